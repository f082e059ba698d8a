// ==========================================
// Layout Exporter - CLI entry point
// ==========================================
// Single positional argument: the template file name, extension
// optional. Missing argument prints usage and exits cleanly.
// ==========================================

use layout_exporter::run::ExportRun;

fn main() {
    layout_exporter::logging::init();

    let Some(input) = std::env::args().nth(1) else {
        println!("Usage: layout-exporter \"TEMPLATE.xml\"");
        return;
    };

    tracing::info!("==================================================");
    tracing::info!("{} v{}", layout_exporter::APP_NAME, layout_exporter::VERSION);
    tracing::info!("==================================================");

    let result = ExportRun::from_config_files().and_then(|run| run.execute(&input));
    match result {
        Ok(summary) => {
            tracing::info!(
                "run complete: {} document(s), {} sheet(s) mapped, {} key(s)",
                summary.documents.len(),
                summary.sheets_mapped,
                summary.total_keys
            );
        }
        Err(e) => {
            tracing::error!("run aborted: {}", e);
            std::process::exit(1);
        }
    }
}
