// ==========================================
// Layout Exporter - layout inspection tool
// ==========================================
// Dry run of the deterministic binding: prints, for every processable
// sheet, the expected table name and whether it exists, then the master
// table's key analysis. Generates nothing.
// ==========================================

use layout_exporter::catalog::{SchemaCatalog, SqliteCatalog};
use layout_exporter::resolver::deterministic_table_name;
use layout_exporter::resolver::normalizer::normalize_identifier;
use layout_exporter::run::{derive_prefix, ExportRun};
use layout_exporter::template::{self, TemplateDocument};
use std::fs;

fn main() -> anyhow::Result<()> {
    layout_exporter::logging::init();

    let Some(input) = std::env::args().nth(1) else {
        println!("Usage: inspect-layout \"TEMPLATE.xml\"");
        return Ok(());
    };

    let run = ExportRun::from_config_files()?;
    let prefix = derive_prefix(&input);
    println!("{}", "=".repeat(60));
    println!("TABLE INSPECTION: {}", input);
    println!("Prefix: {}", prefix);
    println!("{}", "=".repeat(60));

    let path = run.template_path(&input);
    let source = fs::read_to_string(&path)?;
    let doc = TemplateDocument::parse(&source)?;

    let conn = layout_exporter::db::open_connection(&run.db)?;
    let catalog = SqliteCatalog::new(&conn);

    let mut found = 0usize;
    let mut total = 0usize;
    let mut master: Option<(String, Vec<String>)> = None;

    println!("{:<40} | {:<45} | STATUS", "SHEET", "EXPECTED TABLE");
    println!("{}", "-".repeat(100));

    for worksheet in doc.worksheets() {
        let Some(name) = template::sheet_name(worksheet) else {
            continue;
        };
        if run.cfg.is_ignored_sheet(&name) {
            continue;
        }
        total += 1;

        let table = deterministic_table_name(&prefix, &name);
        let status = if catalog.table_exists(&table)? {
            found += 1;
            if normalize_identifier(&name).contains(&run.cfg.master_marker) {
                master = Some((table.clone(), catalog.table_columns(&table)?));
            }
            "OK"
        } else {
            "MISSING"
        };
        println!("{:<40} | {:<45} | {}", name, table, status);
    }

    println!("{}", "-".repeat(100));
    println!("SUMMARY: {} found out of {} processable sheets", found, total);

    match master {
        Some((table, columns)) => {
            println!();
            println!("MASTER TABLE ANALYSIS ({}):", table);
            match columns.first() {
                Some(first) => {
                    println!("  column 1 (will be the key): [ {} ]", first.to_uppercase());
                    println!("  first columns: {:?}", &columns[..columns.len().min(5)]);
                }
                None => println!("  table exists but has no columns"),
            }
        }
        None => {
            println!();
            println!(
                "WARNING: no sheet matches the master marker '{}'; the export run \
                 will fall back to the first resolved sheet",
                run.cfg.master_marker
            );
        }
    }

    Ok(())
}
