// ==========================================
// Layout Exporter - run orchestration
// ==========================================
// Strict phase order: binding -> key detection -> generation. Each phase
// gates the next; the audit trail is flushed on every exit path,
// including the fatal ones.
// ==========================================

use crate::audit::AuditLog;
use crate::catalog::{RowSet, SqliteCatalog};
use crate::config::{DbConfig, ExportConfig};
use crate::db;
use crate::error::{ExportError, ExportResult};
use crate::generator::{regenerate, SheetPayload};
use crate::materializer::{fetch_sheet_rows, materialize_rows, unknown_hint_tokens, FetchOutcome};
use crate::planner::build_key_plan;
use crate::resolver::build_execution_map;
use crate::template::TemplateDocument;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// One export run: configuration plus the phase driver.
pub struct ExportRun {
    pub db: DbConfig,
    pub cfg: ExportConfig,
}

/// What a completed run produced, for the caller and for tests.
#[derive(Debug)]
pub struct RunSummary {
    pub prefix: String,
    pub sheets_mapped: usize,
    pub total_keys: usize,
    pub documents: Vec<PathBuf>,
}

/// Run prefix from the template file name: basename up to the first
/// `" - "` separator, dots replaced so the fragment is usable in table
/// and file names.
pub fn derive_prefix(input_name: &str) -> String {
    let base = Path::new(input_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_name.to_string());
    let head = base.split(" - ").next().unwrap_or(&base);
    head.replace('.', "_")
}

impl ExportRun {
    /// Build a run from `db_config.json` + optional `export_config.json`
    /// in the working directory.
    pub fn from_config_files() -> ExportResult<Self> {
        Ok(Self {
            db: DbConfig::load("db_config.json")?,
            cfg: ExportConfig::load_or_default("export_config.json")?,
        })
    }

    /// Template path under the layouts directory; the `.xml` extension is
    /// optional on the CLI.
    pub fn template_path(&self, input_name: &str) -> PathBuf {
        let file = if input_name.ends_with(".xml") {
            input_name.to_string()
        } else {
            format!("{}.xml", input_name)
        };
        Path::new(&self.cfg.layouts_dir).join(file)
    }

    /// Execute the full run for one template. The audit trail is flushed
    /// before this returns, on success and on every fatal path.
    pub fn execute(&self, input_name: &str) -> ExportResult<RunSummary> {
        let started = Local::now();
        let prefix = derive_prefix(input_name);
        let mut audit = AuditLog::new(&prefix, &self.cfg.logs_dir);

        let result = self.run_phases(input_name, &prefix, &mut audit);
        match &result {
            Ok(summary) => {
                let elapsed = Local::now().signed_duration_since(started);
                audit.info(format!(
                    "TOTAL TIME: {:.2}s",
                    elapsed.num_milliseconds() as f64 / 1000.0
                ));
                audit.info(format!(
                    "DOCUMENTS: {} | SHEETS: {}",
                    summary.documents.len(),
                    summary.sheets_mapped
                ));
                audit.flush()?;
            }
            Err(e) => {
                audit.info(format!("[ERRO CRITICO] {}", e));
                // Diagnosis must stay possible even when the flush target
                // is the problem.
                let _ = audit.flush();
            }
        }
        result
    }

    fn run_phases(
        &self,
        input_name: &str,
        prefix: &str,
        audit: &mut AuditLog,
    ) -> ExportResult<RunSummary> {
        let path = self.template_path(input_name);
        let source = fs::read_to_string(&path)
            .map_err(|e| ExportError::TemplateNotFound(format!("{}: {}", path.display(), e)))?;
        let doc = TemplateDocument::parse(&source)?;

        let conn = db::open_connection(&self.db)?;
        let conn = db::refresh_connection(conn, &self.db)?;
        let catalog = SqliteCatalog::new(&conn);

        // --- Phase 1: binding ---
        audit.info("--- 1. VINCULACAO ---");
        let map = build_execution_map(&doc, prefix, &catalog, &self.cfg, audit)?;
        if map.is_empty() {
            audit.info("[ERRO] no sheet could be bound");
            return Err(ExportError::EmptyExecutionMap);
        }
        for entry in map.entries() {
            for (column, token) in unknown_hint_tokens(&entry.header, &entry.type_hints) {
                audit.file_only(format!(
                    "[HINT] sheet '{}' column '{}': unknown type token '{}', rendering as String",
                    entry.sheet_name, column, token
                ));
            }
        }

        // --- Phase 2: key detection ---
        audit.info("--- 2. DETECCAO DE CHAVE ---");
        let plan = build_key_plan(&map, &catalog, &self.cfg, audit)?;

        // --- Phase 3: generation ---
        audit.info("--- 3. GERACAO ---");
        let mut documents = Vec::new();

        if plan.batches.is_empty() {
            audit.info("[AVISO] zero distinct keys, no documents generated");
        } else {
            let out_dir = Path::new(&self.cfg.output_dir).join(prefix);
            fs::create_dir_all(&out_dir)?;
            let suffix = if self.cfg.timestamp_suffix {
                format!("_{}", started_stamp())
            } else {
                String::new()
            };

            for batch in &plan.batches {
                let mut payloads = Vec::with_capacity(map.len());
                for entry in map.entries() {
                    let rows = match fetch_sheet_rows(
                        &catalog,
                        &entry.table,
                        &plan.key_column,
                        &batch.keys,
                    ) {
                        FetchOutcome::Full(rows) => rows,
                        FetchOutcome::Degraded { rows, reason } => {
                            audit.file_only(format!(
                                "[AVISO] sheet '{}': keyed query failed, full table used: {}",
                                entry.sheet_name, reason
                            ));
                            rows
                        }
                        FetchOutcome::Failed(reason) => {
                            audit.file_only(format!(
                                "[AVISO] sheet '{}': no rows for batch {}: {}",
                                entry.sheet_name,
                                batch.index + 1,
                                reason
                            ));
                            RowSet::empty()
                        }
                    };
                    payloads.push(SheetPayload {
                        sheet_name: entry.sheet_name.clone(),
                        rows: materialize_rows(&rows, &entry.header, &entry.type_hints),
                    });
                }

                let document = regenerate(&source, &payloads)?;
                let file_name =
                    format!("{}_Parte_{:02}{}.xml", prefix, batch.index + 1, suffix);
                let out_path = out_dir.join(&file_name);
                fs::write(&out_path, document).map_err(|e| {
                    ExportError::FileWrite(format!("{}: {}", out_path.display(), e))
                })?;
                audit.info(format!("[OK] {}", file_name));
                documents.push(out_path);
            }
        }

        Ok(RunSummary {
            prefix: prefix.to_string(),
            sheets_mapped: map.len(),
            total_keys: plan.total_keys,
            documents,
        })
    }
}

fn started_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_prefix() {
        assert_eq!(derive_prefix("MM.01 - Materiais.xml"), "MM_01");
        assert_eq!(derive_prefix("layouts/MM.01 - Materiais.xml"), "MM_01");
        assert_eq!(derive_prefix("Layout"), "Layout");
        assert_eq!(derive_prefix("Layout.xml"), "Layout_xml");
    }

    #[test]
    fn test_template_path_extension_optional() {
        let run = ExportRun {
            db: DbConfig {
                database: ":memory:".into(),
                busy_timeout_ms: 5_000,
            },
            cfg: ExportConfig::default(),
        };
        assert_eq!(
            run.template_path("ABC"),
            Path::new("layouts").join("ABC.xml")
        );
        assert_eq!(
            run.template_path("ABC.xml"),
            Path::new("layouts").join("ABC.xml")
        );
    }
}
