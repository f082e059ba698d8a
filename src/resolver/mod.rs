// ==========================================
// Layout Exporter - sheet -> table resolution
// ==========================================
// Two strategies:
// - deterministic: {prefix}_{normalize(sheet)}, existence-checked
// - fuzzy: similarity scan over the {prefix}% catalog subset, gated by
//   the schema-overlap ("DNA") validation
// A failed sheet is excluded from the execution map; the console stays
// quiet about it but the audit trail records every outcome.
// ==========================================

pub mod normalizer;
pub mod similarity;

use crate::audit::AuditLog;
use crate::catalog::SchemaCatalog;
use crate::config::{ExportConfig, StrategyKind};
use crate::error::ExportResult;
use crate::template::{self, TemplateDocument};
use normalizer::normalize_identifier;
use similarity::ratio;

/// One sheet bound to a database table. The header is the template's
/// positional row-5 list (blanks kept); it is never re-derived from the
/// database at batch time.
#[derive(Debug, Clone)]
pub struct ExecutionEntry {
    pub sheet_name: String,
    pub table: String,
    pub header: Vec<String>,
    pub type_hints: Vec<String>,
}

/// Sheet -> table map, in template order. Built once, reused for every
/// batch.
#[derive(Debug, Default)]
pub struct ExecutionMap {
    entries: Vec<ExecutionEntry>,
}

impl ExecutionMap {
    pub fn entries(&self) -> &[ExecutionEntry] {
        &self.entries
    }

    pub fn get(&self, sheet_name: &str) -> Option<&ExecutionEntry> {
        self.entries.iter().find(|e| e.sheet_name == sheet_name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Outcome of the schema-overlap validation of one candidate table.
#[derive(Debug)]
pub struct DnaReport {
    pub passed: bool,
    pub matched: usize,
    pub missing: Vec<String>,
    pub reason: String,
}

/// Validate that every normalized technical-header column of the sheet
/// exists among the candidate's normalized column names. Partial overlap
/// fails, with the missing columns reported.
pub fn validate_dna(header: &[String], candidate_columns: &[String]) -> DnaReport {
    // Single-character labels are layout artifacts, not technical columns.
    let required: Vec<String> = header
        .iter()
        .filter(|c| c.chars().count() > 1)
        .map(|c| normalize_identifier(c))
        .filter(|c| !c.is_empty())
        .collect();

    if required.is_empty() {
        return DnaReport {
            passed: false,
            matched: 0,
            missing: Vec::new(),
            reason: "sheet has no technical columns in row 5".to_string(),
        };
    }

    let available: Vec<String> = candidate_columns
        .iter()
        .map(|c| normalize_identifier(c))
        .collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|c| !available.contains(c))
        .cloned()
        .collect();

    if missing.is_empty() {
        DnaReport {
            reason: format!("DNA 100% OK ({} columns)", required.len()),
            matched: required.len(),
            missing,
            passed: true,
        }
    } else {
        DnaReport {
            reason: format!("DNA incomplete, missing: {:?}", missing),
            matched: required.len() - missing.len(),
            missing,
            passed: false,
        }
    }
}

/// Deterministic expected table name for a sheet.
pub fn deterministic_table_name(prefix: &str, sheet_name: &str) -> String {
    format!("{}_{}", prefix, normalize_identifier(sheet_name))
}

/// Fuzzy lookup: scan the `{prefix}%` catalog subset in iteration order and
/// accept the first candidate at/above the similarity threshold that passes
/// DNA validation. No global best-match search.
pub fn resolve_fuzzy(
    catalog: &dyn SchemaCatalog,
    prefix: &str,
    sheet_name: &str,
    header: &[String],
    threshold: f64,
    audit: &mut AuditLog,
) -> ExportResult<Option<String>> {
    let normalized_sheet = normalize_identifier(sheet_name);
    let strip = format!("{}_", prefix);

    for table in catalog.list_tables(prefix)? {
        let suffix = table.strip_prefix(&strip).unwrap_or(&table);
        if ratio(&normalized_sheet, suffix) < threshold {
            continue;
        }
        let columns = match catalog.table_columns(&table) {
            Ok(cols) => cols,
            Err(e) => {
                audit.file_only(format!(
                    "  [REPROVADA] sheet '{}' -> table '{}': column listing failed: {}",
                    sheet_name, table, e
                ));
                continue;
            }
        };
        let report = validate_dna(header, &columns);
        if report.passed {
            audit.info(format!(
                "  [SUCESSO] sheet '{}' matched table '{}' ({})",
                sheet_name, table, report.reason
            ));
            return Ok(Some(table));
        }
        audit.file_only(format!(
            "  [REPROVADA] sheet '{}' -> table '{}': {}",
            sheet_name, table, report.reason
        ));
    }
    Ok(None)
}

/// Build the execution map: one pass over the template's sheets, in
/// document order. Ignored sheets and sheets without a usable header never
/// enter the map; unresolved sheets are audit-logged, console-silent.
pub fn build_execution_map(
    doc: &TemplateDocument,
    prefix: &str,
    catalog: &dyn SchemaCatalog,
    cfg: &ExportConfig,
    audit: &mut AuditLog,
) -> ExportResult<ExecutionMap> {
    let mut map = ExecutionMap::default();

    for worksheet in doc.worksheets() {
        let Some(name) = template::sheet_name(worksheet) else {
            continue;
        };
        if cfg.is_ignored_sheet(&name) {
            continue;
        }
        let Some(header) = template::technical_header(worksheet) else {
            audit.file_only(format!("[IGNORADA] sheet '{}': no technical header", name));
            continue;
        };
        let hints = template::type_hints(worksheet);

        let resolved = match cfg.strategy {
            StrategyKind::Deterministic => {
                let table = deterministic_table_name(prefix, &name);
                if catalog.table_exists(&table)? {
                    audit.info(format!("[OK] {} -> {}", name, table));
                    Some(table)
                } else {
                    audit.file_only(format!("[FALHA] table not found: {}", table));
                    None
                }
            }
            StrategyKind::Fuzzy => resolve_fuzzy(
                catalog,
                prefix,
                &name,
                &header,
                cfg.similarity_threshold,
                audit,
            )?,
        };

        if let Some(table) = resolved {
            map.entries.push(ExecutionEntry {
                sheet_name: name,
                table,
                header,
                type_hints: hints,
            });
        }
    }

    Ok(map)
}
