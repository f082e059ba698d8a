// ==========================================
// Layout Exporter - key planner
// ==========================================
// Master sheet detection, key column detection, distinct-key
// enumeration and fixed-size batching. The key is never verified to be
// unique; batches are slices over the *distinct* value list.
// ==========================================

use crate::audit::AuditLog;
use crate::catalog::SchemaCatalog;
use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::resolver::normalizer::normalize_identifier;
use crate::resolver::{ExecutionEntry, ExecutionMap};

/// A bounded, ordered chunk of primary-key values. Immutable once built;
/// one batch drives one output document.
#[derive(Debug, Clone)]
pub struct KeyBatch {
    pub index: usize,
    pub keys: Vec<String>,
}

/// The run's batching plan, computed once after resolution.
#[derive(Debug)]
pub struct KeyPlan {
    pub master_sheet: String,
    pub master_table: String,
    pub key_column: String,
    pub total_keys: usize,
    pub batches: Vec<KeyBatch>,
}

/// The master sheet: first map entry whose normalized name contains the
/// marker token, else the first resolved entry.
pub fn select_master<'a>(map: &'a ExecutionMap, marker: &str) -> Option<&'a ExecutionEntry> {
    map.entries()
        .iter()
        .find(|e| normalize_identifier(&e.sheet_name).contains(marker))
        .or_else(|| map.entries().first())
}

/// The key column as the database reports it: ordinal position 1 of the
/// master table, uppercased.
pub fn detect_key_column(catalog: &dyn SchemaCatalog, table: &str) -> ExportResult<String> {
    let columns = catalog.table_columns(table)?;
    columns
        .first()
        .map(|c| c.to_uppercase())
        .ok_or_else(|| ExportError::TableWithoutColumns(table.to_string()))
}

/// Numeric order when every key parses as an integer, lexical otherwise.
/// Mixed input must never fail.
pub fn sort_keys(keys: &mut [String]) {
    if keys.iter().all(|k| k.parse::<i64>().is_ok()) {
        keys.sort_by_key(|k| k.parse::<i64>().unwrap_or_default());
    } else {
        keys.sort();
    }
}

/// Contiguous fixed-size slices; the final batch may be short.
pub fn chunk_keys(keys: Vec<String>, batch_size: usize) -> Vec<KeyBatch> {
    let batch_size = batch_size.max(1);
    keys.chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| KeyBatch {
            index,
            keys: chunk.to_vec(),
        })
        .collect()
}

/// Build the full plan. Any failure against the master table is fatal for
/// the run.
pub fn build_key_plan(
    map: &ExecutionMap,
    catalog: &dyn SchemaCatalog,
    cfg: &ExportConfig,
    audit: &mut AuditLog,
) -> ExportResult<KeyPlan> {
    let master = select_master(map, &cfg.master_marker)
        .ok_or_else(|| ExportError::MasterDetection("execution map is empty".to_string()))?;

    let key_column = match &cfg.key_column {
        Some(explicit) => explicit.to_uppercase(),
        None => detect_key_column(catalog, &master.table)
            .map_err(|e| ExportError::MasterDetection(e.to_string()))?,
    };

    audit.info(format!("MASTER TABLE: {}", master.table));
    audit.info(format!("KEY COLUMN: {}", key_column));

    let mut keys = catalog
        .distinct_keys(&master.table, &key_column)
        .map_err(|e| ExportError::MasterDetection(e.to_string()))?;
    sort_keys(&mut keys);

    let total_keys = keys.len();
    let batches = chunk_keys(keys, cfg.batch_size);
    audit.info(format!(
        "RECORDS: {} | FILES: {}",
        total_keys,
        batches.len()
    ));

    Ok(KeyPlan {
        master_sheet: master.sheet_name.clone(),
        master_table: master.table.clone(),
        key_column,
        total_keys,
        batches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_chunking_5001_keys_batch_2500() {
        let batches = chunk_keys(keys(5_001), 2_500);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].keys.len(), 2_500);
        assert_eq!(batches[1].keys.len(), 2_500);
        assert_eq!(batches[2].keys.len(), 1);
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn test_chunking_zero_keys_yields_zero_batches() {
        assert!(chunk_keys(Vec::new(), 2_500).is_empty());
    }

    #[test]
    fn test_numeric_sort_when_all_integers() {
        let mut k = vec!["10".to_string(), "9".to_string(), "100".to_string()];
        sort_keys(&mut k);
        assert_eq!(k, vec!["9", "10", "100"]);
    }

    #[test]
    fn test_lexical_fallback_does_not_fail_on_mixed_keys() {
        let mut k = vec!["B2".to_string(), "10".to_string(), "A1".to_string()];
        sort_keys(&mut k);
        assert_eq!(k, vec!["10", "A1", "B2"]);
    }
}
