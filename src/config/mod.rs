// ==========================================
// Layout Exporter - run configuration
// ==========================================
// db_config.json     -> database settings (required)
// export_config.json -> export settings (optional, serde defaults)
// ==========================================

use crate::error::{ExportError, ExportResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Database settings, read from `db_config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// Path of the SQLite database file.
    pub database: String,

    /// Per-connection busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    crate::db::DEFAULT_BUSY_TIMEOUT_MS
}

impl DbConfig {
    pub fn load(path: impl AsRef<Path>) -> ExportResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ExportError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ExportError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Sheet -> table resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// `{prefix}_{normalize(sheet)}`, existence-checked.
    Deterministic,
    /// Similarity scan over the `{prefix}%` catalog subset, DNA-validated.
    Fuzzy,
}

/// Export settings, read from `export_config.json` when present.
///
/// Every field has a default matching the original deployment, so the file
/// is optional and may be partial.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Primary-key values per output document.
    pub batch_size: usize,

    /// Sheets that are administrative/instructional and never exported.
    /// Matching is by substring of the sheet name, as in the template.
    pub ignored_sheets: Vec<String>,

    /// Marker token that designates the master sheet (matched against the
    /// normalized sheet name).
    pub master_marker: String,

    /// Resolution strategy.
    pub strategy: StrategyKind,

    /// Similarity acceptance threshold for the fuzzy strategy.
    pub similarity_threshold: f64,

    /// Explicit key column. When unset, the first column of the master
    /// table (ordinal position 1) is used.
    pub key_column: Option<String>,

    /// Directory holding the input templates.
    pub layouts_dir: String,

    /// Directory receiving the per-prefix output folders.
    pub output_dir: String,

    /// Directory receiving the audit log files.
    pub logs_dir: String,

    /// Append a timestamp to output file names to avoid overwrites.
    pub timestamp_suffix: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: 2_500,
            ignored_sheets: vec![
                "Lista de campos".to_string(),
                "Field List".to_string(),
                "Introdução".to_string(),
                "Introduction".to_string(),
            ],
            master_marker: "DADOS_GERAIS".to_string(),
            strategy: StrategyKind::Deterministic,
            similarity_threshold: 0.60,
            key_column: None,
            layouts_dir: "layouts".to_string(),
            output_dir: "saida".to_string(),
            logs_dir: "logs".to_string(),
            timestamp_suffix: true,
        }
    }
}

impl ExportConfig {
    /// Load from the given path; a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> ExportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| ExportError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ExportError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// True when the sheet name matches the ignore list.
    pub fn is_ignored_sheet(&self, sheet_name: &str) -> bool {
        self.ignored_sheets
            .iter()
            .any(|ign| sheet_name.contains(ign.as_str()))
    }
}
