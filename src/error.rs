// ==========================================
// Layout Exporter - error types
// ==========================================
// One enum for the whole run, grouped by failure class:
// fatal (aborts the run) vs per-sheet (excluded, run continues).
// Per-sheet failures never surface here; they go to the audit trail.
// ==========================================

use thiserror::Error;

/// Run-level error type.
#[derive(Error, Debug)]
pub enum ExportError {
    // ===== Environment / input errors (fatal) =====
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("template not found or unreadable: {0}")]
    TemplateNotFound(String),

    #[error("template markup is malformed: {0}")]
    TemplateParse(String),

    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),

    // ===== Binding errors (fatal) =====
    #[error("no sheet could be bound to a table, nothing to export")]
    EmptyExecutionMap,

    // ===== Key planning errors (fatal) =====
    #[error("master sheet/key detection failed: {0}")]
    MasterDetection(String),

    #[error("table has no columns: {0}")]
    TableWithoutColumns(String),

    // ===== Catalog errors =====
    #[error("catalog query failed: {0}")]
    CatalogQuery(String),

    // ===== Configuration errors =====
    #[error("configuration file error ({path}): {message}")]
    ConfigRead { path: String, message: String },

    // ===== Output errors (fatal) =====
    #[error("output file write failed: {0}")]
    FileWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for ExportError {
    fn from(e: rusqlite::Error) -> Self {
        ExportError::CatalogQuery(e.to_string())
    }
}

/// Result alias used across the crate.
pub type ExportResult<T> = Result<T, ExportError>;
