// ==========================================
// Layout Exporter - core library
// ==========================================
// Fills SAP SpreadsheetML layout templates from a relational database,
// one output document per key batch. Single-threaded, single-run:
// binding -> key detection -> generation, in strict order.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Template layer - parsed markup tree, header/type-hint access, writer
pub mod template;

// Resolution layer - normalizer, similarity, DNA validation, execution map
pub mod resolver;

// Key planning - master detection, distinct keys, batching
pub mod planner;

// Row materialization - fetch outcomes, typing, sanitization
pub mod materializer;

// Document regeneration - clone-and-patch per batch
pub mod generator;

// Schema catalog - database query shapes behind a trait
pub mod catalog;

// Configuration layer
pub mod config;

// Database infrastructure (connection bootstrap / unified settings)
pub mod db;

// Log stack
pub mod logging;

// Per-run audit trail
pub mod audit;

// Error types
pub mod error;

// Run orchestration
pub mod run;

// ==========================================
// Re-exports
// ==========================================

pub use audit::AuditLog;
pub use catalog::{RowSet, SchemaCatalog, SqliteCatalog};
pub use config::{DbConfig, ExportConfig, StrategyKind};
pub use error::{ExportError, ExportResult};
pub use generator::{regenerate, SheetPayload};
pub use materializer::{CellValue, FetchOutcome, MaterializedRow};
pub use planner::{KeyBatch, KeyPlan};
pub use resolver::{ExecutionEntry, ExecutionMap};
pub use run::{derive_prefix, ExportRun, RunSummary};
pub use template::TemplateDocument;

// ==========================================
// Constants
// ==========================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Layout Exporter";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
