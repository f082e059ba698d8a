// ==========================================
// Layout Exporter - SQLite connection bootstrap
// ==========================================
// Goals:
// - one place for Connection::open so every module sees the same
//   busy_timeout behavior
// - single startup "refresh" retry, never per-query
// ==========================================

use crate::config::DbConfig;
use crate::error::{ExportError, ExportResult};
use rusqlite::Connection;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Apply the unified per-connection settings.
///
/// busy_timeout must be configured on every connection individually.
pub fn configure_connection(conn: &Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// Open the database connection and apply the unified settings.
pub fn open_connection(cfg: &DbConfig) -> ExportResult<Connection> {
    let conn = Connection::open(&cfg.database)
        .map_err(|e| ExportError::ConnectionFailed(format!("{}: {}", cfg.database, e)))?;
    configure_connection(&conn, cfg.busy_timeout_ms)
        .map_err(|e| ExportError::ConnectionFailed(e.to_string()))?;
    Ok(conn)
}

/// Probe the connection with a trivial query; on failure, dispose and
/// reopen once. This is the only retry of the run.
pub fn refresh_connection(conn: Connection, cfg: &DbConfig) -> ExportResult<Connection> {
    match probe(&conn) {
        Ok(()) => Ok(conn),
        Err(e) => {
            tracing::warn!("connection probe failed, reopening once: {}", e);
            drop(conn);
            let conn = open_connection(cfg)?;
            probe(&conn).map_err(|e| ExportError::ConnectionFailed(e.to_string()))?;
            Ok(conn)
        }
    }
}

fn probe(conn: &Connection) -> rusqlite::Result<()> {
    conn.query_row("SELECT 1", [], |_row| Ok(()))
}
