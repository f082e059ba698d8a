// ==========================================
// Layout Exporter - per-run audit trail
// ==========================================
// Every binding/keying/generation outcome is recorded here and written
// to one file per run under the logs directory. Console output goes
// through tracing; `file_only` entries keep the console quiet (failed
// sheets, degraded fetches) while the file records everything.
// ==========================================

use crate::error::ExportResult;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Accumulating audit trail of one export run.
pub struct AuditLog {
    prefix: String,
    logs_dir: PathBuf,
    lines: Vec<String>,
}

impl AuditLog {
    pub fn new(prefix: &str, logs_dir: impl AsRef<Path>) -> Self {
        let mut log = Self {
            prefix: prefix.to_string(),
            logs_dir: logs_dir.as_ref().to_path_buf(),
            lines: Vec::new(),
        };
        log.record(format!("RUN: {}", prefix));
        log.record(format!(
            "STARTED: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        log
    }

    /// Record a line and echo it to the console stream.
    pub fn info(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("{}", line);
        self.record(line);
    }

    /// Record a line in the file only; the console stays quiet.
    pub fn file_only(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!("{}", line);
        self.record(line);
    }

    fn record(&mut self, line: String) {
        self.lines.push(line);
    }

    /// The recorded lines, in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the trail to `{logs_dir}/{prefix}_{timestamp}.txt`, creating
    /// the directory when needed.
    pub fn flush(&self) -> ExportResult<PathBuf> {
        fs::create_dir_all(&self.logs_dir)?;
        let file_name = format!(
            "{}_{}.txt",
            self.prefix,
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        let path = self.logs_dir.join(file_name);
        fs::write(&path, self.lines.join("\n") + "\n")?;
        Ok(path)
    }
}
