// ==========================================
// Layout Exporter - log stack initialization
// ==========================================
// tracing + tracing-subscriber, level via environment variable.
// The per-run audit file is separate (see audit.rs); this is the
// console/diagnostic stream only.
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the console log stack.
///
/// # Environment
/// - RUST_LOG: level filter (default: info)
///   e.g. RUST_LOG=debug or RUST_LOG=layout_exporter=trace
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}

/// Initialize logging for tests: more verbose, captured per test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
