use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // Daily-rotated JSON log file for post-run inspection
    let file_appender = tracing_appender::rolling::daily("logs", "leadflow.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Human-readable console output
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("leadflow=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // The guard must outlive the process so buffered logs are flushed on exit
    std::mem::forget(guard);
}
