//! Logging system initialization
//!
//! Sets up the tracing subscriber from the loaded configuration: console or
//! file output, optional daily rotation, text or JSON formatting.

use crate::config::AppConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

/// Initialize the logging system. Call once at startup, after the
/// configuration has been loaded.
///
/// The returned `WorkerGuard` must be kept alive for the duration of the
/// program so that buffered log writes are flushed on shutdown.
///
/// # Panics
/// * If the log appender cannot be created
/// * If a global subscriber is already installed
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let log_file = config.logging.file.as_deref().unwrap_or("");

    let writer: Box<dyn std::io::Write + Send + Sync> = if log_file.is_empty() {
        Box::new(std::io::stdout())
    } else if config.logging.enable_rotation {
        Box::new(rolling_appender(log_file, config.logging.max_backups))
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .expect("Failed to open log file");
        Box::new(file)
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);

    let builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(EnvFilter::new(config.logging.level.clone()))
        .with_level(true)
        .with_ansi(log_file.is_empty());

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    guard
}

/// Daily-rotated appender next to the configured log file path.
fn rolling_appender(log_file: &str, max_backups: u32) -> rolling::RollingFileAppender {
    let path = Path::new(log_file);
    let dir = path.parent().unwrap_or(Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("httpulse.log")
        .trim_end_matches(".log");

    rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_backups as usize)
        .build(dir)
        .expect("Failed to create rolling log appender")
}
