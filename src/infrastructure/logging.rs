//! Centralized file-based logging
//!
//! Writes logs to files in logs/ directory:
//! - logs/client - all client logs
//! - logs/error  - warnings and errors only

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize file and console logging
///
/// Creates the logs/ directory and daily-rolling appenders. The returned
/// guards must be kept alive for the duration of the program or buffered
/// lines are lost.
pub fn init_logging() -> Vec<WorkerGuard> {
    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        fs::create_dir_all(logs_dir).expect("Failed to create logs directory");
    }

    let mut guards = Vec::new();

    let (client_appender, client_guard) = create_appender("logs/client", "client");
    guards.push(client_guard);

    let (error_appender, error_guard) = create_appender("logs/error", "error");
    guards.push(error_guard);

    let client_layer = tracing_subscriber::fmt::layer()
        .with_writer(client_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(client_layer)
        .with(error_layer)
        .with(console_layer)
        .init();

    tracing::info!("Logging initialized, files in logs/");

    guards
}

/// Create a daily-rolling file appender
fn create_appender(dir: &str, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, name);
    tracing_appender::non_blocking(appender)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appender_creation() {
        let dir = std::env::temp_dir().join("realtime_log_test");
        let (_writer, guard) = create_appender(dir.to_str().unwrap(), "test");
        drop(guard);
        fs::remove_dir_all(&dir).ok();
    }
}
