//! Logging bootstrap.
//!
//! `RUST_LOG`-driven filtering with optional JSON output and file
//! rotation. Call once at startup; repeated calls are ignored so tests
//! can initialize freely.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Also write to a daily-rotated file in this directory.
    pub file_directory: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
            file_directory: None,
            file_prefix: "agent".to_string(),
        }
    }
}

/// Initialize the global subscriber. Returns a guard that must be held
/// for the lifetime of the process when file logging is enabled.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.clone()));

    if let Some(directory) = &config.file_directory {
        let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let builder = fmt().with_env_filter(filter).with_writer(writer).with_ansi(false);
        let result = if config.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if result.is_err() {
            // A subscriber is already installed; keep it.
            return None;
        }
        return Some(guard);
    }

    let builder = fmt().with_env_filter(filter);
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    None
}

/// Initialize with defaults; handy for tests and examples.
pub fn init_default() {
    let _ = init(&LoggingConfig::default());
}
