//! Tracing subscriber setup.
//!
//! Console output always goes to stderr. When a log directory is configured
//! the same events are also appended to `<directory>/geosync.log` through a
//! non-blocking writer; keep the returned [`LoggingGuard`] alive until exit so
//! buffered lines are flushed.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Log file name inside the configured directory.
pub const LOG_FILE_NAME: &str = "geosync.log";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Filter directive used when `RUST_LOG` is not set, e.g. `info` or
    /// `geosync=debug`.
    pub level: String,
    /// Directory for the log file; console only when `None`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl LoggingOptions {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

/// Keeps the file writer's worker thread alive.
#[must_use = "dropping the guard stops the file writer"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// A subscriber that is already installed is left in place.
///
/// # Errors
///
/// Fails if the log directory cannot be created.
pub fn init_logging(options: &LoggingOptions) -> io::Result<LoggingGuard> {
    let (file_layer, file_guard) = match &options.directory {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter(&options.level))
        .with(console)
        .with(file_layer)
        .try_init();

    Ok(LoggingGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_builders() {
        let options = LoggingOptions::default()
            .with_level("debug")
            .with_directory("/tmp/logs");
        assert_eq!(options.level, "debug");
        assert_eq!(options.directory, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // Must not panic on an unparseable directive.
        let _ = env_filter("=[not a filter");
    }

    #[test]
    fn test_init_creates_log_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("logs");

        let guard = init_logging(&LoggingOptions::default().with_directory(&dir)).unwrap();
        assert!(dir.is_dir());
        drop(guard);
    }
}
