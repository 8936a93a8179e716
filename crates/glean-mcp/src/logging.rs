//! Tracing setup.
//!
//! Logs go to stderr (stdout carries MCP traffic) and, when a log directory is
//! available, to a daily-rolling file `glean-mcp.<date>.log`.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging options from the command line.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines on stderr.
    pub json: bool,
    /// Directory for the rolling log file.
    pub log_dir: Option<PathBuf>,
}

/// Keeps the file writer flushing until dropped at exit.
#[derive(Debug)]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// A log directory that cannot be created only disables file logging.
#[must_use]
pub fn init(settings: &LogSettings) -> LogGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let stderr_layer = if settings.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr).boxed()
    };

    let mut file_error = None;
    let (file_layer, guard) = match settings.log_dir.as_ref().map(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("glean-mcp")
            .filename_suffix("log")
            .build(dir)
    }) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            file_error = Some(e.to_string());
            (None, None)
        }
        None => (None, None),
    };

    // Ignore a second init (tests, embedding).
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter)
        .try_init();

    if let Some(error) = file_error {
        tracing::warn!(%error, "File logging disabled");
    }

    LogGuard { _file: guard }
}
