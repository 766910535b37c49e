//! Logging setup.
//!
//! Logs always go to stderr. With a log directory configured they are also
//! written, without colour codes, to `{log_dir}/floorscraper.log`. `RUST_LOG`
//! overrides the default filter.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ScrapeError, ScrapeResult};
use crate::storage::ensure_dirs;

/// Name of the log file inside the log directory.
pub const LOG_FILE_NAME: &str = "floorscraper.log";

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    /// Log at debug rather than info
    pub verbose: bool,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub fn default_filter(&self) -> &'static str {
        if self.verbose {
            "floorscraper=debug"
        } else {
            "floorscraper=info"
        }
    }
}

/// Keeps the file writer alive; pending lines are flushed on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns `ScrapeError::Logging` if a global subscriber is already set and
/// `ScrapeError::Filesystem` if the log directory cannot be created.
pub fn init_logging(config: &LoggingConfig) -> ScrapeResult<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(LocalTime::rfc_3339());

    let (file_layer, guard) = match config.log_dir {
        Some(ref dir) => {
            ensure_dirs([dir.clone()])?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ScrapeError::Logging(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}
