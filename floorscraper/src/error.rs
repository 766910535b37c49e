//! Error types for the scrape pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for scrape operations.
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Errors that can occur while scraping a floor.
///
/// Nothing in the pipeline recovers from these; the first error aborts the
/// run and whatever was already written stays on disk.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A manifest, tile or metadata request failed.
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// The manifest document did not yield the expected floor structure.
    #[error("failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// A tile was missing or corrupt, or the composite could not be written.
    #[error("image error at {}: {reason}", path.display())]
    Image { path: PathBuf, reason: String },

    /// A directory or file could not be created or written.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The logging subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

impl ScrapeError {
    /// Build a network error for `url`.
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a filesystem error for `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Build an image error for `path`.
    pub fn image(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Image {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by the remote service rather than local state.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
