//! CLI error type.

use std::fmt;

use floorscraper::ScrapeError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad configuration file or command-line value
    Config(String),
    /// Logging could not be set up
    Logging(String),
    /// The scrape itself failed
    Scrape(ScrapeError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Scrape(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Scrape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScrapeError> for CliError {
    fn from(e: ScrapeError) -> Self {
        match e {
            ScrapeError::InvalidConfig(msg) => CliError::Config(msg),
            ScrapeError::Logging(msg) => CliError::Logging(msg),
            other => CliError::Scrape(other),
        }
    }
}
