//! HTTP client abstraction for testability

use std::time::Duration;

use crate::error::{ScrapeError, ScrapeResult};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for HTTP client operations.
///
/// Every remote call the scraper makes (manifest, tiles, metadata) is a
/// plain GET, so this is the only seam needed to run the pipeline against
/// a fake service in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes, or a `Network` error for transport
    /// failures and non-success status codes.
    fn get(&self, url: &str) -> ScrapeResult<Vec<u8>>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        (**self).get(url)
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> ScrapeResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> ScrapeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("floorscraper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ScrapeError::InvalidConfig(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ScrapeError::network(url, format!("Request failed: {}", e)))?;

        // Check HTTP status
        if !response.status().is_success() {
            return Err(ScrapeError::network(url, format!("HTTP {}", response.status())));
        }

        // Read response body
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ScrapeError::network(url, format!("Failed to read response: {}", e)))
    }
}
