//! Remote indoor-mapping service access.
//!
//! This module provides the HTTP seam ([`HttpClient`]) the scraper talks
//! through, the reqwest-backed implementation, an optional retry decorator
//! and the URL builders for the PathAdvisor endpoints.
//!
//! ```ignore
//! use floorscraper::provider::{Endpoints, ReqwestClient, RetryPolicy, RetryingClient};
//!
//! let client = RetryingClient::new(ReqwestClient::new()?, RetryPolicy::none());
//! let endpoints = Endpoints::default();
//! let body = client.get(endpoints.manifest_url())?;
//! ```

mod endpoints;
mod http;
mod retry;

pub use endpoints::{Endpoints, DEFAULT_DATA_URL, DEFAULT_MANIFEST_URL, DEFAULT_TILE_URL};
pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use retry::{RetryPolicy, RetryingClient, DEFAULT_RETRY_BACKOFF_MS};

#[cfg(test)]
pub use http::tests::MockHttpClient;
