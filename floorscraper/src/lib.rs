//! floorscraper - Indoor floor map scraping
//!
//! This library downloads the tiled floor maps and point-of-interest data
//! published by a PathAdvisor indoor-mapping service. For each selected
//! floor it fetches every grid cell, stitches the tiles into one image and
//! writes the point data as a CSV table.
//!
//! ```ignore
//! use floorscraper::config::ConfigFile;
//! use floorscraper::orchestrator::Scraper;
//!
//! let config = ConfigFile::load()?.to_scrape_config()?;
//! let report = Scraper::from_config(&config)?.run(&config.selection)?;
//! println!("{} floors", report.floors.len());
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod grid;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod provider;
pub mod storage;

pub use error::{ScrapeError, ScrapeResult};
pub use orchestrator::{FloorSelection, ScrapeReport, Scraper};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
