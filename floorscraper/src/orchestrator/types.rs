//! Orchestrator types

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ScrapeError;
use crate::grid::DEFAULT_STEP;
use crate::manifest::{FloorManifest, FloorMetadata};

/// Floor scraped when nothing else is requested.
pub const DEFAULT_FLOOR: &str = "G";

/// Floors to scrape with their dimensions, plus requested floors not found.
pub type FloorTargets<'m> = (Vec<(String, &'m FloorMetadata)>, Vec<String>);

/// Which floors a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloorSelection {
    /// One floor by identifier
    Single(String),
    /// Several floors, scraped in the given order
    Many(Vec<String>),
    /// Every floor in the manifest, in identifier order
    All,
}

impl Default for FloorSelection {
    fn default() -> Self {
        FloorSelection::Single(DEFAULT_FLOOR.to_string())
    }
}

impl FloorSelection {
    /// Pick the floors to scrape from the manifest.
    ///
    /// Returns the floors to scrape, in order, and the requested floors the
    /// manifest does not know. The latter are logged and left out; a
    /// duplicate request is scraped once.
    pub fn resolve<'m>(&self, manifest: &'m FloorManifest) -> FloorTargets<'m> {
        let requested: Vec<&str> = match self {
            FloorSelection::All => {
                let targets = manifest
                    .iter()
                    .map(|(id, meta)| (id.to_string(), meta))
                    .collect();
                return (targets, Vec::new());
            }
            FloorSelection::Single(id) => vec![id.as_str()],
            FloorSelection::Many(ids) => ids.iter().map(String::as_str).collect(),
        };

        let mut targets: Vec<(String, &FloorMetadata)> = Vec::with_capacity(requested.len());
        let mut missing: Vec<String> = Vec::new();
        for id in requested {
            if targets.iter().any(|(seen, _)| seen == id) || missing.iter().any(|m| m == id) {
                continue;
            }
            match manifest.get(id) {
                Some(meta) => targets.push((id.to_string(), meta)),
                None => {
                    warn!(floor = id, "Floor not in manifest, skipping");
                    missing.push(id.to_string());
                }
            }
        }
        (targets, missing)
    }
}

impl FromStr for FloorSelection {
    type Err = ScrapeError;

    /// Parses `all`, a single identifier, or a comma-separated list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(FloorSelection::All);
        }

        let mut ids: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        match ids.len() {
            0 => Err(ScrapeError::InvalidConfig(format!(
                "Invalid floor selection '{}'",
                s
            ))),
            1 => Ok(FloorSelection::Single(ids.swap_remove(0))),
            _ => Ok(FloorSelection::Many(ids)),
        }
    }
}

impl fmt::Display for FloorSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloorSelection::Single(id) => write!(f, "{}", id),
            FloorSelection::Many(ids) => write!(f, "{}", ids.join(",")),
            FloorSelection::All => write!(f, "all"),
        }
    }
}

/// Tunables for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSettings {
    /// Grid step in pixels
    pub step: u32,
    /// Concurrent cell fetches; 1 is sequential
    pub parallel: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            parallel: 1,
        }
    }
}

/// Outcome of scraping one floor.
#[derive(Debug, Clone)]
pub struct FloorReport {
    pub floor_id: String,
    /// Grid cells fetched
    pub tiles: usize,
    /// Raw metadata bytes before normalization
    pub metadata_bytes: usize,
    pub composite_path: PathBuf,
    pub composite_size: (u32, u32),
    pub table_path: PathBuf,
    pub table_rows: usize,
    pub elapsed: Duration,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    /// Floors scraped, in the order they ran
    pub floors: Vec<FloorReport>,
    /// Requested floors missing from the manifest
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

impl ScrapeReport {
    pub fn total_tiles(&self) -> usize {
        self.floors.iter().map(|f| f.tiles).sum()
    }
}
