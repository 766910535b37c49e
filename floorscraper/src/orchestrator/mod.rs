//! Scrape run orchestration
//!
//! Drives one run end to end: prepare the output tree, load the manifest,
//! pick the floors, then fetch, stitch and export each floor in turn. Any
//! error stops the run at the point it happened; outputs of floors that
//! already finished stay on disk.

mod types;

pub use types::{
    FloorReport, FloorSelection, FloorTargets, ScrapeReport, ScrapeSettings, DEFAULT_FLOOR,
};

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::compositor::Compositor;
use crate::config::ScrapeConfig;
use crate::error::ScrapeResult;
use crate::export::DataExporter;
use crate::fetcher::TileFetcher;
use crate::manifest::{FloorManifest, FloorMetadata, ManifestLoader};
use crate::provider::{Endpoints, HttpClient, ReqwestClient, RetryingClient};
use crate::storage::StorageLayout;

/// Called after each fetched cell with `(floor_id, cells_done, cells_total)`.
pub type ScrapeProgressCallback = Arc<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Runs the scrape pipeline against one service.
pub struct Scraper<C: HttpClient> {
    client: C,
    endpoints: Endpoints,
    layout: StorageLayout,
    settings: ScrapeSettings,
    progress: Option<ScrapeProgressCallback>,
}

impl<C: HttpClient> Scraper<C> {
    pub fn new(client: C, endpoints: Endpoints, layout: StorageLayout) -> Self {
        Self {
            client,
            endpoints,
            layout,
            settings: ScrapeSettings::default(),
            progress: None,
        }
    }

    pub fn with_settings(mut self, settings: ScrapeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_progress(mut self, progress: ScrapeProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    /// Scrape the selected floors.
    ///
    /// Floors run one after another in selection order. A requested floor
    /// that the manifest does not list is skipped and reported in
    /// [`ScrapeReport::skipped`].
    ///
    /// # Errors
    ///
    /// Returns the first error from bootstrapping, the manifest, or any
    /// floor. A floor whose fetch fails produces neither image nor table.
    pub fn run(&self, selection: &FloorSelection) -> ScrapeResult<ScrapeReport> {
        let started = Instant::now();
        self.layout.ensure_directories()?;

        let manifest = self.load_manifest()?;
        let (targets, skipped) = selection.resolve(&manifest);
        info!(
            selection = %selection,
            floors = targets.len(),
            skipped = skipped.len(),
            "Starting scrape"
        );

        let mut floors = Vec::with_capacity(targets.len());
        for (floor_id, metadata) in targets {
            floors.push(self.scrape_floor(&floor_id, metadata)?);
        }

        let report = ScrapeReport {
            floors,
            skipped,
            elapsed: started.elapsed(),
        };
        info!(
            floors = report.floors.len(),
            tiles = report.total_tiles(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Scrape complete"
        );
        Ok(report)
    }

    /// Fetch and parse the floor manifest.
    pub fn load_manifest(&self) -> ScrapeResult<FloorManifest> {
        ManifestLoader::new(&self.client, &self.endpoints, &self.layout).load()
    }

    /// Fetch, stitch and export one floor.
    ///
    /// Expects the output directories to exist; [`Scraper::run`] creates them.
    pub fn scrape_floor(&self, floor_id: &str, metadata: &FloorMetadata) -> ScrapeResult<FloorReport> {
        let started = Instant::now();
        info!(
            floor = floor_id,
            width = metadata.map_width,
            height = metadata.map_height,
            "Scraping floor"
        );

        let mut fetcher = TileFetcher::new(&self.client, &self.endpoints, &self.layout)
            .with_step(self.settings.step)
            .with_parallel(self.settings.parallel);
        if let Some(ref progress) = self.progress {
            let progress = Arc::clone(progress);
            let id = floor_id.to_string();
            fetcher = fetcher.with_progress(Box::new(move |done, total| progress(&id, done, total)));
        }
        let scrape = fetcher.fetch_floor(floor_id, metadata)?;

        let composite = Compositor::new(&self.layout)
            .with_step(self.settings.step)
            .composite(floor_id, metadata, &scrape.tiles)?;
        let table = DataExporter::new(&self.layout).export_table(floor_id, &scrape.metadata)?;

        Ok(FloorReport {
            floor_id: floor_id.to_string(),
            tiles: scrape.tiles.len(),
            metadata_bytes: scrape.metadata.len(),
            composite_path: composite.path,
            composite_size: (composite.width, composite.height),
            table_path: table.path,
            table_rows: table.rows,
            elapsed: started.elapsed(),
        })
    }
}

impl Scraper<RetryingClient<ReqwestClient>> {
    /// Build a scraper talking to the real service as configured.
    pub fn from_config(config: &ScrapeConfig) -> ScrapeResult<Self> {
        let client = RetryingClient::new(
            ReqwestClient::with_timeout(config.timeout_secs)?,
            config.retry,
        );
        Ok(Self::new(client, config.endpoints.clone(), config.layout.clone())
            .with_settings(config.settings))
    }
}
