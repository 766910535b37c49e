//! Per-floor tile and metadata fetching.
//!
//! For every cell of the floor grid the fetcher downloads one map tile
//! (written to `{temp}/{floor}/{x}-{y}.png`) and one metadata fragment
//! (appended, as raw text, to the floor's accumulator). The first failed
//! request aborts the floor; there is no partial result.
//!
//! Cells are fetched one at a time unless a worker pool size above one is
//! configured. Either way the returned tile set and metadata text are
//! assembled in grid order, so the output does not depend on which request
//! finished first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{ScrapeError, ScrapeResult};
use crate::grid::{GridCoord, DEFAULT_STEP};
use crate::manifest::FloorMetadata;
use crate::provider::{Endpoints, HttpClient};
use crate::storage::{write_file, StorageLayout};

/// Called after each cell with `(cells_done, cells_total)`.
pub type FetchProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Tiles written for one floor, keyed by grid coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileSet {
    tiles: BTreeMap<GridCoord, PathBuf>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the file holding the tile for `coord`.
    pub fn insert(&mut self, coord: GridCoord, path: PathBuf) {
        self.tiles.insert(coord, path);
    }

    pub fn path_for(&self, coord: GridCoord) -> Option<&Path> {
        self.tiles.get(&coord).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &Path)> {
        self.tiles.iter().map(|(coord, path)| (*coord, path.as_path()))
    }
}

/// Everything fetched for one floor.
#[derive(Debug, Clone)]
pub struct FloorScrape {
    pub tiles: TileSet,
    /// Metadata fragments concatenated in grid order.
    pub metadata: String,
}

/// Result of fetching one grid cell.
struct CellFetch {
    coord: GridCoord,
    tile_path: PathBuf,
    metadata: String,
}

/// Downloads tiles and metadata for a floor.
pub struct TileFetcher<'a, C: HttpClient> {
    client: &'a C,
    endpoints: &'a Endpoints,
    layout: &'a StorageLayout,
    step: u32,
    parallel: usize,
    progress: Option<FetchProgressCallback>,
}

impl<'a, C: HttpClient> TileFetcher<'a, C> {
    pub fn new(client: &'a C, endpoints: &'a Endpoints, layout: &'a StorageLayout) -> Self {
        Self {
            client,
            endpoints,
            layout,
            step: DEFAULT_STEP,
            parallel: 1,
            progress: None,
        }
    }

    /// Set the grid step in pixels.
    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    /// Fetch up to `parallel` cells at once. `0` and `1` mean sequential.
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_progress(mut self, progress: FetchProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fetch every cell of the floor grid.
    ///
    /// # Errors
    ///
    /// - `Filesystem` if the floor's temp directory or a tile file cannot be written
    /// - `Network` for the first failed tile or metadata request
    pub fn fetch_floor(&self, floor_id: &str, metadata: &FloorMetadata) -> ScrapeResult<FloorScrape> {
        let grid = metadata.grid(self.step);
        let cells: Vec<GridCoord> = grid.cells().collect();
        let total = cells.len();
        info!(
            floor = floor_id,
            cells = total,
            step = grid.step(),
            parallel = self.parallel.max(1),
            "Fetching floor tiles"
        );

        self.layout.ensure_floor_temp_dir(floor_id)?;

        let done = AtomicUsize::new(0);
        let fetched: Vec<CellFetch> = if self.parallel <= 1 {
            cells
                .iter()
                .map(|coord| self.fetch_cell(floor_id, *coord, &done, total))
                .collect::<ScrapeResult<_>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallel)
                .build()
                .map_err(|e| {
                    ScrapeError::InvalidConfig(format!("Failed to create fetch pool: {}", e))
                })?;
            pool.install(|| {
                cells
                    .par_iter()
                    .map(|coord| self.fetch_cell(floor_id, *coord, &done, total))
                    .collect::<ScrapeResult<_>>()
            })?
        };

        let mut tiles = TileSet::new();
        let mut text = String::new();
        for cell in fetched {
            tiles.insert(cell.coord, cell.tile_path);
            text.push_str(&cell.metadata);
        }

        info!(
            floor = floor_id,
            tiles = tiles.len(),
            metadata_bytes = text.len(),
            "Fetched floor"
        );
        Ok(FloorScrape {
            tiles,
            metadata: text,
        })
    }

    fn fetch_cell(
        &self,
        floor_id: &str,
        coord: GridCoord,
        done: &AtomicUsize,
        total: usize,
    ) -> ScrapeResult<CellFetch> {
        debug!(floor = floor_id, x = coord.x, y = coord.y, "Fetching cell");

        let tile = self.client.get(&self.endpoints.tile_url(coord, floor_id))?;
        let tile_path = self.layout.tile_path(floor_id, coord);
        write_file(&tile_path, &tile)?;

        let body = self
            .client
            .get(&self.endpoints.data_url(coord, floor_id, self.step))?;

        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref cb) = self.progress {
            cb(finished, total);
        }

        Ok(CellFetch {
            coord,
            tile_path,
            metadata: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
