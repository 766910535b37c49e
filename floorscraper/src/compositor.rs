//! Floor map stitching.
//!
//! Tiles are placed on one canvas at their own pixel offsets, mosaic style:
//! no blending, later grid cells simply overwrite any overlap. The canvas is
//! the bounding box of all placed tiles, so a floor whose last column starts
//! at the map edge produces an image wider than the nominal map.

use std::path::{Path, PathBuf};

use image::{imageops, ImageFormat, ImageReader, RgbaImage};
use tracing::{debug, info};

use crate::error::{ScrapeError, ScrapeResult};
use crate::fetcher::TileSet;
use crate::grid::{GridCoord, DEFAULT_STEP};
use crate::manifest::FloorMetadata;
use crate::storage::StorageLayout;

/// The stitched image written for one floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeImage {
    pub floor_id: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Number of tiles placed.
    pub tiles: usize,
}

/// Assembles a floor's tiles into one image.
#[derive(Debug, Clone)]
pub struct Compositor<'a> {
    layout: &'a StorageLayout,
    step: u32,
}

impl<'a> Compositor<'a> {
    pub fn new(layout: &'a StorageLayout) -> Self {
        Self {
            layout,
            step: DEFAULT_STEP,
        }
    }

    /// Grid step; must match the step the tiles were fetched with.
    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    /// Stitch the floor and write `{images}/{floor}.png`.
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::Image` if a grid cell has no tile in the set, a
    /// tile cannot be read or decoded, or the composite cannot be encoded
    /// and written. Nothing is written unless every tile loaded.
    pub fn composite(
        &self,
        floor_id: &str,
        metadata: &FloorMetadata,
        tiles: &TileSet,
    ) -> ScrapeResult<CompositeImage> {
        let grid = metadata.grid(self.step);
        info!(floor = floor_id, tiles = grid.len(), "Merging floor map tiles");

        let mut placed = Vec::with_capacity(grid.len());
        for coord in grid.cells() {
            let path = tiles.path_for(coord).ok_or_else(|| {
                ScrapeError::image(
                    self.layout.tile_path(floor_id, coord),
                    "no tile fetched for this cell",
                )
            })?;
            placed.push((coord, load_tile(path)?));
        }

        let canvas = mosaic(&placed);
        let path = self.layout.composite_path(floor_id);
        canvas
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| ScrapeError::image(&path, e))?;

        info!(
            floor = floor_id,
            path = %path.display(),
            width = canvas.width(),
            height = canvas.height(),
            "Wrote floor map"
        );
        Ok(CompositeImage {
            floor_id: floor_id.to_string(),
            path,
            width: canvas.width(),
            height: canvas.height(),
            tiles: placed.len(),
        })
    }
}

/// Decode one tile, sniffing the format from its content.
pub fn load_tile(path: &Path) -> ScrapeResult<RgbaImage> {
    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ScrapeError::image(path, e))?
        .decode()
        .map_err(|e| ScrapeError::image(path, e))?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "Loaded tile");
    Ok(image.to_rgba8())
}

/// Place every tile at its own offset on a canvas sized to fit them all.
///
/// Placement depends only on each tile's coordinate, never on its position
/// in `tiles`, except where tiles overlap (the later one wins).
pub fn mosaic(tiles: &[(GridCoord, RgbaImage)]) -> RgbaImage {
    let width = tiles
        .iter()
        .map(|(coord, tile)| coord.x.saturating_add(tile.width()))
        .max()
        .unwrap_or(0);
    let height = tiles
        .iter()
        .map(|(coord, tile)| coord.y.saturating_add(tile.height()))
        .max()
        .unwrap_or(0);

    let mut canvas = RgbaImage::new(width, height);
    for (coord, tile) in tiles {
        imageops::replace(&mut canvas, tile, coord.x as i64, coord.y as i64);
    }
    canvas
}
