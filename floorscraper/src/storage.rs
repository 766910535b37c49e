//! Output directory layout.
//!
//! Everything a run produces lives under one root (default `./data`):
//!
//! ```text
//! {root}/
//! ├── data/{floor}.csv          exported point table
//! ├── images/{floor}.png        stitched floor map
//! └── temp/
//!     ├── manifest.js           raw manifest document
//!     └── {floor}/{x}-{y}.png   fetched tiles
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ScrapeError, ScrapeResult};
use crate::grid::GridCoord;

/// Default output root, relative to the working directory.
pub const DEFAULT_ROOT_DIR: &str = "./data";

const DATA_DIR: &str = "data";
const IMAGE_DIR: &str = "images";
const TEMP_DIR: &str = "temp";
const MANIFEST_FILE: &str = "manifest.js";

/// Paths for every artifact a scrape reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_DIR)
    }
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join(IMAGE_DIR)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    /// Where the raw manifest document is kept for inspection.
    pub fn manifest_path(&self) -> PathBuf {
        self.temp_dir().join(MANIFEST_FILE)
    }

    pub fn floor_temp_dir(&self, floor_id: &str) -> PathBuf {
        self.temp_dir().join(floor_id)
    }

    /// `{temp}/{floor}/{x}-{y}.png`
    pub fn tile_path(&self, floor_id: &str, coord: GridCoord) -> PathBuf {
        self.floor_temp_dir(floor_id).join(format!("{}.png", coord))
    }

    /// `{images}/{floor}.png`
    pub fn composite_path(&self, floor_id: &str) -> PathBuf {
        self.image_dir().join(format!("{}.png", floor_id))
    }

    /// `{data}/{floor}.csv`
    pub fn table_path(&self, floor_id: &str) -> PathBuf {
        self.data_dir().join(format!("{}.csv", floor_id))
    }

    /// Create the root, data, images and temp directories if absent.
    ///
    /// Idempotent: an existing tree is left untouched.
    pub fn ensure_directories(&self) -> ScrapeResult<()> {
        ensure_dirs([
            self.root.clone(),
            self.data_dir(),
            self.image_dir(),
            self.temp_dir(),
        ])
    }

    /// Create the per-floor tile directory if absent.
    pub fn ensure_floor_temp_dir(&self, floor_id: &str) -> ScrapeResult<PathBuf> {
        let dir = self.floor_temp_dir(floor_id);
        ensure_dirs([dir.clone()])?;
        Ok(dir)
    }
}

/// Create each directory (and missing parents) in order.
pub fn ensure_dirs<I>(paths: I) -> ScrapeResult<()>
where
    I: IntoIterator<Item = PathBuf>,
{
    for path in paths {
        if path.is_dir() {
            continue;
        }
        debug!(path = %path.display(), "Creating directory");
        fs::create_dir_all(&path).map_err(|e| ScrapeError::filesystem(&path, e))?;
    }
    Ok(())
}

/// Write `contents` to `path`, mapping failures to a filesystem error.
pub(crate) fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> ScrapeResult<()> {
    fs::write(path, contents).map_err(|e| ScrapeError::filesystem(path, e))
}
