//! Floor manifest loading.
//!
//! The manifest is the service's table of floors and their map sizes in
//! pixels. It is fetched once per run and then handed explicitly to every
//! stage that needs floor dimensions.
//!
//! # Example
//!
//! ```ignore
//! use floorscraper::manifest::ManifestLoader;
//!
//! let loader = ManifestLoader::new(&client, &endpoints, &layout);
//! let manifest = loader.load()?;
//! let ground = manifest.get("G").expect("ground floor");
//! println!("{} cells", ground.grid(200).len());
//! ```

mod literal;
mod parser;

pub use parser::{parse_manifest, FLOOR_DATA_VARIABLE};

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::ScrapeResult;
use crate::grid::FloorGrid;
use crate::provider::{Endpoints, HttpClient};
use crate::storage::{ensure_dirs, write_file, StorageLayout};

/// Pixel dimensions of one floor map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorMetadata {
    /// Map width in pixels.
    pub map_width: u32,
    /// Map height in pixels.
    pub map_height: u32,
}

impl FloorMetadata {
    pub fn new(map_width: u32, map_height: u32) -> Self {
        Self {
            map_width,
            map_height,
        }
    }

    /// The scrape grid over this floor with the given step.
    pub fn grid(&self, step: u32) -> FloorGrid {
        FloorGrid::new(self.map_width, self.map_height, step)
    }
}

/// Floor identifier → dimensions, ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloorManifest {
    floors: BTreeMap<String, FloorMetadata>,
}

impl FloorManifest {
    pub fn get(&self, floor_id: &str) -> Option<&FloorMetadata> {
        self.floors.get(floor_id)
    }

    pub fn contains(&self, floor_id: &str) -> bool {
        self.floors.contains_key(floor_id)
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    /// Floor identifiers in sorted order.
    pub fn floor_ids(&self) -> impl Iterator<Item = &str> {
        self.floors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FloorMetadata)> {
        self.floors.iter().map(|(id, meta)| (id.as_str(), meta))
    }
}

impl From<BTreeMap<String, FloorMetadata>> for FloorManifest {
    fn from(floors: BTreeMap<String, FloorMetadata>) -> Self {
        Self { floors }
    }
}

impl<S: Into<String>> FromIterator<(S, FloorMetadata)> for FloorManifest {
    fn from_iter<I: IntoIterator<Item = (S, FloorMetadata)>>(iter: I) -> Self {
        Self {
            floors: iter
                .into_iter()
                .map(|(id, meta)| (id.into(), meta))
                .collect(),
        }
    }
}

/// Fetches and parses the remote manifest.
pub struct ManifestLoader<'a, C: HttpClient> {
    client: &'a C,
    endpoints: &'a Endpoints,
    layout: &'a StorageLayout,
}

impl<'a, C: HttpClient> ManifestLoader<'a, C> {
    pub fn new(client: &'a C, endpoints: &'a Endpoints, layout: &'a StorageLayout) -> Self {
        Self {
            client,
            endpoints,
            layout,
        }
    }

    /// Fetch, store and parse the manifest.
    ///
    /// The raw document is written to `{temp}/manifest.js` before parsing so
    /// a parse failure can be inspected.
    ///
    /// # Errors
    ///
    /// - `Network` if the fetch fails
    /// - `Filesystem` if the raw copy cannot be written
    /// - `Parse` if the document has no usable `floorData`
    pub fn load(&self) -> ScrapeResult<FloorManifest> {
        let url = self.endpoints.manifest_url();
        info!(url, "Fetching floor manifest");
        let body = self.client.get(url)?;

        let path = self.layout.manifest_path();
        ensure_dirs([self.layout.temp_dir()])?;
        write_file(&path, &body)?;
        debug!(path = %path.display(), bytes = body.len(), "Stored raw manifest");

        let manifest = parse_manifest(&String::from_utf8_lossy(&body))?;
        info!(floors = manifest.len(), "Loaded floor manifest");
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::provider::MockHttpClient;
    use tempfile::TempDir;

    const MANIFEST: &str =
        "var floorData = { G: { mapWidth: 400, mapHeight: 200 }, '1': { mapWidth: 0, mapHeight: 0 } };";

    #[test]
    fn test_load_parses_and_stores_document() {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path());
        let endpoints = Endpoints::default();
        let client = MockHttpClient::new().with_response(endpoints.manifest_url(), MANIFEST);

        let manifest = ManifestLoader::new(&client, &endpoints, &layout)
            .load()
            .unwrap();

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(400, 200)));
        assert_eq!(
            std::fs::read_to_string(layout.manifest_path()).unwrap(),
            MANIFEST
        );
    }

    #[test]
    fn test_load_network_failure() {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path());
        let endpoints = Endpoints::default();
        let client = MockHttpClient::new().with_failure(endpoints.manifest_url(), "refused");

        let err = ManifestLoader::new(&client, &endpoints, &layout)
            .load()
            .unwrap_err();
        assert!(err.is_network());
        assert!(!layout.manifest_path().exists());
    }

    #[test]
    fn test_load_parse_failure_keeps_raw_copy() {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path());
        let endpoints = Endpoints::default();
        let client =
            MockHttpClient::new().with_response(endpoints.manifest_url(), "<html>gone</html>");

        let err = ManifestLoader::new(&client, &endpoints, &layout)
            .load()
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
        assert!(layout.manifest_path().exists());
    }

    #[test]
    fn test_manifest_is_ordered_by_id() {
        let manifest: FloorManifest = [
            ("LG1", FloorMetadata::new(1, 1)),
            ("G", FloorMetadata::new(2, 2)),
            ("1", FloorMetadata::new(3, 3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(manifest.floor_ids().collect::<Vec<_>>(), vec!["1", "G", "LG1"]);
    }

    #[test]
    fn test_metadata_grid() {
        let grid = FloorMetadata::new(400, 200).grid(200);
        assert_eq!(grid.len(), 6);
    }
}
