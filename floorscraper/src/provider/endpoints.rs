//! PathAdvisor endpoint URLs.
//!
//! The service exposes three plain GET endpoints:
//!
//! - manifest: a script assigning floor dimensions to `floorData`
//! - tiles: `map_pixel.php?x=&y=&floor=&level=1&lineString=` returning image bytes
//! - metadata: `get_map_data_2.php?floor=&MapCoorX=&MapCoorY=&offsetX=&offsetY=`
//!   returning semicolon-delimited point rows for the cell
//!
//! Query parameters are appended in a fixed order so the URLs are
//! deterministic. Values are percent-encoded like a browser's
//! `encodeURIComponent`: a space is `%20` and `!'()*~` pass through.

use reqwest::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::grid::GridCoord;

/// Default manifest document.
pub const DEFAULT_MANIFEST_URL: &str = "http://pathadvisor.ust.hk/super_global.js";

/// Default tile endpoint.
pub const DEFAULT_TILE_URL: &str = "http://pathadvisor.ust.hk/map_pixel.php";

/// Default metadata endpoint.
pub const DEFAULT_DATA_URL: &str = "http://pathadvisor.ust.hk/phplib/get_map_data_2.php";

/// Map detail level requested for every tile.
const TILE_LEVEL: &str = "1";

/// Base URLs of the remote indoor-mapping service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    manifest: Url,
    tile: Url,
    data: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_URL, DEFAULT_TILE_URL, DEFAULT_DATA_URL)
            .expect("Default endpoint URLs are valid")
    }
}

impl Endpoints {
    /// Build endpoints from base URLs.
    ///
    /// A query already present on the tile or data base is kept and the
    /// cell parameters are appended after it. Fragments are dropped.
    pub fn new(manifest: &str, tile: &str, data: &str) -> ScrapeResult<Self> {
        Ok(Self {
            manifest: parse_url("manifest_url", manifest)?,
            tile: parse_base("tile_url", tile)?,
            data: parse_base("data_url", data)?,
        })
    }

    pub fn manifest_url(&self) -> &str {
        self.manifest.as_str()
    }

    /// Tile image URL for one grid cell.
    pub fn tile_url(&self, coord: GridCoord, floor_id: &str) -> String {
        with_query(
            &self.tile,
            &[
                ("x", &coord.x.to_string()),
                ("y", &coord.y.to_string()),
                ("floor", floor_id),
                ("level", TILE_LEVEL),
                ("lineString", ""),
            ],
        )
    }

    /// Point metadata URL for one grid cell of `step`×`step` pixels.
    pub fn data_url(&self, coord: GridCoord, floor_id: &str, step: u32) -> String {
        let step = step.to_string();
        with_query(
            &self.data,
            &[
                ("floor", floor_id),
                ("MapCoorX", &coord.x.to_string()),
                ("MapCoorY", &coord.y.to_string()),
                ("offsetX", &step),
                ("offsetY", &step),
            ],
        )
    }
}

fn parse_url(key: &str, raw: &str) -> ScrapeResult<Url> {
    Url::parse(raw.trim())
        .map_err(|e| ScrapeError::InvalidConfig(format!("{} '{}': {}", key, raw, e)))
}

fn parse_base(key: &str, raw: &str) -> ScrapeResult<Url> {
    let mut url = parse_url(key, raw)?;
    url.set_fragment(None);
    Ok(url)
}

/// Append `pairs` to the query of `base`, after any pairs it already has.
fn with_query(base: &Url, pairs: &[(&str, &str)]) -> String {
    let mut url = base.to_string();
    match base.query() {
        None => url.push('?'),
        Some("") => {}
        Some(_) => url.push('&'),
    }
    let query: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, encode_component(value)))
        .collect();
    url.push_str(&query.join("&"));
    url
}

/// Percent-encode one query value, leaving `!'()*` unescaped.
fn encode_component(value: &str) -> String {
    const KEPT: [(&str, &str); 5] = [
        ("%21", "!"),
        ("%27", "'"),
        ("%28", "("),
        ("%29", ")"),
        ("%2A", "*"),
    ];
    let mut encoded = urlencoding::encode(value).into_owned();
    for (escaped, plain) in KEPT {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, plain);
        }
    }
    encoded
}
