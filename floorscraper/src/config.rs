//! Configuration file handling.
//!
//! Settings live in an INI file at `{config_dir}/floorscraper/config.ini`.
//! Every key is optional; a missing file or key falls back to the built-in
//! default. Command-line flags are applied on top by the CLI.
//!
//! ```ini
//! [paths]
//! root_dir = ./data
//! ; log_dir = /var/log/floorscraper
//!
//! [remote]
//! manifest_url = http://pathadvisor.ust.hk/super_global.js
//! tile_url = http://pathadvisor.ust.hk/map_pixel.php
//! data_url = http://pathadvisor.ust.hk/phplib/get_map_data_2.php
//!
//! [scrape]
//! floors = G
//! step = 200
//! parallel = 1
//! max_retries = 0
//! retry_backoff_ms = 500
//! timeout = 30
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use crate::error::{ScrapeError, ScrapeResult};
use crate::grid::DEFAULT_STEP;
use crate::orchestrator::{FloorSelection, ScrapeSettings};
use crate::provider::{
    Endpoints, RetryPolicy, DEFAULT_DATA_URL, DEFAULT_MANIFEST_URL, DEFAULT_RETRY_BACKOFF_MS,
    DEFAULT_TILE_URL, DEFAULT_TIMEOUT_SECS,
};
use crate::storage::{StorageLayout, DEFAULT_ROOT_DIR};

const CONFIG_DIR_NAME: &str = "floorscraper";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Path of the user's configuration file.
///
/// Falls back to the working directory when the platform has no config
/// directory.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsSection {
    pub root_dir: PathBuf,
    /// Also write logs to `{log_dir}/floorscraper.log`
    pub log_dir: Option<PathBuf>,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            log_dir: None,
        }
    }
}

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSection {
    pub manifest_url: String,
    pub tile_url: String,
    pub data_url: String,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            tile_url: DEFAULT_TILE_URL.to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
        }
    }
}

/// `[scrape]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSection {
    pub floors: FloorSelection,
    pub step: u32,
    pub parallel: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for ScrapeSection {
    fn default() -> Self {
        Self {
            floors: FloorSelection::default(),
            step: DEFAULT_STEP,
            parallel: 1,
            max_retries: 0,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub remote: RemoteSection,
    pub scrape: ScrapeSection,
}

/// Everything a run needs, resolved from a [`ConfigFile`].
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub layout: StorageLayout,
    pub endpoints: Endpoints,
    pub settings: ScrapeSettings,
    pub retry: RetryPolicy,
    pub timeout_secs: u64,
    pub selection: FloorSelection,
    pub log_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Load the user's configuration file, or defaults if it does not exist.
    pub fn load() -> ScrapeResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> ScrapeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ScrapeError::filesystem(path, e))?;
        Self::parse(&text)
    }

    /// Parse INI text.
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::InvalidConfig` for malformed INI or a value that
    /// does not parse.
    pub fn parse(text: &str) -> ScrapeResult<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| ScrapeError::InvalidConfig(format!("Malformed config file: {}", e)))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("paths")) {
            if let Some(v) = non_empty(section, "root_dir") {
                config.paths.root_dir = PathBuf::from(v);
            }
            if let Some(v) = non_empty(section, "log_dir") {
                config.paths.log_dir = Some(PathBuf::from(v));
            }
        }

        if let Some(section) = ini.section(Some("remote")) {
            if let Some(v) = non_empty(section, "manifest_url") {
                config.remote.manifest_url = v.to_string();
            }
            if let Some(v) = non_empty(section, "tile_url") {
                config.remote.tile_url = v.to_string();
            }
            if let Some(v) = non_empty(section, "data_url") {
                config.remote.data_url = v.to_string();
            }
        }

        if let Some(section) = ini.section(Some("scrape")) {
            let scrape = &mut config.scrape;
            if let Some(v) = non_empty(section, "floors") {
                scrape.floors = v.parse()?;
            }
            if let Some(v) = parse_key(section, "step")? {
                scrape.step = v;
            }
            if let Some(v) = parse_key(section, "parallel")? {
                scrape.parallel = v;
            }
            if let Some(v) = parse_key(section, "max_retries")? {
                scrape.max_retries = v;
            }
            if let Some(v) = parse_key(section, "retry_backoff_ms")? {
                scrape.retry_backoff_ms = v;
            }
            if let Some(v) = parse_key(section, "timeout")? {
                scrape.timeout = v;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ScrapeResult<()> {
        if self.scrape.step == 0 {
            return Err(ScrapeError::InvalidConfig(
                "step must be at least 1 pixel".to_string(),
            ));
        }
        if self.scrape.parallel == 0 {
            return Err(ScrapeError::InvalidConfig(
                "parallel must be at least 1".to_string(),
            ));
        }
        if self.scrape.timeout == 0 {
            return Err(ScrapeError::InvalidConfig(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Save to the user's configuration file, creating its directory.
    pub fn save(&self) -> ScrapeResult<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> ScrapeResult<()> {
        if let Some(parent) = path.parent() {
            crate::storage::ensure_dirs([parent.to_path_buf()])?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|e| ScrapeError::filesystem(path, e))
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("paths"))
            .set("root_dir", self.paths.root_dir.to_string_lossy());
        if let Some(ref log_dir) = self.paths.log_dir {
            ini.with_section(Some("paths"))
                .set("log_dir", log_dir.to_string_lossy());
        }
        ini.with_section(Some("remote"))
            .set("manifest_url", self.remote.manifest_url.as_str())
            .set("tile_url", self.remote.tile_url.as_str())
            .set("data_url", self.remote.data_url.as_str());
        ini.with_section(Some("scrape"))
            .set("floors", self.scrape.floors.to_string())
            .set("step", self.scrape.step.to_string())
            .set("parallel", self.scrape.parallel.to_string())
            .set("max_retries", self.scrape.max_retries.to_string())
            .set("retry_backoff_ms", self.scrape.retry_backoff_ms.to_string())
            .set("timeout", self.scrape.timeout.to_string());
        ini
    }

    /// Resolve into run settings.
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::InvalidConfig` if a remote URL is invalid.
    pub fn to_scrape_config(&self) -> ScrapeResult<ScrapeConfig> {
        let endpoints = Endpoints::new(
            &self.remote.manifest_url,
            &self.remote.tile_url,
            &self.remote.data_url,
        )?;
        Ok(ScrapeConfig {
            layout: StorageLayout::new(&self.paths.root_dir),
            endpoints,
            settings: ScrapeSettings {
                step: self.scrape.step,
                parallel: self.scrape.parallel,
            },
            retry: RetryPolicy::new(
                self.scrape.max_retries,
                Duration::from_millis(self.scrape.retry_backoff_ms),
            ),
            timeout_secs: self.scrape.timeout,
            selection: self.scrape.floors.clone(),
            log_dir: self.paths.log_dir.clone(),
        })
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_key<T: FromStr>(section: &Properties, key: &str) -> ScrapeResult<Option<T>> {
    match non_empty(section, key) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            ScrapeError::InvalidConfig(format!("Invalid value for {}: '{}'", key, v))
        }),
    }
}
