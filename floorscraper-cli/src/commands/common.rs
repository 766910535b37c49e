//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use floorscraper::config::{ConfigFile, ScrapeConfig};
use floorscraper::logging::{self, LoggingConfig, LoggingGuard};
use floorscraper::FloorSelection;

use crate::error::CliError;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOverrides {
    pub floors: Vec<String>,
    pub all: bool,
    pub root: Option<PathBuf>,
    pub step: Option<u32>,
    pub parallel: Option<usize>,
    pub retries: Option<u32>,
    pub timeout: Option<u64>,
}

impl ScrapeOverrides {
    /// Floor selection from the command line, if one was given.
    pub fn selection(&self) -> Option<FloorSelection> {
        if self.all {
            return Some(FloorSelection::All);
        }
        match self.floors.as_slice() {
            [] => None,
            [single] => Some(FloorSelection::Single(single.clone())),
            many => Some(FloorSelection::Many(many.to_vec())),
        }
    }
}

/// Load the user's config file.
pub fn load_config() -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load()?)
}

/// Set up logging from the config file's log directory.
pub fn init_logging(config: &ConfigFile, verbose: bool) -> Result<LoggingGuard, CliError> {
    let logging = LoggingConfig {
        log_dir: config.paths.log_dir.clone(),
        verbose,
    };
    Ok(logging::init_logging(&logging)?)
}

/// Resolve run settings: CLI > config > default.
pub fn resolve_config(
    config: &ConfigFile,
    overrides: &ScrapeOverrides,
) -> Result<ScrapeConfig, CliError> {
    let mut config = config.clone();

    if let Some(ref root) = overrides.root {
        config.paths.root_dir = root.clone();
    }
    if let Some(selection) = overrides.selection() {
        config.scrape.floors = selection;
    }
    if let Some(step) = overrides.step {
        config.scrape.step = step;
    }
    if let Some(parallel) = overrides.parallel {
        config.scrape.parallel = parallel;
    }
    if let Some(retries) = overrides.retries {
        config.scrape.max_retries = retries;
    }
    if let Some(timeout) = overrides.timeout {
        config.scrape.timeout = timeout;
    }

    Ok(config.to_scrape_config()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut file = ConfigFile::default();
        file.scrape.parallel = 3;

        let resolved = resolve_config(&file, &ScrapeOverrides::default()).unwrap();

        assert_eq!(resolved.settings.parallel, 3);
        assert_eq!(resolved.selection, FloorSelection::Single("G".into()));
    }

    #[test]
    fn test_cli_values_win() {
        let mut file = ConfigFile::default();
        file.scrape.step = 100;
        let overrides = ScrapeOverrides {
            floors: vec!["1".into(), "2".into()],
            root: Some(PathBuf::from("/tmp/out")),
            step: Some(50),
            retries: Some(4),
            ..ScrapeOverrides::default()
        };

        let resolved = resolve_config(&file, &overrides).unwrap();

        assert_eq!(resolved.settings.step, 50);
        assert_eq!(resolved.retry.max_retries, 4);
        assert_eq!(resolved.layout.root(), std::path::Path::new("/tmp/out"));
        assert_eq!(
            resolved.selection,
            FloorSelection::Many(vec!["1".into(), "2".into()])
        );
    }

    #[test]
    fn test_all_flag_selects_every_floor() {
        let overrides = ScrapeOverrides {
            all: true,
            ..ScrapeOverrides::default()
        };
        assert_eq!(overrides.selection(), Some(FloorSelection::All));
    }
}
