//! Floors command - list the floors in the service's manifest.

use floorscraper::config::ConfigFile;
use floorscraper::orchestrator::Scraper;

use super::common::{resolve_config, ScrapeOverrides};
use crate::error::CliError;

/// Run the floors command.
pub fn run(config: &ConfigFile, overrides: ScrapeOverrides) -> Result<(), CliError> {
    let config = resolve_config(config, &overrides)?;
    let scraper = Scraper::from_config(&config)?;
    let manifest = scraper.load_manifest()?;
    let step = scraper.settings().step;

    println!("{:<8} {:>7} {:>7} {:>7}", "FLOOR", "WIDTH", "HEIGHT", "CELLS");
    for (floor_id, metadata) in manifest.iter() {
        println!(
            "{:<8} {:>7} {:>7} {:>7}",
            floor_id,
            metadata.map_width,
            metadata.map_height,
            metadata.grid(step).len()
        );
    }
    println!();
    println!("{} floors, grid step {} px", manifest.len(), step);
    Ok(())
}
