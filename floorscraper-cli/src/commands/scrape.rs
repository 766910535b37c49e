//! Scrape command - fetch, stitch and export the selected floors.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use floorscraper::config::ConfigFile;
use floorscraper::orchestrator::{ScrapeProgressCallback, ScrapeReport, Scraper};

use super::common::{resolve_config, ScrapeOverrides};
use crate::error::CliError;

const PROGRESS_TEMPLATE: &str =
    "{msg:>6} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cells ({eta})";

/// Run the scrape command.
pub fn run(config: &ConfigFile, overrides: ScrapeOverrides, progress: bool) -> Result<(), CliError> {
    let config = resolve_config(config, &overrides)?;
    info!(
        root = %config.layout.root().display(),
        floors = %config.selection,
        step = config.settings.step,
        parallel = config.settings.parallel,
        "floorscraper {}",
        floorscraper::VERSION
    );

    let mut scraper = Scraper::from_config(&config)?;
    let bar = progress.then(progress_bar);
    if let Some(ref bar) = bar {
        scraper = scraper.with_progress(progress_callback(bar.clone()));
    }

    let result = scraper.run(&config.selection);
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    print_report(&result?);
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bar = ProgressBar::new(0);
    bar.set_style(style);
    bar
}

fn progress_callback(bar: ProgressBar) -> ScrapeProgressCallback {
    Arc::new(move |floor, done, total| {
        if done == 1 {
            bar.reset();
            bar.set_length(total as u64);
            bar.set_message(floor.to_string());
        }
        // Workers may report out of order
        if done as u64 > bar.position() {
            bar.set_position(done as u64);
        }
    })
}

fn print_report(report: &ScrapeReport) {
    for floor in &report.skipped {
        println!("Skipped floor {}: not in manifest", floor);
    }
    if report.floors.is_empty() {
        println!("No floors scraped.");
        return;
    }

    for floor in &report.floors {
        println!(
            "Floor {}: {} tiles, {}x{} map, {} rows ({:.1}s)",
            floor.floor_id,
            floor.tiles,
            floor.composite_size.0,
            floor.composite_size.1,
            floor.table_rows,
            floor.elapsed.as_secs_f64()
        );
        println!("  Image: {}", floor.composite_path.display());
        println!("  Table: {}", floor.table_path.display());
    }
    println!(
        "Scraped {} floor(s), {} tiles in {:.1}s",
        report.floors.len(),
        report.total_tiles(),
        report.elapsed.as_secs_f64()
    );
}
