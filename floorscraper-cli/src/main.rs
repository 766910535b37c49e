//! floorscraper CLI - Command-line interface
//!
//! Scrapes floor maps and point data from a PathAdvisor service.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::common::{self, ScrapeOverrides};
use error::CliError;

#[derive(Parser)]
#[command(name = "floorscraper")]
#[command(version, about = "Scrape indoor floor maps into stitched images and CSV tables", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, stitch and export floors
    Scrape {
        /// Floor to scrape; repeat or comma-separate for several (default: G)
        #[arg(long = "floor", value_name = "ID", value_delimiter = ',')]
        floors: Vec<String>,

        /// Scrape every floor in the manifest
        #[arg(long, conflicts_with = "floors")]
        all: bool,

        /// Output root directory (default: ./data)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Grid step in pixels
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        step: Option<u32>,

        /// Number of cells fetched concurrently
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..256))]
        parallel: Option<u64>,

        /// Retries per failed request
        #[arg(long)]
        retries: Option<u32>,

        /// Request timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Do not show a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// List the floors the service publishes
    Floors {
        /// Output root directory (default: ./data)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = common::load_config()?;
    let _logging = common::init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Scrape {
            floors,
            all,
            root,
            step,
            parallel,
            retries,
            timeout,
            no_progress,
        } => commands::scrape::run(
            &config,
            ScrapeOverrides {
                floors,
                all,
                root,
                step,
                parallel: parallel.map(|p| p as usize),
                retries,
                timeout,
            },
            !no_progress,
        ),
        Commands::Floors { root } => commands::floors::run(
            &config,
            ScrapeOverrides {
                root,
                ..ScrapeOverrides::default()
            },
        ),
        Commands::Init => commands::init::run(&config),
    }
}
