//! Init command - initialize configuration file.

use floorscraper::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
///
/// Existing settings are kept; missing keys are filled with defaults.
pub fn run(config: &ConfigFile) -> Result<(), CliError> {
    config.save()?;

    let path = config_file_path();
    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize floorscraper settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
