//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use clap::Subcommand;
use inkgrid::config::{config_file_path, ConfigFile};
use std::path::Path;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration (file values over defaults)
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = ConfigFile::load()?;
            print!("{}", render(&config));
            Ok(())
        }
        ConfigCommands::Init { force } => {
            let path = config_file_path();
            if init_at(&path, force)? {
                println!("Created {}", path.display());
            } else {
                println!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            Ok(())
        }
    }
}

/// Writes defaults to `path`. Returns false if the file exists and `force`
/// is not set.
fn init_at(path: &Path, force: bool) -> Result<bool, CliError> {
    if path.exists() && !force {
        return Ok(false);
    }
    ConfigFile::default().save_to(path)?;
    Ok(true)
}

/// Renders the effective configuration as `section.key = value` lines.
fn render(config: &ConfigFile) -> String {
    let rows = [
        (
            "storage.uploads_root",
            config.storage.uploads_root.display().to_string(),
        ),
        (
            "generation.tile_size",
            config.generation.tile_size.to_string(),
        ),
        (
            "generation.tile_density",
            config.generation.tile_density.to_string(),
        ),
        (
            "generation.color_adjustment",
            config.generation.color_adjustment.to_string(),
        ),
        ("generation.style", config.generation.style.to_string()),
        ("logging.file", config.logging.file.display().to_string()),
    ];

    let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(key, value)| format!("{:<width$} = {}\n", key, value, width = width))
        .collect()
}
