//! inkgrid CLI - Command-line interface
//!
//! Submits mosaic generation jobs to the inkgrid pipeline and manages the
//! configuration file.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use commands::config::ConfigCommands;
use commands::generate::GenerateArgs;

#[derive(Parser)]
#[command(name = "inkgrid")]
#[command(version = inkgrid::VERSION)]
#[command(about = "Generate photo mosaics from a main image and a set of tiles", long_about = None)]
struct Cli {
    /// Enable debug-level logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a mosaic and wait for it to finish
    Generate(GenerateArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::run(args, cli.debug).await,
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
