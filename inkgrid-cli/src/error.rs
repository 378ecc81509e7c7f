//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use inkgrid::config::ConfigFileError;
use inkgrid::pipeline::{ErrorKind, JobId, MosaicError};
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// A command-line value could not be used
    InvalidArgument(String),
    /// The orchestrator rejected the request
    Submit(MosaicError),
    /// The job ran and failed
    Generation {
        job: JobId,
        kind: ErrorKind,
        message: String,
    },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Generation {
                kind: ErrorKind::NotFound,
                ..
            } => {
                eprintln!();
                eprintln!("Image references are resolved under the uploads root.");
                eprintln!("Check [storage] uploads_root in config.ini or pass --root.");
            }
            CliError::Generation {
                kind: ErrorKind::NoTilesAvailable,
                ..
            } => {
                eprintln!();
                eprintln!("None of the tile images could be decoded.");
                eprintln!("Supported formats: JPEG, PNG, WebP.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Submit(e) => write!(f, "Failed to submit job: {}", e),
            CliError::Generation { job, kind, message } => {
                write!(f, "{} failed ({}): {}", job, kind, message)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Submit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<MosaicError> for CliError {
    fn from(e: MosaicError) -> Self {
        CliError::Submit(e)
    }
}
