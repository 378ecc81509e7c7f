//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`generate`] - Submit a mosaic job and follow it to completion

pub mod config;
pub mod generate;
