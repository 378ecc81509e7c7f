//! inkgrid - asynchronous photo-mosaic generation
//!
//! Builds a mosaic of a "main" image out of many small "tile" images. Each
//! request produces a half-resolution (SD) and a full-resolution (HD) JPEG
//! and is tracked as a job that clients poll for progress.
//!
//! # Modules
//!
//! - [`store`] - Image references and the read-only image store adapter
//! - [`compositor`] - Grid, tile selection, painting and JPEG encoding
//! - [`pipeline`] - Orchestrator, job state machine, job store and registry
//! - [`config`] - INI configuration at `~/.inkgrid/config.ini`
//! - [`logging`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```ignore
//! use inkgrid::pipeline::{InMemoryJobStore, MosaicOrchestrator};
//! use inkgrid::store::FsImageStore;
//! use inkgrid::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let orchestrator = MosaicOrchestrator::new(
//!     config.orchestrator_config(),
//!     Arc::new(InMemoryJobStore::new()),
//!     Arc::new(FsImageStore::new(&config.storage.uploads_root)),
//! );
//! let job = orchestrator.submit(request)?;
//! ```

pub mod compositor;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod store;

/// Version of the inkgrid library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
