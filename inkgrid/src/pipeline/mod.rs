//! Asynchronous mosaic generation pipeline.
//!
//! A caller submits a [`JobDraft`] to the [`MosaicOrchestrator`], which checks
//! the per-target guard, persists a `processing` record at progress 0 and
//! returns it straight away. The pipeline then runs on the Tokio runtime,
//! saving the record after each fixed checkpoint until it is `completed` or
//! `failed`. Clients poll through the [`JobRegistry`].
//!
//! # Architecture
//!
//! ```text
//! submit → TargetGuard → JobStore.insert → PipelineRun (background)
//!                                               │
//!            ImageStore ◄── resolve/decode ─────┤
//!            Compositor ◄── paint SD/HD ────────┤
//!            uploads/…/mosaics ◄── write JPEG ──┘
//! ```
//!
//! # Key Components
//!
//! - [`MosaicOrchestrator`] - Submission, scheduling, cancellation
//! - [`GenerationJob`] - Job record and its state machine
//! - [`JobStore`] - Persistence boundary ([`InMemoryJobStore`] bundled)
//! - [`JobRegistry`] - Status lookups for polling clients
//! - [`TargetGuard`] - One running job per target
//!
//! # Example
//!
//! ```ignore
//! use inkgrid::pipeline::{InMemoryJobStore, JobDraft, MosaicOrchestrator, OrchestratorConfig};
//! use inkgrid::store::FsImageStore;
//! use std::sync::Arc;
//!
//! let orchestrator = MosaicOrchestrator::new(
//!     OrchestratorConfig::default(),
//!     Arc::new(InMemoryJobStore::new()),
//!     Arc::new(FsImageStore::new("uploads")),
//! );
//! let job = orchestrator.submit(draft)?;
//! let status = orchestrator.registry().get_status(job.user_id, job.id)?;
//! ```

mod error;
mod executor;
mod guard;
mod job;
mod job_store;
mod orchestrator;
mod params;
mod registry;
mod runner;

pub use error::{ErrorKind, MosaicError, PersistenceError};
pub use executor::{BlockingExecutor, BlockingResult, ExecutorError, TokioExecutor};
pub use guard::{GuardStats, TargetGuard, TargetPermit};
pub use job::{Checkpoint, GenerationJob, JobDraft, JobId, JobStatus, TargetId, UserId};
pub use job_store::{InMemoryJobStore, JobStore};
pub use orchestrator::MosaicOrchestrator;
pub use params::{
    GenerationParams, SettingsStore, Style, UnknownStyle, COLOR_ADJUSTMENT_RANGE,
    DEFAULT_COLOR_ADJUSTMENT, DEFAULT_TILE_DENSITY, DEFAULT_TILE_SIZE, TILE_DENSITY_RANGE,
    TILE_SIZE_RANGE,
};
pub use registry::JobRegistry;
pub use runner::OrchestratorConfig;

pub(crate) use runner::PipelineRun;

#[cfg(test)]
pub(crate) use executor::SyncExecutor;
