//! Job persistence boundary.
//!
//! The orchestrator writes job records through [`JobStore`] after every
//! progress checkpoint and reads them back for status queries. A real
//! deployment plugs in its own database; [`InMemoryJobStore`] backs the CLI
//! and the tests.

use super::{GenerationJob, JobDraft, JobId, PersistenceError, TargetId, UserId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Storage for generation job records.
pub trait JobStore: Send + Sync + 'static {
    /// Persists a new `processing` record and assigns its ID.
    fn insert(&self, draft: JobDraft) -> Result<GenerationJob, PersistenceError>;

    /// Overwrites the stored record with `job`.
    ///
    /// Implementations must refuse to modify a terminal record and to move
    /// progress backwards.
    fn save(&self, job: &GenerationJob) -> Result<(), PersistenceError>;

    /// Returns the latest persisted snapshot of a job.
    fn get(&self, id: JobId) -> Result<Option<GenerationJob>, PersistenceError>;

    /// Returns every job owned by `user` in `target`, in no particular order.
    fn list_by_target(
        &self,
        user: UserId,
        target: TargetId,
    ) -> Result<Vec<GenerationJob>, PersistenceError>;
}

/// Concurrent in-process job store.
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, GenerationJob>,
    next_id: AtomicU64,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self {
            jobs: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, draft: JobDraft) -> Result<GenerationJob, PersistenceError> {
        let id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let job = GenerationJob::from_draft(id, draft);
        self.jobs.insert(id, job.clone());
        trace!(job_id = %id, "Job record inserted");
        Ok(job)
    }

    fn save(&self, job: &GenerationJob) -> Result<(), PersistenceError> {
        let mut stored = self
            .jobs
            .get_mut(&job.id)
            .ok_or(PersistenceError::Missing(job.id))?;

        if stored.is_terminal() {
            return Err(PersistenceError::Terminal(job.id));
        }
        if job.progress < stored.progress {
            return Err(PersistenceError::ProgressRegressed {
                job: job.id,
                stored: stored.progress,
                requested: job.progress,
            });
        }

        *stored = job.clone();
        trace!(job_id = %job.id, progress = job.progress, status = %job.status, "Job record saved");
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<Option<GenerationJob>, PersistenceError> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    fn list_by_target(
        &self,
        user: UserId,
        target: TargetId,
    ) -> Result<Vec<GenerationJob>, PersistenceError> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.user_id == user && entry.target_id == target)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
