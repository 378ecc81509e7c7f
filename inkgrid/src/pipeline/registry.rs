//! Read-only job lookups for polling clients.

use super::{GenerationJob, JobId, JobStore, MosaicError, TargetId, UserId};
use std::sync::Arc;

/// Status queries over the job store.
///
/// Every call reads the store directly so callers always see the most
/// recently persisted checkpoint.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<dyn JobStore>,
}

impl JobRegistry {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    /// Returns the job if it exists and belongs to `user`.
    ///
    /// A job owned by someone else is reported as not found.
    pub fn get_status(&self, user: UserId, job: JobId) -> Result<GenerationJob, MosaicError> {
        match self.jobs.get(job)? {
            Some(record) if record.user_id == user => Ok(record),
            _ => Err(MosaicError::JobNotFound { job }),
        }
    }

    /// Lists the user's jobs for `target`, most recent first.
    pub fn list_by_target(
        &self,
        user: UserId,
        target: TargetId,
    ) -> Result<Vec<GenerationJob>, MosaicError> {
        let mut jobs = self.jobs.list_by_target(user, target)?;
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(jobs)
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry").finish_non_exhaustive()
    }
}
