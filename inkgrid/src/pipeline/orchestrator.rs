//! Job orchestrator: submission, background scheduling and shutdown.
//!
//! ```text
//! submit ──► validate ──► guard.try_acquire ──► jobs.insert ──► spawn run
//!   │              │               │                 │
//!   │              ▼               ▼                 ▼
//!   │       InvalidParameter  AlreadyInProgress  Persistence (permit dropped)
//!   ▼
//! returns the `processing` record at progress 0 without waiting
//! ```
//!
//! Each orchestrator owns its own [`TargetGuard`]; there is no process-wide
//! state, so tests can run isolated instances side by side.
//!
//! The target permit is held by the tracked outer task, not by the pipeline
//! itself. It is dropped only after the job's terminal state is persisted,
//! either by the pipeline or by [`record_fault`] when the pipeline task dies,
//! so a target never accepts a new job while its stored record is still
//! `processing`.

use super::{
    BlockingExecutor, ErrorKind, GenerationJob, GuardStats, JobDraft, JobId, JobRegistry,
    JobStore, MosaicError, OrchestratorConfig, PipelineRun, SettingsStore, TargetGuard, TargetId,
    TokioExecutor,
};
use crate::store::ImageStore;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, instrument};

/// Accepts generation requests and runs their pipelines in the background.
pub struct MosaicOrchestrator<E: BlockingExecutor = TokioExecutor> {
    config: Arc<OrchestratorConfig>,
    guard: Arc<TargetGuard>,
    jobs: Arc<dyn JobStore>,
    images: Arc<dyn ImageStore>,
    executor: Arc<E>,
    settings: SettingsStore,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl MosaicOrchestrator<TokioExecutor> {
    /// Creates an orchestrator that runs blocking stages on Tokio's blocking
    /// pool.
    pub fn new(
        config: OrchestratorConfig,
        jobs: Arc<dyn JobStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self::with_executor(config, jobs, images, Arc::new(TokioExecutor::new()))
    }
}

impl<E: BlockingExecutor> MosaicOrchestrator<E> {
    pub fn with_executor(
        config: OrchestratorConfig,
        jobs: Arc<dyn JobStore>,
        images: Arc<dyn ImageStore>,
        executor: Arc<E>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            guard: Arc::new(TargetGuard::new()),
            jobs,
            images,
            executor,
            settings: SettingsStore::new(),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Submits a generation request.
    ///
    /// Returns the persisted `processing` record immediately; the pipeline
    /// continues on the runtime. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`MosaicError::InvalidParameter`] for out-of-range parameters
    /// - [`MosaicError::AlreadyInProgress`] if the target has a running job
    /// - [`MosaicError::Persistence`] if the job store rejects the record
    /// - [`MosaicError::Cancelled`] after [`shutdown`](Self::shutdown)
    /// - [`MosaicError::Internal`] when called outside a runtime
    ///
    /// None of these create a job record.
    #[instrument(
        skip(self, request),
        fields(user = %request.user_id, target = %request.target_id)
    )]
    pub fn submit(&self, request: JobDraft) -> Result<GenerationJob, MosaicError> {
        if self.cancel.is_cancelled() {
            return Err(MosaicError::Cancelled);
        }
        request.params.validate()?;

        let handle = Handle::try_current()
            .map_err(|e| MosaicError::Internal(format!("no async runtime available: {}", e)))?;

        let target = request.target_id;
        let permit = self
            .guard
            .try_acquire(target)
            .ok_or(MosaicError::AlreadyInProgress { target })?;

        // Dropping the permit on this error path releases the target.
        let job = self.jobs.insert(request)?;

        info!(job_id = %job.id, "Mosaic job accepted");

        let run = PipelineRun::new(
            job.clone(),
            Arc::clone(&self.jobs),
            Arc::clone(&self.images),
            Arc::clone(&self.executor),
            Arc::clone(&self.config),
            self.cancel.clone(),
        );
        let jobs = Arc::clone(&self.jobs);
        let job_id = job.id;

        self.tracker.spawn_on(
            async move {
                if let Err(join_error) = tokio::spawn(run.run()).await {
                    let (kind, message) = if join_error.is_panic() {
                        (ErrorKind::Internal, "pipeline task panicked")
                    } else {
                        (ErrorKind::Cancelled, "pipeline task was aborted")
                    };
                    error!(job_id = %job_id, error = %join_error, "{}", message);
                    record_fault(jobs.as_ref(), job_id, kind, message);
                }
                // The terminal state is stored by now.
                drop(permit);
            },
            &handle,
        );

        Ok(job)
    }

    /// Saved generation settings per user and target.
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Read-only status queries over this orchestrator's job store.
    pub fn registry(&self) -> JobRegistry {
        JobRegistry::new(Arc::clone(&self.jobs))
    }

    /// Returns true while `target` has a running pipeline.
    pub fn is_active(&self, target: TargetId) -> bool {
        self.guard.is_active(target)
    }

    pub fn guard_stats(&self) -> GuardStats {
        self.guard.stats()
    }

    /// Number of pipeline tasks still running.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every pipeline spawned so far has finished.
    ///
    /// Once the orchestrator is cancelled the tracker stays closed.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if !self.cancel.is_cancelled() {
            self.tracker.reopen();
        }
    }

    /// Signals running pipelines to stop at their next checkpoint.
    ///
    /// Further submissions are rejected with [`MosaicError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels running pipelines and waits for them to record their final
    /// state.
    pub async fn shutdown(&self) {
        info!(running = self.tracker.len(), "Shutting down mosaic orchestrator");
        self.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl<E: BlockingExecutor> std::fmt::Debug for MosaicOrchestrator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MosaicOrchestrator")
            .field("config", &self.config)
            .field("guard", &self.guard.stats())
            .field("running", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

/// Marks a job failed after its pipeline task died without doing so itself.
fn record_fault(jobs: &dyn JobStore, id: JobId, kind: ErrorKind, message: &str) {
    let mut job = match jobs.get(id) {
        Ok(Some(job)) => job,
        Ok(None) => return,
        Err(e) => {
            error!(job_id = %id, error = %e, "Failed to load job after pipeline fault");
            return;
        }
    };
    if job.fail(kind, message) {
        if let Err(e) = jobs.save(&job) {
            error!(job_id = %id, error = %e, "Failed to persist pipeline fault");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::job::fixtures::draft;
    use crate::pipeline::{
        GenerationParams, InMemoryJobStore, JobStatus, PersistenceError, UserId,
    };
    use crate::store::{DecodedImage, FsImageStore, ImageRef, StoreError};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Blocks every call until released. Afterwards references resolve but
    /// never decode.
    #[derive(Default)]
    struct GatedStore {
        open: Mutex<bool>,
        ready: Condvar,
    }

    impl GatedStore {
        fn release(&self) {
            *self.open.lock().unwrap() = true;
            self.ready.notify_all();
        }

        fn wait(&self) {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.ready.wait(open).unwrap();
            }
        }

        fn missing(reference: &ImageRef) -> StoreError {
            StoreError::NotFound {
                reference: reference.to_string(),
                path: PathBuf::from(reference.as_str()),
            }
        }
    }

    impl ImageStore for GatedStore {
        fn resolve(&self, reference: &ImageRef) -> Result<PathBuf, StoreError> {
            self.wait();
            Ok(PathBuf::from(reference.as_str()))
        }

        fn dimensions(&self, reference: &ImageRef) -> Result<(u32, u32), StoreError> {
            self.wait();
            Err(Self::missing(reference))
        }

        fn open(&self, reference: &ImageRef) -> Result<DecodedImage, StoreError> {
            self.wait();
            Err(Self::missing(reference))
        }
    }

    struct PanickingStore;

    impl ImageStore for PanickingStore {
        fn resolve(&self, _reference: &ImageRef) -> Result<PathBuf, StoreError> {
            panic!("storage backend fault");
        }

        fn dimensions(&self, _reference: &ImageRef) -> Result<(u32, u32), StoreError> {
            panic!("storage backend fault");
        }

        fn open(&self, _reference: &ImageRef) -> Result<DecodedImage, StoreError> {
            panic!("storage backend fault");
        }
    }

    /// Job store whose terminal writes block until released.
    #[derive(Default)]
    struct TerminalGateStore {
        inner: InMemoryJobStore,
        entered: AtomicBool,
        open: Mutex<bool>,
        ready: Condvar,
    }

    impl TerminalGateStore {
        fn release(&self) {
            *self.open.lock().unwrap() = true;
            self.ready.notify_all();
        }

        fn processing_for(&self, user: u64, target: u64) -> usize {
            self.inner
                .list_by_target(UserId::new(user), TargetId::new(target))
                .unwrap()
                .iter()
                .filter(|job| job.status == JobStatus::Processing)
                .count()
        }
    }

    impl JobStore for TerminalGateStore {
        fn insert(&self, draft: JobDraft) -> Result<GenerationJob, PersistenceError> {
            self.inner.insert(draft)
        }

        fn save(&self, job: &GenerationJob) -> Result<(), PersistenceError> {
            if job.is_terminal() {
                self.entered.store(true, Ordering::SeqCst);
                let mut open = self.open.lock().unwrap();
                while !*open {
                    open = self.ready.wait(open).unwrap();
                }
            }
            self.inner.save(job)
        }

        fn get(&self, id: JobId) -> Result<Option<GenerationJob>, PersistenceError> {
            self.inner.get(id)
        }

        fn list_by_target(
            &self,
            user: UserId,
            target: TargetId,
        ) -> Result<Vec<GenerationJob>, PersistenceError> {
            self.inner.list_by_target(user, target)
        }
    }

    struct Fixture {
        _root: TempDir,
        jobs: Arc<InMemoryJobStore>,
        orchestrator: MosaicOrchestrator,
    }

    fn fixture(images: Arc<dyn ImageStore>) -> Fixture {
        let root = TempDir::new().unwrap();
        let jobs = Arc::new(InMemoryJobStore::new());
        let config = OrchestratorConfig {
            uploads_root: root.path().to_path_buf(),
            ..Default::default()
        };
        let orchestrator = MosaicOrchestrator::new(config, jobs.clone(), images);
        Fixture {
            _root: root,
            jobs,
            orchestrator,
        }
    }

    async fn wait_terminal(orchestrator: &MosaicOrchestrator, user: u64, id: JobId) -> GenerationJob {
        let registry = orchestrator.registry();
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let job = registry.get_status(UserId::new(user), id).unwrap();
                if job.is_terminal() {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("job did not finish")
    }

    async fn wait_released(orchestrator: &MosaicOrchestrator, target: u64) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while orchestrator.is_active(TargetId::new(target)) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("target was never released")
    }

    #[tokio::test]
    async fn test_submit_returns_processing_record() {
        let gate = Arc::new(GatedStore::default());
        let f = fixture(gate.clone());
        let orchestrator = &f.orchestrator;

        let job = orchestrator.submit(draft(1, 1)).unwrap();

        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 0);
        assert!(orchestrator.is_active(TargetId::new(1)));

        gate.release();
        orchestrator.wait_idle().await;
    }

    #[tokio::test]
    async fn test_second_submit_rejected_until_terminal() {
        let gate = Arc::new(GatedStore::default());
        let f = fixture(gate.clone());
        let orchestrator = &f.orchestrator;

        let first = orchestrator.submit(draft(1, 1)).unwrap();
        let err = orchestrator.submit(draft(1, 1)).unwrap_err();
        assert!(matches!(err, MosaicError::AlreadyInProgress { target } if target == TargetId::new(1)));
        assert_eq!(f.jobs.len(), 1);

        // Other targets are unaffected.
        orchestrator.submit(draft(1, 2)).unwrap();

        gate.release();
        let finished = wait_terminal(orchestrator, 1, first.id).await;
        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(finished.error_kind, Some(ErrorKind::NotFound));

        wait_released(orchestrator, 1).await;
        assert!(orchestrator.submit(draft(1, 1)).is_ok());
        orchestrator.wait_idle().await;
        assert_eq!(orchestrator.guard_stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_invalid_params_create_no_job() {
        let f = fixture(Arc::new(GatedStore::default()));
        let mut request = draft(1, 1);
        request.params = GenerationParams {
            tile_size: 5,
            ..Default::default()
        };

        let err = f.orchestrator.submit(request).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(f.jobs.is_empty());
        assert!(!f.orchestrator.is_active(TargetId::new(1)));
    }

    #[test]
    fn test_submit_outside_runtime() {
        let f = fixture(Arc::new(GatedStore::default()));

        let err = f.orchestrator.submit(draft(1, 1)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(f.jobs.is_empty());
        assert!(!f.orchestrator.is_active(TargetId::new(1)));
    }

    #[tokio::test]
    async fn test_panicking_store_fails_job_and_releases_target() {
        let f = fixture(Arc::new(PanickingStore));
        let orchestrator = &f.orchestrator;

        let job = orchestrator.submit(draft(3, 9)).unwrap();
        let finished = wait_terminal(orchestrator, 3, job.id).await;

        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(finished.error_kind, Some(ErrorKind::Internal));
        wait_released(orchestrator, 9).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_target_held_until_terminal_state_persisted() {
        let root = TempDir::new().unwrap();
        let jobs = Arc::new(TerminalGateStore::default());
        let config = OrchestratorConfig {
            uploads_root: root.path().to_path_buf(),
            ..Default::default()
        };
        // Empty root: the main image is missing, so the run heads straight
        // for its terminal write.
        let orchestrator = MosaicOrchestrator::new(
            config,
            jobs.clone(),
            Arc::new(FsImageStore::new(root.path())),
        );

        let first = orchestrator.submit(draft(1, 6)).unwrap();
        tokio::time::timeout(Duration::from_secs(10), async {
            while !jobs.entered.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("terminal write never started");

        assert!(orchestrator.is_active(TargetId::new(6)));
        let err = orchestrator.submit(draft(1, 6)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyInProgress);
        assert_eq!(jobs.processing_for(1, 6), 1);

        jobs.release();
        orchestrator.wait_idle().await;

        let stored = jobs.get(first.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(!orchestrator.is_active(TargetId::new(6)));
        assert!(orchestrator.submit(draft(1, 6)).is_ok());
        jobs.release();
        orchestrator.wait_idle().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_job() {
        let gate = Arc::new(GatedStore::default());
        let f = fixture(gate.clone());
        let orchestrator = &f.orchestrator;
        let job = orchestrator.submit(draft(1, 4)).unwrap();

        orchestrator.cancel();
        gate.release();
        orchestrator.shutdown().await;

        let stored = orchestrator
            .registry()
            .get_status(UserId::new(1), job.id)
            .unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error_kind, Some(ErrorKind::Cancelled));
        assert_eq!(stored.progress, 0);
        assert!(!orchestrator.is_active(TargetId::new(4)));
        assert_eq!(orchestrator.running(), 0);

        let err = orchestrator.submit(draft(1, 4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_wait_idle_keeps_tracker_closed_after_cancel() {
        let f = fixture(Arc::new(GatedStore::default()));
        let orchestrator = &f.orchestrator;

        orchestrator.wait_idle().await;
        assert!(!orchestrator.tracker.is_closed());

        orchestrator.cancel();
        orchestrator.wait_idle().await;
        assert!(orchestrator.tracker.is_closed());
    }
}
