//! Background pipeline for one generation job.
//!
//! A [`PipelineRun`] owns its job record. It walks the fixed checkpoints,
//! persisting the record after each one, and finishes by writing exactly one
//! terminal state. The target permit stays with the task that spawned the
//! run and is released only after that terminal write.
//!
//! ```text
//! resolve main (10) → resolve tiles + output dir (20) → measure (30)
//!   → decode main (40) → allocate (50) → decode tiles (60)
//!   → paint SD (70) → paint HD (80) → write SD (90) → write HD (100)
//! ```

use super::{BlockingExecutor, Checkpoint, GenerationJob, JobStore, MosaicError};
use crate::compositor::{
    CanvasSize, CompositeCanvas, RandomSelector, Resolution, TileSet, JPEG_QUALITY,
};
use crate::store::{DecodedImage, ImageRef, ImageStore, StoreError};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Span};

/// Timestamp format used in output filenames.
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Settings shared by every pipeline run of one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Root directory that image references resolve against and that output
    /// directories are created under
    pub uploads_root: PathBuf,
    /// Fixed RNG seed for tile selection; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            uploads_root: PathBuf::from(crate::store::UPLOADS_PREFIX),
            seed: None,
        }
    }
}

/// Where a job's outputs are written.
#[derive(Debug, Clone)]
struct OutputPlan {
    sd: ImageRef,
    hd: ImageRef,
    sd_path: PathBuf,
    hd_path: PathBuf,
}

/// One in-flight pipeline invocation.
pub(crate) struct PipelineRun<E: BlockingExecutor> {
    job: GenerationJob,
    jobs: Arc<dyn JobStore>,
    images: Arc<dyn ImageStore>,
    executor: Arc<E>,
    config: Arc<OrchestratorConfig>,
    cancel: CancellationToken,
}

impl<E: BlockingExecutor> PipelineRun<E> {
    pub(crate) fn new(
        job: GenerationJob,
        jobs: Arc<dyn JobStore>,
        images: Arc<dyn ImageStore>,
        executor: Arc<E>,
        config: Arc<OrchestratorConfig>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            jobs,
            images,
            executor,
            config,
            cancel,
        }
    }

    /// Drives the job to a terminal state and returns the final record.
    #[instrument(
        name = "mosaic_pipeline",
        skip(self),
        fields(job_id = %self.job.id, target = %self.job.target_id)
    )]
    pub(crate) async fn run(mut self) -> GenerationJob {
        let start = Instant::now();
        info!(tiles = self.job.tile_images.len(), "Mosaic generation started");

        let outcome = self.execute().await;

        match outcome {
            Ok(plan) => {
                self.job.complete(plan.sd, plan.hd);
                info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Mosaic generation completed"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    kind = %e.kind(),
                    progress = self.job.progress,
                    "Mosaic generation failed"
                );
                self.job.fail(e.kind(), e.to_string());
            }
        }

        if let Err(e) = self.jobs.save(&self.job) {
            error!(error = %e, status = %self.job.status, "Failed to persist terminal job state");
        }
        self.job
    }

    async fn execute(&mut self) -> Result<OutputPlan, MosaicError> {
        let main = self.job.main_image.clone();

        let images = Arc::clone(&self.images);
        let resolved = main.clone();
        self.blocking(move || images.resolve(&resolved).map_err(MosaicError::from))
            .await?;
        self.checkpoint(Checkpoint::MainResolved)?;

        let tiles = self.resolve_tiles().await?;
        let plan = self.plan_outputs().await?;
        self.checkpoint(Checkpoint::TilesResolved)?;

        let images = Arc::clone(&self.images);
        let measured = main.clone();
        let (width, height) = self
            .blocking(move || images.dimensions(&measured).map_err(MosaicError::from))
            .await?;
        debug!(width, height, "Canvas measured");
        self.checkpoint(Checkpoint::CanvasMeasured)?;

        let images = Arc::clone(&self.images);
        let decoded: DecodedImage = self
            .blocking(move || images.open(&main).map_err(MosaicError::from))
            .await?;
        let main_size = CanvasSize::new(decoded.width(), decoded.height());
        drop(decoded);
        self.checkpoint(Checkpoint::MainDecoded)?;

        let tile_size = self.job.params.tile_size;
        let canvas = self
            .blocking(move || {
                CompositeCanvas::allocate(main_size, tile_size).map_err(MosaicError::from)
            })
            .await?;
        debug!(
            sd = %canvas.size(Resolution::Sd),
            hd = %canvas.size(Resolution::Hd),
            tile_size,
            "Canvases allocated"
        );
        self.checkpoint(Checkpoint::CanvasAllocated)?;

        let tiles = Arc::new(self.decode_tiles(tiles).await?);
        self.checkpoint(Checkpoint::TilesDecoded)?;

        let canvas = self.paint(canvas, Resolution::Sd, &tiles).await?;
        self.checkpoint(Checkpoint::SdComposited)?;

        let canvas = self.paint(canvas, Resolution::Hd, &tiles).await?;
        self.checkpoint(Checkpoint::HdComposited)?;
        drop(tiles);

        let canvas = Arc::new(canvas);
        self.write_output(&canvas, Resolution::Sd, &plan.sd_path).await?;
        self.checkpoint(Checkpoint::SdWritten)?;

        self.write_output(&canvas, Resolution::Hd, &plan.hd_path).await?;

        Ok(plan)
    }

    /// Records a checkpoint, or stops the run if cancellation was requested.
    ///
    /// A failed intermediate save is logged and the run continues; the next
    /// checkpoint carries the same state forward.
    fn checkpoint(&mut self, checkpoint: Checkpoint) -> Result<(), MosaicError> {
        if self.cancel.is_cancelled() {
            return Err(MosaicError::Cancelled);
        }
        if self.job.advance(checkpoint) {
            debug!(
                checkpoint = checkpoint.as_str(),
                progress = self.job.progress,
                "Checkpoint reached"
            );
            if let Err(e) = self.jobs.save(&self.job) {
                warn!(error = %e, progress = self.job.progress, "Failed to persist progress");
            }
        }
        Ok(())
    }

    /// Resolves every tile reference, dropping the ones that do not exist.
    async fn resolve_tiles(&self) -> Result<Vec<ImageRef>, MosaicError> {
        let images = Arc::clone(&self.images);
        let references = self.job.tile_images.clone();
        let results = self
            .blocking(move || {
                Ok(references
                    .into_iter()
                    .map(|reference| {
                        let outcome = images.resolve(&reference).map(|_| reference.clone());
                        (reference, outcome)
                    })
                    .collect::<Vec<_>>())
            })
            .await?;

        Ok(keep_successful(results, "Skipping unresolvable tile"))
    }

    /// Decodes resolved tiles, skipping undecodable ones.
    async fn decode_tiles(&self, references: Vec<ImageRef>) -> Result<TileSet, MosaicError> {
        let images = Arc::clone(&self.images);
        let results = self
            .blocking(move || {
                Ok(references
                    .into_iter()
                    .map(|reference| {
                        let outcome = images.open(&reference);
                        (reference, outcome)
                    })
                    .collect::<Vec<_>>())
            })
            .await?;

        let decoded = keep_successful(results, "Skipping undecodable tile");
        debug!(decoded = decoded.len(), "Tiles decoded");
        Ok(TileSet::from_decoded(decoded)?)
    }

    /// Creates the target's output directory and picks collision-free names.
    async fn plan_outputs(&self) -> Result<OutputPlan, MosaicError> {
        let root = self.config.uploads_root.clone();
        let job = self.job.clone();
        let stamp = Local::now().format(OUTPUT_TIMESTAMP_FORMAT).to_string();
        let plan = self
            .blocking(move || plan_outputs(&root, &job, &stamp))
            .await?;
        debug!(sd = %plan.sd, hd = %plan.hd, "Output paths planned");
        Ok(plan)
    }

    async fn paint(
        &self,
        mut canvas: CompositeCanvas,
        resolution: Resolution,
        tiles: &Arc<TileSet>,
    ) -> Result<CompositeCanvas, MosaicError> {
        let tiles = Arc::clone(tiles);
        let seed = self.config.seed.map(|seed| match resolution {
            Resolution::Sd => seed,
            Resolution::Hd => seed.wrapping_add(1),
        });
        self.blocking(move || {
            let mut selector = match seed {
                Some(seed) => RandomSelector::seeded(seed),
                None => RandomSelector::from_os_rng(),
            };
            canvas.paint(resolution, &tiles, &mut selector);
            Ok(canvas)
        })
        .await
    }

    async fn write_output(
        &self,
        canvas: &Arc<CompositeCanvas>,
        resolution: Resolution,
        path: &Path,
    ) -> Result<(), MosaicError> {
        let canvas = Arc::clone(canvas);
        let bytes = self
            .blocking(move || canvas.encode(resolution, JPEG_QUALITY).map_err(MosaicError::from))
            .await?;

        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| MosaicError::Output {
                operation: "write",
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            resolution = %resolution,
            path = %path.display(),
            bytes = bytes.len(),
            "Output written"
        );
        Ok(())
    }

    /// Runs `f` on the blocking executor inside the current span.
    async fn blocking<F, R>(&self, f: F) -> Result<R, MosaicError>
    where
        F: FnOnce() -> Result<R, MosaicError> + Send + 'static,
        R: Send + 'static,
    {
        let span = Span::current();
        self.executor
            .execute_blocking(move || span.in_scope(f))
            .await
            .map_err(|e| MosaicError::Internal(e.to_string()))?
    }
}

/// Logs and drops failed entries, keeping the successful values in order.
fn keep_successful<T>(
    results: Vec<(ImageRef, Result<T, StoreError>)>,
    message: &'static str,
) -> Vec<T> {
    results
        .into_iter()
        .filter_map(|(reference, outcome)| match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(tile = %reference, error = %e, "{}", message);
                None
            }
        })
        .collect()
}

fn plan_outputs(root: &Path, job: &GenerationJob, stamp: &str) -> Result<OutputPlan, MosaicError> {
    let directory = ImageRef::normalize(&format!(
        "user_{}/target_{}/mosaics",
        job.user_id.as_u64(),
        job.target_id.as_u64()
    ))?;
    let directory_path = directory.to_path(root);
    std::fs::create_dir_all(&directory_path).map_err(|source| MosaicError::Output {
        operation: "create directory",
        path: directory_path.clone(),
        source,
    })?;

    let mut sd_name = format!("mosaic_sd_{}.jpg", stamp);
    let mut hd_name = format!("mosaic_hd_{}.jpg", stamp);
    if directory_path.join(&sd_name).exists() || directory_path.join(&hd_name).exists() {
        let id = job.id.as_u64();
        sd_name = format!("mosaic_sd_{}_{}.jpg", stamp, id);
        hd_name = format!("mosaic_hd_{}_{}.jpg", stamp, id);
    }

    let sd = directory.child(&sd_name)?;
    let hd = directory.child(&hd_name)?;
    Ok(OutputPlan {
        sd_path: sd.to_path(root),
        hd_path: hd.to_path(root),
        sd,
        hd,
    })
}
