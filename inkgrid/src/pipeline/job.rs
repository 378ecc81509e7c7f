//! Generation job records.
//!
//! A [`GenerationJob`] is created in the `processing` state at progress 0 when
//! a request is accepted and is then mutated only by the pipeline task that
//! owns it. It becomes terminal (`completed` or `failed`) exactly once.

use super::{ErrorKind, GenerationParams};
use crate::store::ImageRef;
use chrono::{DateTime, Utc};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier of a generation job, assigned by the job store.
    JobId,
    "mosaic-"
);
numeric_id!(
    /// Owning user.
    UserId,
    "user-"
);
numeric_id!(
    /// Target group (project) that scopes jobs and the concurrency guard.
    TargetId,
    "target-"
);

/// Pipeline state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true for `Completed` and `Failed`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed progress checkpoints, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Checkpoint {
    /// Main image reference resolved
    MainResolved,
    /// Tile references resolved; output directory created
    TilesResolved,
    /// Canvas sizes determined from the main image header
    CanvasMeasured,
    /// Main image decoded
    MainDecoded,
    /// SD and HD canvases allocated
    CanvasAllocated,
    /// Tile set decoded
    TilesDecoded,
    /// SD canvas composited
    SdComposited,
    /// HD canvas composited
    HdComposited,
    /// SD output written
    SdWritten,
    /// HD output written; job complete
    HdWritten,
}

impl Checkpoint {
    /// Progress percentage recorded at this checkpoint.
    pub const fn percent(self) -> u8 {
        match self {
            Self::MainResolved => 10,
            Self::TilesResolved => 20,
            Self::CanvasMeasured => 30,
            Self::MainDecoded => 40,
            Self::CanvasAllocated => 50,
            Self::TilesDecoded => 60,
            Self::SdComposited => 70,
            Self::HdComposited => 80,
            Self::SdWritten => 90,
            Self::HdWritten => 100,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MainResolved => "main_resolved",
            Self::TilesResolved => "tiles_resolved",
            Self::CanvasMeasured => "canvas_measured",
            Self::MainDecoded => "main_decoded",
            Self::CanvasAllocated => "canvas_allocated",
            Self::TilesDecoded => "tiles_decoded",
            Self::SdComposited => "sd_composited",
            Self::HdComposited => "hd_composited",
            Self::SdWritten => "sd_written",
            Self::HdWritten => "hd_written",
        }
    }
}

/// Everything needed to create a job record; the store assigns identity.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDraft {
    pub user_id: UserId,
    pub target_id: TargetId,
    pub main_image: ImageRef,
    pub tile_images: Vec<ImageRef>,
    pub params: GenerationParams,
}

/// One generation request and its pipeline state.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: JobId,
    pub user_id: UserId,
    pub target_id: TargetId,

    /// Source image being reproduced
    pub main_image: ImageRef,
    /// Tile references captured at submission
    pub tile_images: Vec<ImageRef>,
    pub params: GenerationParams,

    pub status: JobStatus,
    /// 0-100, non-decreasing
    pub progress: u8,
    pub sd_output: Option<ImageRef>,
    pub hd_output: Option<ImageRef>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Creates a fresh `processing` record at progress 0.
    pub fn from_draft(id: JobId, draft: JobDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: draft.user_id,
            target_id: draft.target_id,
            main_image: draft.main_image,
            tile_images: draft.tile_images,
            params: draft.params,
            status: JobStatus::Processing,
            progress: 0,
            sd_output: None,
            hd_output: None,
            error_kind: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves progress forward to `checkpoint`.
    ///
    /// Returns false (and changes nothing) if the job is terminal or already
    /// past this checkpoint.
    pub fn advance(&mut self, checkpoint: Checkpoint) -> bool {
        let percent = checkpoint.percent();
        if self.is_terminal() || percent < self.progress {
            return false;
        }
        self.progress = percent;
        self.touch();
        true
    }

    /// Marks the job completed with both output references.
    ///
    /// Returns false if the job was already terminal.
    pub fn complete(&mut self, sd_output: ImageRef, hd_output: ImageRef) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = Checkpoint::HdWritten.percent();
        self.sd_output = Some(sd_output);
        self.hd_output = Some(hd_output);
        self.touch();
        true
    }

    /// Marks the job failed. Progress stays where it stopped.
    ///
    /// Returns false if the job was already terminal.
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error_kind = Some(kind);
        self.error_message = Some(message.into());
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::job;
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(JobId::new(42).to_string(), "mosaic-42");
        assert_eq!(UserId::new(1).to_string(), "user-1");
        assert_eq!(TargetId::new(7).to_string(), "target-7");
    }

    #[test]
    fn test_new_job_is_processing_at_zero() {
        let job = job(1, 1, 1);
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 0);
        assert!(job.sd_output.is_none());
        assert!(job.error_message.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_checkpoints_strictly_increase() {
        let all = [
            Checkpoint::MainResolved,
            Checkpoint::TilesResolved,
            Checkpoint::CanvasMeasured,
            Checkpoint::MainDecoded,
            Checkpoint::CanvasAllocated,
            Checkpoint::TilesDecoded,
            Checkpoint::SdComposited,
            Checkpoint::HdComposited,
            Checkpoint::SdWritten,
            Checkpoint::HdWritten,
        ];
        for pair in all.windows(2) {
            assert!(pair[0].percent() < pair[1].percent());
        }
        assert_eq!(Checkpoint::HdWritten.percent(), 100);
    }

    #[test]
    fn test_advance_never_regresses() {
        let mut job = job(1, 1, 1);
        assert!(job.advance(Checkpoint::CanvasMeasured));
        assert_eq!(job.progress, 30);

        assert!(!job.advance(Checkpoint::MainResolved));
        assert_eq!(job.progress, 30);
    }

    #[test]
    fn test_complete_sets_outputs_and_full_progress() {
        let mut job = job(1, 1, 1);
        job.advance(Checkpoint::SdWritten);
        let sd = ImageRef::normalize("out/sd.jpg").unwrap();
        let hd = ImageRef::normalize("out/hd.jpg").unwrap();

        assert!(job.complete(sd.clone(), hd.clone()));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.sd_output, Some(sd));
        assert_eq!(job.hd_output, Some(hd));
    }

    #[test]
    fn test_fail_freezes_progress() {
        let mut job = job(1, 1, 1);
        job.advance(Checkpoint::TilesDecoded);

        assert!(job.fail(ErrorKind::NoTilesAvailable, "no valid tile images found"));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 60);
        assert_eq!(job.error_kind, Some(ErrorKind::NoTilesAvailable));
    }

    #[test]
    fn test_terminal_is_immutable() {
        let mut job = job(1, 1, 1);
        job.fail(ErrorKind::Internal, "boom");

        assert!(!job.advance(Checkpoint::HdWritten));
        assert!(!job.fail(ErrorKind::Cancelled, "again"));
        let sd = ImageRef::normalize("sd.jpg").unwrap();
        assert!(!job.complete(sd.clone(), sd));

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_kind, Some(ErrorKind::Internal));
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert_eq!(JobStatus::Processing.to_string(), "processing");
    }
}
