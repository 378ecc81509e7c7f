//! Error taxonomy for mosaic generation.
//!
//! Submission-time errors are returned to the caller and never create a job.
//! Pipeline-time errors are recorded on the job as an [`ErrorKind`] plus a
//! message and are only observed by polling.

use super::{JobId, TargetId};
use crate::compositor::ComposeError;
use crate::store::StoreError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from submission, status queries and the background pipeline.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// Another job for the same target is still processing
    #[error("a mosaic generation is already in progress for {target}")]
    AlreadyInProgress { target: TargetId },

    /// A generation parameter is outside its accepted range
    #[error("invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: String,
    },

    /// No job with this ID exists for the requesting user
    #[error("{job} not found")]
    JobNotFound { job: JobId },

    /// Image store failure (missing, undecodable or unreadable image)
    #[error(transparent)]
    Image(#[from] StoreError),

    /// Every tile failed to resolve or decode
    #[error("no valid tile images found")]
    NoTilesAvailable,

    /// Output directory or file could not be written
    #[error("failed to {operation} '{}': {source}", .path.display())]
    Output {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A canvas could not be serialized
    #[error("encoding failed: {0}")]
    Encode(String),

    /// The job store rejected a write
    #[error("job store error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The orchestrator was shut down while the job was running
    #[error("generation cancelled")]
    Cancelled,

    /// Unexpected fault (panicked task, missing runtime)
    #[error("internal error: {0}")]
    Internal(String),
}

impl MosaicError {
    /// Classifies this error for the job record.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInProgress { .. } => ErrorKind::AlreadyInProgress,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::JobNotFound { .. } => ErrorKind::NotFound,
            Self::Image(StoreError::NotFound { .. } | StoreError::InvalidReference { .. }) => {
                ErrorKind::NotFound
            }
            Self::Image(StoreError::Decode { .. }) => ErrorKind::DecodeError,
            Self::Image(StoreError::Io { .. }) | Self::Output { .. } => ErrorKind::IoError,
            Self::NoTilesAvailable => ErrorKind::NoTilesAvailable,
            Self::Encode(_) => ErrorKind::EncodeError,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid(
        parameter: &'static str,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ComposeError> for MosaicError {
    fn from(error: ComposeError) -> Self {
        match error {
            ComposeError::NoTilesAvailable => Self::NoTilesAvailable,
            ComposeError::InvalidTileSize(size) => {
                Self::invalid("tile_size", size, "must be at least 1")
            }
            ComposeError::Encode { .. } => Self::Encode(error.to_string()),
        }
    }
}

/// Coarse error category stored on failed jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyInProgress,
    InvalidParameter,
    NotFound,
    DecodeError,
    NoTilesAvailable,
    IoError,
    EncodeError,
    Persistence,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyInProgress => "already_in_progress",
            Self::InvalidParameter => "invalid_parameter",
            Self::NotFound => "not_found",
            Self::DecodeError => "decode_error",
            Self::NoTilesAvailable => "no_tiles_available",
            Self::IoError => "io_error",
            Self::EncodeError => "encode_error",
            Self::Persistence => "persistence",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a [`JobStore`](super::JobStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// The record does not exist
    #[error("{0} does not exist")]
    Missing(JobId),

    /// The stored record is already terminal
    #[error("{0} is terminal and cannot be modified")]
    Terminal(JobId),

    /// The write would move progress backwards
    #[error("{job} progress cannot move from {stored} to {requested}")]
    ProgressRegressed { job: JobId, stored: u8, requested: u8 },

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::Resolution;

    #[test]
    fn test_already_in_progress_display() {
        let err = MosaicError::AlreadyInProgress {
            target: TargetId::new(3),
        };
        assert_eq!(
            err.to_string(),
            "a mosaic generation is already in progress for target-3"
        );
        assert_eq!(err.kind(), ErrorKind::AlreadyInProgress);
    }

    #[test]
    fn test_store_error_kinds() {
        let not_found = MosaicError::from(StoreError::NotFound {
            reference: "a.png".into(),
            path: PathBuf::from("/x/a.png"),
        });
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let io = MosaicError::from(StoreError::Io {
            path: PathBuf::from("/x"),
            source: std::io::Error::other("disk on fire"),
        });
        assert_eq!(io.kind(), ErrorKind::IoError);
    }

    #[test]
    fn test_compose_error_conversion() {
        assert_eq!(
            MosaicError::from(ComposeError::NoTilesAvailable).kind(),
            ErrorKind::NoTilesAvailable
        );

        let encode = MosaicError::from(ComposeError::Encode {
            resolution: Resolution::Hd,
            message: "bad".into(),
        });
        assert_eq!(encode.kind(), ErrorKind::EncodeError);
        assert!(encode.to_string().contains("hd canvas"));
    }

    #[test]
    fn test_output_error_display() {
        let err = MosaicError::Output {
            operation: "create directory",
            path: PathBuf::from("/srv/out"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("failed to create directory '/srv/out'"));
        assert_eq!(err.kind(), ErrorKind::IoError);
    }

    #[test]
    fn test_persistence_error_display() {
        let err = PersistenceError::ProgressRegressed {
            job: JobId::new(1),
            stored: 50,
            requested: 40,
        };
        assert_eq!(err.to_string(), "mosaic-1 progress cannot move from 50 to 40");
    }
}
