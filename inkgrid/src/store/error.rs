//! Errors raised while resolving and decoding stored images.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the image store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The reference cannot be turned into a root-relative path.
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidReference {
        reference: String,
        reason: &'static str,
    },

    /// No file exists at the resolved location.
    #[error("image '{reference}' not found at {}", .path.display())]
    NotFound { reference: String, path: PathBuf },

    /// Bytes exist but are not a decodable raster.
    #[error("failed to decode image '{reference}': {source}")]
    Decode {
        reference: String,
        #[source]
        source: image::ImageError,
    },

    /// Any other I/O fault while reading.
    #[error("I/O error reading '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Returns true if the image simply does not exist.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
