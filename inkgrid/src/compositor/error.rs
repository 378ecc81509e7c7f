//! Compositor errors.

use super::Resolution;
use thiserror::Error;

/// Errors raised while building or encoding mosaic canvases.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Every tile was filtered out before composition.
    #[error("no valid tile images found")]
    NoTilesAvailable,

    /// Tile size must be at least one pixel.
    #[error("invalid tile size {0}")]
    InvalidTileSize(u32),

    /// JPEG serialization of a canvas failed.
    #[error("failed to encode {resolution} canvas: {message}")]
    Encode {
        resolution: Resolution,
        message: String,
    },
}
