//! Mosaic compositor.
//!
//! Turns a decoded main image and a set of decoded tiles into two JPEG
//! outputs:
//!
//! ```text
//! main W×H ──► HD canvas W×H,       cells tile_size × tile_size
//!          └─► SD canvas W/2×H/2,   cells tile_size/2 × tile_size/2
//! ```
//!
//! Each cell, scanned row-major from the top-left, receives one tile chosen
//! by a [`TileSelector`], scaled with a bilinear filter to the cell size and
//! blended "over" the canvas. Cells at the right/bottom edges are clipped.
//!
//! The bundled [`RandomSelector`] picks uniformly at random; the main image's
//! colors are not consulted. [`average_color`] is available for callers that
//! want to experiment with color-aware selection.

mod canvas;
mod color;
mod error;
mod grid;
mod selector;

pub use canvas::{CanvasSize, CompositeCanvas, Resolution, JPEG_QUALITY, SCALE_FILTER};
pub use color::average_color;
pub use error::ComposeError;
pub use grid::{Cell, CellGrid};
pub use selector::{RandomSelector, TileSelector, TileSet};

use crate::store::DecodedImage;

/// Encoded outputs of one composition.
#[derive(Debug, Clone)]
pub struct MosaicOutputs {
    /// Half-resolution JPEG
    pub sd: Vec<u8>,
    /// Full-resolution JPEG
    pub hd: Vec<u8>,
}

/// Composes and encodes both canvases in one call.
///
/// SD is painted before HD using the same selector, so the two canvases get
/// independent draws.
///
/// # Errors
///
/// [`ComposeError::InvalidTileSize`] for a zero tile size, or
/// [`ComposeError::Encode`] if either canvas cannot be serialized.
pub fn compose<S>(
    main: &DecodedImage,
    tiles: &TileSet,
    tile_size: u32,
    selector: &mut S,
    quality: u8,
) -> Result<MosaicOutputs, ComposeError>
where
    S: TileSelector + ?Sized,
{
    let (width, height) = main.dimensions();
    let mut canvas = CompositeCanvas::allocate(CanvasSize::new(width, height), tile_size)?;

    canvas.paint(Resolution::Sd, tiles, selector);
    canvas.paint(Resolution::Hd, tiles, selector);

    Ok(MosaicOutputs {
        sd: canvas.encode(Resolution::Sd, quality)?,
        hd: canvas.encode(Resolution::Hd, quality)?,
    })
}
