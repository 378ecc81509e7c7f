//! SD and HD canvases painted cell by cell.

use super::{CellGrid, ComposeError, TileSelector, TileSet};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use std::fmt;
use tracing::debug;

/// Smooth resampling used when scaling tiles to the cell size.
pub const SCALE_FILTER: FilterType = FilterType::Triangle;

/// JPEG quality for both outputs.
pub const JPEG_QUALITY: u8 = 90;

/// Which of the two outputs a canvas produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Half width and half height of the main image
    Sd,
    /// Same pixel dimensions as the main image
    Hd,
}

impl Resolution {
    /// Cell side length for this resolution.
    ///
    /// HD cells are `tile_size`; SD cells are `tile_size / 2`, at least one
    /// pixel.
    #[inline]
    pub fn cell_size(self, tile_size: u32) -> u32 {
        match self {
            Self::Hd => tile_size.max(1),
            Self::Sd => (tile_size / 2).max(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sd => "sd",
            Self::Hd => "hd",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel dimensions of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Integer half of each dimension.
    pub const fn half(self) -> Self {
        Self::new(self.width / 2, self.height / 2)
    }

    /// Canvas size for `resolution` given the main image size.
    pub const fn for_resolution(self, resolution: Resolution) -> Self {
        match resolution {
            Resolution::Hd => self,
            Resolution::Sd => self.half(),
        }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The pair of output rasters for one pipeline invocation.
///
/// Both canvases start fully transparent. Painting blends scaled tiles onto
/// them with straight-alpha "over".
pub struct CompositeCanvas {
    tile_size: u32,
    sd: RgbaImage,
    hd: RgbaImage,
}

impl CompositeCanvas {
    /// Allocates SD and HD canvases for a main image of size `main`.
    ///
    /// # Errors
    ///
    /// [`ComposeError::InvalidTileSize`] if `tile_size` is zero.
    pub fn allocate(main: CanvasSize, tile_size: u32) -> Result<Self, ComposeError> {
        if tile_size == 0 {
            return Err(ComposeError::InvalidTileSize(tile_size));
        }
        let sd = main.half();
        Ok(Self {
            tile_size,
            sd: RgbaImage::new(sd.width, sd.height),
            hd: RgbaImage::new(main.width, main.height),
        })
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Current dimensions of one canvas.
    pub fn size(&self, resolution: Resolution) -> CanvasSize {
        let (width, height) = self.canvas(resolution).dimensions();
        CanvasSize::new(width, height)
    }

    pub fn canvas(&self, resolution: Resolution) -> &RgbaImage {
        match resolution {
            Resolution::Sd => &self.sd,
            Resolution::Hd => &self.hd,
        }
    }

    /// Fills every cell of one canvas with a selected, scaled tile.
    ///
    /// Returns the number of cells painted.
    pub fn paint<S>(&mut self, resolution: Resolution, tiles: &TileSet, selector: &mut S) -> usize
    where
        S: TileSelector + ?Sized,
    {
        let cell_size = resolution.cell_size(self.tile_size);
        let canvas = match resolution {
            Resolution::Sd => &mut self.sd,
            Resolution::Hd => &mut self.hd,
        };
        let painted = paint_grid(canvas, cell_size, tiles, selector);

        debug!(
            resolution = %resolution,
            cell_size,
            cells = painted,
            "Canvas painted"
        );
        painted
    }

    /// Encodes one canvas as JPEG.
    ///
    /// # Errors
    ///
    /// [`ComposeError::Encode`] if the canvas is empty or the encoder fails.
    pub fn encode(&self, resolution: Resolution, quality: u8) -> Result<Vec<u8>, ComposeError> {
        encode_jpeg(self.canvas(resolution), quality).map_err(|message| ComposeError::Encode {
            resolution,
            message,
        })
    }

    /// Consumes the canvases, returning `(sd, hd)`.
    pub fn into_canvases(self) -> (RgbaImage, RgbaImage) {
        (self.sd, self.hd)
    }
}

/// Paints `canvas` with one tile per cell.
///
/// Tiles are scaled to the cell size on first use and reused for later cells;
/// every cell has the same size so the result matches per-cell scaling.
fn paint_grid<S>(canvas: &mut RgbaImage, cell_size: u32, tiles: &TileSet, selector: &mut S) -> usize
where
    S: TileSelector + ?Sized,
{
    let grid = CellGrid::new(canvas.width(), canvas.height(), cell_size);
    let mut scaled: Vec<Option<RgbaImage>> = vec![None; tiles.len()];
    let mut painted = 0;

    for cell in grid.cells() {
        let index = selector.select(&cell, tiles.len());
        let (Some(slot), Some(source)) = (scaled.get_mut(index), tiles.get(index)) else {
            continue;
        };
        let tile = slot
            .get_or_insert_with(|| imageops::resize(source, cell.size, cell.size, SCALE_FILTER));
        imageops::overlay(canvas, &*tile, i64::from(cell.x), i64::from(cell.y));
        painted += 1;
    }

    painted
}

/// Encodes an RGBA raster as baseline JPEG (alpha is discarded).
fn encode_jpeg(canvas: &RgbaImage, quality: u8) -> Result<Vec<u8>, String> {
    if canvas.width() == 0 || canvas.height() == 0 {
        return Err(format!(
            "canvas is empty ({}x{})",
            canvas.width(),
            canvas.height()
        ));
    }

    let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| e.to_string())?;
    Ok(buffer)
}
