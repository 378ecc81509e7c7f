//! Tile selection for grid cells.

use super::{Cell, ComposeError};
use crate::store::DecodedImage;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chooses which tile fills a cell.
pub trait TileSelector {
    /// Returns an index in `0..tile_count`. `tile_count` is never zero.
    fn select(&mut self, cell: &Cell, tile_count: usize) -> usize;
}

/// Uniform random selection, independent per cell.
///
/// The same tile may repeat in adjacent cells. This selector does not look at
/// the main image at all.
#[derive(Debug, Clone)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
}

impl RandomSelector<StdRng> {
    /// Seeds from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic selector for reproducible output.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomSelector<R> {
    /// Wraps an existing generator.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> TileSelector for RandomSelector<R> {
    fn select(&mut self, _cell: &Cell, tile_count: usize) -> usize {
        self.rng.random_range(0..tile_count)
    }
}

/// Non-empty set of decoded tiles.
#[derive(Debug, Clone)]
pub struct TileSet {
    tiles: Vec<RgbaImage>,
}

impl TileSet {
    /// Builds a tile set, dropping zero-sized rasters.
    ///
    /// # Errors
    ///
    /// [`ComposeError::NoTilesAvailable`] when nothing usable remains.
    pub fn new(tiles: Vec<RgbaImage>) -> Result<Self, ComposeError> {
        let tiles: Vec<_> = tiles
            .into_iter()
            .filter(|t| t.width() > 0 && t.height() > 0)
            .collect();
        if tiles.is_empty() {
            return Err(ComposeError::NoTilesAvailable);
        }
        Ok(Self { tiles })
    }

    /// Builds a tile set from decoded images.
    ///
    /// # Errors
    ///
    /// [`ComposeError::NoTilesAvailable`] when `images` is empty.
    pub fn from_decoded(images: Vec<DecodedImage>) -> Result<Self, ComposeError> {
        Self::new(images.into_iter().map(DecodedImage::into_pixels).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RgbaImage> {
        self.tiles.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&RgbaImage> {
        self.tiles.get(index)
    }
}
