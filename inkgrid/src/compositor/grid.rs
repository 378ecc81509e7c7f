//! Row-major grid of square cells over a canvas.

/// One square cell of the grid.
///
/// Cells on the right and bottom edges may extend past the canvas; drawing
/// into them is clipped by the canvas bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    /// Left edge in canvas pixels
    pub x: u32,
    /// Top edge in canvas pixels
    pub y: u32,
    /// Side length in pixels
    pub size: u32,
}

/// Partition of a `width × height` canvas into `cell_size` squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGrid {
    width: u32,
    height: u32,
    cell_size: u32,
}

impl CellGrid {
    /// Creates a grid. A zero cell size is treated as one pixel.
    pub fn new(width: u32, height: u32, cell_size: u32) -> Self {
        Self {
            width,
            height,
            cell_size: cell_size.max(1),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Number of columns, counting a partial column at the right edge.
    #[inline]
    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.cell_size)
    }

    /// Number of rows, counting a partial row at the bottom edge.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.cell_size)
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates cells row-major from the top-left origin.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let columns = self.columns();
        (0..self.rows()).flat_map(move |row| {
            (0..columns).map(move |col| Cell {
                row,
                col,
                x: col * self.cell_size,
                y: row * self.cell_size,
                size: self.cell_size,
            })
        })
    }
}
