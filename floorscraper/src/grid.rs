//! Pixel grid iteration over a floor map.
//!
//! A floor is scraped by walking its map in fixed steps. Both bounds are
//! inclusive, so a map whose width is an exact multiple of the step gets one
//! extra column past the nominal edge (and likewise for rows). The remote
//! service is queried with exactly these coordinates.
//!
//! Cells are yielded x-outer, y-inner: `(0,0), (0,S), ..., (S,0), (S,S), ...`.

use std::fmt;

/// Default distance in pixels between neighbouring grid cells.
pub const DEFAULT_STEP: u32 = 200;

/// Pixel offset of one grid cell on the floor map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    /// Horizontal offset in pixels.
    pub x: u32,
    /// Vertical offset in pixels.
    pub y: u32,
}

impl GridCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

/// The inclusive cell grid covering a floor map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorGrid {
    width: u32,
    height: u32,
    step: u32,
}

impl FloorGrid {
    /// Create a grid over a `width`×`height` map.
    ///
    /// A zero step would never advance; it is clamped to 1.
    pub fn new(width: u32, height: u32, step: u32) -> Self {
        Self {
            width,
            height,
            step: step.max(1),
        }
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Number of columns, counting both boundary values.
    pub fn columns(&self) -> u32 {
        self.width / self.step + 1
    }

    /// Number of rows, counting both boundary values.
    pub fn rows(&self) -> u32 {
        self.height / self.step + 1
    }

    /// Total number of cells in the grid.
    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// A grid always has at least the origin cell.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the cells x-outer, y-inner.
    pub fn cells(&self) -> GridCells {
        GridCells {
            grid: *self,
            next: Some(GridCoord::new(0, 0)),
        }
    }
}

/// Iterator over the cells of a [`FloorGrid`].
#[derive(Debug, Clone)]
pub struct GridCells {
    grid: FloorGrid,
    next: Option<GridCoord>,
}

impl Iterator for GridCells {
    type Item = GridCoord;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let step = self.grid.step;

        // u64 arithmetic so a map near u32::MAX still terminates
        let next_y = current.y as u64 + step as u64;
        self.next = if next_y <= self.grid.height as u64 {
            Some(GridCoord::new(current.x, next_y as u32))
        } else {
            let next_x = current.x as u64 + step as u64;
            if next_x <= self.grid.width as u64 {
                Some(GridCoord::new(next_x as u32, 0))
            } else {
                None
            }
        };

        Some(current)
    }
}
