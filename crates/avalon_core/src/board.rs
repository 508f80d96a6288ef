//! The terrain grid.

use serde::{Deserialize, Serialize};

use crate::data::TerrainKind;
use crate::math::Vec2Fixed;

/// Side length of the standard square board, in cells.
pub const GRID_SIZE: u32 = 250;

/// Square terrain grid stored row-major.
///
/// Cell `(x, y)` lives at index `y * size + x`. All accessors are bounds
/// checked and take signed coordinates so callers can query off-board
/// positions without casting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    size: u32,
    cells: Vec<TerrainKind>,
}

impl Board {
    /// Create a board filled with one terrain kind.
    #[must_use]
    pub fn filled(size: u32, terrain: TerrainKind) -> Self {
        Self {
            size,
            cells: vec![terrain; (size as usize) * (size as usize)],
        }
    }

    /// Side length in cells.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Total cell count.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether `(x, y)` is on the board.
    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.size && (y as u32) < self.size
    }

    /// Flat index of `(x, y)`, if on the board.
    #[must_use]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| (y as usize) * (self.size as usize) + x as usize)
    }

    /// Coordinates of a flat index.
    #[must_use]
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let size = self.size as usize;
        ((index % size) as u32, (index / size) as u32)
    }

    /// Terrain at `(x, y)`, if on the board.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<TerrainKind> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Overwrite terrain at `(x, y)`. Off-board writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, terrain: TerrainKind) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = terrain;
        }
    }

    /// Terrain under a continuous position.
    #[must_use]
    pub fn terrain_at(&self, pos: Vec2Fixed) -> Option<TerrainKind> {
        let (x, y) = pos.cell();
        self.get(x, y)
    }

    /// Whether a square footprint with top-left `(x, y)` lies fully on the
    /// board.
    #[must_use]
    pub fn footprint_fits(&self, x: i32, y: i32, footprint: u32) -> bool {
        let Ok(side) = i32::try_from(footprint) else {
            return false;
        };
        side > 0 && self.in_bounds(x, y) && self.in_bounds(x + side - 1, y + side - 1)
    }

    /// Rows of terrain, top to bottom, in the shape clients render.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<TerrainKind>> {
        self.cells
            .chunks(self.size.max(1) as usize)
            .map(<[TerrainKind]>::to_vec)
            .collect()
    }

    /// Count cells of one terrain kind.
    #[must_use]
    pub fn count(&self, terrain: TerrainKind) -> usize {
        self.cells.iter().filter(|&&c| c == terrain).count()
    }
}
