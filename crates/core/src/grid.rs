//! Grid module - locked cells and the derived cell matrix
//!
//! [`LockedPositions`] is the persistent board: every cell a locked piece left
//! behind. The [`Grid`] is a W×H row-major matrix derived from it and rebuilt
//! whenever the locked set changes; it is never edited cell by cell.
//! Coordinates: (x, y) where x grows left to right and y grows top to bottom.

use std::collections::BTreeMap;

use crate::pieces::Piece;
use crate::types::{BoardSize, Cell, ColorId};

/// Union of all locked cells, keyed by board coordinate
///
/// Entries above the visible board (`y < 0`) are kept: they are what ends the
/// game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockedPositions {
    // Keyed (y, x) so a row is a contiguous range.
    cells: BTreeMap<(i16, i16), ColorId>,
}

impl LockedPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, x: i16, y: i16, color: ColorId) {
        self.cells.insert((y, x), color);
    }

    pub fn get(&self, x: i16, y: i16) -> Option<ColorId> {
        self.cells.get(&(y, x)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate `(x, y, color)` from the top row down
    pub fn iter(&self) -> impl Iterator<Item = (i16, i16, ColorId)> + '_ {
        self.cells.iter().map(|(&(y, x), &color)| (x, y, color))
    }

    /// Merge every cell of `piece` into the locked set
    pub fn merge(&mut self, piece: &Piece) {
        for (x, y) in piece.cells() {
            self.insert(x, y, piece.color);
        }
    }

    /// Remove all entries on row `y`, returning how many were removed
    pub fn remove_row(&mut self, y: i16) -> usize {
        let before = self.cells.len();
        self.cells.retain(|&(row, _), _| row != y);
        before - self.cells.len()
    }

    /// Whether any locked cell sits above `row`
    pub fn reaches_row(&self, row: i16) -> bool {
        self.cells
            .keys()
            .next()
            .is_some_and(|&(top, _)| top < row)
    }
}

impl FromIterator<(i16, i16, ColorId)> for LockedPositions {
    fn from_iter<T: IntoIterator<Item = (i16, i16, ColorId)>>(iter: T) -> Self {
        let mut locked = Self::new();
        for (x, y, color) in iter {
            locked.insert(x, y, color);
        }
        locked
    }
}

/// The W×H cell matrix built from [`LockedPositions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: BoardSize,
    /// Flat array of cells, row-major order (y * width + x)
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid
    pub fn empty(size: BoardSize) -> Self {
        Self {
            size,
            cells: vec![None; size.cell_count()],
        }
    }

    /// Build the grid for a locked set; entries off the board are skipped
    pub fn build(size: BoardSize, locked: &LockedPositions) -> Self {
        let mut grid = Self::empty(size);
        for (x, y, color) in locked.iter() {
            if let Some(idx) = grid.index(x, y) {
                grid.cells[idx] = Some(color);
            }
        }
        grid
    }

    #[inline(always)]
    fn index(&self, x: i16, y: i16) -> Option<usize> {
        if !self.size.contains(x, y) {
            return None;
        }
        Some(y as usize * self.size.width as usize + x as usize)
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn width(&self) -> u8 {
        self.size.width
    }

    pub fn height(&self) -> u8 {
        self.size.height
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i16, y: i16) -> Option<Cell> {
        self.index(x, y).map(|idx| self.cells[idx])
    }

    /// Check if position is on the board and empty
    pub fn is_empty_at(&self, x: i16, y: i16) -> bool {
        matches!(self.get(x, y), Some(None))
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        self.row(y).is_some_and(|row| row.iter().all(|c| c.is_some()))
    }

    /// Cells of row `y`
    pub fn row(&self, y: usize) -> Option<&[Cell]> {
        if y >= self.size.height as usize {
            return None;
        }
        let width = self.size.width as usize;
        Some(&self.cells[y * width..(y + 1) * width])
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.size.width as usize)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of occupied cells
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// Clear every full row of `grid` from `locked` and compact what remains
///
/// Rows are scanned bottom to top. A full row's entries are dropped; every
/// surviving entry moves down by the number of full rows found below it, so
/// rows above several clears are never skipped. Entries above the visible
/// board move down by the total. Returns the number of rows cleared.
///
/// `grid` must have been built from `locked`.
pub fn clear_full_rows(grid: &Grid, locked: &mut LockedPositions) -> usize {
    let height = grid.height() as usize;
    let mut shift = vec![0i16; height];
    let mut cleared = 0i16;

    for y in (0..height).rev() {
        if grid.is_row_full(y) {
            locked.remove_row(y as i16);
            cleared += 1;
        } else {
            shift[y] = cleared;
        }
    }

    if cleared == 0 {
        return 0;
    }

    let compacted = std::mem::take(&mut locked.cells)
        .into_iter()
        .map(|((y, x), color)| {
            let dy = if y < 0 {
                cleared
            } else {
                shift.get(y as usize).copied().unwrap_or(0)
            };
            ((y + dy, x), color)
        })
        .collect();
    locked.cells = compacted;

    cleared as usize
}
