//! Snapshot module - owned copies of the state a renderer needs
//!
//! A snapshot holds only shapes, colours and positions. It shares nothing with
//! the live [`crate::GameState`] and can be handed to another task freely.

use crate::pieces::{Piece, Shape};
use crate::types::{BoardSize, Cell, ColorId, GameStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceSnapshot {
    pub x: i16,
    pub y: i16,
    pub shape: Shape,
    pub color: ColorId,
}

impl From<&Piece> for PieceSnapshot {
    fn from(value: &Piece) -> Self {
        Self {
            x: value.x,
            y: value.y,
            shape: value.shape,
            color: value.color,
        }
    }
}

/// A piece shown outside the board (next / hold), so no position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewSnapshot {
    pub shape: Shape,
    pub color: ColorId,
}

impl From<&Piece> for PreviewSnapshot {
    fn from(value: &Piece) -> Self {
        Self {
            shape: value.shape,
            color: value.color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub size: BoardSize,
    /// Locked cells, row-major; the falling piece is not painted in.
    pub grid: Vec<Cell>,
    pub current: PieceSnapshot,
    pub ghost: PieceSnapshot,
    pub next: PreviewSnapshot,
    pub hold: Option<PreviewSnapshot>,
    pub score: u32,
    pub level: u32,
    pub high_score: u32,
    pub status: GameStatus,
}

impl GameSnapshot {
    /// Blank snapshot sized for `size`, ready for `snapshot_into`
    pub fn new(size: BoardSize) -> Self {
        let blank = Piece::spawn(crate::types::PieceKind::I, size);
        Self {
            size,
            grid: vec![None; size.cell_count()],
            current: PieceSnapshot::from(&blank),
            ghost: PieceSnapshot::from(&blank),
            next: PreviewSnapshot::from(&blank),
            hold: None,
            score: 0,
            level: 0,
            high_score: 0,
            status: GameStatus::Running,
        }
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.grid.chunks(self.size.width as usize)
    }
}
