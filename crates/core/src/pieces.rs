//! Pieces module - tetromino shapes and the raw rotation transform
//!
//! Shapes are small boolean matrices packed into a `u16` (row-major, 4 bits per
//! row), so they are `Copy` and immutable: rotating produces a new shape.
//! There is no wall-kick table; callers validate a rotation and keep the old
//! piece when it does not fit (see [`crate::collision::try_rotate`]).

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::types::{BoardSize, ColorId, PieceKind};

/// Largest shape dimension (rows or columns)
pub const MAX_SHAPE_DIM: u8 = 4;

/// Upper bound on filled cells in a shape
pub const MAX_SHAPE_CELLS: usize = (MAX_SHAPE_DIM * MAX_SHAPE_DIM) as usize;

/// Offsets of a shape's filled cells, `(dx, dy)` relative to the anchor
pub type ShapeCells = ArrayVec<(i16, i16), MAX_SHAPE_CELLS>;

/// Reasons a row matrix cannot be turned into a [`Shape`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("shape has no rows or columns")]
    Empty,
    #[error("shape is {width}x{height}, larger than 4x4")]
    TooLarge { width: usize, height: usize },
    #[error("shape rows have different lengths")]
    Ragged,
    #[error("shape cell value {0} is not 0 or 1")]
    InvalidCell(u8),
    #[error("shape has no filled cells")]
    NoFilledCells,
}

/// Immutable boolean matrix of up to 4x4 cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    width: u8,
    height: u8,
    bits: u16,
}

impl Shape {
    const fn pack(width: u8, height: u8, rows: [[u8; 4]; 4]) -> Self {
        let mut bits = 0u16;
        let mut row = 0;
        while row < 4 {
            let mut col = 0;
            while col < 4 {
                if rows[row][col] != 0 {
                    bits |= 1 << (row * 4 + col);
                }
                col += 1;
            }
            row += 1;
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// Build a shape from rows of 0/1 values
    ///
    /// ```
    /// use tetris_stream_core::pieces::{Shape, ShapeError};
    ///
    /// let t = Shape::from_rows(&[vec![0, 1, 0], vec![1, 1, 1]]).unwrap();
    /// assert_eq!((t.width(), t.height()), (3, 2));
    ///
    /// assert_eq!(Shape::from_rows(&[vec![1, 1], vec![1]]), Err(ShapeError::Ragged));
    /// ```
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, ShapeError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(ShapeError::Empty);
        }
        if width > MAX_SHAPE_DIM as usize || height > MAX_SHAPE_DIM as usize {
            return Err(ShapeError::TooLarge { width, height });
        }

        let mut bits = 0u16;
        for (row, cells) in rows.iter().enumerate() {
            let cells = cells.as_ref();
            if cells.len() != width {
                return Err(ShapeError::Ragged);
            }
            for (col, &cell) in cells.iter().enumerate() {
                match cell {
                    0 => {}
                    1 => bits |= 1 << (row * 4 + col),
                    other => return Err(ShapeError::InvalidCell(other)),
                }
            }
        }

        if bits == 0 {
            return Err(ShapeError::NoFilledCells);
        }

        Ok(Self {
            width: width as u8,
            height: height as u8,
            bits,
        })
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Whether the cell at (col, row) is filled; false outside the matrix
    #[inline(always)]
    pub fn is_filled(&self, col: u8, row: u8) -> bool {
        col < self.width && row < self.height && self.bits & (1 << (row * 4 + col)) != 0
    }

    /// Number of filled cells
    pub fn cell_count(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Filled cell offsets in row-major order (no allocation)
    pub fn cells(&self) -> ShapeCells {
        let mut out = ArrayVec::new();
        for row in 0..self.height {
            for col in 0..self.width {
                if self.is_filled(col, row) {
                    out.push((col as i16, row as i16));
                }
            }
        }
        out
    }

    /// Rotate 90° clockwise: reverse the row order, then transpose
    ///
    /// The result has swapped dimensions. Four rotations give back the
    /// original shape.
    pub fn rotate_cw(&self) -> Shape {
        let mut bits = 0u16;
        // new[r][c] = old[h - 1 - c][r]
        for r in 0..self.width {
            for c in 0..self.height {
                if self.is_filled(r, self.height - 1 - c) {
                    bits |= 1 << (r * 4 + c);
                }
            }
        }
        Shape {
            width: self.height,
            height: self.width,
            bits,
        }
    }

    /// Rows of 0/1 values, for wire and storage formats
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        (0..self.height)
            .map(|row| {
                (0..self.width)
                    .map(|col| self.is_filled(col, row) as u8)
                    .collect()
            })
            .collect()
    }
}

/// Spawn shapes indexed by [`PieceKind::index`]
const TETROMINOES: [Shape; 7] = [
    // I
    Shape::pack(4, 1, [[1, 1, 1, 1], [0; 4], [0; 4], [0; 4]]),
    // J
    Shape::pack(3, 2, [[1, 0, 0, 0], [1, 1, 1, 0], [0; 4], [0; 4]]),
    // L
    Shape::pack(3, 2, [[0, 0, 1, 0], [1, 1, 1, 0], [0; 4], [0; 4]]),
    // O
    Shape::pack(2, 2, [[1, 1, 0, 0], [1, 1, 0, 0], [0; 4], [0; 4]]),
    // S
    Shape::pack(3, 2, [[0, 1, 1, 0], [1, 1, 0, 0], [0; 4], [0; 4]]),
    // T
    Shape::pack(3, 2, [[0, 1, 0, 0], [1, 1, 1, 0], [0; 4], [0; 4]]),
    // Z
    Shape::pack(3, 2, [[1, 1, 0, 0], [0, 1, 1, 0], [0; 4], [0; 4]]),
];

/// Get the spawn shape for a piece kind
pub fn spawn_shape(kind: PieceKind) -> Shape {
    TETROMINOES[kind.index()]
}

/// Whether `shape` is one of the four orientations of `kind`
pub fn is_orientation_of(shape: Shape, kind: PieceKind) -> bool {
    let mut candidate = spawn_shape(kind);
    for _ in 0..4 {
        if candidate == shape {
            return true;
        }
        candidate = candidate.rotate_cw();
    }
    false
}

/// A piece: shape plus anchor position on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub x: i16,
    pub y: i16,
    pub shape: Shape,
    pub color: ColorId,
}

impl Piece {
    /// Create a new piece of `kind` at the spawn position
    pub fn spawn(kind: PieceKind, size: BoardSize) -> Self {
        Self {
            kind,
            x: size.spawn_x(),
            y: 0,
            shape: spawn_shape(kind),
            color: kind.color(),
        }
    }

    /// Same piece moved by (dx, dy)
    pub fn moved(&self, dx: i16, dy: i16) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Same piece rotated 90° clockwise around its anchor
    pub fn rotated(&self) -> Self {
        Self {
            shape: self.shape.rotate_cw(),
            ..*self
        }
    }

    /// Same piece with its anchor reset to the spawn position, orientation kept
    pub fn at_spawn(&self, size: BoardSize) -> Self {
        Self {
            x: size.spawn_x(),
            y: 0,
            ..*self
        }
    }

    /// Absolute board coordinates of the filled cells
    pub fn cells(&self) -> impl Iterator<Item = (i16, i16)> + '_ {
        self.shape
            .cells()
            .into_iter()
            .map(move |(dx, dy)| (self.x + dx, self.y + dy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_shapes_have_four_cells() {
        for kind in PieceKind::ALL {
            assert_eq!(spawn_shape(kind).cell_count(), 4, "{:?}", kind);
        }
    }

    #[test]
    fn test_pack_matches_from_rows() {
        let t = Shape::from_rows(&[[0u8, 1, 0], [1, 1, 1]]).unwrap();
        assert_eq!(spawn_shape(PieceKind::T), t);
        let i = Shape::from_rows(&[[1u8, 1, 1, 1]]).unwrap();
        assert_eq!(spawn_shape(PieceKind::I), i);
    }

    #[test]
    fn test_orientations_of_kind() {
        for kind in PieceKind::ALL {
            let mut shape = spawn_shape(kind);
            for _ in 0..4 {
                assert!(is_orientation_of(shape, kind), "{:?}", kind);
                shape = shape.rotate_cw();
            }
        }
        let dot = Shape::from_rows(&[[1u8]]).unwrap();
        assert!(!is_orientation_of(dot, PieceKind::T));
        assert!(!is_orientation_of(spawn_shape(PieceKind::S), PieceKind::Z));
        assert!(!is_orientation_of(spawn_shape(PieceKind::J), PieceKind::L));
    }

    #[test]
    fn test_rotate_j() {
        let j = spawn_shape(PieceKind::J).rotate_cw();
        assert_eq!(j.to_rows(), vec![vec![1, 1], vec![1, 0], vec![1, 0]]);
    }

    #[test]
    fn test_rotation_cycle_order_four() {
        for kind in PieceKind::ALL {
            let shape = spawn_shape(kind);
            let back = shape.rotate_cw().rotate_cw().rotate_cw().rotate_cw();
            assert_eq!(back, shape, "{:?}", kind);
        }
    }

    #[test]
    fn test_shape_errors() {
        let empty: [[u8; 0]; 0] = [];
        assert_eq!(Shape::from_rows(&empty), Err(ShapeError::Empty));
        assert_eq!(
            Shape::from_rows(&[[1u8, 1, 1, 1, 1]]),
            Err(ShapeError::TooLarge {
                width: 5,
                height: 1
            })
        );
        assert_eq!(Shape::from_rows(&[[0u8, 2]]), Err(ShapeError::InvalidCell(2)));
        assert_eq!(Shape::from_rows(&[[0u8, 0]]), Err(ShapeError::NoFilledCells));
    }

    #[test]
    fn test_piece_spawn_and_cells() {
        let piece = Piece::spawn(PieceKind::O, BoardSize::STANDARD);
        assert_eq!((piece.x, piece.y), (3, 0));
        assert_eq!(piece.color, PieceKind::O.color());
        let cells: Vec<_> = piece.cells().collect();
        assert_eq!(cells, vec![(3, 0), (4, 0), (3, 1), (4, 1)]);
    }

    #[test]
    fn test_at_spawn_keeps_orientation() {
        let size = BoardSize::STANDARD;
        let piece = Piece::spawn(PieceKind::L, size).rotated().moved(2, 7);
        let reset = piece.at_spawn(size);
        assert_eq!((reset.x, reset.y), (3, 0));
        assert_eq!(reset.shape, piece.shape);
    }
}
