//! Persistence contract - high score and save-state storage
//!
//! The simulation never touches files directly. An [`crate::Engine`] is handed a
//! [`Persistence`] implementation and calls through it on save/load commands
//! and when a game ends. [`MemoryStore`] is the in-process implementation used
//! by tests; the JSON file store lives in its own crate.

use parking_lot::Mutex;
use thiserror::Error;

use crate::grid::LockedPositions;
use crate::pieces::{is_orientation_of, Piece, ShapeError, MAX_SHAPE_DIM};
use crate::types::{BoardSize, PieceKind, COLOR_COUNT};

/// Everything needed to resume a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedGame {
    pub locked: LockedPositions,
    pub current: Piece,
    pub next: Piece,
    pub hold: Option<Piece>,
    pub score: u32,
}

/// A save state that cannot be loaded; live state is left untouched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadStateError {
    #[error("malformed save state: {0}")]
    Malformed(String),
    #[error("unknown piece kind {0:?}")]
    UnknownKind(String),
    #[error("invalid {piece} shape: {source}")]
    Shape {
        piece: &'static str,
        #[source]
        source: ShapeError,
    },
    #[error("unknown colour id {0}")]
    UnknownColor(u8),
    #[error("{piece} piece is {kind:?} but has colour {color}")]
    ColorMismatch {
        piece: &'static str,
        kind: PieceKind,
        color: u8,
    },
    #[error("locked cell ({x}, {y}) is outside the board")]
    LockedOutOfBounds { x: i16, y: i16 },
    #[error("{piece} piece at ({x}, {y}) is outside the board")]
    PieceOutOfBounds { piece: &'static str, x: i16, y: i16 },
    #[error("{piece} piece shape does not match kind {kind:?}")]
    ShapeMismatch { piece: &'static str, kind: PieceKind },
}

impl SavedGame {
    /// Check the state is consistent for a board of `size`
    ///
    /// Locked cells must lie on the board. Every piece needs an anchor near the
    /// board, a shape that is an orientation of its kind, a colour matching
    /// its kind, and cells within the side walls and above the floor.
    /// Occupancy is not checked.
    pub fn validate(&self, size: BoardSize) -> Result<(), LoadStateError> {
        for (x, y, color) in self.locked.iter() {
            if color >= COLOR_COUNT {
                return Err(LoadStateError::UnknownColor(color));
            }
            if !size.contains(x, y) {
                return Err(LoadStateError::LockedOutOfBounds { x, y });
            }
        }

        let pieces = [
            ("current", Some(&self.current)),
            ("next", Some(&self.next)),
            ("hold", self.hold.as_ref()),
        ];
        for (name, piece) in pieces {
            if let Some(piece) = piece {
                validate_piece(name, piece, size)?;
            }
        }

        Ok(())
    }
}

fn validate_piece(
    name: &'static str,
    piece: &Piece,
    size: BoardSize,
) -> Result<(), LoadStateError> {
    let width = size.width as i16;
    let height = size.height as i16;
    let reach = MAX_SHAPE_DIM as i16;

    // Anchor first: cell offsets are added to it.
    let out_of_bounds = LoadStateError::PieceOutOfBounds {
        piece: name,
        x: piece.x,
        y: piece.y,
    };
    if !(-reach..=width).contains(&piece.x) || !(-reach..=height).contains(&piece.y) {
        return Err(out_of_bounds);
    }

    if !is_orientation_of(piece.shape, piece.kind) {
        return Err(LoadStateError::ShapeMismatch {
            piece: name,
            kind: piece.kind,
        });
    }
    if piece.color >= COLOR_COUNT {
        return Err(LoadStateError::UnknownColor(piece.color));
    }
    if piece.color != piece.kind.color() {
        return Err(LoadStateError::ColorMismatch {
            piece: name,
            kind: piece.kind,
            color: piece.color,
        });
    }
    if piece
        .cells()
        .any(|(x, y)| x < 0 || x >= width || y >= height)
    {
        return Err(out_of_bounds);
    }
    Ok(())
}

/// Storage faults surfaced to the operator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt resource {resource}: {reason}")]
    Corrupt { resource: String, reason: String },
    #[error("failed to encode {resource}: {reason}")]
    Encode { resource: String, reason: String },
}

/// High-score and save-state gateway shared by all sessions
///
/// Implementations must serialize access so that concurrent read-modify-write
/// of the high score never loses an update, and readers never observe a
/// partial write.
pub trait Persistence: Send + Sync {
    /// Stored high score; 0 when absent or unreadable
    fn load_high_score(&self) -> u32;

    /// Store `score` if it beats the stored value (or none is stored yet).
    /// Returns whether a write happened.
    fn save_high_score(&self, score: u32) -> Result<bool, StoreError>;

    /// Overwrite the saved game
    fn save_game(&self, game: &SavedGame) -> Result<(), StoreError>;

    /// Saved game, `Ok(None)` when none exists or it cannot be read
    fn load_game(&self) -> Result<Option<SavedGame>, LoadStateError>;
}

/// In-memory [`Persistence`] for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    high_score: Mutex<Option<u32>>,
    saved: Mutex<Option<SavedGame>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with a high score
    pub fn with_high_score(score: u32) -> Self {
        Self {
            high_score: Mutex::new(Some(score)),
            saved: Mutex::new(None),
        }
    }

    /// Replace the saved game directly
    pub fn put_saved(&self, game: Option<SavedGame>) {
        *self.saved.lock() = game;
    }

    pub fn saved(&self) -> Option<SavedGame> {
        self.saved.lock().clone()
    }
}

impl Persistence for MemoryStore {
    fn load_high_score(&self) -> u32 {
        self.high_score.lock().unwrap_or(0)
    }

    fn save_high_score(&self, score: u32) -> Result<bool, StoreError> {
        let mut stored = self.high_score.lock();
        match *stored {
            Some(current) if score <= current => Ok(false),
            _ => {
                *stored = Some(score);
                Ok(true)
            }
        }
    }

    fn save_game(&self, game: &SavedGame) -> Result<(), StoreError> {
        *self.saved.lock() = Some(game.clone());
        Ok(())
    }

    fn load_game(&self) -> Result<Option<SavedGame>, LoadStateError> {
        Ok(self.saved.lock().clone())
    }
}
