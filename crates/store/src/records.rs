//! On-disk JSON records
//!
//! Field names are snake_case and colours are stored as hex strings, so the
//! files stay readable and can be edited by hand.

use serde::{Deserialize, Serialize};

use tetris_stream_core::pieces::is_orientation_of;
use tetris_stream_core::{LoadStateError, LockedPositions, Piece, SavedGame, Shape};
use tetris_stream_types::{color_from_hex, color_hex, ColorId, PieceKind};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct HighScoreRecord {
    #[serde(default)]
    pub highscore: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LockedCellRecord {
    pub x: i16,
    pub y: i16,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PieceRecord {
    pub kind: String,
    pub x: i16,
    pub y: i16,
    /// Rows of 0/1, top to bottom.
    pub shape: Vec<Vec<u8>>,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SaveGameRecord {
    pub locked_positions: Vec<LockedCellRecord>,
    pub current_piece: PieceRecord,
    pub next_piece: PieceRecord,
    #[serde(default)]
    pub hold_piece: Option<PieceRecord>,
    pub score: u32,
}

fn hex(color: ColorId) -> Result<String, String> {
    color_hex(color)
        .map(str::to_owned)
        .ok_or_else(|| format!("unknown colour id {color}"))
}

fn parse_color(value: &str) -> Result<ColorId, LoadStateError> {
    color_from_hex(value)
        .ok_or_else(|| LoadStateError::Malformed(format!("unknown colour {value:?}")))
}

impl PieceRecord {
    fn encode(piece: &Piece) -> Result<Self, String> {
        Ok(Self {
            kind: piece.kind.as_str().to_ascii_uppercase(),
            x: piece.x,
            y: piece.y,
            shape: piece.shape.to_rows(),
            color: hex(piece.color)?,
        })
    }

    fn decode(self, name: &'static str) -> Result<Piece, LoadStateError> {
        let kind = PieceKind::from_str(&self.kind)
            .ok_or_else(|| LoadStateError::UnknownKind(self.kind.clone()))?;
        let shape = Shape::from_rows(&self.shape)
            .map_err(|source| LoadStateError::Shape { piece: name, source })?;
        if !is_orientation_of(shape, kind) {
            return Err(LoadStateError::ShapeMismatch { piece: name, kind });
        }
        Ok(Piece {
            kind,
            x: self.x,
            y: self.y,
            shape,
            color: parse_color(&self.color)?,
        })
    }
}

impl SaveGameRecord {
    pub fn encode(game: &SavedGame) -> Result<Self, String> {
        let locked_positions = game
            .locked
            .iter()
            .map(|(x, y, color)| {
                Ok(LockedCellRecord {
                    x,
                    y,
                    color: hex(color)?,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Self {
            locked_positions,
            current_piece: PieceRecord::encode(&game.current)?,
            next_piece: PieceRecord::encode(&game.next)?,
            hold_piece: game.hold.as_ref().map(PieceRecord::encode).transpose()?,
            score: game.score,
        })
    }

    /// Structural decode; board-level checks happen when the game is restored
    pub fn decode(self) -> Result<SavedGame, LoadStateError> {
        let mut locked = LockedPositions::new();
        for cell in &self.locked_positions {
            locked.insert(cell.x, cell.y, parse_color(&cell.color)?);
        }

        Ok(SavedGame {
            locked,
            current: self.current_piece.decode("current")?,
            next: self.next_piece.decode("next")?,
            hold: self.hold_piece.map(|p| p.decode("hold")).transpose()?,
            score: self.score,
        })
    }
}
