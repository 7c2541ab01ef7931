//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the server.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (simulation, persistence, wire protocol).
//!
//! # Board Dimensions
//!
//! The default playfield is 10 columns by 20 rows. Other sizes are allowed
//! through [`BoardSize::new`]:
//!
//! - **Width**: columns indexed `0..width` (left to right)
//! - **Height**: rows indexed `0..height` (top to bottom)
//! - **Spawn position**: `(width / 2 - 2, 0)`
//!
//! # Game Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Default server tick interval (~60 FPS) |
//! | `BASE_DROP_MS` | 400 | Gravity interval at level 0 |
//! | `DROP_STEP_MS` | 50 | Interval reduction per level |
//! | `DROP_INTERVAL_MIN_MS` | 100 | Gravity floor |
//!
//! # Drop Intervals by Level
//!
//! | Level | Interval |
//! |-------|----------|
//! | 0 | 400ms |
//! | 1 | 350ms |
//! | 2 | 300ms |
//! | 3 | 250ms |
//! | 4 | 200ms |
//! | 5 | 150ms |
//! | 6+ | 100ms |
//!
//! # Examples
//!
//! ```
//! use tetris_stream_types::{BoardSize, Command, GameAction, PieceKind};
//!
//! let size = BoardSize::default();
//! assert_eq!((size.width, size.height), (10, 20));
//! assert_eq!(size.spawn_x(), 3);
//!
//! assert_eq!(PieceKind::from_str("t"), Some(PieceKind::T));
//! assert_eq!(PieceKind::T.color(), 5);
//!
//! let command = Command::from_str("hardDrop").unwrap();
//! assert_eq!(command.as_action(), Some(GameAction::HardDrop));
//! ```

/// Default board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Default board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Smallest accepted board width (a 4-wide piece must fit at the spawn column)
pub const MIN_BOARD_WIDTH: u8 = 4;

/// Smallest accepted board height
pub const MIN_BOARD_HEIGHT: u8 = 2;

/// Largest accepted board dimension
pub const MAX_BOARD_DIM: u8 = 64;

/// Default server tick interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Gravity interval at level 0 (0.4s per row)
pub const BASE_DROP_MS: u32 = 400;

/// Gravity speed-up per level
pub const DROP_STEP_MS: u32 = 50;

/// Absolute minimum drop interval (0.1s)
pub const DROP_INTERVAL_MIN_MS: u32 = 100;

/// Points awarded per cleared row
pub const POINTS_PER_LINE: u32 = 150;

/// Score needed to advance one level
pub const POINTS_PER_LEVEL: u32 = 1000;

/// A locked cell above this row ends the game
pub const GAME_OVER_ROW: i16 = 1;

/// Playfield dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardSize {
    pub width: u8,
    pub height: u8,
}

impl BoardSize {
    /// The standard 10x20 playfield
    pub const STANDARD: BoardSize = BoardSize {
        width: BOARD_WIDTH,
        height: BOARD_HEIGHT,
    };

    /// Create a board size, rejecting dimensions the simulation cannot use
    ///
    /// ```
    /// use tetris_stream_types::BoardSize;
    ///
    /// assert!(BoardSize::new(10, 4).is_some());
    /// assert!(BoardSize::new(3, 20).is_none());
    /// assert!(BoardSize::new(10, 200).is_none());
    /// ```
    pub fn new(width: u8, height: u8) -> Option<Self> {
        let width_ok = (MIN_BOARD_WIDTH..=MAX_BOARD_DIM).contains(&width);
        let height_ok = (MIN_BOARD_HEIGHT..=MAX_BOARD_DIM).contains(&height);
        (width_ok && height_ok).then_some(Self { width, height })
    }

    /// Spawn column for new pieces
    pub fn spawn_x(&self) -> i16 {
        self.width as i16 / 2 - 2
    }

    /// Total number of cells on the board
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether (x, y) lies on the visible board
    pub fn contains(&self, x: i16, y: i16) -> bool {
        x >= 0 && y >= 0 && x < self.width as i16 && y < self.height as i16
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Colour index into the piece palette
pub type ColorId = u8;

/// Number of distinct piece colours
pub const COLOR_COUNT: u8 = 7;

/// Piece colours as hex strings, indexed by [`ColorId`] in I, J, L, O, S, T, Z order
const PALETTE_HEX: [&str; COLOR_COUNT as usize] = [
    "#00F0F0", "#0000F0", "#F0A000", "#F0F000", "#00F000", "#A000F0", "#F00000",
];

/// CSS-style hex string for a colour id, `None` if the id is unknown
///
/// ```
/// use tetris_stream_types::color_hex;
///
/// assert_eq!(color_hex(0), Some("#00F0F0"));
/// assert_eq!(color_hex(7), None);
/// ```
pub fn color_hex(color: ColorId) -> Option<&'static str> {
    PALETTE_HEX.get(color as usize).copied()
}

/// Colour id for a hex string produced by [`color_hex`] (case-insensitive)
pub fn color_from_hex(hex: &str) -> Option<ColorId> {
    PALETTE_HEX
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(hex))
        .map(|index| index as ColorId)
}

/// A cell on the game board
///
/// - `None`: Empty cell
/// - `Some(ColorId)`: Cell filled with a locked block of that colour
pub type Cell = Option<ColorId>;

/// The seven tetromino piece kinds
///
/// Declaration order matches the colour table:
/// - **I**: Cyan, horizontal bar
/// - **J**: Blue, J-shaped
/// - **L**: Orange, L-shaped (mirror of J)
/// - **O**: Yellow, 2x2 square
/// - **S**: Green, S-shaped
/// - **T**: Purple, T-shaped
/// - **Z**: Red, Z-shaped (mirror of S)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl PieceKind {
    /// All kinds in table order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    /// Kind at a table index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Table index of this kind
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Colour assigned to this kind
    pub fn color(&self) -> ColorId {
        *self as ColorId
    }

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tetris_stream_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            "o" => Some(PieceKind::O),
            "s" => Some(PieceKind::S),
            "t" => Some(PieceKind::T),
            "z" => Some(PieceKind::Z),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::J => "j",
            PieceKind::L => "l",
            PieceKind::O => "o",
            PieceKind::S => "s",
            PieceKind::T => "t",
            PieceKind::Z => "z",
        }
    }
}

/// Actions that mutate the simulation directly
///
/// Every action is validated against collision; an action that cannot be
/// applied is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Move piece one cell down
    SoftDrop,
    /// Rotate piece 90° clockwise
    Rotate,
    /// Drop piece to its resting row and lock it
    HardDrop,
    /// Store or swap the current piece (once per piece)
    Hold,
    /// Suspend the simulation
    Pause,
    /// Continue a paused simulation
    Resume,
}

/// Commands accepted from the external input stream
///
/// A superset of [`GameAction`]: `Save`, `Load` and `Quit` are handled by the
/// engine around the simulation rather than by the simulation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    HardDrop,
    Hold,
    Pause,
    Resume,
    Save,
    Load,
    Quit,
}

impl Command {
    /// Parse command from its wire name (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tetris_stream_types::Command;
    ///
    /// assert_eq!(Command::from_str("moveLeft"), Some(Command::MoveLeft));
    /// assert_eq!(Command::from_str("HARDDROP"), Some(Command::HardDrop));
    /// assert_eq!(Command::from_str("rotateCcw"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(Command::MoveLeft),
            "moveright" => Some(Command::MoveRight),
            "softdrop" => Some(Command::SoftDrop),
            "rotate" => Some(Command::Rotate),
            "harddrop" => Some(Command::HardDrop),
            "hold" => Some(Command::Hold),
            "pause" => Some(Command::Pause),
            "resume" => Some(Command::Resume),
            "save" => Some(Command::Save),
            "load" => Some(Command::Load),
            "quit" => Some(Command::Quit),
            _ => None,
        }
    }

    /// Convert to camelCase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::MoveLeft => "moveLeft",
            Command::MoveRight => "moveRight",
            Command::SoftDrop => "softDrop",
            Command::Rotate => "rotate",
            Command::HardDrop => "hardDrop",
            Command::Hold => "hold",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Save => "save",
            Command::Load => "load",
            Command::Quit => "quit",
        }
    }

    /// The simulation action this command maps to, if any
    pub fn as_action(&self) -> Option<GameAction> {
        match self {
            Command::MoveLeft => Some(GameAction::MoveLeft),
            Command::MoveRight => Some(GameAction::MoveRight),
            Command::SoftDrop => Some(GameAction::SoftDrop),
            Command::Rotate => Some(GameAction::Rotate),
            Command::HardDrop => Some(GameAction::HardDrop),
            Command::Hold => Some(GameAction::Hold),
            Command::Pause => Some(GameAction::Pause),
            Command::Resume => Some(GameAction::Resume),
            Command::Save | Command::Load | Command::Quit => None,
        }
    }
}

/// Simulation lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Running,
    Paused,
    GameOver,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Running => "running",
            GameStatus::Paused => "paused",
            GameStatus::GameOver => "gameOver",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults() {
        assert_eq!(BASE_DROP_MS, 400);
        assert_eq!(DROP_STEP_MS, 50);
        assert_eq!(DROP_INTERVAL_MIN_MS, 100);
        assert_eq!(POINTS_PER_LINE, 150);
        assert_eq!(POINTS_PER_LEVEL, 1000);
    }

    #[test]
    fn piece_kind_colors_follow_table_order() {
        for (i, kind) in PieceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(kind.color() as usize, i);
            assert_eq!(PieceKind::from_index(i), Some(*kind));
            assert_eq!(PieceKind::from_str(kind.as_str()), Some(*kind));
        }
        assert_eq!(PieceKind::from_index(7), None);
    }

    #[test]
    fn hex_colors_map_back() {
        for id in 0..COLOR_COUNT {
            let hex = color_hex(id).unwrap();
            assert_eq!(color_from_hex(hex), Some(id));
            assert_eq!(color_from_hex(&hex.to_ascii_lowercase()), Some(id));
        }
        assert_eq!(color_from_hex("#808080"), None);
    }

    #[test]
    fn command_names_roundtrip() {
        let all = [
            Command::MoveLeft,
            Command::MoveRight,
            Command::SoftDrop,
            Command::Rotate,
            Command::HardDrop,
            Command::Hold,
            Command::Pause,
            Command::Resume,
            Command::Save,
            Command::Load,
            Command::Quit,
        ];
        for command in all {
            assert_eq!(Command::from_str(command.as_str()), Some(command));
        }
        assert_eq!(Command::Save.as_action(), None);
        assert_eq!(Command::Pause.as_action(), Some(GameAction::Pause));
    }

    #[test]
    fn board_size_limits() {
        assert_eq!(BoardSize::new(10, 20), Some(BoardSize::STANDARD));
        assert!(BoardSize::new(MIN_BOARD_WIDTH, MIN_BOARD_HEIGHT).is_some());
        assert!(BoardSize::new(MIN_BOARD_WIDTH - 1, 20).is_none());
        assert!(BoardSize::new(10, MIN_BOARD_HEIGHT - 1).is_none());
        assert!(BoardSize::new(MAX_BOARD_DIM + 1, 20).is_none());

        let size = BoardSize::STANDARD;
        assert!(size.contains(0, 0));
        assert!(size.contains(9, 19));
        assert!(!size.contains(-1, 0));
        assert!(!size.contains(10, 0));
        assert!(!size.contains(0, 20));
        assert_eq!(size.cell_count(), 200);
    }
}
