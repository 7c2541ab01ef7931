//! Core game logic - pure simulation plus the persistence contract
//!
//! This crate contains all the game rules, state management, and simulation
//! logic. It has no dependencies on networking or files, making it:
//!
//! - **Deterministic**: the same seed produces the same piece sequence
//! - **Testable**: every rule is exercised without a socket or a disk
//! - **Portable**: one [`Engine`] per session, no process-wide state
//!
//! # Module Structure
//!
//! - [`grid`]: locked positions, the derived cell matrix and row clearing
//! - [`pieces`]: tetromino shapes and the clockwise rotation transform
//! - [`collision`]: placement validity, ghost projection, hard drop, rotate-or-revert
//! - [`rng`]: uniform random piece generation
//! - [`scoring`]: line points, levels and gravity speed
//! - [`game_state`]: the Running/Paused/GameOver state machine
//! - [`snapshot`]: owned state copies for transmission
//! - [`persist`]: the high-score/save-state gateway and an in-memory store
//! - [`engine`]: a [`GameState`] wired to a gateway
//!
//! # Game Rules
//!
//! - **Uniform randomizer**: every kind is equally likely on every draw
//! - **Raw rotation**: 90° clockwise matrix transform, no wall kicks; a rotation
//!   that does not fit is reverted
//! - **No lock delay**: a piece locks on the first gravity step it cannot take
//! - **Hard drop**: drops and locks immediately
//! - **Hold**: store one piece for later use (once per piece)
//! - **Scoring**: 150 points per cleared row; level = score / 1000
//! - **Game over**: a lock leaves a cell above row 1
//!
//! # Example
//!
//! ```
//! use tetris_stream_core::GameState;
//! use tetris_stream_core::types::{BoardSize, GameAction};
//!
//! let mut game = GameState::new(BoardSize::STANDARD, 12345);
//!
//! game.apply_action(GameAction::MoveRight);
//! game.apply_action(GameAction::Rotate);
//! game.apply_action(GameAction::HardDrop);
//!
//! assert_eq!(game.locked().len(), 4);
//! assert_eq!(game.score(), 0);
//! ```
//!
//! # Timing
//!
//! Call [`GameState::tick`] with the elapsed milliseconds. Gravity fires when
//! the accumulated time reaches the level's drop interval (400ms at level 0,
//! 50ms faster per level, never below 100ms).

pub mod collision;
pub mod engine;
pub mod game_state;
pub mod grid;
pub mod persist;
pub mod pieces;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use tetris_stream_types as types;

// Re-export commonly used types for convenience
pub use collision::{ghost_drop, hard_drop, is_valid, try_rotate};
pub use engine::{Engine, EngineError, Flow};
pub use game_state::{GameState, LockEvent};
pub use grid::{clear_full_rows, Grid, LockedPositions};
pub use persist::{LoadStateError, MemoryStore, Persistence, SavedGame, StoreError};
pub use pieces::{Piece, Shape, ShapeError};
pub use rng::{PieceGenerator, SimpleRng};
pub use scoring::{calculate_level, calculate_line_score, get_drop_interval_ms};
pub use snapshot::{GameSnapshot, PieceSnapshot, PreviewSnapshot};
