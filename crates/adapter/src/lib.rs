//! Adapter - streams a game to a remote renderer over TCP
//!
//! Every accepted connection gets its own game. The server pushes the full
//! render state once per tick and takes commands from the same connection.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7777)
//! 2. **Welcome**: Server sends `welcome` with the board size and tick length
//! 3. **Streaming**: Server sends a `snapshot` every tick (16ms by default)
//! 4. **Commanding**: Client sends `command` lines at any time
//! 5. **Game over**: Server sends a final `snapshot`, then `gameOver`, then closes
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **command**: `moveLeft`, `moveRight`, `softDrop`, `rotate`, `hardDrop`,
//!   `hold`, `pause`, `resume`, `save`, `load` or `quit` (case-insensitive)
//!
//! ## Server → Client
//!
//! - **welcome**: protocol version, session id, board size, tick length
//! - **snapshot**: grid, current/ghost/next/hold pieces, score, level, high score
//! - **error**: `invalid_message`, `load_rejected` or `storage_failure`
//! - **gameOver**: final score and high score
//!
//! # Environment Variables
//!
//! See [`config::ServerConfig::from_env`]: `TETRIS_HOST`, `TETRIS_PORT`,
//! `TETRIS_TICK_MS`, `TETRIS_BOARD_WIDTH`, `TETRIS_BOARD_HEIGHT`,
//! `TETRIS_DATA_DIR` and `LOG_LEVEL`.
//!
//! # Example Protocol Flow
//!
//! ```text
//! Server -> Client: {"type":"welcome","seq":1,"ts":1234567890,"protocol_version":"1.0.0","session_id":1,"board":{"width":10,"height":20},"tick_ms":16}
//! Server -> Client: {"type":"snapshot","seq":2,"ts":1234567891,"state":"running","grid":[[null,...],...],"currentPiece":{...},...}
//! Client -> Server: {"type":"command","seq":1,"command":"rotate"}
//! Client -> Server: {"type":"command","seq":2,"command":"hardDrop"}
//! ```
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 7777
//! {"type":"command","command":"hardDrop"}
//! ```

pub mod config;
pub mod protocol;
pub mod server;
pub mod session;

pub use tetris_stream_core as core;
pub use tetris_stream_types as types;

pub use config::{ConfigError, ServerConfig, PROTOCOL_VERSION};
pub use protocol::*;
pub use server::run_server;
pub use session::{run_session, SessionContext, SessionEnd};
