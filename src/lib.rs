//! Tetris stream (workspace facade crate).
//!
//! Re-exports the workspace crates as `tetris_stream::{core,adapter,store,types}`
//! so the binary, integration tests and benches share one import path.

pub use tetris_stream_adapter as adapter;
pub use tetris_stream_core as core;
pub use tetris_stream_store as store;
pub use tetris_stream_types as types;
