//! Server configuration from environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tetris_stream_types::{BoardSize, TICK_MS};

/// Wire protocol version announced in the welcome message
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Simulation step; one snapshot is sent per step
    pub tick_ms: u32,
    pub board: BoardSize,
    /// Directory holding `highscore.json` and `savegame.json`
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            tick_ms: TICK_MS,
            board: BoardSize::STANDARD,
            data_dir: PathBuf::from("."),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get("TETRIS_HOST").unwrap_or(defaults.host);
        let port = parse_or(get("TETRIS_PORT"), "TETRIS_PORT", defaults.port)?;
        let tick_ms: u32 = parse_or(get("TETRIS_TICK_MS"), "TETRIS_TICK_MS", defaults.tick_ms)?;
        if tick_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "TETRIS_TICK_MS",
                value: "0".to_string(),
            });
        }

        let width = parse_or(
            get("TETRIS_BOARD_WIDTH"),
            "TETRIS_BOARD_WIDTH",
            defaults.board.width,
        )?;
        let height = parse_or(
            get("TETRIS_BOARD_HEIGHT"),
            "TETRIS_BOARD_HEIGHT",
            defaults.board.height,
        )?;
        let board = BoardSize::new(width, height).ok_or(ConfigError::BoardSize { width, height })?;

        let data_dir = get("TETRIS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let log_level = get("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            host,
            port,
            tick_ms,
            board,
            data_dir,
            log_level,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.tick_ms))
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for environment variable {key}")]
    Invalid { key: &'static str, value: String },

    #[error("Board size {width}x{height} out of range")]
    BoardSize { width: u8, height: u8 },

    #[error("Invalid server address format: {0}")]
    InvalidAddress(String),
}
