//! Protocol module - JSON message types for the renderer connection
//!
//! Line-delimited JSON: one message per line in each direction. Every message
//! has a `type`; server messages also carry a per-session `seq` and a
//! timestamp `ts` in milliseconds.

use serde::{Deserialize, Serialize};

use tetris_stream_core::{GameSnapshot, PieceSnapshot, PreviewSnapshot};
use tetris_stream_types::{color_hex, BoardSize, Cell, ColorId, Command, GameStatus};

// ============== Client -> Server Messages ==============

/// Command name on the wire, matched case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireCommand(pub Command);

impl Serialize for WireCommand {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for WireCommand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Command::from_str(s.trim())
            .map(WireCommand)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown command {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    #[serde(rename = "command")]
    Command,
}

impl Default for CommandType {
    fn default() -> Self {
        Self::Command
    }
}

/// A single game command from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    pub command: WireCommand,
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotType {
    #[serde(rename = "snapshot")]
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverType {
    #[serde(rename = "gameOver")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardInfo {
    pub width: u8,
    pub height: u8,
}

impl From<BoardSize> for BoardInfo {
    fn from(value: BoardSize) -> Self {
        Self {
            width: value.width,
            height: value.height,
        }
    }
}

/// First message on every connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub session_id: u64,
    pub board: BoardInfo,
    pub tick_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "invalid_message")]
    InvalidMessage,
    #[serde(rename = "load_rejected")]
    LoadRejected,
    #[serde(rename = "storage_failure")]
    StorageFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    /// `seq` of the client message this answers, when it had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_seq: Option<u64>,
    pub code: ErrorCode,
    pub message: String,
}

/// Sent once when the game ends, just before the server closes the connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverMessage {
    #[serde(rename = "type")]
    pub msg_type: GameOverType,
    pub seq: u64,
    pub ts: u64,
    pub score: u32,
    pub high_score: u32,
}

/// Hex colour string; unknown ids fall back to grey
pub type HexColor = &'static str;

const UNKNOWN_COLOR: HexColor = "#808080";

fn hex(color: ColorId) -> HexColor {
    color_hex(color).unwrap_or(UNKNOWN_COLOR)
}

/// Piece on the board: shape rows, anchor and colour
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WirePiece {
    pub x: i16,
    pub y: i16,
    pub shape: Vec<Vec<u8>>,
    pub color: HexColor,
}

impl From<&PieceSnapshot> for WirePiece {
    fn from(value: &PieceSnapshot) -> Self {
        Self {
            x: value.x,
            y: value.y,
            shape: value.shape.to_rows(),
            color: hex(value.color),
        }
    }
}

/// Piece shown outside the board (next / hold)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WirePreview {
    pub shape: Vec<Vec<u8>>,
    pub color: HexColor,
}

impl From<&PreviewSnapshot> for WirePreview {
    fn from(value: &PreviewSnapshot) -> Self {
        Self {
            shape: value.shape.to_rows(),
            color: hex(value.color),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WireStatus {
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "gameOver")]
    GameOver,
}

impl From<GameStatus> for WireStatus {
    fn from(value: GameStatus) -> Self {
        match value {
            GameStatus::Running => Self::Running,
            GameStatus::Paused => Self::Paused,
            GameStatus::GameOver => Self::GameOver,
        }
    }
}

/// Full render state, sent once per tick
///
/// `grid` holds locked cells only, top row first; `null` is an empty cell.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    #[serde(rename = "type")]
    pub msg_type: SnapshotType,
    pub seq: u64,
    pub ts: u64,
    pub state: WireStatus,
    pub grid: Vec<Vec<Option<HexColor>>>,
    pub current_piece: WirePiece,
    pub ghost_piece: WirePiece,
    pub next_piece: WirePreview,
    pub hold_piece: Option<WirePreview>,
    pub score: u32,
    pub level: u32,
    pub high_score: u32,
}

fn wire_row(row: &[Cell]) -> Vec<Option<HexColor>> {
    row.iter().map(|cell| cell.map(hex)).collect()
}

impl SnapshotMessage {
    pub fn from_snapshot(seq: u64, snap: &GameSnapshot) -> Self {
        Self {
            msg_type: SnapshotType::Snapshot,
            seq,
            ts: current_timestamp_ms(),
            state: snap.status.into(),
            grid: snap.rows().map(wire_row).collect(),
            current_piece: WirePiece::from(&snap.current),
            ghost_piece: WirePiece::from(&snap.ghost),
            next_piece: WirePreview::from(&snap.next),
            hold_piece: snap.hold.as_ref().map(WirePreview::from),
            score: snap.score,
            level: snap.level,
            high_score: snap.high_score,
        }
    }
}

// ============== Message Parsing ==============

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Command(CommandMessage),
    /// Well-formed JSON with a `type` this server does not handle
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessage {
    pub msg_type: String,
    pub seq: Option<u64>,
}

/// Parse one line from the client
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    struct Header {
        #[serde(rename = "type")]
        msg_type: Option<String>,
        seq: Option<u64>,
    }

    let header: Header = serde_json::from_str(json)?;
    match header.msg_type.as_deref() {
        Some("command") | None => {
            serde_json::from_str::<CommandMessage>(json).map(ParsedMessage::Command)
        }
        Some(other) => Ok(ParsedMessage::Unknown(UnknownMessage {
            msg_type: other.to_string(),
            seq: header.seq,
        })),
    }
}

/// Best-effort `seq` from a line that failed to parse
pub fn extract_seq(json: &str) -> Option<u64> {
    #[derive(Deserialize)]
    struct SeqOnly {
        seq: Option<u64>,
    }
    serde_json::from_str::<SeqOnly>(json).ok()?.seq
}

// ============== Utility Functions ==============

pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    session_id: u64,
    board: BoardSize,
    tick_ms: u32,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        session_id,
        board: board.into(),
        tick_ms,
    }
}

pub fn create_error(
    seq: u64,
    command_seq: Option<u64>,
    code: ErrorCode,
    message: &str,
) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        command_seq,
        code,
        message: message.to_string(),
    }
}

pub fn create_game_over(seq: u64, score: u32, high_score: u32) -> GameOverMessage {
    GameOverMessage {
        msg_type: GameOverType::GameOver,
        seq,
        ts: current_timestamp_ms(),
        score,
        high_score,
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetris_stream_core::GameState;

    #[test]
    fn test_command_names_fold_case() {
        use std::collections::HashSet;

        let seen: HashSet<WireCommand> = ["hardDrop", "HARDDROP", "harddrop", "hold"]
            .iter()
            .map(|name| serde_json::from_value(serde_json::json!(name)).unwrap())
            .collect();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&WireCommand(Command::HardDrop)));
        assert!(seen.contains(&WireCommand(Command::Hold)));
    }

    #[test]
    fn test_parse_command() {
        let json = r#"{"type":"command","seq":2,"command":"moveLeft"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                assert_eq!(msg.seq, Some(2));
                assert_eq!(msg.command, WireCommand(Command::MoveLeft));
            }
            other => panic!("Expected Command message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_command_case_insensitive_without_type() {
        let json = r#"{"command":"HARDDROP"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                assert_eq!(msg.seq, None);
                assert_eq!(msg.command.0, Command::HardDrop);
            }
            other => panic!("Expected Command message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_type() {
        let json = r#"{"type":"hello","seq":9}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Unknown(m) => {
                assert_eq!(m.msg_type, "hello");
                assert_eq!(m.seq, Some(9));
            }
            other => panic!("Expected Unknown message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_message("not json").is_err());
        assert!(parse_message(r#"{"type":"command","command":"fly"}"#).is_err());
        assert!(parse_message(r#"{"type":"command"}"#).is_err());
        assert_eq!(extract_seq(r#"{"type":"command","seq":4,"command":"fly"}"#), Some(4));
        assert_eq!(extract_seq("garbage"), None);
    }

    #[test]
    fn test_snapshot_message_fields() {
        let game = GameState::new(BoardSize::STANDARD, 7);
        let snap = game.snapshot(900);
        let msg = SnapshotMessage::from_snapshot(3, &snap);
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["seq"], 3);
        assert_eq!(value["state"], "running");
        assert_eq!(value["score"], 0);
        assert_eq!(value["level"], 0);
        assert_eq!(value["highScore"], 900);
        assert!(value["holdPiece"].is_null());

        let grid = value["grid"].as_array().unwrap();
        assert_eq!(grid.len(), 20);
        assert!(grid
            .iter()
            .all(|row| row.as_array().unwrap().len() == 10
                && row.as_array().unwrap().iter().all(|c| c.is_null())));

        let current = &value["currentPiece"];
        assert_eq!(current["x"], i64::from(snap.current.x));
        assert_eq!(current["y"], 0);
        assert_eq!(current["color"], color_hex(snap.current.color).unwrap());
        assert_eq!(
            current["shape"],
            serde_json::to_value(snap.current.shape.to_rows()).unwrap()
        );
        assert!(value["nextPiece"]["shape"].is_array());
        assert!(value["nextPiece"].get("x").is_none());
        assert_eq!(value["ghostPiece"]["x"], current["x"]);
    }

    #[test]
    fn test_error_and_game_over_messages() {
        let err = create_error(5, Some(2), ErrorCode::LoadRejected, "bad save");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "load_rejected");
        assert_eq!(value["command_seq"], 2);

        let err = create_error(6, None, ErrorCode::InvalidMessage, "?");
        let value = serde_json::to_value(&err).unwrap();
        assert!(value.get("command_seq").is_none());

        let over = create_game_over(7, 450, 900);
        let value = serde_json::to_value(&over).unwrap();
        assert_eq!(value["type"], "gameOver");
        assert_eq!(value["score"], 450);
        assert_eq!(value["highScore"], 900);
    }

    #[test]
    fn test_welcome_message() {
        let welcome = create_welcome(1, "1.0.0", 4, BoardSize::STANDARD, 16);
        let value = serde_json::to_value(&welcome).unwrap();
        assert_eq!(value["type"], "welcome");
        assert_eq!(value["board"]["width"], 10);
        assert_eq!(value["board"]["height"], 20);
        assert_eq!(value["tick_ms"], 16);
        assert_eq!(value["session_id"], 4);
    }
}
