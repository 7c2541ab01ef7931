//! JSON file persistence
//!
//! [`FileStore`] keeps two documents in a data directory:
//!
//! - `highscore.json`: `{"highscore": n}`
//! - `savegame.json`: locked cells, current/next/hold pieces and the score
//!
//! One store is shared by every session. All file access goes through a single
//! mutex, and writes land in a temporary file that is synced and renamed over
//! the target, so a reader sees either the old document or the new one.

mod records;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use tetris_stream_core::{LoadStateError, Persistence, SavedGame, StoreError};

use records::{HighScoreRecord, SaveGameRecord};

pub const HIGH_SCORE_FILE: &str = "highscore.json";
pub const SAVE_GAME_FILE: &str = "savegame.json";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    io_lock: Mutex<()>,
}

impl FileStore {
    /// Store rooted at `dir`; nothing is touched until the first call
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            io_lock: Mutex::new(()),
        }
    }

    /// Like [`FileStore::new`], creating `dir` if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).map_err(|source| StoreError::Io {
            resource: store.dir.display().to_string(),
            source,
        })?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn high_score_path(&self) -> PathBuf {
        self.dir.join(HIGH_SCORE_FILE)
    }

    pub fn save_game_path(&self) -> PathBuf {
        self.dir.join(SAVE_GAME_FILE)
    }

    /// Raw file contents, `None` when the file does not exist
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                resource: name.to_owned(),
                source,
            }),
        }
    }

    fn read_high_score(&self) -> Result<Option<u32>, StoreError> {
        let Some(bytes) = self.read(HIGH_SCORE_FILE)? else {
            return Ok(None);
        };
        let record: HighScoreRecord =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                resource: HIGH_SCORE_FILE.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Some(record.highscore))
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            resource: name.to_owned(),
            source,
        };
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp, &target).map_err(io_err)?;
        Ok(())
    }
}

impl Persistence for FileStore {
    fn load_high_score(&self) -> u32 {
        let _guard = self.io_lock.lock();
        match self.read_high_score() {
            Ok(score) => score.unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "high score unreadable, using 0");
                0
            }
        }
    }

    fn save_high_score(&self, score: u32) -> Result<bool, StoreError> {
        let _guard = self.io_lock.lock();
        let stored = self.read_high_score().map_err(|e| {
            error!(error = %e, score = score, "cannot update high score");
            e
        })?;
        if matches!(stored, Some(current) if score <= current) {
            return Ok(false);
        }

        let bytes = serde_json::to_vec(&HighScoreRecord { highscore: score }).map_err(|e| {
            StoreError::Encode {
                resource: HIGH_SCORE_FILE.to_owned(),
                reason: e.to_string(),
            }
        })?;
        self.write_atomic(HIGH_SCORE_FILE, &bytes)?;
        debug!(score = score, previous = ?stored, "high score written");
        Ok(true)
    }

    fn save_game(&self, game: &SavedGame) -> Result<(), StoreError> {
        let encode_err = |reason: String| StoreError::Encode {
            resource: SAVE_GAME_FILE.to_owned(),
            reason,
        };
        let record = SaveGameRecord::encode(game).map_err(encode_err)?;
        let bytes = serde_json::to_vec(&record).map_err(|e| encode_err(e.to_string()))?;

        let _guard = self.io_lock.lock();
        self.write_atomic(SAVE_GAME_FILE, &bytes)
    }

    fn load_game(&self) -> Result<Option<SavedGame>, LoadStateError> {
        let bytes = {
            let _guard = self.io_lock.lock();
            match self.read(SAVE_GAME_FILE) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return Ok(None),
                Err(e) => {
                    warn!(error = %e, "saved game unreadable");
                    return Ok(None);
                }
            }
        };

        let record: SaveGameRecord = serde_json::from_slice(&bytes)
            .map_err(|e| LoadStateError::Malformed(e.to_string()))?;
        record.decode().map(Some)
    }
}
