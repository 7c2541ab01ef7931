//! Engine module - a game session's simulation plus its persistence gateway
//!
//! [`GameState`] is pure; the engine wraps it with the storage side effects the
//! command stream can trigger: `Save` and `Load` go through the gateway, and the
//! high score is written once when the game ends (or when the session is
//! closed early via [`Engine::finish`]).

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::game_state::{GameState, LockEvent};
use crate::persist::{LoadStateError, Persistence, StoreError};
use crate::snapshot::GameSnapshot;
use crate::types::{Command, GameStatus};

/// What the caller should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadStateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Engine {
    state: GameState,
    store: Arc<dyn Persistence>,
    high_score: u32,
    /// High score already flushed for this game.
    finished: bool,
}

impl Engine {
    pub fn new(state: GameState, store: Arc<dyn Persistence>) -> Self {
        let high_score = store.load_high_score();
        Self {
            state,
            store,
            high_score,
            finished: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Best of the stored high score and anything this session recorded
    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply one command from the input stream
    ///
    /// Moves that do not fit are silent no-ops. A rejected load leaves the
    /// game untouched and is returned as [`EngineError::Load`].
    pub fn handle(&mut self, command: Command) -> Result<Flow, EngineError> {
        let flow = match self.play(command) {
            Some(flow) => flow,
            None => {
                match command {
                    Command::Save => self.save()?,
                    _ => self.load()?,
                }
                Flow::Continue
            }
        };
        self.settle()?;
        Ok(flow)
    }

    /// Apply a command without touching the gateway
    ///
    /// Returns `None` for `Save` and `Load`, which need [`Engine::handle`].
    /// A game ended by the command is only recorded by [`Engine::settle`].
    pub fn play(&mut self, command: Command) -> Option<Flow> {
        match command {
            Command::Quit => Some(Flow::Quit),
            Command::Save | Command::Load => None,
            other => {
                if let Some(action) = other.as_action() {
                    if !self.state.apply_action(action) {
                        debug!(command = other.as_str(), "command had no effect");
                    }
                }
                Some(Flow::Continue)
            }
        }
    }

    /// Advance gravity; persists the high score if the game just ended
    pub fn tick(&mut self, elapsed_ms: u32) -> Result<Option<LockEvent>, StoreError> {
        let event = self.step(elapsed_ms);
        self.settle()?;
        Ok(event)
    }

    /// Advance gravity without touching the gateway
    pub fn step(&mut self, elapsed_ms: u32) -> Option<LockEvent> {
        let event = self.state.tick(elapsed_ms);
        if let Some(event) = event {
            debug!(
                lines = event.lines_cleared,
                points = event.points,
                score = self.state.score(),
                "piece locked"
            );
        }
        event
    }

    /// The game is over and its high score has not been written yet
    pub fn settle_pending(&self) -> bool {
        self.state.game_over() && !self.finished
    }

    /// Record the high score once the game is over
    pub fn settle(&mut self) -> Result<(), StoreError> {
        if self.settle_pending() {
            info!(score = self.state.score(), "game over");
            self.record_high_score()?;
        }
        Ok(())
    }

    /// Flush the high score for a session ending before game over
    pub fn finish(&mut self) -> Result<(), StoreError> {
        if self.finished {
            return Ok(());
        }
        if self.state.score() == 0 {
            self.finished = true;
            return Ok(());
        }
        self.record_high_score()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.state.snapshot(self.high_score)
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        self.state.snapshot_into(self.high_score, out);
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if self.state.game_over() {
            debug!("save ignored after game over");
            return Ok(());
        }
        self.store.save_game(&self.state.to_saved())?;
        info!(score = self.state.score(), "game saved");
        Ok(())
    }

    fn load(&mut self) -> Result<(), LoadStateError> {
        if self.state.status() != GameStatus::Running {
            debug!(status = self.state.status().as_str(), "load ignored");
            return Ok(());
        }
        match self.store.load_game() {
            Ok(Some(saved)) => {
                self.state.restore(saved)?;
                info!(score = self.state.score(), "game loaded");
                Ok(())
            }
            Ok(None) => {
                debug!("no saved game to load");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "rejected saved game");
                Err(e)
            }
        }
    }

    fn record_high_score(&mut self) -> Result<(), StoreError> {
        self.finished = true;
        let score = self.state.score();
        if self.store.save_high_score(score)? {
            info!(score = score, "high score recorded");
        }
        self.high_score = self.high_score.max(score);
        Ok(())
    }
}
