//! Game state module - the per-session simulation state machine
//!
//! This module ties together the grid, pieces, collision checks, RNG and
//! scoring. It handles gravity timing, piece movement, rotation, hold, line
//! clears and the Running/Paused/GameOver lifecycle. It performs no I/O: saving,
//! loading and high scores are handled by [`crate::Engine`].

use crate::collision::{self, is_valid};
use crate::grid::{clear_full_rows, Grid, LockedPositions};
use crate::persist::{LoadStateError, SavedGame};
use crate::pieces::Piece;
use crate::rng::PieceGenerator;
use crate::scoring::{calculate_level, calculate_line_score, get_drop_interval_ms};
use crate::snapshot::{GameSnapshot, PieceSnapshot, PreviewSnapshot};
use crate::types::*;

/// Event emitted after a piece locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEvent {
    pub lines_cleared: u32,
    pub points: u32,
    pub game_over: bool,
}

/// Complete game state for one session
#[derive(Debug, Clone)]
pub struct GameState {
    size: BoardSize,
    locked: LockedPositions,
    /// Derived from `locked`; rebuilt after every change to it.
    grid: Grid,
    current: Piece,
    next: Piece,
    hold: Option<Piece>,
    hold_used: bool,
    generator: PieceGenerator,
    score: u32,
    fall_timer_ms: u32,
    status: GameStatus,
    /// Last lock event (consumed by observers).
    last_event: Option<LockEvent>,
}

impl GameState {
    /// Create a running game on a board of `size` with the given RNG seed
    pub fn new(size: BoardSize, seed: u32) -> Self {
        let mut generator = PieceGenerator::new(seed);
        let current = generator.spawn(size);
        let next = generator.spawn(size);
        let locked = LockedPositions::new();

        Self {
            size,
            grid: Grid::build(size, &locked),
            locked,
            current,
            next,
            hold: None,
            hold_used: false,
            generator,
            score: 0,
            fall_timer_ms: 0,
            status: GameStatus::Running,
            last_event: None,
        }
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn paused(&self) -> bool {
        self.status == GameStatus::Paused
    }

    pub fn game_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        calculate_level(self.score)
    }

    pub fn hold_used(&self) -> bool {
        self.hold_used
    }

    pub fn current(&self) -> &Piece {
        &self.current
    }

    pub fn next(&self) -> &Piece {
        &self.next
    }

    pub fn hold_piece(&self) -> Option<&Piece> {
        self.hold.as_ref()
    }

    pub fn locked(&self) -> &LockedPositions {
        &self.locked
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn fall_timer_ms(&self) -> u32 {
        self.fall_timer_ms
    }

    pub fn seed(&self) -> u32 {
        self.generator.seed()
    }

    /// Get current drop interval based on level
    pub fn drop_interval_ms(&self) -> u32 {
        get_drop_interval_ms(self.level())
    }

    /// Landing preview of the current piece
    pub fn ghost(&self) -> Piece {
        collision::ghost_drop(&self.current, &self.grid)
    }

    /// Take and clear the last lock event.
    pub fn take_last_event(&mut self) -> Option<LockEvent> {
        self.last_event.take()
    }

    /// Try to move the current piece; an invalid move is reverted
    pub(crate) fn try_move(&mut self, dx: i16, dy: i16) -> bool {
        let moved = self.current.moved(dx, dy);
        if is_valid(&moved, &self.grid) {
            self.current = moved;
            return true;
        }
        false
    }

    /// Try to rotate the current piece clockwise
    pub(crate) fn try_rotate(&mut self) -> bool {
        let (piece, rotated) = collision::try_rotate(&self.current, &self.grid);
        self.current = piece;
        rotated
    }

    /// Drop the current piece to its resting row and lock it
    pub(crate) fn hard_drop(&mut self) -> LockEvent {
        self.current = collision::hard_drop(&self.current, &self.grid);
        self.lock_current()
    }

    /// Store the current piece, or swap it with the held one
    ///
    /// Allowed once per piece: the flag only resets when a piece locks.
    pub fn hold(&mut self) -> bool {
        if self.hold_used {
            return false;
        }

        let outgoing = self.current.at_spawn(self.size);
        match self.hold.take() {
            Some(held) => {
                self.current = held.at_spawn(self.size);
            }
            None => {
                let promoted = self.generator.spawn(self.size);
                self.current = std::mem::replace(&mut self.next, promoted);
            }
        }
        self.hold = Some(outgoing);
        self.hold_used = true;

        true
    }

    /// Lock the current piece onto the board and handle line clears
    fn lock_current(&mut self) -> LockEvent {
        self.locked.merge(&self.current);
        self.grid = Grid::build(self.size, &self.locked);

        let cleared = clear_full_rows(&self.grid, &mut self.locked);
        if cleared > 0 {
            self.grid = Grid::build(self.size, &self.locked);
        }

        let points = calculate_line_score(cleared);
        self.score = self.score.saturating_add(points);

        let promoted = self.generator.spawn(self.size);
        self.current = std::mem::replace(&mut self.next, promoted);
        self.hold_used = false;
        self.fall_timer_ms = 0;

        let game_over = self.locked.reaches_row(GAME_OVER_ROW);
        if game_over {
            self.status = GameStatus::GameOver;
        }

        let event = LockEvent {
            lines_cleared: cleared as u32,
            points,
            game_over,
        };
        self.last_event = Some(event);
        event
    }

    /// Advance gravity by `elapsed_ms`
    ///
    /// Once the accumulated time reaches the drop interval the current piece
    /// moves down one row, or locks if it cannot. The accumulator then resets.
    /// Returns the lock event if a piece locked.
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<LockEvent> {
        if self.status != GameStatus::Running {
            return None;
        }

        self.fall_timer_ms = self.fall_timer_ms.saturating_add(elapsed_ms);
        if self.fall_timer_ms < self.drop_interval_ms() {
            return None;
        }
        self.fall_timer_ms = 0;

        if self.try_move(0, 1) {
            None
        } else {
            Some(self.lock_current())
        }
    }

    /// Apply a game action
    ///
    /// Returns whether the action changed anything. While paused only
    /// `Resume` is accepted; after game over nothing is.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match (self.status, action) {
            (GameStatus::Running, GameAction::Pause) => {
                self.status = GameStatus::Paused;
                true
            }
            (GameStatus::Paused, GameAction::Resume) => {
                self.status = GameStatus::Running;
                true
            }
            (GameStatus::Running, action) => match action {
                GameAction::MoveLeft => self.try_move(-1, 0),
                GameAction::MoveRight => self.try_move(1, 0),
                GameAction::SoftDrop => self.try_move(0, 1),
                GameAction::Rotate => self.try_rotate(),
                GameAction::HardDrop => {
                    self.hard_drop();
                    true
                }
                GameAction::Hold => self.hold(),
                GameAction::Pause | GameAction::Resume => false,
            },
            _ => false,
        }
    }

    /// Capture the state a save file needs
    pub fn to_saved(&self) -> SavedGame {
        SavedGame {
            locked: self.locked.clone(),
            current: self.current,
            next: self.next,
            hold: self.hold,
            score: self.score,
        }
    }

    /// Replace board, pieces and score with a saved game
    ///
    /// All-or-nothing: the saved game is validated first and nothing changes
    /// if it is rejected. The hold becomes available and the fall timer
    /// restarts.
    pub fn restore(&mut self, saved: SavedGame) -> Result<(), LoadStateError> {
        saved.validate(self.size)?;

        self.grid = Grid::build(self.size, &saved.locked);
        self.locked = saved.locked;
        self.current = saved.current;
        self.next = saved.next;
        self.hold = saved.hold;
        self.score = saved.score;
        self.hold_used = false;
        self.fall_timer_ms = 0;
        self.last_event = None;

        Ok(())
    }

    pub fn snapshot_into(&self, high_score: u32, out: &mut GameSnapshot) {
        out.size = self.size;
        out.grid.clear();
        out.grid.extend_from_slice(self.grid.cells());
        out.current = PieceSnapshot::from(&self.current);
        out.ghost = PieceSnapshot::from(&self.ghost());
        out.next = PreviewSnapshot::from(&self.next);
        out.hold = self.hold.as_ref().map(PreviewSnapshot::from);
        out.score = self.score;
        out.level = self.level();
        out.high_score = high_score;
        out.status = self.status;
    }

    pub fn snapshot(&self, high_score: u32) -> GameSnapshot {
        let mut s = GameSnapshot::new(self.size);
        self.snapshot_into(high_score, &mut s);
        s
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(BoardSize::STANDARD, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new(BoardSize::STANDARD, 12345)
    }

    #[test]
    fn test_new_game_state() {
        let state = state();

        assert_eq!(state.status, GameStatus::Running);
        assert_eq!(state.score, 0);
        assert_eq!(state.level(), 0);
        assert!(state.locked.is_empty());
        assert!(state.hold.is_none());
        assert!(!state.hold_used);
        assert_eq!((state.current.x, state.current.y), (3, 0));
        assert_eq!((state.next.x, state.next.y), (3, 0));
    }

    #[test]
    fn test_try_move() {
        let mut state = state();
        let initial_x = state.current.x;

        assert!(state.try_move(1, 0));
        assert_eq!(state.current.x, initial_x + 1);
        assert!(state.try_move(-1, 0));
        assert_eq!(state.current.x, initial_x);
    }

    #[test]
    fn test_try_move_collision() {
        let mut state = state();

        let mut moved = 0;
        for _ in 0..10 {
            if state.try_move(-1, 0) {
                moved += 1;
            }
        }
        // Spawn column is 3; every shape's left edge is at the anchor.
        assert_eq!(moved, 3);
        assert_eq!(state.current.x, 0);
    }

    #[test]
    fn test_gravity_waits_for_interval() {
        let mut state = state();
        assert_eq!(state.tick(399), None);
        assert_eq!(state.current.y, 0);
        assert_eq!(state.fall_timer_ms, 399);

        assert_eq!(state.tick(1), None);
        assert_eq!(state.current.y, 1);
        assert_eq!(state.fall_timer_ms, 0);
    }

    #[test]
    fn test_gravity_locks_on_floor() {
        let mut state = state();
        let rows = 20 - state.current.shape.height() as i16;
        for _ in 0..rows {
            assert_eq!(state.tick(400), None);
        }
        let next = state.next;
        let event = state.tick(400).expect("piece should lock");
        assert_eq!(event.lines_cleared, 0);
        assert!(!event.game_over);
        assert_eq!(state.locked.len(), 4);
        assert_eq!(state.current, next);
        assert_eq!(state.fall_timer_ms, 0);
    }

    #[test]
    fn test_pause_blocks_mutation() {
        let mut state = state();
        assert!(state.apply_action(GameAction::Pause));
        assert!(state.paused());

        let before = state.current;
        assert!(!state.apply_action(GameAction::MoveLeft));
        assert!(!state.apply_action(GameAction::HardDrop));
        assert!(!state.apply_action(GameAction::Hold));
        assert_eq!(state.tick(10_000), None);
        assert_eq!(state.current, before);
        assert_eq!(state.fall_timer_ms, 0);

        assert!(!state.apply_action(GameAction::Pause));
        assert!(state.apply_action(GameAction::Resume));
        assert_eq!(state.status, GameStatus::Running);
        assert!(!state.apply_action(GameAction::Resume));
    }

    #[test]
    fn test_hold_first_use_promotes_next() {
        let mut state = state();
        let current = state.current;
        let next = state.next;

        assert!(state.hold());
        assert_eq!(state.current, next);
        assert_eq!(state.hold.map(|p| p.kind), Some(current.kind));
        assert!(state.hold_used);
    }

    #[test]
    fn test_hold_swap_resets_anchor() {
        let mut state = state();
        let first = state.current;
        assert!(state.hold());
        state.hard_drop();

        assert!(state.try_move(1, 0) || state.try_move(-1, 0));
        assert!(state.hold());
        assert_eq!(state.current.kind, first.kind);
        assert_eq!((state.current.x, state.current.y), (3, 0));
        let held = state.hold.unwrap();
        assert_eq!((held.x, held.y), (3, 0));
    }

    #[test]
    fn test_restore_rejects_without_mutation() {
        let mut state = state();
        let mut saved = state.to_saved();
        saved.score = 900;
        saved.locked.insert(-1, 3, 0);

        let before = state.to_saved();
        assert!(state.restore(saved).is_err());
        assert_eq!(state.to_saved(), before);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut state = state();
        state.hold();
        let snap = state.snapshot(777);

        assert_eq!(snap.grid.len(), 200);
        assert_eq!(snap.current.x, state.current.x);
        assert_eq!(snap.current.shape, state.current.shape);
        assert_eq!(snap.next.color, state.next.color);
        assert!(snap.hold.is_some());
        assert_eq!(snap.high_score, 777);
        assert_eq!(snap.status, GameStatus::Running);
        assert_eq!(snap.ghost.y, state.ghost().y);
    }
}
