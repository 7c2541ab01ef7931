//! Scoring module - line-clear points, levels and gravity speed
//!
//! Every cleared row is worth a flat [`POINTS_PER_LINE`], with no bonus for
//! clearing several rows at once. The level is derived from the score alone
//! and only affects gravity.

use crate::types::{
    BASE_DROP_MS, DROP_INTERVAL_MIN_MS, DROP_STEP_MS, POINTS_PER_LEVEL, POINTS_PER_LINE,
};

/// Calculate line clear score
/// lines: number of rows cleared by one lock
pub fn calculate_line_score(lines: usize) -> u32 {
    (lines as u32).saturating_mul(POINTS_PER_LINE)
}

/// Level management
/// Level increases every 1000 points
pub fn calculate_level(score: u32) -> u32 {
    score / POINTS_PER_LEVEL
}

/// Get drop interval for a level (in milliseconds)
/// 400ms at level 0, 50ms faster per level, never below 100ms
pub fn get_drop_interval_ms(level: u32) -> u32 {
    BASE_DROP_MS
        .saturating_sub(level.saturating_mul(DROP_STEP_MS))
        .max(DROP_INTERVAL_MIN_MS)
}
