//! Study-turn transitions: every learner action either bumps a card counter,
//! moves the cursor, flips the reveal flag, or some combination of those.
//!
//! Store writes happen first; the session only changes once they succeed, so a
//! failed write leaves both the store and the session as they were.

use crate::db::Database;
use crate::error::Result;
use crate::models::Card;
use crate::session::SessionState;

/// `success / (success + failure)` as a percentage, 0 for an unseen card.
pub fn compute_accuracy(card: &Card) -> f64 {
    accuracy_percent(card.success_count as u64, card.failure_count as u64)
}

pub fn accuracy_percent(success: u64, failure: u64) -> f64 {
    let attempts = success + failure;
    if attempts == 0 {
        0.0
    } else {
        (success as f64 / attempts as f64) * 100.0
    }
}

pub fn mark_correct(db: &Database, session: &mut SessionState, card: &Card) -> Result<()> {
    db.update_counters(card.id, 1, 0)?;
    session.advance();
    Ok(())
}

/// Counts a miss and keeps the same card up with its answer showing.
pub fn mark_incorrect(db: &Database, session: &mut SessionState, card: &Card) -> Result<()> {
    db.update_counters(card.id, 0, 1)?;
    session.reveal();
    Ok(())
}

/// Moves past the displayed card without scoring it.
pub fn skip(session: &mut SessionState, card: &Card) {
    log::debug!("skipped card {}", card.id);
    session.advance();
}

pub fn toggle_bookmark(db: &Database, card: &Card) -> Result<bool> {
    db.toggle_bookmark(card.id)
}

pub fn reveal_answer(session: &mut SessionState) {
    session.reveal();
}
