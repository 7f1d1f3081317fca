pub mod library;
pub mod overview;
pub mod study;

use ratatui::style::Color;

use crate::models::Card;

/// Five-cell bar for an accuracy percentage.
pub fn accuracy_bar(percent: f64) -> String {
    let filled = ((percent / 20.0).round() as usize).min(5);
    format!("{}{}", "█".repeat(filled), "░".repeat(5 - filled))
}

/// Total answers recorded for a card, widened before adding.
pub fn card_attempts(card: &Card) -> u64 {
    card.success_count as u64 + card.failure_count as u64
}

pub fn accuracy_color(percent: f64, attempts: u64) -> Color {
    if attempts == 0 {
        Color::DarkGray
    } else if percent >= 70.0 {
        Color::Green
    } else if percent >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
