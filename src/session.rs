use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Card, CardFilter, FilterMode, Topic};
use crate::selector::{filter_cards, CardSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    QuestionShown,
    AnswerShown,
}

/// State of one interactive study session. Lives as long as the session and
/// is never persisted; the shell owns it and hands it to each handler.
pub struct SessionState {
    active_topic: Topic,
    active_subtopic: Option<String>,
    filter_mode: FilterMode,
    card_cursor: usize,
    selector: CardSelector,
    answer_revealed: bool,
    shown_card: Option<i64>,
    rng: Box<dyn RngCore>,
}

impl SessionState {
    pub fn new(topic: Topic, filter_mode: FilterMode) -> Self {
        Self::with_rng(topic, filter_mode, StdRng::from_entropy())
    }

    pub fn with_rng(topic: Topic, filter_mode: FilterMode, rng: impl RngCore + 'static) -> Self {
        Self {
            active_topic: topic,
            active_subtopic: None,
            filter_mode,
            card_cursor: 0,
            selector: CardSelector::new(),
            answer_revealed: false,
            shown_card: None,
            rng: Box::new(rng),
        }
    }

    pub fn active_topic(&self) -> Topic {
        self.active_topic
    }

    pub fn active_subtopic(&self) -> Option<&str> {
        self.active_subtopic.as_deref()
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn card_cursor(&self) -> usize {
        self.card_cursor
    }

    pub fn answer_revealed(&self) -> bool {
        self.answer_revealed
    }

    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.selector.order()
    }

    pub fn phase(&self) -> TurnPhase {
        if self.answer_revealed {
            TurnPhase::AnswerShown
        } else {
            TurnPhase::QuestionShown
        }
    }

    /// Switches the study unit and starts it from the top.
    pub fn select_subtopic(&mut self, topic: Topic, subtopic: &str) {
        self.active_topic = topic;
        self.active_subtopic = Some(subtopic.to_string());
        self.card_cursor = 0;
        self.answer_revealed = false;
        self.shown_card = None;
        self.selector.invalidate();
    }

    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        if mode == self.filter_mode {
            return;
        }
        self.filter_mode = mode;
        self.answer_revealed = false;
        self.selector.invalidate();
    }

    pub(crate) fn advance(&mut self) {
        self.card_cursor += 1;
        self.answer_revealed = false;
    }

    pub(crate) fn reveal(&mut self) {
        self.answer_revealed = true;
    }

    /// Cards of the active subtopic that pass the filter, in id order.
    pub fn working_set(&self, db: &Database) -> Result<Vec<Card>> {
        let Some(subtopic) = &self.active_subtopic else {
            return Ok(Vec::new());
        };
        let cards = db.query(&CardFilter::subtopic(self.active_topic, subtopic.clone()))?;
        Ok(filter_cards(cards, self.filter_mode))
    }

    /// The card under the cursor. Fails with `EmptySelection` when nothing
    /// passes the filter; the cursor is left where it was.
    pub fn current_card(&mut self, db: &Database) -> Result<Card> {
        let filtered = self.working_set(db)?;
        let card = self
            .selector
            .select(&filtered, self.card_cursor, &mut *self.rng)?
            .clone();

        if self.shown_card != Some(card.id) {
            self.answer_revealed = false;
            self.shown_card = Some(card.id);
        }
        Ok(card)
    }
}
