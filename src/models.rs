use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// The fixed subject list cards are filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    Physics,
    Chemistry,
    Biology,
    #[serde(rename = "Higher Math")]
    HigherMath,
    #[serde(rename = "General Math")]
    GeneralMath,
    English,
    #[serde(rename = "ICT")]
    Ict,
    #[serde(rename = "BGS")]
    Bgs,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Physics,
        Topic::Chemistry,
        Topic::Biology,
        Topic::HigherMath,
        Topic::GeneralMath,
        Topic::English,
        Topic::Ict,
        Topic::Bgs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Physics => "Physics",
            Topic::Chemistry => "Chemistry",
            Topic::Biology => "Biology",
            Topic::HigherMath => "Higher Math",
            Topic::GeneralMath => "General Math",
            Topic::English => "English",
            Topic::Ict => "ICT",
            Topic::Bgs => "BGS",
        }
    }

    pub fn names() -> String {
        Topic::ALL
            .iter()
            .map(Topic::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();
        match normalized.as_str() {
            "physics" => Some(Topic::Physics),
            "chemistry" => Some(Topic::Chemistry),
            "biology" => Some(Topic::Biology),
            "highermath" => Some(Topic::HigherMath),
            "generalmath" => Some(Topic::GeneralMath),
            "english" => Some(Topic::English),
            "ict" => Some(Topic::Ict),
            "bgs" => Some(Topic::Bgs),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        Self::from_str(s).ok_or_else(|| Error::UnknownTopic(s.to_string()))
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Topic {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Topic {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Topic::from_str(s).ok_or_else(|| FromSqlError::Other(Box::new(Error::UnknownTopic(s.into()))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub topic: Topic,
    pub subtopic: String,
    pub question: String,
    pub answer: String,
    pub success_count: u32,
    pub failure_count: u32,
    pub bookmarked: bool,
}

impl Card {
    pub fn accuracy(&self) -> f64 {
        crate::scoring::compute_accuracy(self)
    }
}

/// A card that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub topic: Topic,
    pub subtopic: String,
    pub question: String,
    pub answer: String,
}

impl NewCard {
    pub fn new(
        topic: Topic,
        subtopic: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            topic,
            subtopic: subtopic.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A full row as edited in a table view. Rows without an id are new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedCard {
    pub id: Option<i64>,
    pub topic: Topic,
    pub subtopic: String,
    pub question: String,
    pub answer: String,
    pub success_count: u32,
    pub failure_count: u32,
    pub bookmarked: bool,
}

impl From<Card> for EditedCard {
    fn from(card: Card) -> Self {
        Self {
            id: Some(card.id),
            topic: card.topic,
            subtopic: card.subtopic,
            question: card.question,
            answer: card.answer,
            success_count: card.success_count,
            failure_count: card.failure_count,
            bookmarked: card.bookmarked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Wrong,
    Right,
    Bookmarked,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::Wrong,
        FilterMode::Right,
        FilterMode::Bookmarked,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Wrong => "Wrong",
            FilterMode::Right => "Right",
            FilterMode::Bookmarked => "Bookmarks",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" | "a" => Some(FilterMode::All),
            "wrong" | "w" | "failed" => Some(FilterMode::Wrong),
            "right" | "r" | "correct" => Some(FilterMode::Right),
            "bookmarked" | "bookmarks" | "b" => Some(FilterMode::Bookmarked),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        Self::from_str(s).ok_or_else(|| Error::InvalidFilter(s.to_string()))
    }

    pub fn next(&self) -> Self {
        match self {
            FilterMode::All => FilterMode::Wrong,
            FilterMode::Wrong => FilterMode::Right,
            FilterMode::Right => FilterMode::Bookmarked,
            FilterMode::Bookmarked => FilterMode::All,
        }
    }

    pub fn matches(&self, card: &Card) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Wrong => card.failure_count > 0,
            FilterMode::Right => card.success_count > 0,
            FilterMode::Bookmarked => card.bookmarked,
        }
    }
}

/// Optional (topic, subtopic) predicate for store queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub topic: Option<Topic>,
    pub subtopic: Option<String>,
}

impl CardFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn topic(topic: Topic) -> Self {
        Self {
            topic: Some(topic),
            subtopic: None,
        }
    }

    pub fn subtopic(topic: Topic, subtopic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic),
            subtopic: Some(subtopic.into()),
        }
    }
}

/// What a single `create` does when its (topic, subtopic, question) key exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Skip,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Reject => "reject",
            DuplicatePolicy::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "id", rename_all = "lowercase")]
pub enum CreateOutcome {
    Added(i64),
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtopicSummary {
    pub topic: Topic,
    pub subtopic: String,
    pub card_count: i64,
    pub bookmarked_count: i64,
    pub total_success: i64,
    pub total_failure: i64,
}

impl SubtopicSummary {
    pub fn accuracy(&self) -> f64 {
        crate::scoring::accuracy_percent(self.total_success as u64, self.total_failure as u64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_cards: i64,
    pub total_subtopics: i64,
    pub total_success: i64,
    pub total_failure: i64,
    pub bookmarked: i64,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
