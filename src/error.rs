use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("card {0} not found")]
    NotFound(i64),

    #[error("a card with question '{question}' already exists in {topic} / {subtopic}")]
    DuplicateKey {
        topic: String,
        subtopic: String,
        question: String,
    },

    #[error("no cards match the current filter")]
    EmptySelection,

    #[error("card store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unknown topic '{0}' (expected one of: {})", crate::models::Topic::names())]
    UnknownTopic(String),

    #[error("unknown filter '{0}'. Use: all, wrong, right, or bookmarked")]
    InvalidFilter(String),

    #[error("legacy import failed: {0}")]
    LegacyImport(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// Busy and locked databases are the only transient failures; everything else
// stays a plain SQLite error.
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Error::StoreUnavailable(err.to_string())
            }
            _ => Error::Sqlite(err),
        }
    }
}

impl Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

/// Runs `op`, retrying exactly once if the store reported itself unavailable.
pub fn retry_once<T, F>(mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    match op() {
        Err(e) if e.is_transient() => {
            log::warn!("store unavailable, retrying once: {}", e);
            op()
        }
        other => other,
    }
}
