//! Getting cards in and out of the store: pasted `Question -!- Answer` text,
//! the one-time legacy CSV migration, and CSV export.

use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Card, EditedCard, NewCard, Topic};

pub const BULK_SEPARATOR: &str = "-!-";

const MIGRATED_SUFFIX: &str = "_OLD_MIGRATED";

/// One card per line, question and answer split by `-!-`. Lines without the
/// separator or with an empty question are ignored.
pub fn parse_bulk_text(text: &str, topic: Topic, subtopic: &str) -> Vec<NewCard> {
    text.lines()
        .filter(|line| line.contains(BULK_SEPARATOR))
        .filter_map(|line| {
            let mut parts = line.split(BULK_SEPARATOR);
            let question = parts.next()?.trim();
            let answer = parts.next()?.trim();
            if question.is_empty() {
                return None;
            }
            Some(NewCard::new(topic, subtopic, question, answer))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyImport {
    pub migrated: usize,
    pub skipped: usize,
    pub archived_to: PathBuf,
}

struct LegacyColumns {
    id: Option<usize>,
    topic: usize,
    subtopic: usize,
    question: usize,
    answer: usize,
    success: Option<usize>,
    failure: Option<usize>,
    bookmarked: Option<usize>,
}

// Old exports used `Subject`/`Topic` for what are now topic/subtopic. The
// rename is case-sensitive and happens before everything is lower-cased.
fn normalize_header(header: &str) -> String {
    match header.trim() {
        "Subject" => "topic".to_string(),
        "Topic" => "subtopic".to_string(),
        other => other.to_lowercase(),
    }
}

impl LegacyColumns {
    fn from_headers(headers: &[String]) -> Result<Self> {
        let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| Error::LegacyImport(format!("missing column '{}'", names[0])))
        };

        Ok(Self {
            id: find(&["id"]),
            topic: require(&["topic"])?,
            subtopic: require(&["subtopic"])?,
            question: require(&["question", "key"])?,
            answer: require(&["answer", "value"])?,
            success: find(&["success_count", "success"]),
            failure: find(&["failure_count", "failure"]),
            bookmarked: find(&["bookmarked"]),
        })
    }
}

fn parse_count(value: Option<&str>) -> u32 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u32)
        .unwrap_or(0)
}

fn parse_flag(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "1.0" | "true" | "yes"),
        None => false,
    }
}

/// Reads a legacy CSV into rows ready for the store. Rows with a topic outside
/// the fixed set are counted as skipped. Any ids in the file are dropped so the
/// store assigns fresh ones.
pub fn read_legacy_csv<R: Read>(reader: R) -> Result<(Vec<EditedCard>, usize)> {
    read_rows(reader, false)
}

/// Reads an edited export back in. Rows keep their `id` when the column is
/// present and non-empty.
pub fn read_edited_csv<R: Read>(reader: R) -> Result<(Vec<EditedCard>, usize)> {
    read_rows(reader, true)
}

fn read_rows<R: Read>(reader: R, keep_ids: bool) -> Result<(Vec<EditedCard>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let columns = LegacyColumns::from_headers(&headers)?;

    let mut rows = Vec::new();
    let mut skipped = 0;
    for result in reader.records() {
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        let raw_topic = field(columns.topic);
        let Some(topic) = Topic::from_str(&raw_topic) else {
            log::warn!("skipping legacy row with unknown topic '{}'", raw_topic);
            skipped += 1;
            continue;
        };

        let id = columns
            .id
            .filter(|_| keep_ids)
            .and_then(|i| record.get(i))
            .and_then(|v| v.trim().parse::<i64>().ok());

        rows.push(EditedCard {
            id,
            topic,
            subtopic: field(columns.subtopic),
            question: field(columns.question),
            answer: field(columns.answer),
            success_count: parse_count(columns.success.and_then(|i| record.get(i))),
            failure_count: parse_count(columns.failure.and_then(|i| record.get(i))),
            bookmarked: parse_flag(columns.bookmarked.and_then(|i| record.get(i))),
        });
    }

    Ok((rows, skipped))
}

pub fn archive_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, MIGRATED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, MIGRATED_SUFFIX),
    };
    path.with_file_name(file_name)
}

/// Appends the legacy file's rows to the store, then renames the file so it is
/// never migrated twice. Duplicates are left for the resolver.
pub fn import_legacy_csv(db: &Database, path: &Path) -> Result<LegacyImport> {
    let file = std::fs::File::open(path)?;
    let (rows, skipped) = read_legacy_csv(file)?;
    let migrated = db.append_rows(&rows)?;

    let archived_to = archive_path(path);
    std::fs::rename(path, &archived_to)?;

    log::info!(
        "migrated {} legacy cards from {} ({} skipped), archived to {}",
        migrated,
        path.display(),
        skipped,
        archived_to.display()
    );

    Ok(LegacyImport {
        migrated,
        skipped,
        archived_to,
    })
}

pub fn export_csv<W: Write>(cards: &[Card], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for card in cards {
        wtr.serialize(card)?;
    }
    wtr.flush()?;
    Ok(cards.len())
}
