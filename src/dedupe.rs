use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::models::Topic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub topic: Topic,
    pub subtopic: String,
    pub question: String,
    pub kept_id: i64,
    pub duplicate_ids: Vec<i64>,
}

/// Lists every (topic, subtopic, question) key held by more than one card.
pub fn find_duplicates(db: &Database) -> Result<Vec<DuplicateGroup>> {
    let mut stmt = db.conn().prepare(
        r#"
        SELECT topic, subtopic, question, MIN(id), GROUP_CONCAT(id)
        FROM cards
        GROUP BY topic, subtopic, question
        HAVING COUNT(*) > 1
        ORDER BY MIN(id)
        "#,
    )?;

    let rows = stmt.query_map([], |row| {
        let kept_id: i64 = row.get(3)?;
        let all_ids: String = row.get(4)?;
        let mut duplicate_ids: Vec<i64> = all_ids
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .filter(|id| *id != kept_id)
            .collect();
        duplicate_ids.sort_unstable();

        Ok(DuplicateGroup {
            topic: row.get(0)?,
            subtopic: row.get(1)?,
            question: row.get(2)?,
            kept_id,
            duplicate_ids,
        })
    })?;
    let groups = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(groups)
}

/// Collapses each duplicate key onto its lowest-id card and returns how many
/// cards were deleted. Running it again right away deletes nothing.
pub fn resolve_duplicates(db: &Database) -> Result<usize> {
    let tx = db.transaction()?;
    let removed = tx.execute(
        r#"
        DELETE FROM cards
        WHERE id NOT IN (
            SELECT MIN(id) FROM cards GROUP BY topic, subtopic, question
        )
        "#,
        [],
    )?;
    tx.commit()?;

    if removed > 0 {
        log::info!("removed {} duplicate cards", removed);
    }
    Ok(removed)
}
