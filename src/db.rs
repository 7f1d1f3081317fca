use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{
    BulkOutcome, Card, CardFilter, CreateOutcome, DuplicatePolicy, EditedCard, NewCard, Stats,
    SubtopicSummary, Topic,
};

const CARD_COLUMNS: &str =
    "id, topic, subtopic, question, answer, success_count, failure_count, bookmarked";

// Seed card for a freshly created subtopic, so it shows up in the library
const PLACEHOLDER_QUESTION: &str = "Definition";
const PLACEHOLDER_ANSWER: &str = "Answer";

pub struct Database {
    conn: Connection,
    duplicate_policy: DuplicatePolicy,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            duplicate_policy: DuplicatePolicy::default(),
        })
    }

    /// Bounds how long any statement waits on a locked database before
    /// failing with `StoreUnavailable`.
    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self> {
        self.conn.busy_timeout(timeout)?;
        Ok(self)
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                subtopic TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                success_count INTEGER NOT NULL DEFAULT 0,
                failure_count INTEGER NOT NULL DEFAULT 0,
                bookmarked INTEGER NOT NULL DEFAULT 0
            );

            -- Not UNIQUE: duplicates are collapsed by the resolver, not rejected here
            CREATE INDEX IF NOT EXISTS idx_cards_key ON cards(topic, subtopic, question);
            "#,
        )?;

        let migrated = self.migrate()?;
        if migrated > 0 {
            log::info!("migrated {} cards from legacy study_cards table", migrated);
        }

        Ok(())
    }

    // The previous schema kept cards in `study_cards` with key/value/success/failure
    // columns. Copy whatever it holds and drop it.
    fn migrate(&self) -> Result<usize> {
        let has_legacy_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'study_cards')",
            [],
            |row| row.get(0),
        )?;

        if !has_legacy_table {
            return Ok(0);
        }

        let tx = self.transaction()?;
        let legacy: Vec<(Option<String>, String, String, String, i64, i64, bool)> = {
            let mut stmt = tx.prepare(
                r#"
                SELECT topic, COALESCE(subtopic, ''), COALESCE(key, ''), COALESCE(value, ''),
                       CAST(COALESCE(success, 0) AS INTEGER),
                       CAST(COALESCE(failure, 0) AS INTEGER),
                       COALESCE(bookmarked, 0) != 0
                FROM study_cards
                ORDER BY id
                "#,
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?;
            let collected = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            collected
        };

        // Topics go through the same lenient parse as the legacy CSV import
        let mut migrated = 0;
        let mut skipped = 0;
        for (raw_topic, subtopic, question, answer, success, failure, bookmarked) in legacy {
            let Some(topic) = raw_topic.as_deref().and_then(Topic::from_str) else {
                skipped += 1;
                continue;
            };
            let card = EditedCard {
                id: None,
                topic,
                subtopic,
                question,
                answer,
                success_count: clamp_count(success),
                failure_count: clamp_count(failure),
                bookmarked,
            };
            insert_edited(&tx, &card)?;
            migrated += 1;
        }
        if skipped > 0 {
            log::warn!("skipping {} legacy cards with an unknown topic", skipped);
        }

        tx.execute_batch("DROP TABLE study_cards;")?;
        tx.commit()?;

        Ok(migrated)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Opens a write transaction up front so concurrent writers queue on the
    /// busy timeout instead of failing mid-way.
    pub(crate) fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // Card operations
    pub fn create(&self, card: &NewCard) -> Result<CreateOutcome> {
        let tx = self.transaction()?;
        if key_exists(&tx, card.topic, &card.subtopic, &card.question)? {
            return match self.duplicate_policy {
                DuplicatePolicy::Reject => Err(Error::DuplicateKey {
                    topic: card.topic.to_string(),
                    subtopic: card.subtopic.clone(),
                    question: card.question.clone(),
                }),
                DuplicatePolicy::Skip => Ok(CreateOutcome::Skipped),
            };
        }

        let id = insert_new(&tx, card)?;
        tx.commit()?;
        Ok(CreateOutcome::Added(id))
    }

    pub fn bulk_create(&self, cards: &[NewCard]) -> Result<BulkOutcome> {
        let tx = self.transaction()?;
        let mut outcome = BulkOutcome::default();

        for card in cards {
            // Checked against the open transaction, so repeats inside the batch are caught too
            if key_exists(&tx, card.topic, &card.subtopic, &card.question)? {
                outcome.skipped += 1;
            } else {
                insert_new(&tx, card)?;
                outcome.added += 1;
            }
        }

        tx.commit()?;
        log::info!(
            "bulk insert: {} added, {} skipped",
            outcome.added,
            outcome.skipped
        );
        Ok(outcome)
    }

    pub fn create_subtopic(&self, topic: Topic, subtopic: &str) -> Result<CreateOutcome> {
        let placeholder = NewCard::new(topic, subtopic, PLACEHOLDER_QUESTION, PLACEHOLDER_ANSWER);
        let outcome = self.bulk_create(std::slice::from_ref(&placeholder))?;
        if outcome.added == 0 {
            return Ok(CreateOutcome::Skipped);
        }
        Ok(CreateOutcome::Added(self.conn.last_insert_rowid()))
    }

    pub fn get_card(&self, id: i64) -> Result<Option<Card>> {
        let card = self
            .conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                params![id],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    pub fn query(&self, filter: &CardFilter) -> Result<Vec<Card>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(topic) = filter.topic {
            clauses.push("topic = ?");
            params_vec.push(Box::new(topic));
        }
        if let Some(subtopic) = &filter.subtopic {
            clauses.push("subtopic = ?");
            params_vec.push(Box::new(subtopic.clone()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let query = format!(
            "SELECT {} FROM cards {} ORDER BY id ASC",
            CARD_COLUMNS, where_clause
        );

        let mut stmt = self.conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), card_from_row)?;
        let cards = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(cards)
    }

    pub fn bookmarks(&self, topic: Topic, subtopic: &str) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cards WHERE topic = ?1 AND subtopic = ?2 AND bookmarked = 1 ORDER BY id ASC",
            CARD_COLUMNS
        ))?;
        let rows = stmt.query_map(params![topic, subtopic], card_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Counter and bookmark mutations are single statements, so concurrent
    // sessions hitting the same card never lose an increment.
    pub fn update_counters(&self, id: i64, delta_success: u32, delta_failure: u32) -> Result<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE cards
            SET success_count = success_count + ?1,
                failure_count = failure_count + ?2
            WHERE id = ?3
            "#,
            params![delta_success, delta_failure, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    pub fn set_bookmark(&self, id: i64, bookmarked: bool) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE cards SET bookmarked = ?1 WHERE id = ?2",
            params![bookmarked, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    pub fn toggle_bookmark(&self, id: i64) -> Result<bool> {
        let flag: Option<bool> = self
            .conn
            .query_row(
                "UPDATE cards SET bookmarked = NOT bookmarked WHERE id = ?1 RETURNING bookmarked",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        flag.ok_or(Error::NotFound(id))
    }

    pub fn delete_by_subtopic(&self, topic: Topic, subtopic: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM cards WHERE topic = ?1 AND subtopic = ?2",
            params![topic, subtopic],
        )?;
        Ok(rows)
    }

    pub fn delete_by_id(&self, id: i64) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    pub fn reset_counters(&self, topic: Topic, subtopic: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE cards SET success_count = 0, failure_count = 0 WHERE topic = ?1 AND subtopic = ?2",
            params![topic, subtopic],
        )?;
        Ok(rows)
    }

    /// Destructive: the table ends up holding exactly `rows`.
    pub fn replace_all(&self, rows: &[EditedCard]) -> Result<usize> {
        let tx = self.transaction()?;
        tx.execute("DELETE FROM cards", [])?;
        for row in rows {
            insert_edited(&tx, row)?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn replace_subtopic(
        &self,
        topic: Topic,
        subtopic: &str,
        rows: &[EditedCard],
    ) -> Result<usize> {
        let tx = self.transaction()?;
        tx.execute(
            "DELETE FROM cards WHERE topic = ?1 AND subtopic = ?2",
            params![topic, subtopic],
        )?;
        for row in rows {
            insert_edited(&tx, row)?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Appends full rows without any duplicate check.
    pub(crate) fn append_rows(&self, rows: &[EditedCard]) -> Result<usize> {
        let tx = self.transaction()?;
        for row in rows {
            insert_edited(&tx, row)?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    // Library and statistics
    pub fn library(&self) -> Result<Vec<SubtopicSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT topic, subtopic, COUNT(*),
                   COALESCE(SUM(bookmarked), 0),
                   COALESCE(SUM(success_count), 0),
                   COALESCE(SUM(failure_count), 0)
            FROM cards
            GROUP BY topic, subtopic
            ORDER BY topic, subtopic
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SubtopicSummary {
                topic: row.get(0)?,
                subtopic: row.get(1)?,
                card_count: row.get(2)?,
                bookmarked_count: row.get(3)?,
                total_success: row.get(4)?,
                total_failure: row.get(5)?,
            })
        })?;
        let library = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(library)
    }

    pub fn stats(&self) -> Result<Stats> {
        let stats = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COUNT(DISTINCT topic || char(31) || subtopic),
                   COALESCE(SUM(success_count), 0),
                   COALESCE(SUM(failure_count), 0),
                   COALESCE(SUM(bookmarked), 0)
            FROM cards
            "#,
            [],
            |row| {
                Ok(Stats {
                    total_cards: row.get(0)?,
                    total_subtopics: row.get(1)?,
                    total_success: row.get(2)?,
                    total_failure: row.get(3)?,
                    bookmarked: row.get(4)?,
                })
            },
        )?;

        Ok(stats)
    }
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        topic: row.get(1)?,
        subtopic: row.get(2)?,
        question: row.get(3)?,
        answer: row.get(4)?,
        success_count: row.get(5)?,
        failure_count: row.get(6)?,
        bookmarked: row.get(7)?,
    })
}

fn key_exists(conn: &Connection, topic: Topic, subtopic: &str, question: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM cards WHERE topic = ?1 AND subtopic = ?2 AND question = ?3)",
        params![topic, subtopic, question],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn insert_new(conn: &Connection, card: &NewCard) -> Result<i64> {
    conn.execute(
        "INSERT INTO cards (topic, subtopic, question, answer) VALUES (?1, ?2, ?3, ?4)",
        params![card.topic, card.subtopic, card.question, card.answer],
    )?;
    Ok(conn.last_insert_rowid())
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn insert_edited(conn: &Connection, row: &EditedCard) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO cards (id, topic, subtopic, question, answer, success_count, failure_count, bookmarked)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            row.id,
            row.topic,
            row.subtopic,
            row.question,
            row.answer,
            row.success_count,
            row.failure_count,
            row.bookmarked
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn motion_card(question: &str) -> NewCard {
        NewCard::new(Topic::Physics, "Motion", question, "answer")
    }

    fn added_id(outcome: CreateOutcome) -> i64 {
        match outcome {
            CreateOutcome::Added(id) => id,
            CreateOutcome::Skipped => panic!("Expected card to be added"),
        }
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_cards_table() {
            let db = setup_db();
            let count: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
                .expect("cards table should exist");
            assert_eq!(count, 0);
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.create(&motion_card("F=ma?")).unwrap();

            db.init().expect("Re-init should succeed");

            assert_eq!(db.query(&CardFilter::all()).unwrap().len(), 1);
        }

        #[test]
        fn init_migrates_legacy_study_cards_table() {
            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE study_cards (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        topic TEXT, subtopic TEXT, key TEXT, value TEXT,
                        success INTEGER DEFAULT 0, failure INTEGER DEFAULT 0,
                        bookmarked BOOLEAN DEFAULT 0);
                    INSERT INTO study_cards (topic, subtopic, key, value, success, failure, bookmarked)
                        VALUES ('Physics', 'Motion', 'F=ma?', 'Newton', 2, 1, 1);
                    INSERT INTO study_cards (topic, subtopic, key, value)
                        VALUES ('Alchemy', 'Gold', 'Lead?', 'No');
                    "#,
                )
                .unwrap();

            db.init().unwrap();

            let cards = db.query(&CardFilter::all()).unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].question, "F=ma?");
            assert_eq!(cards[0].answer, "Newton");
            assert_eq!(cards[0].success_count, 2);
            assert_eq!(cards[0].failure_count, 1);
            assert!(cards[0].bookmarked);

            let legacy_left: bool = db
                .conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = 'study_cards')",
                    [],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(!legacy_left);
        }
    }

    mod legacy_topic_tests {
        use super::*;

        #[test]
        fn legacy_table_topics_parse_leniently() {
            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE study_cards (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        topic TEXT, subtopic TEXT, key TEXT, value TEXT,
                        success INTEGER DEFAULT 0, failure INTEGER DEFAULT 0,
                        bookmarked BOOLEAN DEFAULT 0);
                    INSERT INTO study_cards (topic, subtopic, key, value)
                        VALUES ('physics', 'Motion', 'v?', 'speed');
                    INSERT INTO study_cards (topic, subtopic, key, value, success)
                        VALUES (' higher math ', 'Calculus', 'd/dx x?', '1', 3.0);
                    INSERT INTO study_cards (topic, subtopic, key, value)
                        VALUES (NULL, 'Orphan', 'q', 'a');
                    "#,
                )
                .unwrap();

            db.init().unwrap();

            let cards = db.query(&CardFilter::all()).unwrap();
            assert_eq!(cards.len(), 2);
            assert_eq!(cards[0].topic, Topic::Physics);
            assert_eq!(cards[1].topic, Topic::HigherMath);
            assert_eq!(cards[1].success_count, 3);
        }

        #[test]
        fn legacy_table_and_csv_agree_on_topics() {
            let csv = "Subject,Topic,Key,Value\nphysics,Motion,v?,speed\nAlchemy,Gold,q,a\n";
            let (csv_rows, csv_skipped) = crate::import::read_legacy_csv(csv.as_bytes()).unwrap();

            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE study_cards (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        topic TEXT, subtopic TEXT, key TEXT, value TEXT,
                        success INTEGER DEFAULT 0, failure INTEGER DEFAULT 0,
                        bookmarked BOOLEAN DEFAULT 0);
                    INSERT INTO study_cards (topic, subtopic, key, value)
                        VALUES ('physics', 'Motion', 'v?', 'speed');
                    INSERT INTO study_cards (topic, subtopic, key, value)
                        VALUES ('Alchemy', 'Gold', 'q', 'a');
                    "#,
                )
                .unwrap();
            db.init().unwrap();
            let table_cards = db.query(&CardFilter::all()).unwrap();

            assert_eq!(csv_skipped, 1);
            assert_eq!(table_cards.len(), csv_rows.len());
            assert_eq!(table_cards[0].topic, csv_rows[0].topic);
        }

        #[test]
        fn clamp_count_bounds() {
            assert_eq!(clamp_count(-4), 0);
            assert_eq!(clamp_count(7), 7);
            assert_eq!(clamp_count(i64::MAX), u32::MAX);
        }
    }

    mod create_tests {
        use super::*;

        #[test]
        fn create_assigns_increasing_ids() {
            let db = setup_db();
            let a = added_id(db.create(&motion_card("q1")).unwrap());
            let b = added_id(db.create(&motion_card("q2")).unwrap());
            assert!(b > a);
        }

        #[test]
        fn create_starts_with_zero_counters() {
            let db = setup_db();
            let id = added_id(db.create(&motion_card("q1")).unwrap());
            let card = db.get_card(id).unwrap().unwrap();
            assert_eq!(card.success_count, 0);
            assert_eq!(card.failure_count, 0);
            assert!(!card.bookmarked);
            assert_eq!(card.topic, Topic::Physics);
            assert_eq!(card.subtopic, "Motion");
        }

        #[test]
        fn create_rejects_duplicate_key_by_default() {
            let db = setup_db();
            db.create(&motion_card("q1")).unwrap();

            let err = db.create(&motion_card("q1")).unwrap_err();
            assert!(matches!(err, Error::DuplicateKey { .. }));
            assert_eq!(db.query(&CardFilter::all()).unwrap().len(), 1);
        }

        #[test]
        fn create_skips_duplicate_under_skip_policy() {
            let db = setup_db().with_duplicate_policy(DuplicatePolicy::Skip);
            db.create(&motion_card("q1")).unwrap();

            assert_eq!(
                db.create(&motion_card("q1")).unwrap(),
                CreateOutcome::Skipped
            );
            assert_eq!(db.query(&CardFilter::all()).unwrap().len(), 1);
        }

        #[test]
        fn same_question_in_other_subtopic_is_not_a_duplicate() {
            let db = setup_db();
            db.create(&motion_card("q1")).unwrap();
            let other = NewCard::new(Topic::Physics, "Heat", "q1", "a");
            assert!(matches!(db.create(&other).unwrap(), CreateOutcome::Added(_)));
        }

        #[test]
        fn bulk_create_reports_added_and_skipped() {
            let db = setup_db();
            db.create(&motion_card("existing")).unwrap();

            let outcome = db
                .bulk_create(&[
                    motion_card("existing"),
                    motion_card("new1"),
                    motion_card("new1"),
                    motion_card("new2"),
                ])
                .unwrap();

            assert_eq!(outcome, BulkOutcome { added: 2, skipped: 2 });
            assert_eq!(db.query(&CardFilter::all()).unwrap().len(), 3);
        }

        #[test]
        fn create_subtopic_seeds_placeholder_once() {
            let db = setup_db();
            assert!(matches!(
                db.create_subtopic(Topic::Biology, "Cells").unwrap(),
                CreateOutcome::Added(_)
            ));
            assert_eq!(
                db.create_subtopic(Topic::Biology, "Cells").unwrap(),
                CreateOutcome::Skipped
            );

            let cards = db
                .query(&CardFilter::subtopic(Topic::Biology, "Cells"))
                .unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].question, PLACEHOLDER_QUESTION);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn query_filters_by_topic_and_subtopic() {
            let db = setup_db();
            db.create(&motion_card("q1")).unwrap();
            db.create(&NewCard::new(Topic::Physics, "Heat", "q2", "a"))
                .unwrap();
            db.create(&NewCard::new(Topic::Chemistry, "Motion", "q3", "a"))
                .unwrap();

            assert_eq!(db.query(&CardFilter::all()).unwrap().len(), 3);
            assert_eq!(db.query(&CardFilter::topic(Topic::Physics)).unwrap().len(), 2);
            let motion = db
                .query(&CardFilter::subtopic(Topic::Physics, "Motion"))
                .unwrap();
            assert_eq!(motion.len(), 1);
            assert_eq!(motion[0].question, "q1");
        }

        #[test]
        fn query_orders_by_id() {
            let db = setup_db();
            for q in ["c", "a", "b"] {
                db.create(&motion_card(q)).unwrap();
            }
            let cards = db.query(&CardFilter::all()).unwrap();
            let ids: Vec<i64> = cards.iter().map(|c| c.id).collect();
            let mut sorted = ids.clone();
            sorted.sort();
            assert_eq!(ids, sorted);
            assert_eq!(cards[0].question, "c");
        }

        #[test]
        fn get_card_missing_returns_none() {
            let db = setup_db();
            assert!(db.get_card(999).unwrap().is_none());
        }

        #[test]
        fn bookmarks_only_returns_flagged_cards() {
            let db = setup_db();
            let a = added_id(db.create(&motion_card("q1")).unwrap());
            db.create(&motion_card("q2")).unwrap();
            db.set_bookmark(a, true).unwrap();

            let marked = db.bookmarks(Topic::Physics, "Motion").unwrap();
            assert_eq!(marked.len(), 1);
            assert_eq!(marked[0].id, a);
        }
    }

    mod mutation_tests {
        use super::*;

        #[test]
        fn update_counters_increments() {
            let db = setup_db();
            let id = added_id(db.create(&motion_card("q1")).unwrap());

            db.update_counters(id, 1, 0).unwrap();
            db.update_counters(id, 2, 3).unwrap();

            let card = db.get_card(id).unwrap().unwrap();
            assert_eq!(card.success_count, 3);
            assert_eq!(card.failure_count, 3);
        }

        #[test]
        fn update_counters_missing_id_is_not_found() {
            let db = setup_db();
            assert!(matches!(
                db.update_counters(42, 1, 0),
                Err(Error::NotFound(42))
            ));
        }

        #[test]
        fn set_and_toggle_bookmark() {
            let db = setup_db();
            let id = added_id(db.create(&motion_card("q1")).unwrap());

            db.set_bookmark(id, true).unwrap();
            assert!(db.get_card(id).unwrap().unwrap().bookmarked);

            assert!(!db.toggle_bookmark(id).unwrap());
            assert!(db.toggle_bookmark(id).unwrap());
            assert!(db.get_card(id).unwrap().unwrap().bookmarked);
        }

        #[test]
        fn bookmark_missing_id_is_not_found() {
            let db = setup_db();
            assert!(matches!(db.set_bookmark(3, true), Err(Error::NotFound(3))));
            assert!(matches!(db.toggle_bookmark(3), Err(Error::NotFound(3))));
        }

        #[test]
        fn delete_by_subtopic_is_idempotent() {
            let db = setup_db();
            for i in 0..5 {
                db.create(&motion_card(&format!("q{}", i))).unwrap();
            }
            db.create(&NewCard::new(Topic::Physics, "Heat", "q", "a"))
                .unwrap();

            assert_eq!(db.delete_by_subtopic(Topic::Physics, "Motion").unwrap(), 5);
            assert_eq!(db.delete_by_subtopic(Topic::Physics, "Motion").unwrap(), 0);
            assert_eq!(db.query(&CardFilter::all()).unwrap().len(), 1);
        }

        #[test]
        fn delete_by_id() {
            let db = setup_db();
            let id = added_id(db.create(&motion_card("q1")).unwrap());

            db.delete_by_id(id).unwrap();
            assert!(db.get_card(id).unwrap().is_none());
            assert!(matches!(db.delete_by_id(id), Err(Error::NotFound(_))));
        }

        #[test]
        fn reset_counters_only_touches_subtopic() {
            let db = setup_db();
            let a = added_id(db.create(&motion_card("q1")).unwrap());
            let b = added_id(
                db.create(&NewCard::new(Topic::Physics, "Heat", "q", "a"))
                    .unwrap(),
            );
            db.update_counters(a, 4, 2).unwrap();
            db.update_counters(b, 1, 1).unwrap();

            assert_eq!(db.reset_counters(Topic::Physics, "Motion").unwrap(), 1);

            let a = db.get_card(a).unwrap().unwrap();
            assert_eq!((a.success_count, a.failure_count), (0, 0));
            let b = db.get_card(b).unwrap().unwrap();
            assert_eq!((b.success_count, b.failure_count), (1, 1));
        }

        #[test]
        fn replace_all_overwrites_table() {
            let db = setup_db();
            let id = added_id(db.create(&motion_card("q1")).unwrap());
            db.create(&motion_card("q2")).unwrap();

            let mut kept: EditedCard = db.get_card(id).unwrap().unwrap().into();
            kept.answer = "edited".to_string();
            kept.success_count = 9;
            let fresh = EditedCard {
                id: None,
                topic: Topic::English,
                subtopic: "Grammar".to_string(),
                question: "noun?".to_string(),
                answer: "a thing".to_string(),
                success_count: 0,
                failure_count: 0,
                bookmarked: true,
            };

            assert_eq!(db.replace_all(&[kept, fresh]).unwrap(), 2);

            let cards = db.query(&CardFilter::all()).unwrap();
            assert_eq!(cards.len(), 2);
            assert_eq!(cards[0].id, id);
            assert_eq!(cards[0].answer, "edited");
            assert_eq!(cards[0].success_count, 9);
            assert_eq!(cards[1].topic, Topic::English);
            assert!(cards[1].bookmarked);
        }

        #[test]
        fn replace_all_failure_leaves_table_unchanged() {
            let db = setup_db();
            let id = added_id(db.create(&motion_card("q1")).unwrap());
            let row: EditedCard = db.get_card(id).unwrap().unwrap().into();

            // Two rows with the same id violate the primary key mid-transaction
            let result = db.replace_all(&[row.clone(), row]);
            assert!(result.is_err());

            let cards = db.query(&CardFilter::all()).unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].id, id);
        }

        #[test]
        fn replace_subtopic_keeps_other_subtopics() {
            let db = setup_db();
            db.create(&motion_card("q1")).unwrap();
            db.create(&motion_card("q2")).unwrap();
            db.create(&NewCard::new(Topic::Physics, "Heat", "q", "a"))
                .unwrap();

            let edited = vec![EditedCard {
                id: None,
                topic: Topic::Physics,
                subtopic: "Motion".to_string(),
                question: "v=d/t?".to_string(),
                answer: "speed".to_string(),
                success_count: 0,
                failure_count: 0,
                bookmarked: false,
            }];
            db.replace_subtopic(Topic::Physics, "Motion", &edited)
                .unwrap();

            let motion = db
                .query(&CardFilter::subtopic(Topic::Physics, "Motion"))
                .unwrap();
            assert_eq!(motion.len(), 1);
            assert_eq!(motion[0].question, "v=d/t?");
            assert_eq!(
                db.query(&CardFilter::subtopic(Topic::Physics, "Heat"))
                    .unwrap()
                    .len(),
                1
            );
        }
    }

    mod contention_tests {
        use super::*;
        use std::thread;
        use tempfile::TempDir;

        fn open_at(path: &Path, timeout_ms: u64) -> Database {
            let db = Database::open(path)
                .unwrap()
                .with_busy_timeout(Duration::from_millis(timeout_ms))
                .unwrap();
            db.init().unwrap();
            db
        }

        #[test]
        fn held_write_lock_surfaces_as_store_unavailable() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("cards.db");
            let a = open_at(&path, 50);
            let b = open_at(&path, 50);
            let id = added_id(a.create(&motion_card("F=ma?")).unwrap());

            let tx = a.transaction().unwrap();

            let created = b.create(&motion_card("v=d/t?"));
            assert!(
                matches!(created, Err(Error::StoreUnavailable(_))),
                "expected StoreUnavailable, got {:?}",
                created
            );
            let counted = b.update_counters(id, 1, 0);
            assert!(matches!(counted, Err(Error::StoreUnavailable(_))));

            tx.rollback().unwrap();

            // Neither failed write left anything behind
            let cards = b.query(&CardFilter::all()).unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].success_count, 0);

            // Once the lock is gone the same write goes through
            assert!(b.create(&motion_card("v=d/t?")).is_ok());
        }

        #[test]
        fn retry_once_recovers_after_lock_is_released() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("cards.db");
            let a = open_at(&path, 50);
            let b = open_at(&path, 50);
            let id = added_id(a.create(&motion_card("F=ma?")).unwrap());

            let mut tx = Some(a.transaction().unwrap());
            let result = crate::error::retry_once(|| {
                let outcome = b.update_counters(id, 0, 1);
                // Release the lock after the first attempt fails
                if let Some(tx) = tx.take() {
                    tx.rollback()?;
                }
                outcome
            });

            assert!(result.is_ok());
            assert_eq!(b.get_card(id).unwrap().unwrap().failure_count, 1);
        }

        #[test]
        fn concurrent_increments_are_not_lost() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("cards.db");
            let db = open_at(&path, 5000);
            let id = added_id(db.create(&motion_card("F=ma?")).unwrap());

            let workers: Vec<_> = (0..2)
                .map(|_| {
                    let path = path.clone();
                    thread::spawn(move || {
                        let db = open_at(&path, 5000);
                        for _ in 0..50 {
                            db.update_counters(id, 1, 1).unwrap();
                        }
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }

            let card = db.get_card(id).unwrap().unwrap();
            assert_eq!(card.success_count, 100);
            assert_eq!(card.failure_count, 100);
        }
    }

    mod library_tests {
        use super::*;

        #[test]
        fn library_groups_by_subtopic() {
            let db = setup_db();
            let a = added_id(db.create(&motion_card("q1")).unwrap());
            db.create(&motion_card("q2")).unwrap();
            db.create(&NewCard::new(Topic::Chemistry, "Acids", "pH?", "a"))
                .unwrap();
            db.update_counters(a, 3, 1).unwrap();
            db.set_bookmark(a, true).unwrap();

            let library = db.library().unwrap();
            assert_eq!(library.len(), 2);

            let motion = library
                .iter()
                .find(|s| s.subtopic == "Motion")
                .expect("Motion summary");
            assert_eq!(motion.card_count, 2);
            assert_eq!(motion.bookmarked_count, 1);
            assert_eq!(motion.total_success, 3);
            assert_eq!(motion.total_failure, 1);
            assert!((motion.accuracy() - 75.0).abs() < f64::EPSILON);
        }

        #[test]
        fn stats_on_empty_store() {
            let db = setup_db();
            assert_eq!(db.stats().unwrap(), Stats::default());
        }

        #[test]
        fn stats_counts_everything() {
            let db = setup_db();
            let a = added_id(db.create(&motion_card("q1")).unwrap());
            db.create(&NewCard::new(Topic::Physics, "Heat", "q", "a"))
                .unwrap();
            db.update_counters(a, 2, 5).unwrap();
            db.set_bookmark(a, true).unwrap();

            let stats = db.stats().unwrap();
            assert_eq!(stats.total_cards, 2);
            assert_eq!(stats.total_subtopics, 2);
            assert_eq!(stats.total_success, 2);
            assert_eq!(stats.total_failure, 5);
            assert_eq!(stats.bookmarked, 1);
        }
    }
}
