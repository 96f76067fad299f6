//! Repository pattern for progress storage.

use crate::db::error::DbError;
use chrono::{DateTime, Utc};
use lesson_core::{Attempt, ScoreSnapshot};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

type Result<T> = std::result::Result<T, DbError>;

/// Saved ledger state for one lesson file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProgress {
    pub lesson_key: String,
    pub content_hash: String,
    pub snapshot: ScoreSnapshot,
    pub session_id: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// A logged first miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissRecord {
    pub item_id: String,
    pub submitted: String,
    pub session_id: String,
    pub recorded_at: String,
}

/// Repository for score snapshots.
pub trait ProgressRepository {
    fn get_progress(&self, lesson_key: &str) -> Result<Option<StoredProgress>>;
    fn save_progress(&self, progress: &StoredProgress) -> Result<()>;
}

/// Repository for the review list of missed items.
pub trait ReviewRepository {
    fn record_misses(&self, lesson_key: &str, session_id: &str, misses: &[Attempt]) -> Result<usize>;
    fn recent_misses(&self, lesson_key: &str, limit: usize) -> Result<Vec<MissRecord>>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::SCHEMA)?;
        for &(table, column, definition) in super::schema::ADDED_COLUMNS {
            let exists = self
                .conn
                .prepare("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2")?
                .exists(params![table, column])?;
            if !exists {
                tracing::info!(table, column, "adding column to progress database");
                self.conn
                    .execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))?;
            }
        }
        Ok(())
    }
}

impl ProgressRepository for SqliteRepository {
    fn get_progress(&self, lesson_key: &str) -> Result<Option<StoredProgress>> {
        let row = self
            .conn
            .query_row(
                "SELECT content_hash, awarded_keys, awarded_points, total, streak, session_id, saved_at
                 FROM lesson_progress WHERE lesson_key = ?1",
                params![lesson_key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((content_hash, awarded_json, points_json, total, streak, session_id, saved_at)) = row
        else {
            return Ok(None);
        };

        let awarded_keys: Vec<String> = serde_json::from_str(&awarded_json)?;
        let points: BTreeMap<String, u32> = serde_json::from_str(&points_json)?;
        let saved_at = DateTime::parse_from_rfc3339(&saved_at)
            .map_err(|source| DbError::SavedAt {
                value: saved_at.clone(),
                source,
            })?
            .with_timezone(&Utc);

        Ok(Some(StoredProgress {
            lesson_key: lesson_key.to_string(),
            content_hash,
            snapshot: ScoreSnapshot {
                awarded_keys,
                total,
                streak,
                points,
            },
            session_id,
            saved_at,
        }))
    }

    fn save_progress(&self, progress: &StoredProgress) -> Result<()> {
        let awarded_json = serde_json::to_string(&progress.snapshot.awarded_keys)?;
        let points_json = serde_json::to_string(&progress.snapshot.points)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO lesson_progress
                (lesson_key, content_hash, awarded_keys, awarded_points, total, streak, session_id, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                progress.lesson_key,
                progress.content_hash,
                awarded_json,
                points_json,
                progress.snapshot.total,
                progress.snapshot.streak,
                progress.session_id,
                progress.saved_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl ReviewRepository for SqliteRepository {
    fn record_misses(&self, lesson_key: &str, session_id: &str, misses: &[Attempt]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare(
            "INSERT INTO review_log (lesson_key, item_id, submitted, session_id, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        let mut count = 0;
        for miss in misses {
            count += stmt.execute(params![lesson_key, miss.item_id, miss.submitted, session_id, now])?;
        }
        Ok(count)
    }

    fn recent_misses(&self, lesson_key: &str, limit: usize) -> Result<Vec<MissRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, submitted, session_id, recorded_at FROM review_log
             WHERE lesson_key = ?1 ORDER BY id DESC LIMIT ?2",
        )?;

        let misses = stmt
            .query_map(params![lesson_key, limit as i64], |row| {
                Ok(MissRecord {
                    item_id: row.get(0)?,
                    submitted: row.get(1)?,
                    session_id: row.get(2)?,
                    recorded_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(misses)
    }
}
