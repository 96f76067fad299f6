//! SQLite schema definitions.

/// Complete schema for the progress database.
pub const SCHEMA: &str = r#"
-- Latest score snapshot per lesson
CREATE TABLE IF NOT EXISTS lesson_progress (
    lesson_key TEXT PRIMARY KEY,
    content_hash TEXT NOT NULL,
    awarded_keys TEXT NOT NULL DEFAULT '[]',
    awarded_points TEXT NOT NULL DEFAULT '{}',
    total INTEGER NOT NULL DEFAULT 0,
    streak INTEGER NOT NULL DEFAULT 0,
    session_id TEXT,
    saved_at TEXT NOT NULL
);

-- First wrong answer per item, per session
CREATE TABLE IF NOT EXISTS review_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lesson_key TEXT NOT NULL,
    item_id TEXT NOT NULL,
    submitted TEXT NOT NULL,
    session_id TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_review_log_lesson ON review_log(lesson_key);
"#;

/// Columns added after the first release, as `(table, column, definition)`.
/// Applied to databases created before the column existed.
pub const ADDED_COLUMNS: &[(&str, &str, &str)] = &[(
    "lesson_progress",
    "awarded_points",
    "TEXT NOT NULL DEFAULT '{}'",
)];
