//! Errors from the progress database.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("progress database: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored awards are not valid JSON: {0}")]
    Awards(#[from] serde_json::Error),

    #[error("stored save time {value} is not RFC 3339")]
    SavedAt {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
