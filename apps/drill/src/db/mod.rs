//! Local SQLite storage for lesson progress.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{MissRecord, ProgressRepository, ReviewRepository, SqliteRepository, StoredProgress};
