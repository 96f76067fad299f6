//! Snapshot store backed by the SQLite progress database.

use crate::db::{ProgressRepository, ReviewRepository, SqliteRepository, StoredProgress};
use chrono::Utc;
use lesson_core::{Attempt, ScoreSnapshot, SnapshotStore, StorageError};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the progress database.
pub type SharedRepository = Arc<Mutex<SqliteRepository>>;

/// Stores one lesson's ledger snapshots, tagged with the lesson's content hash.
///
/// A saved snapshot is only restored while the lesson file is unchanged.
pub struct LessonStore {
    repo: SharedRepository,
    content_hash: String,
    session_id: String,
}

impl LessonStore {
    pub fn new(repo: SharedRepository, content_hash: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            repo,
            content_hash: content_hash.into(),
            session_id: session_id.into(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteRepository>, StorageError> {
        self.repo
            .lock()
            .map_err(|_| StorageError("progress database lock poisoned".to_string()))
    }
}

impl SnapshotStore for LessonStore {
    fn load(&self, lesson_key: &str) -> Result<Option<ScoreSnapshot>, StorageError> {
        let stored = self
            .lock()?
            .get_progress(lesson_key)
            .map_err(|e| StorageError(e.to_string()))?;

        match stored {
            Some(progress) if progress.content_hash == self.content_hash => {
                Ok(Some(progress.snapshot))
            }
            Some(_) => {
                tracing::info!(lesson = lesson_key, "lesson changed since last session, starting fresh");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn save(&mut self, lesson_key: &str, snapshot: &ScoreSnapshot) -> Result<(), StorageError> {
        let progress = StoredProgress {
            lesson_key: lesson_key.to_string(),
            content_hash: self.content_hash.clone(),
            snapshot: snapshot.clone(),
            session_id: Some(self.session_id.clone()),
            saved_at: Utc::now(),
        };
        self.lock()?
            .save_progress(&progress)
            .map_err(|e| StorageError(e.to_string()))
    }
}

/// SHA-256 of the lesson file content, hex encoded.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable key for a lesson file: its canonical path when resolvable.
pub fn lesson_key(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Open the progress database, creating its directory. Returns `None` when
/// storage is unavailable so the drill can run in memory.
pub fn open_repository(path: &Path) -> Option<SharedRepository> {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), error = %e, "cannot create data directory, progress will not be saved");
            return None;
        }
    }

    match SqliteRepository::open(path) {
        Ok(repo) => Some(Arc::new(Mutex::new(repo))),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot open progress database, progress will not be saved");
            None
        }
    }
}

/// Append a session's first misses to the review log. Returns rows written.
pub fn log_misses(
    repo: &SharedRepository,
    lesson_key: &str,
    session_id: &str,
    misses: &[Attempt],
) -> Result<usize, StorageError> {
    if misses.is_empty() {
        return Ok(0);
    }
    repo.lock()
        .map_err(|_| StorageError("progress database lock poisoned".to_string()))?
        .record_misses(lesson_key, session_id, misses)
        .map_err(|e| StorageError(e.to_string()))
}
