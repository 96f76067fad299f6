//! Seams between the exercise engine and its host: rendering, speech and storage.

use crate::error::{SpeechError, StorageError};
use crate::ledger::{LedgerChange, LedgerObserver};
use crate::types::ScoreSnapshot;
use serde::Serialize;

/// Everything a host needs to render the result of one checked submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub item_id: String,
    pub correct: bool,
    pub explanation: String,
    pub points_awarded: u32,
    pub running_total: u32,
    pub completion_ratio: f64,
}

/// Rendering callback, invoked synchronously once per checked submission.
pub trait FeedbackSink {
    fn feedback(&mut self, feedback: &Feedback);
}

/// A fire-and-forget request to read text aloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub accent: Option<String>,
}

/// Text-to-speech collaborator. Completion is never observed.
pub trait SpeechSink {
    fn speak(&mut self, request: &SpeechRequest) -> Result<(), SpeechError>;
}

/// Key-value storage for a lesson's score snapshot.
pub trait SnapshotStore {
    fn load(&self, lesson_key: &str) -> Result<Option<ScoreSnapshot>, StorageError>;
    fn save(&mut self, lesson_key: &str, snapshot: &ScoreSnapshot) -> Result<(), StorageError>;
}

/// Ledger observer that mirrors every change into a [`SnapshotStore`].
///
/// Storage failures are logged and swallowed; the lesson keeps running in memory.
pub struct PersistingObserver<S> {
    store: S,
    lesson_key: String,
    failures: usize,
}

impl<S: SnapshotStore> PersistingObserver<S> {
    pub fn new(store: S, lesson_key: impl Into<String>) -> Self {
        Self {
            store,
            lesson_key: lesson_key.into(),
            failures: 0,
        }
    }

    /// Number of saves that failed so far.
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl<S: SnapshotStore> LedgerObserver for PersistingObserver<S> {
    fn on_change(&mut self, change: &LedgerChange) {
        if let Err(e) = self.store.save(&self.lesson_key, &change.snapshot) {
            if self.failures == 0 {
                tracing::warn!(lesson = %self.lesson_key, error = %e, "progress will not survive this session");
            } else {
                tracing::debug!(lesson = %self.lesson_key, error = %e, "snapshot save failed");
            }
            self.failures += 1;
        }
    }
}
