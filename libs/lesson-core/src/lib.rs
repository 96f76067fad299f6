//! Core exercise engine for English drill lessons.
//!
//! Provides:
//! - Answer matching (normalization, exact match, Levenshtein similarity)
//! - Scoring ledger with at-most-once awards per achievement key
//! - Exercise runner driving items through Unanswered, Checked and Locked
//! - Lesson file parser
//! - Host seams for rendering, speech and progress storage

pub mod error;
pub mod hooks;
pub mod ledger;
pub mod matching;
pub mod parser;
pub mod runner;
pub mod types;

pub use error::{ConfigError, ParseError, Result, SpeechError, StorageError};
pub use hooks::{Feedback, FeedbackSink, PersistingObserver, SnapshotStore, SpeechRequest, SpeechSink};
pub use ledger::{completion_ratio, ChangeKind, LedgerChange, LedgerObserver, ScoreState, ScoringLedger};
pub use matching::{best_similarity, exact_match, levenshtein_distance, normalize, similarity};
pub use parser::{parse, Lesson};
pub use runner::{ExerciseRunner, IgnoreReason, SubmitResult, COMPLETION_KEY};
pub use types::{
    AnswerKey, Attempt, ExerciseItem, ExerciseKind, ItemState, LessonSettings, Outcome, Response,
    ScoreSnapshot, SimilarityBand, Speech, Thresholds,
};
