//! Core types for exercise lessons.

use crate::error::ConfigError;
use crate::matching::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default points for a correct answer on the first attempt.
pub const DEFAULT_FIRST_TRY_POINTS: u32 = 2;

/// Default points for a correct answer after at least one miss.
pub const DEFAULT_RETRY_POINTS: u32 = 1;

/// How an item decides whether an answer is correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
    /// Normalized exact match against any accepted phrasing.
    Typed { accepted: Vec<String> },
    /// Multiple choice; `correct` is a zero-based index into `options`.
    Choice { options: Vec<String>, correct: usize },
    /// Similarity match, correct when the best score reaches `threshold`.
    Spoken { accepted: Vec<String>, threshold: u8 },
}

/// Exercise kind without its answer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Typed,
    Choice,
    Spoken,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typed => "typed",
            Self::Choice => "choice",
            Self::Spoken => "spoken",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "typed" => Some(Self::Typed),
            "choice" => Some(Self::Choice),
            "spoken" => Some(Self::Spoken),
            _ => None,
        }
    }
}

/// Text the host should read aloud for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speech {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

/// One authored exercise. Never mutated once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseItem {
    pub id: String,
    pub prompt: String,
    pub answer: AnswerKey,
    pub explanation: String,
    pub points: u32,
    pub retry_points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech: Option<Speech>,
}

impl ExerciseItem {
    fn new(id: impl Into<String>, prompt: impl Into<String>, answer: AnswerKey) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            answer,
            explanation: String::new(),
            points: DEFAULT_FIRST_TRY_POINTS,
            retry_points: DEFAULT_RETRY_POINTS,
            speech: None,
        }
    }

    /// Fill-in-the-blank item accepting any of `accepted`.
    pub fn typed<S: Into<String>>(
        id: impl Into<String>,
        prompt: impl Into<String>,
        accepted: impl IntoIterator<Item = S>,
    ) -> Self {
        let accepted = accepted.into_iter().map(Into::into).collect();
        Self::new(id, prompt, AnswerKey::Typed { accepted })
    }

    /// Multiple-choice item with a zero-based correct index.
    pub fn choice<S: Into<String>>(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        correct: usize,
    ) -> Self {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(id, prompt, AnswerKey::Choice { options, correct })
    }

    /// Repeat-after-me item scored by similarity.
    pub fn spoken<S: Into<String>>(
        id: impl Into<String>,
        prompt: impl Into<String>,
        accepted: impl IntoIterator<Item = S>,
        threshold: u8,
    ) -> Self {
        let accepted = accepted.into_iter().map(Into::into).collect();
        Self::new(id, prompt, AnswerKey::Spoken { accepted, threshold })
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_points(mut self, points: u32, retry_points: u32) -> Self {
        self.points = points;
        self.retry_points = retry_points;
        self
    }

    pub fn with_speech(mut self, text: impl Into<String>, accent: Option<String>) -> Self {
        self.speech = Some(Speech {
            text: text.into(),
            accent,
        });
        self
    }

    pub fn kind(&self) -> ExerciseKind {
        match self.answer {
            AnswerKey::Typed { .. } => ExerciseKind::Typed,
            AnswerKey::Choice { .. } => ExerciseKind::Choice,
            AnswerKey::Spoken { .. } => ExerciseKind::Spoken,
        }
    }

    /// Answer shown as the hint: the first accepted phrasing or the correct option.
    pub fn expected(&self) -> &str {
        match &self.answer {
            AnswerKey::Typed { accepted } | AnswerKey::Spoken { accepted, .. } => {
                accepted.first().map(String::as_str).unwrap_or_default()
            }
            AnswerKey::Choice { options, correct } => {
                options.get(*correct).map(String::as_str).unwrap_or_default()
            }
        }
    }

    /// Options for choice items, empty otherwise.
    pub fn options(&self) -> &[String] {
        match &self.answer {
            AnswerKey::Choice { options, .. } => options,
            _ => &[],
        }
    }

    /// Check the authoring rules an item must satisfy before it can be run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }

        let id = || self.id.clone();
        match &self.answer {
            AnswerKey::Typed { accepted } => {
                if !has_usable_answer(accepted) {
                    return Err(ConfigError::NoAcceptedAnswer { id: id() });
                }
            }
            AnswerKey::Choice { options, correct } => {
                if options.is_empty() {
                    return Err(ConfigError::NoOptions { id: id() });
                }
                if *correct >= options.len() {
                    return Err(ConfigError::OptionOutOfRange {
                        id: id(),
                        index: *correct,
                        len: options.len(),
                    });
                }
                if normalize(&options[*correct]).is_empty() {
                    return Err(ConfigError::NoAcceptedAnswer { id: id() });
                }
            }
            AnswerKey::Spoken {
                accepted,
                threshold,
            } => {
                if !has_usable_answer(accepted) {
                    return Err(ConfigError::NoAcceptedAnswer { id: id() });
                }
                if *threshold > 100 {
                    return Err(ConfigError::ThresholdOutOfRange {
                        id: id(),
                        threshold: *threshold,
                    });
                }
            }
        }
        Ok(())
    }
}

/// At least one accepted answer that survives normalization.
fn has_usable_answer(accepted: &[String]) -> bool {
    accepted.iter().any(|a| !normalize(a).is_empty())
}

/// Lifecycle state of one item inside a running lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Unanswered,
    Checked,
    Locked,
}

impl Default for ItemState {
    fn default() -> Self {
        Self::Unanswered
    }
}

/// A learner's answer to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Typed(String),
    /// Zero-based option index.
    Chosen(usize),
}

impl From<&str> for Response {
    fn from(s: &str) -> Self {
        Self::Typed(s.to_string())
    }
}

impl From<String> for Response {
    fn from(s: String) -> Self {
        Self::Typed(s)
    }
}

/// A recorded submission. `seq` is a logical clock, not wall time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub item_id: String,
    pub submitted: String,
    pub seq: u64,
    pub correct: bool,
}

/// Similarity bucket used to phrase feedback on spoken items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBand {
    Close,
    NeedsWork,
    Retry,
}

impl SimilarityBand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::NeedsWork => "needs work",
            Self::Retry => "retry",
        }
    }
}

/// Band boundaries for similarity scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub close: u8,
    pub needs_work: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            close: 80,
            needs_work: 60,
        }
    }
}

impl Thresholds {
    pub fn band(&self, score: u8) -> SimilarityBand {
        if score >= self.close {
            SimilarityBand::Close
        } else if score >= self.needs_work {
            SimilarityBand::NeedsWork
        } else {
            SimilarityBand::Retry
        }
    }
}

/// Result of checking one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub item_id: String,
    pub correct: bool,
    pub explanation: String,
    pub expected: String,
    pub points_awarded: u32,
    /// 1-based attempt number for this item.
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<SimilarityBand>,
}

/// Persisted ledger shape handed to and from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub awarded_keys: Vec<String>,
    pub total: u32,
    #[serde(default)]
    pub streak: u32,
    /// Points earned per awarded key. Older snapshots carry none.
    #[serde(default)]
    pub points: BTreeMap<String, u32>,
}

/// Defaults applied when authoring or running a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSettings {
    pub first_try_points: u32,
    pub retry_points: u32,
    pub thresholds: Thresholds,
}

impl Default for LessonSettings {
    fn default() -> Self {
        Self {
            first_try_points: DEFAULT_FIRST_TRY_POINTS,
            retry_points: DEFAULT_RETRY_POINTS,
            thresholds: Thresholds::default(),
        }
    }
}
