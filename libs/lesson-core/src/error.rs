//! Error types for lesson-core.

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while parsing a lesson file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("field {field} at line {line} appears before any ID")]
    MissingId { field: &'static str, line: usize },

    #[error("missing question for item {id} at line {line}")]
    MissingQuestion { id: String, line: usize },

    #[error("choice item {id} at line {line} has no C: line")]
    MissingCorrectOption { id: String, line: usize },

    #[error("invalid {field} value at line {line}: {value}")]
    InvalidValue {
        field: &'static str,
        line: usize,
        value: String,
    },

    #[error("unknown exercise kind at line {line}: {value}")]
    UnknownKind { line: usize, value: String },

    #[error("duplicate ID {id} at line {line}")]
    DuplicateId { id: String, line: usize },
}

/// Authoring errors that keep an exercise item out of the running lesson.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("exercise item has an empty id")]
    EmptyId,

    #[error("item {id} has no accepted answer")]
    NoAcceptedAnswer { id: String },

    #[error("item {id} has no options")]
    NoOptions { id: String },

    #[error("item {id} marks option {index} correct but only has {len} options")]
    OptionOutOfRange { id: String, index: usize, len: usize },

    #[error("item {id} has threshold {threshold}, expected 0-100")]
    ThresholdOutOfRange { id: String, threshold: u8 },

    #[error("item {id} is defined more than once")]
    DuplicateId { id: String },

    #[error("item id {id} is reserved")]
    ReservedId { id: String },
}

impl ConfigError {
    /// Id of the rejected item, if it had one.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::EmptyId => None,
            Self::NoAcceptedAnswer { id }
            | Self::NoOptions { id }
            | Self::OptionOutOfRange { id, .. }
            | Self::ThresholdOutOfRange { id, .. }
            | Self::DuplicateId { id }
            | Self::ReservedId { id } => Some(id),
        }
    }
}

/// Failure reported by a snapshot store.
#[derive(Debug, Error)]
#[error("storage unavailable: {0}")]
pub struct StorageError(pub String);

/// Failure reported by a speech collaborator.
#[derive(Debug, Error)]
#[error("speech unavailable: {0}")]
pub struct SpeechError(pub String);
