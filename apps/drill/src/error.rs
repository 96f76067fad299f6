//! Error handling for the drill host.

use lesson_core::ParseError;
use thiserror::Error;

/// Errors that stop a drill before the first exercise is shown.
#[derive(Debug, Error)]
pub enum DrillError {
    #[error("no lesson file given: pass a path or set DRILL_LESSON")]
    MissingLesson,

    #[error("invalid {name} value: {value}")]
    InvalidConfig { name: &'static str, value: String },

    #[error("could not read lesson {path}: {source}")]
    ReadLesson {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lesson parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("lesson {0} has no usable exercises")]
    EmptyLesson(String),
}

/// Result type alias for host setup.
pub type Result<T> = std::result::Result<T, DrillError>;
