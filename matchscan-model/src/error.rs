use std::fmt::{self, Display};

/// Errors produced by model constructors and wire-format parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The task parameter string did not carry the expected field count.
    FieldCount { expected: usize, found: usize },
    /// A single field failed to parse.
    InvalidField { field: &'static str, value: String },
    UnknownScanType(String),
    UnknownGame(String),
    /// A file-time or tick value does not map onto a representable instant.
    OutOfRange(i64),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::FieldCount { expected, found } => write!(
                f,
                "task parameter string has {found} fields, expected {expected}"
            ),
            ModelError::InvalidField { field, value } => {
                write!(f, "invalid value for {field}: {value:?}")
            }
            ModelError::UnknownScanType(value) => {
                write!(f, "unknown scan type: {value:?}")
            }
            ModelError::UnknownGame(value) => {
                write!(f, "unknown game id: {value:?}")
            }
            ModelError::OutOfRange(value) => {
                write!(f, "time value out of range: {value}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
