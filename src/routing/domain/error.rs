//! Error types for routing domain parsing and validation.

use thiserror::Error;

/// Error returned while parsing persisted domain values.
///
/// Enum-like conversation fields are stored as lowercase strings; this
/// error surfaces any value the current vocabulary does not recognize.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {field} value: {value}")]
pub struct ParseDomainValueError {
    /// Which field failed to parse.
    pub field: &'static str,
    /// The rejected raw value.
    pub value: String,
}

impl ParseDomainValueError {
    /// Creates a parse error for the given field and raw value.
    #[must_use]
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}
