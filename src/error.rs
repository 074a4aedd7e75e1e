//! Error types for smartblock.
//!
//! Evaluation never fails. These errors come from loading rule documents
//! and from validating rules at the point where they are created.

use thiserror::Error;

/// Error type for smartblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rule document has an extension we cannot load
    #[error("unsupported rule document format: {0}")]
    UnsupportedFormat(String),

    /// A rule or custom source failed boundary validation
    #[error("invalid rule {rule}: {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: ValidationError,
    },
}

/// Result type alias for smartblock operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for `HH:mm` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// Missing the `:` separator or non-numeric parts
    #[error("malformed time of day (expected HH:mm): {0:?}")]
    Malformed(String),

    /// Hour or minute out of range
    #[error("time of day out of range: {0:?}")]
    OutOfRange(String),
}

/// Error type for rule shape validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Rule name is blank
    #[error("rule name is empty")]
    EmptyName,

    /// Two rules share an id
    #[error("duplicate rule id: {0}")]
    DuplicateId(String),

    /// Time range boundary does not parse
    #[error("invalid time range: {0}")]
    TimeRange(#[from] TimeRangeError),

    /// Day of week outside 0..=6
    #[error("day of week out of range (0-6): {0}")]
    DayOfWeek(i64),

    /// Show or hide with nothing to act on
    #[error("{0} action has no block ids")]
    EmptyBlockIds(&'static str),

    /// Reorder with nothing to order
    #[error("reorder action has no order")]
    EmptyOrder,

    /// Action type the engine does not know
    #[error("unknown action type")]
    UnknownAction,

    /// Custom source with a blank name
    #[error("custom traffic source name is empty")]
    EmptySourceName,

    /// Custom source with no domains
    #[error("custom traffic source {0} has no domains")]
    EmptySourceDomains(String),
}
