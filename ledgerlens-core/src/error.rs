//! Failures raised by the schema layer.

use thiserror::Error;

/// No processor is registered for the requested selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported statement kind: '{0}'")]
pub struct UnsupportedKind(pub String);

/// The specific constraint a field broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("required field is missing")]
    Missing,
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value must not be empty")]
    Empty,
    #[error("'{0}' is not a recognizable date")]
    InvalidDate(String),
    #[error("'{0}' is not a decimal amount")]
    InvalidDecimal(String),
    #[error("'{value}' is not one of {allowed:?}")]
    NotOneOf {
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("period start {start} is after end {end}")]
    PeriodReversed { start: String, end: String },
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// A candidate record failed validation at `field`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}': {violation}")]
pub struct SchemaViolation {
    /// Dotted path with list indices, e.g. `transactions[2].amount`
    pub field: String,
    pub violation: Violation,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        Self {
            field: field.into(),
            violation,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, Violation::Missing)
    }
}
