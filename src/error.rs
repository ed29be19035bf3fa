//! Error types for the 5/3/1 engine.

use thiserror::Error;

use crate::domain::Program;

/// Errors raised by program generation and progression.
///
/// Malformed numeric data degrades to zero weights instead of erroring; only
/// identifiers outside their closed domain are rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid {field}: {value}")]
    InvalidDomainValue { field: &'static str, value: String },

    #[error("program {0} requires premium access")]
    PremiumRequired(Program),
}

impl EngineError {
    pub fn invalid(field: &'static str, value: impl ToString) -> Self {
        EngineError::InvalidDomainValue {
            field,
            value: value.to_string(),
        }
    }
}

/// Errors that can occur when loading or saving a program document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("cannot read file: {0}")]
    CannotRead(String),

    #[error("cannot write file: {0}")]
    CannotWrite(String),

    #[error("invalid document format: {0}")]
    InvalidFormat(String),

    #[error("unknown profile: {0}")]
    UnknownProfile(String),
}
