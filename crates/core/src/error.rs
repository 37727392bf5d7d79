//! Errors raised by aggregates while deciding commands.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Business-rule failure produced by `Aggregate::handle`.
///
/// Storage, authorization and transport failures never appear here; the
/// engine layer wraps those separately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input the caller can correct and resubmit.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The command is well-formed but the record's current state forbids it
    /// (editing a non-draft price list, placing an empty order).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The command targets a record that was never created.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Status change not present in the lifecycle table.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }

    pub fn invalid_transition(from: impl core::fmt::Display, to: impl core::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
