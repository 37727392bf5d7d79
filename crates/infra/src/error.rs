//! Engine-level error taxonomy.
//!
//! Callers branch on [`EngineError::kind`]; the message carries detail for
//! logs and display.

use thiserror::Error;

use tradegate_auth::AuthzError;
use tradegate_core::DomainError;

use crate::store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse error category exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input; fix it and resubmit.
    Validation,
    /// Duplicate, illegal transition or lost race; retrying may succeed.
    Conflict,
    NotFound,
    Authorization,
    /// The document store itself failed.
    Store,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Optimistic concurrency failure; safe to reload and retry.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("store failure: {0}")]
    Store(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Conflict(_) | EngineError::Concurrency(_) => ErrorKind::Conflict,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Authorization(_) => ErrorKind::Authorization,
            EngineError::Store(_) => ErrorKind::Store,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Concurrency(_))
    }

    pub fn not_found(what: impl core::fmt::Display) -> Self {
        EngineError::NotFound(what.to_string())
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::NotFound(entity) => EngineError::NotFound(entity.to_string()),
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
            e @ DomainError::InvalidTransition { .. } => EngineError::Conflict(e.to_string()),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            e @ StoreError::DuplicateKey { .. } => EngineError::Conflict(e.to_string()),
            e @ StoreError::Concurrency { .. } => EngineError::Concurrency(e.to_string()),
            e @ StoreError::NotFound { .. } => EngineError::NotFound(e.to_string()),
            e @ (StoreError::InvalidPatch(_) | StoreError::Unavailable(_)) => {
                EngineError::Store(e.to_string())
            }
        }
    }
}

impl From<AuthzError> for EngineError {
    fn from(value: AuthzError) -> Self {
        EngineError::Authorization(value.to_string())
    }
}
