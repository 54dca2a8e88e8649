//! Error types for the notification engine.

use std::time::Duration;

use thiserror::Error;

use crate::repository::OwnershipViolation;

/// Result type alias using the engine's error type.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failures surfaced to callers of the engine.
///
/// Suppressed and duplicate outcomes are not errors: the engine returns
/// `Ok(None)` or the existing record for those.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Referenced recipient, actor or target does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller does not own the notification it tried to touch
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed event or request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Ledger write did not complete within the configured deadline
    #[error("Ledger write timed out after {0:?}")]
    Timeout(Duration),

    /// Ledger or preference storage failed
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
}

impl EngineError {
    /// Short machine-readable code, used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Timeout(_) => "timeout",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<OwnershipViolation>() {
            Ok(violation) => Self::Forbidden(violation.to_string()),
            Err(err) => Self::Storage(err),
        }
    }
}
