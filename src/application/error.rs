//! Errors reported to tool callers.

use thiserror::Error;

use crate::domain::errors::{BulkValidationError, DomainError, InstanceError};

/// Failure of a context-level operation, as reported to a tool caller.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Instance configuration or client construction failed.
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// The request was rejected before any backend call.
    #[error(transparent)]
    Validation(#[from] BulkValidationError),

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] DomainError),
}

impl ProxyError {
    /// Stable machine-readable kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Instance(e) => e.kind().as_str(),
            Self::Validation(BulkValidationError::NotAList(_)) => "INVALID_INPUT_TYPE",
            Self::Validation(_) => "INVALID_INPUT",
            Self::Backend(DomainError::NotFound { .. }) => "NOT_FOUND",
            Self::Backend(DomainError::ReadOnlyInstance { .. }) => "READ_ONLY_INSTANCE",
            Self::Backend(DomainError::Unauthorized(_)) => "UNAUTHORIZED",
            Self::Backend(DomainError::RateLimited(_)) => "RATE_LIMITED",
            Self::Backend(_) => "BACKEND_ERROR",
        }
    }
}

/// Result of a context-level operation.
pub type ProxyResult<T> = Result<T, ProxyError>;
