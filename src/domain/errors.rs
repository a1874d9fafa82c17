//! Domain errors for the boardgate access layer.
//!
//! Three families live here:
//! - [`DomainError`]: backend/client failures. These are ordinary data for
//!   cache fetchers and per-item bulk results.
//! - [`InstanceError`]: deployment and programming errors raised while
//!   loading instance configuration, resolving an instance or building its
//!   client. Each carries a stable [`InstanceErrorKind`].
//! - [`BulkValidationError`]: pre-flight rejection of a bulk request.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Format a list of names for error messages: `a, b, c` or `(none)`.
fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Errors raised by backend clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The resource does not exist on the instance.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource label, e.g. `Board`.
        resource: String,
        /// Requested id.
        id: i64,
    },

    /// A write was refused locally because the instance is read-only.
    #[error("Instance '{instance}' is read-only: {operation} refused")]
    ReadOnlyInstance {
        /// Instance name.
        instance: String,
        /// Refused operation.
        operation: String,
    },

    /// The backend rejected the API token.
    #[error("Authentication failed for instance '{0}'")]
    Unauthorized(String),

    /// The backend answered 429.
    #[error("Rate limit exceeded on instance '{0}'")]
    RateLimited(String),

    /// Transport failure or unexpected status. `message` is scrubbed of secrets.
    #[error("API request failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ApiRequestFailed {
        /// HTTP status, when a response arrived.
        status: Option<u16>,
        /// Scrubbed failure description.
        message: String,
    },

    /// The backend answered with a payload that could not be decoded.
    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    /// A request was rejected before it was sent.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Result of a backend client call.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<reqwest::Error> for DomainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::InvalidResponse(err.to_string());
        }
        Self::ApiRequestFailed {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Stable, machine-readable classification of an [`InstanceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceErrorKind {
    /// No configuration source was found.
    ConfigNotFound,
    /// A configuration source failed validation.
    ConfigInvalid,
    /// The requested instance is not configured.
    InstanceNotFound,
    /// The instance token variable is unset.
    TokenMissing,
    /// The client could not be built or initialized.
    ClientInitFailed,
}

impl InstanceErrorKind {
    /// Screaming-snake-case name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigNotFound => "CONFIG_NOT_FOUND",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::InstanceNotFound => "INSTANCE_NOT_FOUND",
            Self::TokenMissing => "TOKEN_MISSING",
            Self::ClientInitFailed => "CLIENT_INIT_FAILED",
        }
    }
}

impl fmt::Display for InstanceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance configuration, resolution and client construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstanceError {
    /// Strict mode found no configuration source.
    #[error("No instance configuration found (searched: {})", format_names(.searched))]
    ConfigNotFound {
        /// Sources tried, in order.
        searched: Vec<String>,
    },

    /// A configuration source exists but failed validation.
    #[error("Invalid instance configuration in {source_name}{}: {reason}", .field.as_ref().map(|f| format!(" at '{f}'")).unwrap_or_default())]
    ConfigInvalid {
        /// Source that failed, e.g. a file path.
        source_name: String,
        /// Dotted path of the offending field, when known.
        field: Option<String>,
        /// What is wrong.
        reason: String,
    },

    /// The requested name matches no configured instance.
    #[error("Instance '{name}' not found (available: {})", format_names(.available))]
    InstanceNotFound {
        /// Requested name.
        name: String,
        /// Configured names.
        available: Vec<String>,
    },

    /// The token variable named by the descriptor is unset or blank.
    #[error("API token for instance '{instance}' is missing: environment variable {env_var} is not set or blank")]
    TokenMissing {
        /// Instance name.
        instance: String,
        /// Variable that should hold the token.
        env_var: String,
    },

    /// The client could not be built or its initialization failed.
    #[error("Failed to initialize client for instance '{instance}': {reason}")]
    ClientInitFailed {
        /// Instance name.
        instance: String,
        /// Scrubbed failure description.
        reason: String,
    },
}

impl InstanceError {
    /// Classification of this error.
    pub const fn kind(&self) -> InstanceErrorKind {
        match self {
            Self::ConfigNotFound { .. } => InstanceErrorKind::ConfigNotFound,
            Self::ConfigInvalid { .. } => InstanceErrorKind::ConfigInvalid,
            Self::InstanceNotFound { .. } => InstanceErrorKind::InstanceNotFound,
            Self::TokenMissing { .. } => InstanceErrorKind::TokenMissing,
            Self::ClientInitFailed { .. } => InstanceErrorKind::ClientInitFailed,
        }
    }

    pub(crate) fn invalid(
        source_name: impl Into<String>,
        field: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConfigInvalid {
            source_name: source_name.into(),
            field: field.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// Result of instance resolution and client construction.
pub type InstanceResult<T> = Result<T, InstanceError>;

/// Pre-flight validation failures of a bulk request. Raised before any
/// per-item operation runs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BulkValidationError {
    /// The ids argument was not a JSON array.
    #[error("Bulk ids must be a list, got {0}")]
    NotAList(String),

    /// More ids than the executor accepts.
    #[error("Bulk request has {actual} ids, exceeding the limit of {limit}")]
    TooManyItems {
        /// Largest batch accepted.
        limit: usize,
        /// Ids submitted.
        actual: usize,
    },

    /// An id was not a positive integer.
    #[error("Invalid id at index {index}: {value} is not a positive integer")]
    InvalidId {
        /// Position in the ids array.
        index: usize,
        /// Offending value.
        value: String,
    },
}
