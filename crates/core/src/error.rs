//! Domain error model shared by every warehouse crate.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failure raised while validating or planning a warehouse change.
///
/// Storage and transport failures are not represented here; adapters map
/// their own errors at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Rejected input: blank names, negative prices, duplicate barcodes.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The change would break a business rule on otherwise valid data.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A path or body identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate key or stale header version.
    #[error("conflict: {0}")]
    Conflict(String),
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

    /// `what` names the missing resource, e.g. `"delivery 7"`.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
