//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// role/ownership checks, missing entities). Infrastructure concerns belong elsewhere.
///
/// Every variant carries a human-readable message that is safe to show to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or malformed input (absent fields, non-positive price, empty cart,
    /// missing guest session token).
    #[error("{0}")]
    Validation(String),

    /// A role or ownership check failed (not artisan, not owner, not admin).
    #[error("{0}")]
    Permission(String),

    /// The operation requires a logged-in identity.
    #[error("{0}")]
    Authentication(String),

    /// The referenced entity is absent or not visible to the caller.
    ///
    /// Also used to mask cross-scope existence.
    #[error("{0}")]
    NotFound(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::Permission(_) => "permission_denied",
            DomainError::Authentication(_) => "authentication_required",
            DomainError::NotFound(_) => "not_found",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::InvariantViolation(_) => "invariant_violation",
        }
    }
}
