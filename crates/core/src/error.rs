//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a failure, stable across layers.
///
/// Transport layers map this to their own status codes; the core only promises
/// that the same condition always produces the same kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Unauthenticated,
    Forbidden,
    Internal,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal_error",
        };
        f.write_str(s)
    }
}

/// Domain-level error.
///
/// Absence is not an error: lookups and credential checks return `Option`.
/// These variants are reserved for malformed input, constraint violations,
/// authorization failures and infrastructure faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input; `field` names the offending input.
    #[error("validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A unique key already exists (entity or assignment edge).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An id or name did not resolve to an existing row.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing, invalid or expired credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// A valid identity lacking the required grant.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unexpected storage or signing failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }
}
