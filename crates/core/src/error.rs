//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic domain failures. Infrastructure
/// concerns (store/session failures) belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation at construction time.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A visa check denied a mutation. Raised before any state change, so the
    /// aggregate is guaranteed unmodified.
    #[error("permission denied: {0}")]
    Permission(String),

    /// An operation was attempted in an invalid lifecycle state (mutating a
    /// deleted aggregate, computing a visa before a required reference is set).
    #[error("structural: {0}")]
    Structural(String),

    /// A repository lookup matched no record.
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn permission(what: impl Into<String>) -> Self {
        Self::Permission(what.into())
    }

    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Value-object construction failure.
///
/// Always local to the field being set; never wraps a permission concern.
/// Numeric range violations reuse `TooShort`/`TooLong` (bounds carried as
/// `i64` so both string lengths and numeric values fit).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: too short (min {min}, got {actual})")]
    TooShort {
        field: &'static str,
        min: i64,
        actual: i64,
    },

    #[error("{field}: too long (max {max}, got {actual})")]
    TooLong {
        field: &'static str,
        max: i64,
        actual: i64,
    },

    #[error("{field}: wrong type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("{field}: '{value}' is not an allowed value")]
    NotInEnumeration {
        field: &'static str,
        value: String,
    },
}

impl ValidationError {
    /// Which field the failing value was destined for.
    pub fn field(&self) -> &'static str {
        match self {
            Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::WrongType { field, .. }
            | Self::NotInEnumeration { field, .. } => field,
        }
    }
}
