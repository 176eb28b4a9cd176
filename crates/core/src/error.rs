//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// The first five variants are business failures: they abort the enclosing
/// unit of work and are returned to the caller as-is. `Persistence` covers
/// failures of the storage layer itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (e.g. a negative quantity or an out-of-range discount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A business-unique key is already taken, or a row changed underneath
    /// the current unit of work.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced entity is missing (or soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requested quantity exceeds what batches, buckets or locations hold.
    #[error("insufficient stock for {context}: requested {requested}, available {available}")]
    InsufficientStock {
        context: String,
        requested: i64,
        available: i64,
    },

    /// The operation is illegal for the current state of the entity.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The underlying storage failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn insufficient_stock(context: impl Into<String>, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            context: context.into(),
            requested,
            available,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// True for the business kinds; false for storage failures.
    pub fn is_business(&self) -> bool {
        !matches!(self, DomainError::Persistence(_))
    }
}

/// Reject zero and negative quantities.
pub fn ensure_positive(quantity: i64, what: &str) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "{what} must be positive (got {quantity})"
        )));
    }
    Ok(())
}
