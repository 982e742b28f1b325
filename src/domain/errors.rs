//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The API layer maps each variant to an HTTP status and a stable error code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input
    #[error("{0}")]
    Validation(String),
    /// Illegal reservation status change
    #[error("cannot move reservation from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
    /// A review already exists for (reservation, author, direction)
    #[error("a review has already been submitted for this reservation")]
    DuplicateReview,
    /// Author and recipient of a review are the same user
    #[error("a user cannot review themselves")]
    SelfReview,
    /// Actor is not allowed to perform the operation
    #[error("{0}")]
    Permission(String),
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),
    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),
    /// Database/persistence error
    #[error("database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: &str) -> Self {
        DomainError::NotFound(what.to_string())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        DomainError::Permission(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::DuplicateReview => "duplicate_review",
            DomainError::SelfReview => "self_review",
            DomainError::Permission(_) => "permission_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::Unauthorized(_) => "authentication_error",
            DomainError::Database(_) => "database_error",
            DomainError::Internal(_) => "internal_error",
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, DomainError::Database(_) | DomainError::Internal(_))
    }
}

// Conversion from SeaORM errors (used in infrastructure and services)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
