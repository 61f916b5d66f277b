//! Unified error types for the request workflow.
//!
//! Every operation returns [`Result`]. Failures abort the enclosing database
//! transaction, so prior state is left unchanged.

use sea_orm::DbErr;
use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// A business rule refused the action (fees, income account, stage gating, uploads)
    #[error("Validation error: {message}")]
    Validation {
        /// Message surfaced to the acting citizen or staff member
        message: String,
    },

    /// A document slot already exists for this (request, requirement) pair
    #[error("Requirement {requirement_id} already added for request {request_id}")]
    DuplicateDocument {
        /// Owning request
        request_id: i64,
        /// Requirement of the duplicated slot
        requirement_id: i64,
    },

    /// Fee amount is negative or not a finite number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Record kind, e.g. `"request"`
        entity: &'static str,
        /// Primary key that was looked up
        id: i64,
    },

    /// Configuration or seed data problem
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
