//! Error types for Trueno-AB
//!
//! Validation and precondition failures are surfaced verbatim. Conflicts are
//! produced by stores and resolved inside the assignment service.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-AB error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (user id, variant key, weight, variant set)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Experiment is not configured well enough to assign users
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Another caller bound this (experiment, user) pair first
    #[error("Assignment already exists for experiment {experiment_id} and user {user_id}")]
    Conflict {
        /// Experiment of the contested binding
        experiment_id: String,
        /// User of the contested binding
        user_id: String,
    },

    /// Storage unavailable or in an unexpected state
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`Error::Persistence`].
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// True for the uniqueness race reported by `create_assignment`.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
