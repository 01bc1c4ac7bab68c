//! Error types for the rewards ledger.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, RewardsError>;

/// Errors surfaced by ledger and catalog operations.
///
/// Display strings are written for direct display to the end user where the
/// variant is user-facing (`ValidationFailed`, `PartialFailure`).
#[derive(Debug, thiserror::Error)]
pub enum RewardsError {
    /// Referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record ("account", "ringtone", ...).
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request rejected by a business rule.
    #[error("{0}")]
    ValidationFailed(String),

    /// Actor is not allowed to act on the target account.
    #[error("not authorized to act on this account")]
    Unauthorized,

    /// A mutation succeeded but a follow-up write did not.
    #[error("{message}")]
    PartialFailure {
        /// Which step failed.
        step: &'static str,
        /// User-facing guidance.
        message: String,
    },

    /// Guarded update kept losing to concurrent writers.
    #[error("account is busy, please retry")]
    Contention,

    /// Status transition not allowed from the current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl RewardsError {
    /// Shorthand for a missing account.
    #[must_use]
    pub fn account_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "account",
            id: id.to_string(),
        }
    }
}
