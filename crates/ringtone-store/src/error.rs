//! Error types for ledger storage.

use ringtone_core::RewardsError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier looked up.
        id: String,
    },

    /// Guarded write lost: the record changed since it was read.
    #[error("{entity} {id} was modified concurrently")]
    VersionConflict {
        /// Kind of record.
        entity: &'static str,
        /// Identifier written.
        id: String,
    },

    /// Backend unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<StoreError> for RewardsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::VersionConflict { .. } => Self::Contention,
            StoreError::Database(msg)
            | StoreError::Serialization(msg)
            | StoreError::Unavailable(msg) => Self::Storage(msg),
        }
    }
}
