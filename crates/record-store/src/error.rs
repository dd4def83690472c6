use thiserror::Error;
use uuid::Uuid;

use crate::Version;

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record was modified since it was read.
    #[error(
        "Concurrency conflict for {collection} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        collection: String,
        id: Uuid,
        expected: Version,
        actual: Version,
    },

    /// An insert targeted a record that already exists.
    #[error("Record already exists: {collection} {id}")]
    AlreadyExists { collection: String, id: Uuid },

    /// An update targeted a record that does not exist.
    #[error("Record not found: {collection} {id}")]
    NotFound { collection: String, id: Uuid },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the error means another writer got there first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::ConcurrencyConflict { .. } | StoreError::AlreadyExists { .. }
        )
    }
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
