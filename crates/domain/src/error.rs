//! Domain error types.

use record_store::StoreError;
use thiserror::Error;

use crate::assembly::AssemblyError;
use crate::offer::OfferError;
use crate::order::OrderError;

/// Broad classification of a failure, used by callers to decide how to
/// report it and whether a retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input was malformed or incomplete.
    Validation,
    /// Someone else already acted on the entity.
    Conflict,
    /// The referenced entity does not exist.
    NotFound,
    /// The caller is not allowed to perform the operation.
    Forbidden,
    /// The store or another dependency failed; retryable.
    Infrastructure,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the record store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An order rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An offer rule was violated.
    #[error("Offer error: {0}")]
    Offer(#[from] OfferError),

    /// An assembly rule was violated.
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller lacks the role or ownership required.
    #[error("Not permitted to {action}")]
    Forbidden { action: &'static str },

    /// The entity changed between read and conditional write.
    #[error("{entity} {id} was modified concurrently during {operation}; reload and retry")]
    StaleWrite {
        entity: &'static str,
        id: String,
        operation: &'static str,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Maps a store conflict on commit to a stale-write error; other store
    /// errors pass through.
    pub(crate) fn from_commit(
        err: StoreError,
        entity: &'static str,
        id: impl ToString,
        operation: &'static str,
    ) -> Self {
        if err.is_conflict() {
            DomainError::StaleWrite {
                entity,
                id: id.to_string(),
                operation,
            }
        } else {
            DomainError::Store(err)
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Store(err) => match err {
                StoreError::ConcurrencyConflict { .. } | StoreError::AlreadyExists { .. } => {
                    ErrorKind::Conflict
                }
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                _ => ErrorKind::Infrastructure,
            },
            DomainError::Order(err) => err.kind(),
            DomainError::Offer(err) => err.kind(),
            DomainError::Assembly(err) => err.kind(),
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Forbidden { .. } => ErrorKind::Forbidden,
            DomainError::StaleWrite { .. } => ErrorKind::Conflict,
            DomainError::Serialization(_) => ErrorKind::Infrastructure,
        }
    }
}
