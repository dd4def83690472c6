//! Offers: manufacturer bids and the single-winner acceptance rule.

mod commands;
mod entity;
mod service;

pub use commands::SubmitOffer;
pub use entity::{Offer, OfferTerms};
pub use service::{AcceptOutcome, OfferService};

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during offer operations.
#[derive(Debug, Error)]
pub enum OfferError {
    /// A required term was not supplied.
    #[error("Offer is missing {field}")]
    MissingTerm { field: &'static str },

    /// A term was zero or negative.
    #[error("Offer {field} must be greater than 0")]
    NonPositiveTerm { field: &'static str },

    /// The offer was already accepted.
    #[error("Offer has already been accepted")]
    AlreadyAccepted,

    /// The offer was already declined.
    #[error("Offer has already been declined")]
    AlreadyDeclined,
}

impl OfferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OfferError::MissingTerm { .. } | OfferError::NonPositiveTerm { .. } => {
                ErrorKind::Validation
            }
            OfferError::AlreadyAccepted | OfferError::AlreadyDeclined => ErrorKind::Conflict,
        }
    }
}
