//! The offer entity.

use chrono::{DateTime, Utc};
use common::{OfferId, OrderId};
use record_store::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OfferError;
use crate::value_objects::{Contact, Money, PriceSnapshot};

/// Validated cost and lead-time terms of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub unit_cost: Money,
    pub projected_cost: Money,
    pub projected_units: u32,
    pub shipping_cost: Money,
    pub lead_time_days: u32,
}

impl OfferTerms {
    /// Price terms to copy onto the order once the offer wins.
    pub fn price_snapshot(&self) -> PriceSnapshot {
        PriceSnapshot {
            unit_cost: self.unit_cost,
            projected_cost: self.projected_cost,
            projected_units: self.projected_units,
            shipping_cost: self.shipping_cost,
        }
    }
}

/// A manufacturer's bid on an order.
///
/// `is_accepted` and `is_declined` are never both set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub order_id: OrderId,
    pub manufacturer: Contact,
    #[serde(flatten)]
    pub terms: OfferTerms,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_accepted: bool,
    pub is_declined: bool,
}

impl Entity for Offer {
    const COLLECTION: &'static str = "offers";

    fn entity_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Offer {
    pub fn new(order_id: OrderId, manufacturer: Contact, terms: OfferTerms, now: DateTime<Utc>) -> Self {
        Self {
            id: OfferId::new(),
            order_id,
            manufacturer,
            terms,
            created_at: now,
            updated_at: now,
            is_accepted: false,
            is_declined: false,
        }
    }

    /// Returns true while the offer is neither accepted nor declined.
    pub fn is_open(&self) -> bool {
        !self.is_accepted && !self.is_declined
    }

    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), OfferError> {
        if self.is_declined {
            return Err(OfferError::AlreadyDeclined);
        }
        if self.is_accepted {
            return Err(OfferError::AlreadyAccepted);
        }
        self.is_accepted = true;
        self.updated_at = now;
        Ok(())
    }

    /// Declines the offer. Returns false if it was already declined.
    pub fn decline(&mut self, now: DateTime<Utc>) -> Result<bool, OfferError> {
        if self.is_accepted {
            return Err(OfferError::AlreadyAccepted);
        }
        if self.is_declined {
            return Ok(false);
        }
        self.is_declined = true;
        self.updated_at = now;
        Ok(true)
    }
}
