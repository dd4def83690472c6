//! The order entity.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use common::{OfferId, OrderId, UserId};
use record_store::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::{validate_address, validate_shipping_info};
use super::{CreateOrderDraft, OrderError, OrderStatus, StatusMachine, TagId, UpdateShipping, find_tag};
use crate::offer::Offer;
use crate::value_objects::{Address, Contact, PriceSnapshot, ShippingInfo};

/// A manufacturing request placed by a creator.
///
/// `manufacturer` is set exactly when the status is at or beyond
/// "Order Accepted", and then `selected_offer` names the one accepted offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_archived: bool,
    pub tags: BTreeSet<TagId>,
    pub delivery_address: Option<Address>,
    pub shipping_info: Option<ShippingInfo>,
    pub price: Option<PriceSnapshot>,
    pub livestream_url: Option<String>,
    pub selected_offer: Option<OfferId>,
    pub offers: Vec<OfferId>,
    pub creator: Contact,
    pub manufacturer: Option<Contact>,
    pub status: OrderStatus,
    pub project_files: Vec<String>,
}

impl Entity for Order {
    const COLLECTION: &'static str = "orders";

    fn entity_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Order {
    /// Validates a draft command and builds a new order in "Order Created".
    pub fn draft(
        cmd: CreateOrderDraft,
        creator: Contact,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let title = cmd.title.trim();
        if title.is_empty() {
            return Err(OrderError::TitleRequired);
        }
        if cmd.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: cmd.quantity,
            });
        }
        if let Some(tag) = cmd.tags.iter().find(|tag| find_tag(**tag).is_none()) {
            return Err(OrderError::UnknownTag { tag: *tag });
        }
        let created_on = now.date_naive();
        if cmd.due_date < created_on {
            return Err(OrderError::DueDateInPast {
                due_date: cmd.due_date,
                created_on,
            });
        }
        if let Some(address) = &cmd.delivery_address {
            validate_address(address)?;
        }

        Ok(Self {
            id: OrderId::new(),
            title: title.to_string(),
            description: cmd.description,
            quantity: cmd.quantity,
            due_date: cmd.due_date,
            created_at: now,
            updated_at: now,
            is_archived: false,
            tags: cmd.tags,
            delivery_address: cmd.delivery_address,
            shipping_info: None,
            price: None,
            livestream_url: cmd.livestream_url.filter(|url| !url.trim().is_empty()),
            selected_offer: None,
            offers: Vec::new(),
            creator,
            manufacturer: None,
            status: OrderStatus::OrderCreated,
            project_files: cmd.project_files,
        })
    }

    /// Returns true if `user` created the order.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.creator.user_id == user
    }

    /// Returns true if `user` is the assigned manufacturer.
    pub fn is_manufactured_by(&self, user: UserId) -> bool {
        self.manufacturer
            .as_ref()
            .is_some_and(|manufacturer| manufacturer.user_id == user)
    }

    /// Returns true if no manufacturer has claimed the order.
    pub fn is_unclaimed(&self) -> bool {
        self.manufacturer.is_none()
    }

    /// The participant on the other side from `user`, if any.
    pub fn counterpart_of(&self, user: UserId) -> Option<Contact> {
        if self.is_owned_by(user) {
            self.manufacturer.clone()
        } else {
            Some(self.creator.clone())
        }
    }

    /// Checks that manufacturers may still bid.
    pub fn ensure_open_for_offers(&self) -> Result<(), OrderError> {
        if self.is_archived {
            return Err(OrderError::Archived);
        }
        if !self.is_unclaimed() || self.status.is_claimed() {
            return Err(OrderError::AlreadyClaimed);
        }
        Ok(())
    }

    /// Records a new offer; the first one moves the order to "Manufacturer Offer".
    pub fn record_offer(&mut self, offer_id: OfferId, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_open_for_offers()?;

        self.offers.push(offer_id);
        if self.status == OrderStatus::OrderCreated {
            self.status = OrderStatus::ManufacturerOffer;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Claims the order for the manufacturer behind `offer`.
    pub fn assign_manufacturer(&mut self, offer: &Offer, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_open_for_offers()?;
        if self.selected_offer.is_some() {
            return Err(OrderError::AlreadyClaimed);
        }

        self.manufacturer = Some(offer.manufacturer.clone());
        self.selected_offer = Some(offer.id);
        self.price = Some(offer.terms.price_snapshot());
        self.status = OrderStatus::OrderAccepted;
        self.updated_at = now;
        Ok(())
    }

    /// Moves a claimed order to its next stage, returning `(from, to)`.
    ///
    /// Shipping details are recorded only when entering "Shipped".
    pub fn advance(
        &mut self,
        machine: &StatusMachine,
        shipping: Option<ShippingInfo>,
        now: DateTime<Utc>,
    ) -> Result<(OrderStatus, OrderStatus), OrderError> {
        if self.is_archived {
            return Err(OrderError::Archived);
        }
        if !self.status.is_claimed() {
            return Err(OrderError::InvalidStatusTransition {
                current: self.status,
                action: "advance an unclaimed order",
            });
        }
        let next = machine
            .next(self.status)
            .ok_or(OrderError::InvalidStatusTransition {
                current: self.status,
                action: "advance",
            })?;

        if next == OrderStatus::Shipped {
            if let Some(info) = shipping {
                validate_shipping_info(&info)?;
                self.shipping_info = Some(info);
            }
        }

        let from = self.status;
        self.status = next;
        self.updated_at = now;
        Ok((from, next))
    }

    /// Applies new delivery details, returning the names of changed fields.
    pub fn update_shipping(
        &mut self,
        cmd: UpdateShipping,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, OrderError> {
        if self.is_archived {
            return Err(OrderError::Archived);
        }
        cmd.validate()?;

        let mut changes = Vec::new();
        if let Some(address) = cmd.delivery_address {
            if self.delivery_address.as_ref() != Some(&address) {
                self.delivery_address = Some(address);
                changes.push("delivery address".to_string());
            }
        }
        if let Some(info) = cmd.shipping_info {
            if self.shipping_info.as_ref() != Some(&info) {
                self.shipping_info = Some(info);
                changes.push("shipping info".to_string());
            }
        }
        if !changes.is_empty() {
            self.updated_at = now;
        }
        Ok(changes)
    }

    /// Soft-deletes the order. Returns false if it was already archived.
    pub fn archive(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_archived {
            return false;
        }
        self.is_archived = true;
        self.updated_at = now;
        true
    }
}
