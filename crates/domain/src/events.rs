//! Domain events written to the outbox alongside state changes.
//!
//! Each event carries the minimal snapshot a consumer needs (for example an
//! email template) so the outbox can be processed without reloading entities.

use chrono::NaiveDate;
use common::{AssemblyId, OfferId, OrderId};
use record_store::NewEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::offer::Offer;
use crate::order::{Order, OrderStatus};
use crate::value_objects::{Contact, Money, PriceSnapshot, ShippingInfo};

/// Trait for events that can be appended to the outbox.
pub trait DomainEvent: Serialize + Sized {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the id of the entity the event is about.
    fn entity_id(&self) -> Uuid;

    /// Packages the event for a [`record_store::WriteBatch`].
    fn to_outbox(&self) -> record_store::Result<NewEvent> {
        NewEvent::new(self.event_type(), self.entity_id(), self)
    }
}

/// Order fields carried by events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub title: String,
    pub quantity: u32,
    pub due_date: NaiveDate,
    pub status: OrderStatus,
    pub creator: Contact,
    pub manufacturer: Option<Contact>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            title: order.title.clone(),
            quantity: order.quantity,
            due_date: order.due_date,
            status: order.status,
            creator: order.creator.clone(),
            manufacturer: order.manufacturer.clone(),
        }
    }
}

/// Offer fields carried by events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSummary {
    pub id: OfferId,
    pub manufacturer: Contact,
    pub unit_cost: Money,
    pub projected_cost: Money,
    pub projected_units: u32,
    pub shipping_cost: Money,
    pub lead_time_days: u32,
}

impl From<&Offer> for OfferSummary {
    fn from(offer: &Offer) -> Self {
        Self {
            id: offer.id,
            manufacturer: offer.manufacturer.clone(),
            unit_cost: offer.terms.unit_cost,
            projected_cost: offer.terms.projected_cost,
            projected_units: offer.terms.projected_units,
            shipping_cost: offer.terms.shipping_cost,
            lead_time_days: offer.terms.lead_time_days,
        }
    }
}

impl OfferSummary {
    /// Price terms of the offer.
    pub fn price(&self) -> PriceSnapshot {
        PriceSnapshot {
            unit_cost: self.unit_cost,
            projected_cost: self.projected_cost,
            projected_units: self.projected_units,
            shipping_cost: self.shipping_cost,
        }
    }
}

/// Events raised by marketplace operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MarketEvent {
    /// A creator drafted a new order.
    OrderCreated { order: OrderSummary },

    /// A manufacturer bid on an order.
    OfferSubmitted {
        order: OrderSummary,
        offer: OfferSummary,
    },

    /// The creator accepted an offer; the order is now claimed.
    OfferAccepted {
        order: OrderSummary,
        offer: OfferSummary,
    },

    /// The creator declined an offer.
    OfferDeclined {
        order: OrderSummary,
        offer: OfferSummary,
    },

    /// The order moved to the next manufacturing stage.
    OrderStatusAdvanced {
        order: OrderSummary,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The order entered the "Shipped" stage.
    OrderShipped {
        order: OrderSummary,
        shipping: Option<ShippingInfo>,
    },

    /// Order details changed; `recipient` is the participant to inform.
    OrderUpdated {
        order: OrderSummary,
        recipient: Option<Contact>,
        changes: Vec<String>,
    },

    /// The order was archived.
    OrderArchived { order: OrderSummary },

    /// Parts were grouped into a new assembly.
    AssemblyCreated {
        order_id: OrderId,
        assembly_id: AssemblyId,
        name: String,
        part_count: usize,
    },

    /// The build order of an order's assemblies was replaced.
    AssembliesReordered {
        order_id: OrderId,
        assembly_ids: Vec<AssemblyId>,
    },
}

impl DomainEvent for MarketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MarketEvent::OrderCreated { .. } => "OrderCreated",
            MarketEvent::OfferSubmitted { .. } => "OfferSubmitted",
            MarketEvent::OfferAccepted { .. } => "OfferAccepted",
            MarketEvent::OfferDeclined { .. } => "OfferDeclined",
            MarketEvent::OrderStatusAdvanced { .. } => "OrderStatusAdvanced",
            MarketEvent::OrderShipped { .. } => "OrderShipped",
            MarketEvent::OrderUpdated { .. } => "OrderUpdated",
            MarketEvent::OrderArchived { .. } => "OrderArchived",
            MarketEvent::AssemblyCreated { .. } => "AssemblyCreated",
            MarketEvent::AssembliesReordered { .. } => "AssembliesReordered",
        }
    }

    fn entity_id(&self) -> Uuid {
        match self {
            MarketEvent::OrderCreated { order }
            | MarketEvent::OrderStatusAdvanced { order, .. }
            | MarketEvent::OrderShipped { order, .. }
            | MarketEvent::OrderUpdated { order, .. }
            | MarketEvent::OrderArchived { order } => order.id.as_uuid(),
            MarketEvent::OfferSubmitted { offer, .. }
            | MarketEvent::OfferAccepted { offer, .. }
            | MarketEvent::OfferDeclined { offer, .. } => offer.id.as_uuid(),
            MarketEvent::AssemblyCreated { assembly_id, .. } => assembly_id.as_uuid(),
            MarketEvent::AssembliesReordered { order_id, .. } => order_id.as_uuid(),
        }
    }
}
