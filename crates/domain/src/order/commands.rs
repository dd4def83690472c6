//! Order commands and views.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus, TagId};
use crate::value_objects::{Address, ShippingInfo};

/// Command to draft a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub quantity: u32,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub tags: BTreeSet<TagId>,
    #[serde(default)]
    pub delivery_address: Option<Address>,
    #[serde(default)]
    pub livestream_url: Option<String>,
    #[serde(default)]
    pub project_files: Vec<String>,
}

impl CreateOrderDraft {
    /// Creates a draft command with the required fields.
    pub fn new(title: impl Into<String>, quantity: u32, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            quantity,
            due_date,
            tags: BTreeSet::new(),
            delivery_address: None,
            livestream_url: None,
            project_files: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_delivery_address(mut self, address: Address) -> Self {
        self.delivery_address = Some(address);
        self
    }
}

/// Command to move an order to its next stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvanceStatus {
    /// Recorded when the order enters "Shipped".
    #[serde(default)]
    pub shipping: Option<ShippingInfo>,
}

/// Command to change delivery and carrier details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShipping {
    #[serde(default)]
    pub delivery_address: Option<Address>,
    #[serde(default)]
    pub shipping_info: Option<ShippingInfo>,
}

impl UpdateShipping {
    pub(crate) fn validate(&self) -> Result<(), OrderError> {
        if let Some(address) = &self.delivery_address {
            validate_address(address)?;
        }
        if let Some(info) = &self.shipping_info {
            validate_shipping_info(info)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_address(address: &Address) -> Result<(), OrderError> {
    let fields = [
        ("street", &address.street),
        ("city", &address.city),
        ("state", &address.state),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
    ];
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(OrderError::AddressIncomplete { field: *field }),
        None => Ok(()),
    }
}

pub(crate) fn validate_shipping_info(info: &ShippingInfo) -> Result<(), OrderError> {
    if info.carrier.trim().is_empty() {
        return Err(OrderError::CarrierRequired);
    }
    Ok(())
}

/// Delivery view of an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingDetails {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub delivery_address: Option<Address>,
    pub shipping_info: Option<ShippingInfo>,
}
