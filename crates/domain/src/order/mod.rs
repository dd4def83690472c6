//! Orders: the entity, its status lifecycle and the service driving it.

mod commands;
mod entity;
mod service;
mod status;
mod tags;

pub use commands::{AdvanceStatus, CreateOrderDraft, ShippingDetails, UpdateShipping};
pub use entity::Order;
pub use service::OrderService;
pub(crate) use service::load_order;
pub use status::{OrderStatus, StatusMachine, next_status, next_status_named};
pub use tags::{
    MATERIAL_TAGS, MISCELLANEOUS_TAGS, PROCESS_TAGS, Tag, TagCategory, TagId, all_tags, find_tag,
};

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Title is required.
    #[error("Order title is required")]
    TitleRequired,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Tag id is not part of the taxonomy.
    #[error("Unknown tag: {tag}")]
    UnknownTag { tag: TagId },

    /// Due date lies before the order's creation date.
    #[error("Due date {due_date} is before the creation date {created_on}")]
    DueDateInPast {
        due_date: NaiveDate,
        created_on: NaiveDate,
    },

    /// A shipping carrier must be named.
    #[error("Shipping carrier is required")]
    CarrierRequired,

    /// An address field was left blank.
    #[error("Delivery address is missing {field}")]
    AddressIncomplete { field: &'static str },

    /// Order is not in a stage that allows the action.
    #[error("Invalid status transition: cannot {action} from {current} status")]
    InvalidStatusTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Order has been archived.
    #[error("Order is archived")]
    Archived,

    /// Order already has a manufacturer.
    #[error("Order has already been claimed by a manufacturer")]
    AlreadyClaimed,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::TitleRequired
            | OrderError::InvalidQuantity { .. }
            | OrderError::UnknownTag { .. }
            | OrderError::DueDateInPast { .. }
            | OrderError::CarrierRequired
            | OrderError::AddressIncomplete { .. } => ErrorKind::Validation,
            OrderError::InvalidStatusTransition { .. }
            | OrderError::Archived
            | OrderError::AlreadyClaimed => ErrorKind::Conflict,
        }
    }
}
