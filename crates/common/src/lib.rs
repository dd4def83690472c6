//! Shared identifier types used across the marketplace crates.

mod types;

pub use types::{AssemblyId, EventId, OfferId, OrderId, SpecificationId, UserId};
