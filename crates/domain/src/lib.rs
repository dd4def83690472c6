//! Domain layer for the foundry marketplace.
//!
//! This crate provides the order/offer domain model:
//! - Order entity with an explicit status state machine and tag taxonomy
//! - Offer arbitration enforcing a single accepted offer per order
//! - Assembly and part decomposition with per-part specifications
//! - Domain events written to the outbox alongside every state change

pub mod assembly;
pub mod error;
pub mod events;
pub mod offer;
pub mod order;
pub mod value_objects;

pub use assembly::{
    Assembly, AssemblyError, AssemblyPart, AssemblyService, AssemblyWithParts, CreateAssembly,
    PartId, PartMetadata, PartSpecification, PartSummary, ReorderAssemblies, SaveSpecification,
    SetSpecificationStatus, SplitResult, normalize_split_response, summarize_path,
};
pub use error::{DomainError, ErrorKind};
pub use events::{DomainEvent, MarketEvent, OfferSummary, OrderSummary};
pub use offer::{AcceptOutcome, Offer, OfferError, OfferService, OfferTerms, SubmitOffer};
pub use order::{
    AdvanceStatus, CreateOrderDraft, Order, OrderError, OrderService, OrderStatus, ShippingDetails,
    StatusMachine, Tag, TagCategory, TagId, UpdateShipping, all_tags, find_tag, next_status,
    next_status_named,
};
pub use value_objects::{AccountType, Actor, Address, Contact, Money, PriceSnapshot, ShippingInfo};
