//! Versioned record store.
//!
//! Entities are stored as JSON documents grouped by collection. Every write is
//! conditional on the record's current [`Version`], and a [`WriteBatch`] is
//! applied all-or-nothing together with the domain events it carries.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryRecordStore;
pub use postgres::{OUTBOX_LOCK_KEY, PostgresRecordStore};
pub use query::RecordQuery;
pub use record::{Entity, NewEvent, Record, Stored, StoredEvent, Version};
pub use store::{RecordStore, RecordStoreExt, Write, WriteBatch};
