use chrono::{DateTime, Utc};
use common::EventId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::Result;

/// Version number of a stored record, used for conditional updates.
///
/// A record is at version 1 after insert and gains one per update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a record that has not been written yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version of a freshly inserted record.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A raw stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Collection (table) the record belongs to.
    pub collection: String,

    /// Primary key within the collection.
    pub id: Uuid,

    /// Current version.
    pub version: Version,

    /// The entity serialized as JSON.
    pub data: serde_json::Value,

    /// When the record was first inserted.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// A type that can be persisted as a record.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the collection holding this entity.
    const COLLECTION: &'static str;

    /// Primary key of this entity.
    fn entity_id(&self) -> Uuid;
}

/// An entity together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Stored<T> {
    pub entity: T,
    pub version: Version,
}

impl<T: Entity> Stored<T> {
    /// Decodes a raw record into a typed entity.
    pub fn from_record(record: Record) -> Result<Self> {
        Ok(Self {
            entity: serde_json::from_value(record.data)?,
            version: record.version,
        })
    }

    /// Returns the entity, discarding the version.
    pub fn into_inner(self) -> T {
        self.entity
    }
}

/// A domain event waiting to be appended to the outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub id: EventId,
    pub event_type: String,
    pub entity_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl NewEvent {
    /// Creates an event from a serializable payload.
    pub fn new<P: Serialize>(
        event_type: impl Into<String>,
        entity_id: Uuid,
        payload: &P,
    ) -> Result<Self> {
        Ok(Self {
            id: EventId::new(),
            event_type: event_type.into(),
            entity_id,
            occurred_at: Utc::now(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// An event as read back from the outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Monotonic position in the outbox, starting at 1.
    pub position: i64,
    pub id: EventId,
    pub event_type: String,
    pub entity_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}
