use async_trait::async_trait;
use uuid::Uuid;

use crate::{Entity, NewEvent, Record, RecordQuery, Result, Stored, StoredEvent, Version};

/// A single conditional write inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum Write {
    /// Inserts a new record; fails if the key is taken.
    Insert {
        collection: String,
        id: Uuid,
        data: serde_json::Value,
    },

    /// Replaces a record; fails unless it is still at `expected`.
    Update {
        collection: String,
        id: Uuid,
        data: serde_json::Value,
        expected: Version,
    },
}

impl Write {
    /// Returns the collection and key targeted by this write.
    pub fn key(&self) -> (&str, Uuid) {
        match self {
            Write::Insert { collection, id, .. } | Write::Update { collection, id, .. } => {
                (collection.as_str(), *id)
            }
        }
    }
}

/// A set of writes and outbox events applied atomically.
///
/// Either every write succeeds and every event is appended, or nothing is
/// changed.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
    events: Vec<NewEvent>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an insert of a new entity.
    pub fn insert<T: Entity>(mut self, entity: &T) -> Result<Self> {
        self.writes.push(Write::Insert {
            collection: T::COLLECTION.to_string(),
            id: entity.entity_id(),
            data: serde_json::to_value(entity)?,
        });
        Ok(self)
    }

    /// Adds an update of an entity last read at `expected`.
    pub fn update<T: Entity>(mut self, entity: &T, expected: Version) -> Result<Self> {
        self.writes.push(Write::Update {
            collection: T::COLLECTION.to_string(),
            id: entity.entity_id(),
            data: serde_json::to_value(entity)?,
            expected,
        });
        Ok(self)
    }

    /// Appends an event to the outbox as part of this batch.
    pub fn event(mut self, event: NewEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Returns the writes in this batch.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Returns the events in this batch.
    pub fn events(&self) -> &[NewEvent] {
        &self.events
    }

    /// Returns true if the batch has nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.events.is_empty()
    }

    /// Splits the batch into its writes and events.
    pub fn into_parts(self) -> (Vec<Write>, Vec<NewEvent>) {
        (self.writes, self.events)
    }
}

/// Core trait for record store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches a single record by key.
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Record>>;

    /// Returns records matching a query, in insertion order.
    async fn query(&self, query: RecordQuery) -> Result<Vec<Record>>;

    /// Applies a batch atomically.
    ///
    /// Fails with `ConcurrencyConflict` if any update's expected version is
    /// stale, `AlreadyExists` if any insert collides, and `NotFound` if any
    /// update targets a missing record. On failure nothing is written.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Reads outbox events with a position greater than `after`, oldest first.
    async fn read_events(&self, after: i64, limit: usize) -> Result<Vec<StoredEvent>>;
}

/// Typed convenience methods over any [`RecordStore`].
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Loads an entity by id.
    async fn load<T: Entity + 'static>(&self, id: Uuid) -> Result<Option<Stored<T>>> {
        match self.get(T::COLLECTION, id).await? {
            Some(record) => Ok(Some(Stored::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Loads every entity matching a query.
    async fn find<T: Entity + 'static>(&self, query: RecordQuery) -> Result<Vec<Stored<T>>> {
        self.query(query)
            .await?
            .into_iter()
            .map(Stored::from_record)
            .collect()
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}
