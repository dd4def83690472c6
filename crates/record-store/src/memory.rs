use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    Record, RecordQuery, Result, StoreError, StoredEvent, Version,
    store::{RecordStore, Write, WriteBatch},
};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<(String, Uuid), (u64, Record)>,
    events: Vec<StoredEvent>,
    next_seq: u64,
}

/// In-memory record store implementation for testing and local runs.
///
/// Provides the same conditional-write semantics as the PostgreSQL
/// implementation: a batch is validated and applied under a single lock.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in a collection.
    pub async fn record_count(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .records
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    /// Returns the number of events in the outbox.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }
}

fn check(inner: &Inner, write: &Write) -> Result<()> {
    match write {
        Write::Insert { collection, id, .. } => {
            if inner.records.contains_key(&(collection.clone(), *id)) {
                return Err(StoreError::AlreadyExists {
                    collection: collection.clone(),
                    id: *id,
                });
            }
        }
        Write::Update {
            collection,
            id,
            expected,
            ..
        } => match inner.records.get(&(collection.clone(), *id)) {
            None => {
                return Err(StoreError::NotFound {
                    collection: collection.clone(),
                    id: *id,
                });
            }
            Some((_, record)) if record.version != *expected => {
                return Err(StoreError::ConcurrencyConflict {
                    collection: collection.clone(),
                    id: *id,
                    expected: *expected,
                    actual: record.version,
                });
            }
            Some(_) => {}
        },
    }
    Ok(())
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Record>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .get(&(collection.to_string(), id))
            .map(|(_, record)| record.clone()))
    }

    async fn query(&self, query: RecordQuery) -> Result<Vec<Record>> {
        let inner = self.inner.read().await;
        let mut matched: Vec<_> = inner
            .records
            .values()
            .filter(|(_, r)| r.collection == query.collection && query.matches(&r.data))
            .collect();
        matched.sort_by_key(|(seq, _)| *seq);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write().await;

        // Validate everything first so a failure leaves the store untouched.
        for write in batch.writes() {
            check(&inner, write)?;
        }

        let now = Utc::now();
        let (writes, events) = batch.into_parts();

        for write in writes {
            match write {
                Write::Insert {
                    collection,
                    id,
                    data,
                } => {
                    inner.next_seq += 1;
                    let seq = inner.next_seq;
                    let record = Record {
                        collection: collection.clone(),
                        id,
                        version: Version::first(),
                        data,
                        created_at: now,
                        updated_at: now,
                    };
                    inner.records.insert((collection, id), (seq, record));
                }
                Write::Update {
                    collection,
                    id,
                    data,
                    ..
                } => {
                    if let Some((_, record)) = inner.records.get_mut(&(collection, id)) {
                        record.data = data;
                        record.version = record.version.next();
                        record.updated_at = now;
                    }
                }
            }
        }

        for event in events {
            let position = inner.events.len() as i64 + 1;
            inner.events.push(StoredEvent {
                position,
                id: event.id,
                event_type: event.event_type,
                entity_id: event.entity_id,
                occurred_at: event.occurred_at,
                payload: event.payload,
            });
        }

        Ok(())
    }

    async fn read_events(&self, after: i64, limit: usize) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.position > after)
            .take(limit)
            .cloned()
            .collect())
    }
}
