//! Outbox consumer delivering notification emails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::MarketEvent;
use record_store::{Entity, RecordStore, RecordStoreExt, Stored, WriteBatch};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::Result;
use crate::mailer::Mailer;
use crate::templates::render;

/// Namespace for checkpoint ids derived from the consumer name.
const CHECKPOINT_NAMESPACE: Uuid = Uuid::from_u128(0x0b7e_55a1_93c4_4d2f_8e06_71fa_2c9d_4e18);

/// Persisted outbox position of a named consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchCheckpoint {
    pub id: Uuid,
    pub consumer: String,
    /// Position of the last event handled.
    pub position: i64,
    pub updated_at: DateTime<Utc>,
}

impl Entity for DispatchCheckpoint {
    const COLLECTION: &'static str = "checkpoints";

    fn entity_id(&self) -> Uuid {
        self.id
    }
}

impl DispatchCheckpoint {
    /// Id of the checkpoint for `consumer`.
    pub fn id_for(consumer: &str) -> Uuid {
        Uuid::new_v5(&CHECKPOINT_NAMESPACE, consumer.as_bytes())
    }
}

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub events: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Reads the outbox and sends the emails each event triggers.
///
/// Delivery is at-least-once relative to the checkpoint: if the process dies
/// after sending but before the checkpoint is written, the batch is resent.
pub struct NotificationDispatcher<S: RecordStore> {
    store: S,
    mailer: Arc<dyn Mailer>,
    consumer: String,
    batch_size: usize,
}

impl<S: RecordStore> NotificationDispatcher<S> {
    /// Creates a dispatcher with the default consumer name.
    pub fn new(store: S, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            consumer: "notifications".to_string(),
            batch_size: 100,
        }
    }

    /// Sets the maximum number of events handled per pass.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Returns the position of the last handled event.
    pub async fn position(&self) -> Result<i64> {
        Ok(self
            .load_checkpoint()
            .await?
            .map(|stored| stored.entity.position)
            .unwrap_or(0))
    }

    async fn load_checkpoint(&self) -> Result<Option<Stored<DispatchCheckpoint>>> {
        Ok(self
            .store
            .load::<DispatchCheckpoint>(DispatchCheckpoint::id_for(&self.consumer))
            .await?)
    }

    /// Handles one batch of events after the checkpoint.
    ///
    /// Mailer failures are logged and counted; only store failures are
    /// returned.
    #[tracing::instrument(skip(self), fields(consumer = %self.consumer))]
    pub async fn run_once(&self) -> Result<DispatchStats> {
        let checkpoint = self.load_checkpoint().await?;
        let after = checkpoint.as_ref().map_or(0, |c| c.entity.position);

        let events = self.store.read_events(after, self.batch_size).await?;
        let Some(last) = events.last().map(|event| event.position) else {
            return Ok(DispatchStats::default());
        };

        let mut stats = DispatchStats {
            events: events.len(),
            ..DispatchStats::default()
        };
        for stored in events {
            let event: MarketEvent = match serde_json::from_value(stored.payload) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(
                        position = stored.position,
                        event_type = %stored.event_type,
                        error = %e,
                        "skipping undecodable outbox event"
                    );
                    continue;
                }
            };

            for email in render(&event) {
                match self.mailer.send(&email).await {
                    Ok(()) => {
                        stats.sent += 1;
                        metrics::counter!("notifications_sent_total").increment(1);
                    }
                    Err(e) => {
                        stats.failed += 1;
                        metrics::counter!("notifications_failed_total").increment(1);
                        tracing::warn!(
                            position = stored.position,
                            event_type = %stored.event_type,
                            to = %email.to,
                            error = %e,
                            "notification send failed"
                        );
                    }
                }
            }
        }

        self.save_checkpoint(checkpoint, last).await?;
        tracing::debug!(position = last, sent = stats.sent, failed = stats.failed, "dispatch pass complete");
        Ok(stats)
    }

    async fn save_checkpoint(
        &self,
        current: Option<Stored<DispatchCheckpoint>>,
        position: i64,
    ) -> Result<()> {
        let now = Utc::now();
        let batch = match current {
            Some(Stored {
                entity: mut checkpoint,
                version,
            }) => {
                checkpoint.position = position;
                checkpoint.updated_at = now;
                WriteBatch::new().update(&checkpoint, version)?
            }
            None => WriteBatch::new().insert(&DispatchCheckpoint {
                id: DispatchCheckpoint::id_for(&self.consumer),
                consumer: self.consumer.clone(),
                position,
                updated_at: now,
            })?,
        };
        self.store.commit(batch).await?;
        Ok(())
    }

    /// Handles batches until the outbox is drained.
    pub async fn drain(&self) -> Result<DispatchStats> {
        let mut total = DispatchStats::default();
        loop {
            let stats = self.run_once().await?;
            if stats.events == 0 {
                return Ok(total);
            }
            total.events += stats.events;
            total.sent += stats.sent;
            total.failed += stats.failed;
        }
    }

    /// Polls the outbox every `interval` until `shutdown` flips to true.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(consumer = %self.consumer, ?interval, "notification dispatcher started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.drain().await {
                        tracing::warn!(error = %e, "notification dispatch pass failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(consumer = %self.consumer, "notification dispatcher stopped");
    }
}
