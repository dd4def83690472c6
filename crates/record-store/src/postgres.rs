use async_trait::async_trait;
use chrono::Utc;
use common::EventId;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Record, RecordQuery, Result, StoreError, StoredEvent, Version,
    store::{RecordStore, Write, WriteBatch},
};

/// Advisory lock key serializing outbox appends across transactions.
///
/// `BIGSERIAL` positions are handed out at insert time while rows become
/// visible at commit, so without it a reader could pass a position whose
/// transaction has not committed yet and never see that event.
pub const OUTBOX_LOCK_KEY: i64 = 0x6f75_7462_6f78;

/// PostgreSQL-backed record store implementation.
///
/// Updates are issued as `UPDATE ... WHERE version = $expected`, so two
/// writers racing on the same record cannot both succeed.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<Record> {
        Ok(Record {
            collection: row.try_get("collection")?,
            id: row.try_get::<Uuid, _>("id")?,
            version: Version::new(row.try_get("version")?),
            data: row.try_get("data")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_event(row: PgRow) -> Result<StoredEvent> {
        Ok(StoredEvent {
            position: row.try_get("position")?,
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            entity_id: row.try_get::<Uuid, _>("entity_id")?,
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Record>> {
        let row = sqlx::query(
            r#"
            SELECT collection, id, version, data, created_at, updated_at
            FROM records
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn query(&self, query: RecordQuery) -> Result<Vec<Record>> {
        let mut sql = String::from(
            "SELECT collection, id, version, data, created_at, updated_at FROM records WHERE collection = $1",
        );
        let mut param_count = 1;

        if !query.filters.is_empty() {
            param_count += 1;
            sql.push_str(&format!(" AND data @> ${param_count}"));
        }

        sql.push_str(" ORDER BY seq ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let containment = query.containment();
        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection);

        if !query.filters.is_empty() {
            sqlx_query = sqlx_query.bind(&containment);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    #[tracing::instrument(skip(self, batch), fields(writes = batch.writes().len(), events = batch.events().len()))]
    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let (writes, events) = batch.into_parts();

        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await?;

        for write in writes {
            match write {
                Write::Insert {
                    collection,
                    id,
                    data,
                } => {
                    let result = sqlx::query(
                        r#"
                        INSERT INTO records (collection, id, version, data, created_at, updated_at)
                        VALUES ($1, $2, $3, $4, $5, $5)
                        ON CONFLICT (collection, id) DO NOTHING
                        "#,
                    )
                    .bind(&collection)
                    .bind(id)
                    .bind(Version::first().as_i64())
                    .bind(&data)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(StoreError::AlreadyExists { collection, id });
                    }
                }
                Write::Update {
                    collection,
                    id,
                    data,
                    expected,
                } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE records
                        SET data = $1, version = version + 1, updated_at = $2
                        WHERE collection = $3 AND id = $4 AND version = $5
                        "#,
                    )
                    .bind(&data)
                    .bind(now)
                    .bind(&collection)
                    .bind(id)
                    .bind(expected.as_i64())
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        let actual: Option<i64> = sqlx::query_scalar(
                            "SELECT version FROM records WHERE collection = $1 AND id = $2",
                        )
                        .bind(&collection)
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await?;

                        return Err(match actual {
                            Some(actual) => StoreError::ConcurrencyConflict {
                                collection,
                                id,
                                expected,
                                actual: Version::new(actual),
                            },
                            None => StoreError::NotFound { collection, id },
                        });
                    }
                }
            }
        }

        if !events.is_empty() {
            // Held until commit, so outbox positions become visible in order.
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(OUTBOX_LOCK_KEY)
                .execute(&mut *tx)
                .await?;
        }

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO domain_events (id, event_type, entity_id, occurred_at, payload)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(event.id.as_uuid())
            .bind(&event.event_type)
            .bind(event.entity_id)
            .bind(event.occurred_at)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn read_events(&self, after: i64, limit: usize) -> Result<Vec<StoredEvent>> {
        use futures_util::{StreamExt, TryStreamExt};

        sqlx::query(
            r#"
            SELECT position, id, event_type, entity_id, occurred_at, payload
            FROM domain_events
            WHERE position > $1
            ORDER BY position ASC
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit as i64)
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(StoreError::Database(e)),
        })
        .try_collect()
        .await
    }
}
