use crate::{
    consts,
    models::{
        event::{Collection, RecordPayload, StoreStats, StoredRecord, WriteOutcome},
        user_profile::UserProfile,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row, SqlitePool, sqlite::SqliteRow};

use super::{EventRepo, sqlite_queries};

#[derive(Clone)]
pub struct SqlxSqliteRepo {
    pub db_pool: SqlitePool,
}

impl SqlxSqliteRepo {
    /// Creates the tables if they are missing
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(sqlite_queries::SCHEMA)
            .execute(&self.db_pool)
            .await
            .context("failed to create webhook store schema")?;

        Ok(())
    }
}

impl FromRow<'_, SqliteRow> for StoredRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let payload: String = row.try_get("payload")?;

        Ok(Self {
            doc_id: row.try_get("doc_id")?,
            payload: serde_json::from_str::<RecordPayload>(&payload)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            received_at: row.try_get("received_at")?,
            processed: row.try_get("processed")?,
        })
    }
}

fn encode_payload(record: &StoredRecord) -> anyhow::Result<String> {
    serde_json::to_string(&record.payload).context("failed to serialize record payload")
}

#[async_trait]
impl EventRepo for SqlxSqliteRepo {
    async fn upsert_record(
        &self,
        collection: Collection,
        record: &StoredRecord,
    ) -> anyhow::Result<WriteOutcome> {
        let payload = encode_payload(record)?;

        // single statement, so concurrent re-deliveries see exactly one insert
        let write_count: i64 = sqlx::query_scalar(&sqlite_queries::query_upsert_record(collection))
            .bind(&record.doc_id)
            .bind(payload)
            .bind(record.received_at)
            .bind(record.processed)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(if write_count > 1 {
            WriteOutcome::Overwritten
        } else {
            WriteOutcome::Inserted
        })
    }

    async fn mirror_to_sender(
        &self,
        sender_id: &str,
        record: &StoredRecord,
    ) -> anyhow::Result<()> {
        Ok(sqlx::query(sqlite_queries::QUERY_UPSERT_USER_MESSAGE)
            .bind(sender_id)
            .bind(&record.doc_id)
            .bind(encode_payload(record)?)
            .bind(record.received_at)
            .bind(record.processed)
            .execute(&self.db_pool)
            .await
            .map(|_| ())?)
    }

    async fn upsert_user_profile(
        &self,
        user_id: &str,
        name: Option<String>,
        seen_at: DateTime<Utc>,
    ) -> anyhow::Result<UserProfile> {
        let mut transaction = self.db_pool.begin().await?;

        sqlx::query(sqlite_queries::QUERY_UPSERT_USER_PROFILE)
            .bind(user_id)
            .bind(name)
            .bind(seen_at)
            .execute(&mut *transaction)
            .await?;

        let profile = sqlx::query_as::<_, UserProfile>(sqlite_queries::QUERY_GET_USER_PROFILE)
            .bind(user_id)
            .fetch_one(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(profile)
    }

    async fn get_user_profile(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>> {
        Ok(
            sqlx::query_as::<_, UserProfile>(sqlite_queries::QUERY_GET_USER_PROFILE)
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await?,
        )
    }

    async fn get_recent_records(
        &self,
        collection: Collection,
        limit: u32,
    ) -> anyhow::Result<Vec<StoredRecord>> {
        Ok(sqlx::query_as::<_, StoredRecord>(
            &sqlite_queries::query_get_recent_records(collection),
        )
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?)
    }

    async fn get_sender_records(
        &self,
        sender_id: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<StoredRecord>> {
        Ok(
            sqlx::query_as::<_, StoredRecord>(sqlite_queries::QUERY_GET_USER_MESSAGES)
                .bind(sender_id)
                .bind(limit)
                .fetch_all(&self.db_pool)
                .await?,
        )
    }

    async fn get_stats(&self) -> anyhow::Result<StoreStats> {
        let row = sqlx::query(sqlite_queries::QUERY_GET_STATS)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(StoreStats {
            total_messages: row.try_get("total_messages")?,
            total_users: row.try_get("total_users")?,
        })
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query(sqlite_queries::QUERY_UPSERT_HEALTH_CHECK)
            .bind(consts::HEALTH_CHECK_DOC_ID)
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await?;

        let status: Option<String> = sqlx::query_scalar(sqlite_queries::QUERY_GET_HEALTH_CHECK)
            .bind(consts::HEALTH_CHECK_DOC_ID)
            .fetch_optional(&self.db_pool)
            .await?;

        status
            .map(|_| ())
            .context("health check document was not readable after write")
    }

    fn is_connected(&self) -> bool {
        !self.db_pool.is_closed()
    }
}
