pub mod memory;
pub mod sqlite;
pub mod sqlite_queries;

use crate::models::{
    event::{Collection, StoreStats, StoredRecord, WriteOutcome},
    user_profile::UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence adapter for webhook events.
///
/// Every write is a single-document upsert; backends must make that atomic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepo: Send + Sync {
    /// Inserts the record, or overwrites the one already stored under `doc_id`
    async fn upsert_record(
        &self,
        collection: Collection,
        record: &StoredRecord,
    ) -> anyhow::Result<WriteOutcome>;

    /// Secondary copy of a record under the sender's own collection
    async fn mirror_to_sender(&self, sender_id: &str, record: &StoredRecord)
    -> anyhow::Result<()>;

    async fn upsert_user_profile(
        &self,
        user_id: &str,
        name: Option<String>,
        seen_at: DateTime<Utc>,
    ) -> anyhow::Result<UserProfile>;

    async fn get_user_profile(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>>;

    /// Newest first by `received_at`
    async fn get_recent_records(
        &self,
        collection: Collection,
        limit: u32,
    ) -> anyhow::Result<Vec<StoredRecord>>;

    async fn get_sender_records(
        &self,
        sender_id: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<StoredRecord>>;

    async fn get_stats(&self) -> anyhow::Result<StoreStats>;

    /// Write/read round trip used by the health check
    async fn ping(&self) -> anyhow::Result<()>;

    fn is_connected(&self) -> bool;
}

pub type ImplEventRepo = Box<dyn EventRepo>;
