//! Process-local store used for development and tests.
//!
//! Records live in plain vectors behind one `RwLock` shared by every worker.
//! Nothing is ever evicted, so memory grows with traffic.

use crate::models::{
    event::{Collection, StoreStats, StoredRecord, WriteOutcome},
    user_profile::UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use super::EventRepo;

#[derive(Default)]
struct MemoryState {
    collections: HashMap<Collection, Vec<StoredRecord>>,
    sender_records: HashMap<String, Vec<StoredRecord>>,
    profiles: HashMap<String, UserProfile>,
    last_ping: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct InMemoryRepo {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Replaces the record with the same id in place, otherwise appends it
fn upsert_into(records: &mut Vec<StoredRecord>, record: &StoredRecord) -> WriteOutcome {
    match records.iter_mut().find(|r| r.doc_id == record.doc_id) {
        Some(existing) => {
            *existing = record.clone();
            WriteOutcome::Overwritten
        }
        None => {
            records.push(record.clone());
            WriteOutcome::Inserted
        }
    }
}

/// Newest first; among equal timestamps the later write wins
fn newest_first(records: &[StoredRecord], limit: u32) -> Vec<StoredRecord> {
    let mut sorted: Vec<StoredRecord> = records.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    sorted.truncate(limit as usize);
    sorted
}

#[async_trait]
impl EventRepo for InMemoryRepo {
    async fn upsert_record(
        &self,
        collection: Collection,
        record: &StoredRecord,
    ) -> anyhow::Result<WriteOutcome> {
        let mut state = self.state.write().await;
        let records = state.collections.entry(collection).or_default();

        Ok(upsert_into(records, record))
    }

    async fn mirror_to_sender(
        &self,
        sender_id: &str,
        record: &StoredRecord,
    ) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        let records = state
            .sender_records
            .entry(sender_id.to_string())
            .or_default();
        upsert_into(records, record);

        Ok(())
    }

    async fn upsert_user_profile(
        &self,
        user_id: &str,
        name: Option<String>,
        seen_at: DateTime<Utc>,
    ) -> anyhow::Result<UserProfile> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .entry(user_id.to_string())
            .and_modify(|profile| profile.record_message(name.as_deref(), seen_at))
            .or_insert_with(|| UserProfile::first_seen(user_id, name.as_deref(), seen_at));

        Ok(profile.clone())
    }

    async fn get_user_profile(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.state.read().await.profiles.get(user_id).cloned())
    }

    async fn get_recent_records(
        &self,
        collection: Collection,
        limit: u32,
    ) -> anyhow::Result<Vec<StoredRecord>> {
        let state = self.state.read().await;

        Ok(state
            .collections
            .get(&collection)
            .map(|records| newest_first(records, limit))
            .unwrap_or_default())
    }

    async fn get_sender_records(
        &self,
        sender_id: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<StoredRecord>> {
        let state = self.state.read().await;

        Ok(state
            .sender_records
            .get(sender_id)
            .map(|records| newest_first(records, limit))
            .unwrap_or_default())
    }

    async fn get_stats(&self) -> anyhow::Result<StoreStats> {
        let state = self.state.read().await;

        Ok(StoreStats {
            total_messages: state
                .collections
                .get(&Collection::Messages)
                .map_or(0, |records| records.len() as i64),
            total_users: state.profiles.len() as i64,
        })
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.state.write().await.last_ping = Some(Utc::now());

        self.state
            .read()
            .await
            .last_ping
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("ping was not recorded"))
    }

    fn is_connected(&self) -> bool {
        true
    }
}
