//! # Events API Module
//!
//! Read side of the webhook store plus the health check. Handlers in
//! `front::server` only translate these results into HTTP responses.

use crate::{
    config::HealthCheckMode,
    consts,
    models::event::{Collection, StoredRecord},
    repo::{self, EventRepo},
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessagesPage {
    pub count: usize,
    pub messages: Vec<StoredRecord>,
}

impl From<Vec<StoredRecord>> for MessagesPage {
    fn from(messages: Vec<StoredRecord>) -> Self {
        Self {
            count: messages.len(),
            messages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub total_messages: i64,
    pub total_users: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    #[serde(rename = "OK")]
    #[display("OK")]
    Ok,
    #[serde(rename = "ERROR")]
    #[display("ERROR")]
    Error,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    #[display("connected")]
    Connected,
    #[display("disconnected")]
    Disconnected,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: DatabaseStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Resolves the requested page size: query value if any, else the configured default
pub fn page_limit(requested: Option<u32>, default_limit: u32) -> u32 {
    requested
        .unwrap_or(default_limit)
        .clamp(1, consts::MAX_MESSAGES_PAGE_LIMIT)
}

/// Most recent stored user messages, newest first.
pub async fn get_recent_messages(
    repo: &repo::ImplEventRepo,
    limit: u32,
) -> anyhow::Result<MessagesPage> {
    Ok(repo
        .get_recent_records(Collection::Messages, limit)
        .await?
        .into())
}

/// Messages mirrored under a single sender, newest first.
pub async fn get_sender_messages(
    repo: &repo::ImplEventRepo,
    sender_id: &str,
    limit: u32,
) -> anyhow::Result<MessagesPage> {
    Ok(repo.get_sender_records(sender_id, limit).await?.into())
}

pub async fn get_stats(repo: &repo::ImplEventRepo) -> anyhow::Result<StatsReport> {
    let stats = repo.get_stats().await?;

    Ok(StatsReport {
        total_messages: stats.total_messages,
        total_users: stats.total_users,
        timestamp: Utc::now(),
    })
}

/// Builds the health report.
///
/// In [`HealthCheckMode::Store`] the store gets a write/read round trip;
/// in [`HealthCheckMode::Liveness`] only the non-I/O connection flag is read.
pub async fn check_health(repo: &repo::ImplEventRepo, mode: HealthCheckMode) -> HealthReport {
    let checked = match mode {
        HealthCheckMode::Store => repo.ping().await,
        HealthCheckMode::Liveness => Ok(()),
    };

    match checked {
        Ok(()) => HealthReport {
            status: HealthStatus::Ok,
            database: if repo.is_connected() {
                DatabaseStatus::Connected
            } else {
                DatabaseStatus::Disconnected
            },
            timestamp: Utc::now(),
            service: Some(consts::SERVICE_NAME),
            error: None,
        },
        Err(e) => {
            log::error!("health check failed: {:#}", e);
            HealthReport {
                status: HealthStatus::Error,
                database: DatabaseStatus::Disconnected,
                timestamp: Utc::now(),
                service: None,
                error: Some(e.to_string()),
            }
        }
    }
}
