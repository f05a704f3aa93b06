//! # WhatsApp Webhook Handler
//!
//! Ingestion flow for one delivery: extract the first user message, persist
//! it (or the raw body), then optionally send a keyword auto-reply.
//!
//! Nothing in here returns an error to the caller. Every failing step is
//! logged and recorded in the [`IngestReport`] so the route can always
//! acknowledge the provider with 200.

use super::{
    auto_reply::{self, ReplyRule},
    extractor::{self, Extraction},
};
use crate::{
    metric,
    models::event::{Collection, ExtractedMessage, StoredRecord, WriteOutcome},
    repo::{self, EventRepo},
    services::{self, MessagingService},
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::time::Duration;

/// Optional secondary writes done after the primary one, and the reply deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub mirror_sender_messages: bool,
    pub track_user_profiles: bool,
    /// The delivery is acknowledged only after the reply attempt ends
    pub reply_timeout: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            mirror_sender_messages: true,
            track_user_profiles: true,
            reply_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    Persisted(WriteOutcome),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStage {
    Replied(ReplyRule),
    Failed(ReplyRule),
    Skipped(&'static str),
}

/// Stages one delivery went through before being acknowledged
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub extraction: &'static str,
    pub collection: Collection,
    pub doc_id: String,
    pub persisted: PersistStage,
    pub reply: ReplyStage,
}

/// Decodes the request body, wrapping anything that is not JSON
pub fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| {
        json!({
            "unparsed_body": String::from_utf8_lossy(body),
        })
    })
}

async fn persist(
    repo: &repo::ImplEventRepo,
    collection: Collection,
    record: &StoredRecord,
) -> PersistStage {
    match repo.upsert_record(collection, record).await {
        Ok(outcome) => {
            log::info!(
                "record {} {} into {}",
                record.doc_id,
                outcome,
                collection.table_name()
            );
            PersistStage::Persisted(outcome)
        }
        Err(e) => {
            log::error!(
                "failed to save record {} into {}: {:#}",
                record.doc_id,
                collection.table_name(),
                e
            );
            metric::incr_persistence_failure_statds(collection.table_name());
            PersistStage::Failed
        }
    }
}

/// Mirror and profile writes; failures here never undo the primary write
async fn persist_secondary(
    repo: &repo::ImplEventRepo,
    message: &ExtractedMessage,
    record: &StoredRecord,
    outcome: WriteOutcome,
    options: &IngestOptions,
) {
    if options.mirror_sender_messages {
        if let Err(e) = repo.mirror_to_sender(&message.from, record).await {
            log::error!(
                "failed to mirror record {} for sender {}: {:#}",
                record.doc_id,
                message.from,
                e
            );
            metric::incr_persistence_failure_statds("user_messages");
        }
    }

    // re-deliveries of the same message id must not bump the counter again
    if options.track_user_profiles && outcome == WriteOutcome::Inserted {
        if let Err(e) = repo
            .upsert_user_profile(&message.from, message.contact_name.clone(), record.received_at)
            .await
        {
            log::error!("failed to update profile of {}: {:#}", message.from, e);
            metric::incr_persistence_failure_statds("user_profiles");
        }
    }
}

async fn reply_to(
    messaging: Option<&services::ImplMessagingService>,
    message: &ExtractedMessage,
    persisted: PersistStage,
    reply_timeout: Duration,
) -> ReplyStage {
    let Some(messaging) = messaging else {
        return ReplyStage::Skipped("disabled");
    };
    let Some(body) = message.text_body.as_deref().filter(|body| !body.trim().is_empty()) else {
        return ReplyStage::Skipped("not_text");
    };
    if persisted == PersistStage::Persisted(WriteOutcome::Overwritten) {
        return ReplyStage::Skipped("redelivery");
    }

    let reply = auto_reply::select_reply(body);
    let sending = messaging.send_text_message(&message.from, reply.text);
    match ntex::time::timeout(reply_timeout, sending).await {
        Ok(Ok(receipt)) => {
            log::info!(
                "auto-reply '{}' sent to {} (provider id: {:?})",
                reply.rule,
                message.from,
                receipt.message_id
            );
            ReplyStage::Replied(reply.rule)
        }
        Ok(Err(e)) => {
            log::error!("failed to send auto-reply to {}: {:#}", message.from, e);
            ReplyStage::Failed(reply.rule)
        }
        Err(_) => {
            log::error!(
                "auto-reply to {} timed out after {:?}",
                message.from,
                reply_timeout
            );
            ReplyStage::Failed(reply.rule)
        }
    }
}

/// Payloads without a user message are kept as unprocessed raw events
async fn store_raw(
    repo: &repo::ImplEventRepo,
    payload: Value,
    extraction: &'static str,
    received_at: DateTime<Utc>,
) -> IngestReport {
    let record = StoredRecord::from_raw(payload, received_at);
    let persisted = persist(repo, Collection::WebhookLogs, &record).await;

    IngestReport {
        extraction,
        collection: Collection::WebhookLogs,
        doc_id: record.doc_id,
        persisted,
        reply: ReplyStage::Skipped("no_message"),
    }
}

/// Main webhook processor
///
/// # Arguments
///
/// * `body` - Raw request body as received
/// * `repo` - Persistence adapter
/// * `messaging` - Outbound client, `None` when auto-replies are off
/// * `options` - Secondary write switches
/// * `received_at` - Arrival time, used as `received_at` of the stored record
#[tracing::instrument(skip_all)]
pub async fn process_webhook(
    body: &[u8],
    repo: &repo::ImplEventRepo,
    messaging: Option<&services::ImplMessagingService>,
    options: &IngestOptions,
    received_at: DateTime<Utc>,
) -> IngestReport {
    let payload = parse_body(body);
    let extraction = extractor::extract(&payload, received_at);
    let label = extraction.label();
    metric::incr_webhook_event_statds(label);

    match extraction {
        Extraction::Extracted(message) => {
            let record = StoredRecord::from_message(message.clone(), received_at);
            let persisted = persist(repo, Collection::Messages, &record).await;

            if let PersistStage::Persisted(outcome) = persisted {
                persist_secondary(repo, &message, &record, outcome, options).await;
            }

            let reply = reply_to(messaging, &message, persisted, options.reply_timeout).await;
            metric::incr_auto_reply_statds(match reply {
                ReplyStage::Replied(_) => "replied",
                ReplyStage::Failed(_) => "failed",
                ReplyStage::Skipped(reason) => reason,
            });

            IngestReport {
                extraction: label,
                collection: Collection::Messages,
                doc_id: record.doc_id,
                persisted,
                reply,
            }
        }
        Extraction::Malformed(reason) => {
            log::warn!("webhook body is not a valid envelope: {}", reason);
            store_raw(repo, payload, label, received_at).await
        }
        Extraction::NotAMessage => {
            log::info!("no message data found in webhook, saving raw data");
            store_raw(repo, payload, label, received_at).await
        }
    }
}
