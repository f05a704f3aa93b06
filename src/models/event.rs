use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts;

/// Target collection of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Normalized user messages, keyed by provider message id
    Messages,
    /// Raw payloads that did not carry a user message
    WebhookLogs,
}

impl Collection {
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Messages => "whatsapp_messages",
            Collection::WebhookLogs => "webhook_logs",
        }
    }
}

/// First user message found in an inbound webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMessage {
    pub id: String,
    pub from: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    /// `None` for any non-text content
    pub text_body: Option<String>,
    pub contact_name: Option<String>,
    pub messaging_product: Option<String>,
    pub phone_number_id: Option<String>,
    /// Provider timestamp, epoch seconds as sent
    pub timestamp: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RecordPayload {
    Message(ExtractedMessage),
    Raw(Value),
}

/// One document written per inbound delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub doc_id: String,
    pub payload: RecordPayload,
    pub received_at: DateTime<Utc>,
    pub processed: bool,
}

impl StoredRecord {
    pub fn from_message(message: ExtractedMessage, received_at: DateTime<Utc>) -> Self {
        Self {
            doc_id: message.id.clone(),
            payload: RecordPayload::Message(message),
            received_at,
            processed: true,
        }
    }

    /// Raw payloads get a generated id so they never collide
    pub fn from_raw(body: Value, received_at: DateTime<Utc>) -> Self {
        Self {
            doc_id: generate_doc_id(received_at),
            payload: RecordPayload::Raw(body),
            received_at,
            processed: false,
        }
    }

    pub fn sender(&self) -> Option<&str> {
        match &self.payload {
            RecordPayload::Message(message) => Some(message.from.as_str()),
            RecordPayload::Raw(_) => None,
        }
    }
}

/// Result of an upsert by document id
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    #[display("inserted")]
    Inserted,
    #[display("overwritten")]
    Overwritten,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_messages: i64,
    pub total_users: i64,
}

/// Builds `msg_<epoch millis>_<random suffix>` for payloads without a provider id
pub fn generate_doc_id(at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();

    format!(
        "{prefix}{millis}_{suffix}",
        prefix = consts::GENERATED_ID_PREFIX,
        millis = at.timestamp_millis(),
        suffix = &suffix[..consts::GENERATED_ID_SUFFIX_LEN],
    )
}
