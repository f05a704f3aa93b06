//! Pulls the first user message out of an inbound webhook body.
//!
//! Only `entry[0].changes[0]` with `field == "messages"` is considered, and
//! only its first message. The path is walked one link at a time so nothing
//! off the path can reject a delivery. Anything else is reported, never raised.

use super::schemas::{Contact, Message, Metadata};
use crate::{
    consts,
    models::event::{ExtractedMessage, generate_doc_id},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Extracted(ExtractedMessage),
    /// Well formed envelope without a user message (statuses, other fields, `{}`)
    NotAMessage,
    /// Body does not fit the envelope shape
    Malformed(String),
}

impl Extraction {
    pub fn label(&self) -> &'static str {
        match self {
            Extraction::Extracted(_) => "extracted",
            Extraction::NotAMessage => "not_a_message",
            Extraction::Malformed(_) => "malformed",
        }
    }
}

/// First element of the array under `key`, `None` when absent or empty
fn first_in<'a>(node: &'a Value, key: &str) -> Result<Option<&'a Value>, String> {
    match node.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(items.first()),
        Some(_) => Err(format!("{key} is not an array")),
    }
}

/// `value` of `entry[0].changes[0]` when that change carries messages
fn messages_value(body: &Value) -> Result<Option<&Value>, String> {
    if !body.is_object() {
        return Err("body is not a JSON object".to_string());
    }

    let Some(entry) = first_in(body, "entry")? else {
        return Ok(None);
    };
    let Some(change) = first_in(entry, "changes")? else {
        return Ok(None);
    };
    if change.get("field").and_then(Value::as_str) != Some(consts::MESSAGES_FIELD) {
        return Ok(None);
    }

    Ok(change.get("value").filter(|value| value.is_object()))
}

/// Classifies `body`; `received_at` seeds the fallback id of messages without one
pub fn extract(body: &Value, received_at: DateTime<Utc>) -> Extraction {
    let value = match messages_value(body) {
        Ok(Some(value)) => value,
        Ok(None) => return Extraction::NotAMessage,
        Err(reason) => return Extraction::Malformed(reason),
    };
    let message = match first_in(value, "messages") {
        Ok(Some(message)) => message,
        Ok(None) => return Extraction::NotAMessage,
        Err(reason) => return Extraction::Malformed(reason),
    };
    if !message.is_object() {
        return Extraction::Malformed("message is not an object".to_string());
    }
    let message = match Message::deserialize(message) {
        Ok(message) => message,
        Err(e) => return Extraction::Malformed(e.to_string()),
    };

    let Some(from) = message.from.filter(|from| !from.is_empty()) else {
        return Extraction::Malformed("message without sender".to_string());
    };

    let msg_type = message.msg_type.unwrap_or_else(|| "unknown".to_string());
    let text_body = match msg_type.as_str() {
        "text" => message.text.and_then(|text| text.body),
        _ => None,
    };

    let contact = first_in(value, "contacts")
        .ok()
        .flatten()
        .and_then(|contact| Contact::deserialize(contact).ok());
    let metadata = value
        .get("metadata")
        .and_then(|metadata| Metadata::deserialize(metadata).ok());

    Extraction::Extracted(ExtractedMessage {
        id: message
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| generate_doc_id(received_at)),
        from,
        msg_type,
        text_body,
        contact_name: contact
            .and_then(|contact| contact.profile)
            .and_then(|profile| profile.name),
        messaging_product: value
            .get("messaging_product")
            .and_then(Value::as_str)
            .map(str::to_string),
        phone_number_id: metadata.and_then(|metadata| metadata.phone_number_id),
        timestamp: message.timestamp,
        raw: body.clone(),
    })
}
