//! # WhatsApp Webhook Schemas
//!
//! Data structures for the nodes of the JSON envelope WhatsApp sends when
//! webhook events occur. Only the nodes on the message path are modeled,
//! and each of their fields is read leniently: a field of an unexpected type
//! becomes `None` instead of failing the whole node. Numeric ids and
//! timestamps are kept as their decimal string.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

/// Reads a string field, accepting numbers and dropping anything else
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(value) => Some(value),
        JsonValue::Number(value) => Some(value.to_string()),
        _ => None,
    })
}

/// Reads a nested node, dropping it when it does not fit `T`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = JsonValue::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }

    Ok(T::deserialize(value).ok())
}

/// Metadata about the WhatsApp Business phone number
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number_id: Option<String>,
}

/// Contact information for the message sender
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "lenient")]
    pub profile: Option<Profile>,
    /// WhatsApp ID (phone number)
    #[serde(default, deserialize_with = "lenient_string")]
    pub wa_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// Message object
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Message {
    /// Sender's WhatsApp ID (phone number)
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: Option<String>,
    /// Message ID, stable across provider re-deliveries
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    /// Message type (text, image, video, document, etc.)
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub msg_type: Option<String>,
    /// Text message content (if type is "text")
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<TextMessage>,
}

/// Text message content
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TextMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub body: Option<String>,
}
