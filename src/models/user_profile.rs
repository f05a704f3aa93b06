use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-sender summary, upserted on every new inbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: String,
    /// Most recent contact profile name seen, empty if never sent
    pub name: String,
    pub last_message_at: DateTime<Utc>,
    pub message_count: i64,
}

impl UserProfile {
    pub fn first_seen(user_id: &str, name: Option<&str>, seen_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.unwrap_or_default().to_string(),
            last_message_at: seen_at,
            message_count: 1,
        }
    }

    /// Applies one more message; a missing name keeps the previous one
    pub fn record_message(&mut self, name: Option<&str>, seen_at: DateTime<Utc>) {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.name = name.to_string();
        }
        if seen_at > self.last_message_at {
            self.last_message_at = seen_at;
        }
        self.message_count += 1;
    }
}
