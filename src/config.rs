//! Application configuration management with security considerations.
//!
//! All values are read from environment variables once at startup and the
//! resulting [`AppConfig`] is handed to the server explicitly.
//!
//! # Security Notes
//! - Sensitive fields are clearly marked and should never be logged
//! - `VERIFY_TOKEN` ships with a placeholder default that must be overridden
//!   outside of local development

use crate::consts;
use envconfig::Envconfig;
use std::{fmt, str::FromStr, time::Duration};

/// Persistence backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" | "in_memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// How `GET /health` decides the database status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheckMode {
    /// Performs a write/read round trip against the store
    Store,
    /// Reports process liveness without touching the store
    Liveness,
}

impl FromStr for HealthCheckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "store" => Ok(Self::Store),
            "liveness" => Ok(Self::Liveness),
            other => Err(format!("unknown health check mode: {other}")),
        }
    }
}

/// Application configuration with security-aware field management.
///
/// This struct contains all environment variables used to configure the service.
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Port for web server binding, always on 0.0.0.0 (NON-SENSITIVE)
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,

    /// 🔒 SENSITIVE: Token configured in the Meta dashboard for the webhook handshake
    #[envconfig(from = "VERIFY_TOKEN", default = "default_token")]
    pub verify_token: String,

    /// 🔒 SENSITIVE: Bearer token used for outbound send-message calls
    #[envconfig(from = "AUTHORIZATION_TOKEN")]
    pub authorization_token: Option<String>,

    /// WhatsApp Business phone number ID (SEMI-SENSITIVE)
    #[envconfig(from = "WHATSAPP_PHONE_NUMBER_ID")]
    pub whatsapp_phone_number_id: Option<String>,

    /// Graph API base url, overridable for sandboxes (NON-SENSITIVE)
    #[envconfig(default = "https://graph.facebook.com/v22.0")]
    pub graph_api_base_url: String,

    /// Master switch for keyword auto-replies (NON-SENSITIVE)
    #[envconfig(default = "true")]
    pub auto_reply_enabled: bool,

    /// Upper bound of one outbound send, in milliseconds (NON-SENSITIVE)
    #[envconfig(default = "5000")]
    pub reply_timeout_ms: u64,

    /// Persistence backend: "sqlite" or "memory" (NON-SENSITIVE)
    #[envconfig(default = "sqlite")]
    pub store_backend: StoreBackend,

    /// Database host value (NON-SENSITIVE)
    /// Example: "sqlite:data/webhook_events.db"
    #[envconfig(default = "sqlite:data/webhook_events.db")]
    pub db_host: String,

    /// 🔒 SENSITIVE: Database password to encrypt SQLite data
    pub db_pass_encrypt: Option<String>,

    /// Default page size of `GET /messages` (NON-SENSITIVE)
    #[envconfig(default = "10")]
    pub messages_page_limit: u32,

    /// "store" round-trips the database, "liveness" does not (NON-SENSITIVE)
    #[envconfig(default = "store")]
    pub health_check_mode: HealthCheckMode,

    /// Also write each message under the sender's collection (NON-SENSITIVE)
    #[envconfig(default = "true")]
    pub mirror_sender_messages: bool,

    /// Keep a per-sender profile with message counters (NON-SENSITIVE)
    #[envconfig(default = "true")]
    pub track_user_profiles: bool,

    /// 🔒 SENSITIVE: Logfire write token
    pub logfire_token: Option<String>,
}

impl AppConfig {
    /// Checks if running on a developer machine
    pub fn is_local(&self) -> bool {
        self.env.to_lowercase() == "local"
    }

    /// True when the handshake secret was never overridden
    pub fn uses_default_verify_token(&self) -> bool {
        self.verify_token == consts::DEFAULT_VERIFY_TOKEN
    }

    /// Page size for `GET /messages`, kept inside the allowed bounds
    pub fn page_limit(&self) -> u32 {
        self.messages_page_limit
            .clamp(1, consts::MAX_MESSAGES_PAGE_LIMIT)
    }

    /// Constructs the WhatsApp Business API endpoint for sending messages.
    ///
    /// Returns `None` when no phone number id is configured.
    pub fn whatsapp_send_msg_endpoint(&self) -> Option<String> {
        let id = self.whatsapp_phone_number_id.as_deref()?.trim();
        if id.is_empty() {
            return None;
        }

        Some(format!(
            "{base}/{id}/messages",
            base = self.graph_api_base_url.trim_end_matches('/'),
        ))
    }

    /// Deadline of one auto-reply send, bounding how long a delivery waits for its ack
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms.max(1))
    }

    /// Outbound replies need the switch on plus an endpoint and a token
    pub fn auto_reply_ready(&self) -> bool {
        self.auto_reply_enabled
            && self.whatsapp_send_msg_endpoint().is_some()
            && self
                .authorization_token
                .as_deref()
                .is_some_and(|token| !token.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let env = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        AppConfig::init_from_hashmap(&env).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.health_check_mode, HealthCheckMode::Store);
        assert_eq!(config.page_limit(), 10);
        assert!(config.is_local());
        assert!(config.uses_default_verify_token());
        assert!(!config.auto_reply_ready());
        assert_eq!(config.reply_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_reply_timeout_is_configurable() {
        assert_eq!(
            config_from(&[("REPLY_TIMEOUT_MS", "250")]).reply_timeout(),
            Duration::from_millis(250)
        );
        assert_eq!(
            config_from(&[("REPLY_TIMEOUT_MS", "0")]).reply_timeout(),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_send_endpoint_and_auto_reply_ready() {
        let config = config_from(&[
            ("WHATSAPP_PHONE_NUMBER_ID", "10987654321"),
            ("AUTHORIZATION_TOKEN", "secret"),
            ("GRAPH_API_BASE_URL", "http://localhost:9000/v22.0/"),
        ]);

        assert_eq!(
            config.whatsapp_send_msg_endpoint().as_deref(),
            Some("http://localhost:9000/v22.0/10987654321/messages")
        );
        assert!(config.auto_reply_ready());

        let disabled = config_from(&[
            ("WHATSAPP_PHONE_NUMBER_ID", "10987654321"),
            ("AUTHORIZATION_TOKEN", "secret"),
            ("AUTO_REPLY_ENABLED", "false"),
        ]);
        assert!(!disabled.auto_reply_ready());
    }

    #[test]
    fn test_page_limit_is_clamped() {
        assert_eq!(config_from(&[("MESSAGES_PAGE_LIMIT", "500")]).page_limit(), 50);
        assert_eq!(config_from(&[("MESSAGES_PAGE_LIMIT", "0")]).page_limit(), 1);
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        let env = HashMap::from([("STORE_BACKEND".to_string(), "mongo".to_string())]);
        assert!(AppConfig::init_from_hashmap(&env).is_err());
        assert_eq!(
            "Memory".parse::<StoreBackend>().unwrap(),
            StoreBackend::Memory
        );
    }
}
