pub const SERVICE_NAME: &str = "WhatsApp Webhook Event Store";
pub const DEFAULT_VERIFY_TOKEN: &str = "default_token";
pub const SUBSCRIBE_MODE: &str = "subscribe";
pub const MESSAGES_FIELD: &str = "messages";
pub const MESSAGING_PRODUCT: &str = "whatsapp";

pub const MAX_MESSAGES_PAGE_LIMIT: u32 = 50;
pub const MAX_WEBHOOK_BODY_BYTES: usize = 5 * 1024 * 1024;

pub const GENERATED_ID_PREFIX: &str = "msg_";
pub const GENERATED_ID_SUFFIX_LEN: usize = 9;

pub const HEALTH_CHECK_DOC_ID: &str = "ping";
