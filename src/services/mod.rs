use async_trait::async_trait;

/// Identifier the messaging provider assigned to a sent message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

/// Outbound side of the messaging provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Sends a plain text message to a WhatsApp ID
    async fn send_text_message(&self, to: &str, body: &str) -> anyhow::Result<SendReceipt>;
}

pub type ImplMessagingService = Box<dyn MessagingService>;
