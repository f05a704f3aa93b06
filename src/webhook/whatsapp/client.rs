//! # WhatsApp API Client
//!
//! This module provides a client for sending messages to WhatsApp Business API.
//! It handles bearer authentication and text message sending.

use super::outgoing_schemas::{OutgoingTextMessage, WhatsAppMessageResponse};
use crate::{
    config::AppConfig,
    services::{MessagingService, SendReceipt},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// WhatsApp API client for sending messages
#[derive(Clone)]
pub struct WhatsAppClient {
    /// HTTP client for making API requests
    client: reqwest::Client,
    /// WhatsApp Business API endpoint for sending messages
    endpoint: String,
    /// Authentication token
    auth_token: String,
}

impl WhatsAppClient {
    /// Every request made by this client is aborted after `timeout`
    pub fn new(endpoint: String, auth_token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build WhatsApp HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }

    /// Builds a client when auto-replies are enabled and fully configured
    pub fn from_config(app_config: &AppConfig) -> Result<Option<Self>> {
        if !app_config.auto_reply_ready() {
            return Ok(None);
        }
        let (Some(endpoint), Some(auth_token)) = (
            app_config.whatsapp_send_msg_endpoint(),
            app_config.authorization_token.clone(),
        ) else {
            return Ok(None);
        };

        Self::new(endpoint, auth_token, app_config.reply_timeout()).map(Some)
    }

    /// Sends a text message
    ///
    /// # Arguments
    /// * `to` - Recipient's WhatsApp ID (phone number with country code)
    /// * `body` - Message text
    pub async fn send_text(&self, to: &str, body: &str) -> Result<WhatsAppMessageResponse> {
        let message = OutgoingTextMessage::new(to.to_string(), body.to_string());
        self.send_message(&message).await
    }

    /// Internal method to send any message type to WhatsApp API
    async fn send_message<T: serde::Serialize>(
        &self,
        message: &T,
    ) -> Result<WhatsAppMessageResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.auth_token)
            .header("Content-Type", "application/json")
            .json(message)
            .send()
            .await
            .context("Failed to send request to WhatsApp API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());

            anyhow::bail!("WhatsApp API returned error status {}: {}", status, body);
        }

        let whatsapp_response: WhatsAppMessageResponse = response
            .json()
            .await
            .context("Failed to parse WhatsApp API response")?;

        Ok(whatsapp_response)
    }
}

#[async_trait]
impl MessagingService for WhatsAppClient {
    async fn send_text_message(&self, to: &str, body: &str) -> Result<SendReceipt> {
        let response = self.send_text(to, body).await?;

        Ok(SendReceipt {
            message_id: response.messages.into_iter().next().map(|m| m.id),
        })
    }
}
