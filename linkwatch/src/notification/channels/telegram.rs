//! Telegram Bot API notification channel.
//!
//! Sends messages via the Telegram Bot API (`POST /bot<token>/sendMessage`).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{NotificationChannel, failure_from_response, truncate_message};
use crate::notification::events::{ChannelKind, PendingNotification};
use crate::{Error, Result};

/// Telegram `sendMessage` text limit (UTF-8 characters).
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Telegram channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Telegram Bot API token.
    pub bot_token: String,
    /// Target chat ID (user, group, or channel).
    pub chat_id: String,
    /// Bot API base URL, without the `/bot<token>` segment.
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// Telegram notification channel.
pub struct TelegramChannel {
    chat_id: String,
    endpoint: String,
    client: Client,
}

impl TelegramChannel {
    /// Create a new Telegram channel.
    pub fn new(config: TelegramConfig, client: Client) -> Self {
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );
        Self {
            chat_id: config.chat_id,
            endpoint,
            client,
        }
    }

    fn build_payload(&self, notification: &PendingNotification) -> serde_json::Value {
        json!({
            "chat_id": self.chat_id,
            "text": truncate_message(&notification.body, TELEGRAM_MESSAGE_LIMIT),
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::ChatBot
    }

    async fn send(&self, notification: &PendingNotification) -> Result<()> {
        let payload = self.build_payload(notification);

        // The endpoint embeds the bot token; keep it out of error text.
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::channel(self.kind().as_str(), e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from_response(self.kind(), response).await);
        }

        debug!(chat_id = %self.chat_id, "Telegram notification sent");
        Ok(())
    }
}
