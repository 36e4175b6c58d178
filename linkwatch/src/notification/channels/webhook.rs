//! Incoming webhook notification channel.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{NotificationChannel, failure_from_response, truncate_message};
use crate::notification::events::{ChannelKind, PendingNotification};
use crate::{Error, Result};

/// Discord rejects `content` longer than this.
const WEBHOOK_CONTENT_LIMIT: usize = 2000;

/// Webhook channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WebhookConfig {
    /// Webhook URL.
    pub url: String,
}

/// Incoming webhook notification channel.
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
}

impl WebhookChannel {
    /// Create a new Webhook channel.
    pub fn new(config: WebhookConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Build the JSON payload.
    fn build_payload(&self, notification: &PendingNotification) -> serde_json::Value {
        json!({
            "content": truncate_message(&notification.body, WEBHOOK_CONTENT_LIMIT),
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, notification: &PendingNotification) -> Result<()> {
        let payload = self.build_payload(notification);

        // Webhook URLs carry their secret in the path.
        let response = self
            .client
            .post(&self.config.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::channel(self.kind().as_str(), e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from_response(self.kind(), response).await);
        }

        debug!("Webhook notification sent");
        Ok(())
    }
}
