//! Notification channels.
//!
//! This module provides the outbound transports notifications are delivered
//! through:
//! - Email (SMTP relay submission)
//! - Telegram Bot API
//! - Incoming webhooks (Discord-style `{"content": ...}` POST)
//!
//! Channels never retry on their own. A failed `send` is reported to the
//! dispatcher, which owns the retry and ordering policy.

mod email;
mod telegram;
mod webhook;

pub use email::{EmailChannel, EmailConfig};
pub use telegram::{TelegramChannel, TelegramConfig};
pub use webhook::{WebhookChannel, WebhookConfig};

use std::sync::Arc;

use async_trait::async_trait;

use super::events::{ChannelKind, PendingNotification};
use crate::Result;
use crate::config::AppConfig;
use crate::utils::http_client;

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// The kind of transport this channel delivers through.
    fn kind(&self) -> ChannelKind;

    /// Deliver one notification. All-or-nothing.
    async fn send(&self, notification: &PendingNotification) -> Result<()>;

    /// Deliver a fixed test message to verify the channel configuration.
    async fn test(&self) -> Result<()> {
        let notification = PendingNotification::new(
            self.kind(),
            Some("linkwatch channel test".to_string()),
            "This is a test notification from linkwatch.",
        );
        self.send(&notification).await
    }
}

/// Build every configured channel, in fan-out order: email, chat bot, webhook.
pub fn build_channels(config: &AppConfig) -> Result<Vec<Arc<dyn NotificationChannel>>> {
    let client = http_client::build_client(config.send_timeout);

    let email = EmailChannel::new(config.email.clone(), config.send_timeout)?;
    let telegram = TelegramChannel::new(config.telegram.clone(), client.clone());
    let webhook = WebhookChannel::new(config.webhook.clone(), client);

    Ok(vec![Arc::new(email), Arc::new(telegram), Arc::new(webhook)])
}

/// Truncate a message to fit within a transport's character limit.
pub(crate) fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = "\n\n[truncated]";
    let budget = limit.saturating_sub(suffix.len());
    let truncated: String = text.chars().take(budget).collect();
    format!("{truncated}{suffix}")
}

/// Turn a non-success HTTP response into a channel error.
pub(crate) async fn failure_from_response(
    channel: ChannelKind,
    response: reqwest::Response,
) -> crate::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = truncate_message(body.trim(), 512);
    crate::Error::channel(channel.as_str(), format!("HTTP {status}: {body}"))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("hello", 100), "hello");

        let long = "a".repeat(5000);
        let truncated = truncate_message(&long, 4096);
        assert!(truncated.chars().count() <= 4096);
        assert!(truncated.ends_with("[truncated]"));
    }

    #[test]
    fn test_truncate_message_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        assert_eq!(truncate_message(&text, 10), text);
    }
}
