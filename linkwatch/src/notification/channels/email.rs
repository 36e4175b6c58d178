//! Email notification channel using an authenticated SMTP relay.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::NotificationChannel;
use crate::notification::events::{ChannelKind, PendingNotification};
use crate::{Error, Result};

/// Email channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP relay port.
    pub smtp_port: u16,
    /// Upgrade a plain connection with STARTTLS instead of connecting over TLS.
    pub use_starttls: bool,
    /// SMTP account name. Also used as the sender address.
    pub username: String,
    /// SMTP account secret.
    pub password: String,
    /// Recipient address.
    pub to_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            use_starttls: true,
            username: String::new(),
            password: String::new(),
            to_address: String::new(),
        }
    }
}

/// Email notification channel.
pub struct EmailChannel {
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailChannel {
    /// Create a new Email channel.
    ///
    /// Addresses and the relay host are validated here, so a bad value is a
    /// startup configuration error rather than a failure on every send.
    pub fn new(config: EmailConfig, timeout: Option<Duration>) -> Result<Self> {
        let from: Mailbox = config
            .username
            .parse()
            .map_err(|e| Error::config(format!("invalid sender address: {e}")))?;
        let to: Mailbox = config
            .to_address
            .parse()
            .map_err(|e| Error::config(format!("invalid recipient address: {e}")))?;

        let builder = if config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .map_err(|e| Error::config(format!("invalid SMTP relay {}: {e}", config.smtp_host)))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(config.username, config.password))
            .timeout(timeout)
            .build();

        Ok(Self { from, to, transport })
    }

    /// Build the plain-text message for a notification.
    fn build_message(&self, notification: &PendingNotification) -> Result<Message> {
        let subject = notification
            .subject
            .clone()
            .unwrap_or_else(|| "linkwatch notification".to_string());

        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| Error::channel(ChannelKind::Email.as_str(), e.to_string()))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, notification: &PendingNotification) -> Result<()> {
        let message = self.build_message(notification)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::channel(ChannelKind::Email.as_str(), e.to_string()))?;

        debug!(to = %self.to, "Email notification sent");
        Ok(())
    }
}
