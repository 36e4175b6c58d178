//! Notification events.
//!
//! Defines the user-visible events, the channel kinds they fan out to, and
//! the per-channel [`PendingNotification`] record that the queue owns.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of outbound transport a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Authenticated email relay submission.
    Email,
    /// HTTP POST to a messaging bot API.
    ChatBot,
    /// HTTP POST to an incoming webhook.
    Webhook,
}

impl ChannelKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::ChatBot => "chat_bot",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that produce notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// The client established its session.
    Login,
    /// An outage was detected.
    Offline,
    /// Reachability was confirmed again after an outage.
    Reconnected,
    /// A runtime error surfaced by the client.
    Error { message: String },
    /// The process is terminating.
    Shutdown,
}

impl NotificationEvent {
    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Offline => "offline",
            Self::Reconnected => "reconnected",
            Self::Error { .. } => "error",
            Self::Shutdown => "shutdown",
        }
    }

    /// Email subject line for this event.
    pub fn subject(&self, instance: &str) -> String {
        match self {
            Self::Login => format!("{instance} Login"),
            Self::Offline => format!("{instance} Offline"),
            Self::Reconnected => format!("{instance} Reconnected"),
            Self::Error { .. } => format!("{instance} Error"),
            Self::Shutdown => format!("{instance} Disconnected"),
        }
    }

    /// Message body, shared by every channel.
    pub fn body(&self, instance: &str) -> String {
        match self {
            Self::Login => format!("{instance} has successfully logged in."),
            Self::Offline => format!("{instance} has gone offline."),
            Self::Reconnected => format!("{instance} has reconnected."),
            Self::Error { message } => format!("An error occurred: {message}"),
            Self::Shutdown => format!("{instance} has been disconnected."),
        }
    }

    /// Build the notification addressed to one channel.
    ///
    /// Only email carries a subject.
    pub fn render(&self, instance: &str, channel: ChannelKind) -> PendingNotification {
        let subject = match channel {
            ChannelKind::Email => Some(self.subject(instance)),
            ChannelKind::ChatBot | ChannelKind::Webhook => None,
        };
        PendingNotification::new(channel, subject, self.body(instance))
    }
}

/// A notification addressed to exactly one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub channel: ChannelKind,
    pub subject: Option<String>,
    pub body: String,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingNotification {
    pub fn new(channel: ChannelKind, subject: Option<String>, body: impl Into<String>) -> Self {
        Self {
            channel,
            subject,
            body: body.into(),
            enqueued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_texts() {
        let event = NotificationEvent::Offline;
        assert_eq!(event.subject("relay-01"), "relay-01 Offline");
        assert_eq!(event.body("relay-01"), "relay-01 has gone offline.");

        let event = NotificationEvent::Shutdown;
        assert_eq!(event.subject("relay-01"), "relay-01 Disconnected");
        assert_eq!(event.body("relay-01"), "relay-01 has been disconnected.");
    }

    #[test]
    fn test_error_body_carries_message() {
        let event = NotificationEvent::Error {
            message: "socket hang up".to_string(),
        };
        assert_eq!(event.body("relay-01"), "An error occurred: socket hang up");
        assert_eq!(event.event_type(), "error");
    }

    #[test]
    fn test_render_subject_only_for_email() {
        let event = NotificationEvent::Login;
        let email = event.render("relay-01", ChannelKind::Email);
        assert_eq!(email.subject.as_deref(), Some("relay-01 Login"));

        let chat = event.render("relay-01", ChannelKind::ChatBot);
        assert!(chat.subject.is_none());
        assert_eq!(chat.body, email.body);
    }

    #[test]
    fn test_channel_kind_serialization() {
        let json = serde_json::to_string(&ChannelKind::ChatBot).unwrap();
        assert_eq!(json, "\"chat_bot\"");
        assert_eq!(ChannelKind::Webhook.to_string(), "webhook");
    }
}
