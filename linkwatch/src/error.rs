//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed startup configuration. Fatal.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A channel adapter failed to deliver a notification.
    ///
    /// Delivery is all-or-nothing, so no partial progress is carried.
    #[error("{channel} delivery failed: {message}")]
    ChannelSend {
        channel: &'static str,
        message: String,
    },

    /// The reachability check itself could not run. This is not the same as
    /// the target being unreachable.
    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Heartbeat failed: {0}")]
    Heartbeat(String),

    /// The monitor task has stopped and no longer accepts messages.
    #[error("Connectivity monitor has stopped")]
    MonitorStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn channel(channel: &'static str, msg: impl Into<String>) -> Self {
        Self::ChannelSend {
            channel,
            message: msg.into(),
        }
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }
}
