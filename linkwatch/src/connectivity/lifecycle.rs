//! Client lifecycle signals and process termination.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Signals raised by the host client integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The client established its session.
    Ready,
    /// The client surfaced a runtime error.
    Error(String),
    /// The client lost its connection.
    Disconnect,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Error(_) => "error",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Resolve when the process is asked to terminate (Ctrl-C, or SIGTERM on Unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_event_serialization() {
        let json = serde_json::to_string(&LifecycleEvent::Error("boom".to_string())).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"boom"}"#);

        let event: LifecycleEvent = serde_json::from_str(r#"{"type":"disconnect"}"#).unwrap();
        assert_eq!(event, LifecycleEvent::Disconnect);
    }
}
