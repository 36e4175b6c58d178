//! Liveness heartbeat.
//!
//! Posts `{botId, timestamp}` to a monitoring endpoint on a fixed period.
//! A failed beat is logged and dropped. It never touches the connectivity
//! monitor or the notification queue.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Liveness record sent to the monitoring endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub bot_id: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,
}

impl HeartbeatPayload {
    pub fn now(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

pub struct HeartbeatEmitter {
    url: String,
    bot_id: String,
    client: Client,
}

impl HeartbeatEmitter {
    pub fn new(url: impl Into<String>, bot_id: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            bot_id: bot_id.into(),
            client,
        }
    }

    /// Send one heartbeat. No retry.
    pub async fn beat(&self) -> Result<()> {
        let payload = HeartbeatPayload::now(&self.bot_id);

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Heartbeat(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Heartbeat(format!("monitor returned HTTP {status}")));
        }

        debug!(bot_id = %self.bot_id, "Heartbeat sent");
        Ok(())
    }

    /// Beat every `period` until cancelled. The first beat is one period after start.
    pub fn spawn(self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(url = %self.url, period_secs = period.as_secs(), "Heartbeat started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.beat().await {
                            warn!(error = %e, "Heartbeat failed");
                        }
                    }
                }
            }

            debug!("Heartbeat stopped");
        })
    }
}
