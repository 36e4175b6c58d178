//! Reachability probes.
//!
//! A probe answers one question: can this host reach the outside world right
//! now. `Ok(ProbeStatus::Unreachable)` means the check ran and failed;
//! `Err(Error::Probe)` means the check itself could not run and says nothing
//! about connectivity.

use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::actor::MonitorHandle;
use crate::{Error, Result};

/// Outcome of a probe that ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Reachable,
    Unreachable,
}

/// A single reachability check against an external host.
#[async_trait]
pub trait ReachabilityCheck: Send + Sync {
    /// Human-readable target, for logs.
    fn target(&self) -> String;

    async fn check(&self) -> Result<ProbeStatus>;
}

/// ICMP echo through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingCheck {
    host: String,
    timeout: Duration,
}

impl PingCheck {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new("ping");
        command
            .args(ping_args(&self.host, self.timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

/// Single-echo `ping` arguments for the current platform.
fn ping_args(host: &str, timeout: Duration) -> Vec<String> {
    #[cfg(windows)]
    let (count_flag, wait) = ("-n", timeout.as_millis().max(1).to_string());

    #[cfg(target_os = "macos")]
    let (count_flag, wait) = ("-c", timeout.as_millis().max(1).to_string());

    // Linux `-W` takes whole seconds.
    #[cfg(not(any(windows, target_os = "macos")))]
    let (count_flag, wait) = ("-c", (timeout.as_secs_f64().ceil().max(1.0) as u64).to_string());

    let wait_flag = if cfg!(windows) { "-w" } else { "-W" };

    vec![
        count_flag.to_string(),
        "1".to_string(),
        wait_flag.to_string(),
        wait,
        host.to_string(),
    ]
}

#[async_trait]
impl ReachabilityCheck for PingCheck {
    fn target(&self) -> String {
        self.host.clone()
    }

    async fn check(&self) -> Result<ProbeStatus> {
        // `ping` enforces its own deadline; the outer one catches a wedged process.
        let deadline = self.timeout + Duration::from_secs(1);

        match timeout(deadline, self.command().status()).await {
            Err(_) => Ok(ProbeStatus::Unreachable),
            Ok(Err(e)) => Err(Error::probe(format!("failed to run ping: {e}"))),
            Ok(Ok(status)) if status.success() => Ok(ProbeStatus::Reachable),
            Ok(Ok(status)) => {
                debug!(host = %self.host, %status, "ping reported no reply");
                Ok(ProbeStatus::Unreachable)
            }
        }
    }
}

/// TCP connect to a well-known service.
#[derive(Debug, Clone)]
pub struct TcpCheck {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpCheck {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

/// Map a connect error onto a probe outcome.
fn classify_connect_error(error: &io::Error) -> Result<ProbeStatus> {
    match error.kind() {
        // Something answered, so the path is up.
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
            Ok(ProbeStatus::Reachable)
        }
        io::ErrorKind::PermissionDenied
        | io::ErrorKind::InvalidInput
        | io::ErrorKind::Unsupported => Err(Error::probe(format!("tcp connect: {error}"))),
        _ => Ok(ProbeStatus::Unreachable),
    }
}

#[async_trait]
impl ReachabilityCheck for TcpCheck {
    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn check(&self) -> Result<ProbeStatus> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));

        match timeout(self.timeout, connect).await {
            Err(_) => Ok(ProbeStatus::Unreachable),
            Ok(Ok(_stream)) => Ok(ProbeStatus::Reachable),
            Ok(Err(e)) => classify_connect_error(&e),
        }
    }
}

/// Run `check` every `period` and report each result to the monitor.
///
/// The first check happens one full period after start. The loop ends on
/// cancellation or once the monitor has stopped.
pub fn spawn_probe_loop(
    check: Arc<dyn ReachabilityCheck>,
    period: Duration,
    handle: MonitorHandle,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(host = %check.target(), period_secs = period.as_secs(), "Probe loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let result = check.check().await;
                    debug!(host = %check.target(), ?result, "Probe finished");

                    if handle.report_probe(result).await.is_err() {
                        debug!("Monitor stopped, ending probe loop");
                        break;
                    }
                }
            }
        }

        debug!("Probe loop stopped");
    })
}
