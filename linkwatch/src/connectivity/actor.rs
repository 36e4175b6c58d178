//! Single-owner task around the [`ConnectivityMonitor`].
//!
//! Every mutation of the queue and the connectivity state arrives as a
//! [`MonitorMessage`] and is handled to completion before the next one is
//! received, so drains and immediate sends never interleave.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::lifecycle::LifecycleEvent;
use super::monitor::{ConnectivityMonitor, MonitorSnapshot};
use super::probe::ProbeStatus;
use crate::notification::DrainReport;
use crate::{Error, Result};

/// Mailbox capacity of the monitor task.
pub const MONITOR_MAILBOX_CAPACITY: usize = 64;

/// Messages handled by the monitor task.
#[derive(Debug)]
pub enum MonitorMessage {
    /// A client lifecycle signal.
    Lifecycle(LifecycleEvent),
    /// Result of one reachability check.
    Probe(Result<ProbeStatus>),
    /// Query current state (response sent via oneshot channel).
    Snapshot(oneshot::Sender<MonitorSnapshot>),
    /// Queue the shutdown set, drain once, reply with the drain outcome and stop.
    Terminate(oneshot::Sender<DrainReport>),
}

/// Cloneable sender side of the monitor task.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorMessage>,
}

impl MonitorHandle {
    /// Move `monitor` into its own task and return a handle to it.
    pub fn spawn(monitor: ConnectivityMonitor) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(MONITOR_MAILBOX_CAPACITY);
        let task = tokio::spawn(run(monitor, receiver));
        (Self { sender }, task)
    }

    /// Single ingress for client lifecycle signals.
    pub async fn signal(&self, event: LifecycleEvent) -> Result<()> {
        self.send(MonitorMessage::Lifecycle(event)).await
    }

    pub async fn report_probe(&self, result: Result<ProbeStatus>) -> Result<()> {
        self.send(MonitorMessage::Probe(result)).await
    }

    /// Snapshot taken after every message sent before it has been handled.
    pub async fn snapshot(&self) -> Result<MonitorSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(MonitorMessage::Snapshot(reply)).await?;
        response.await.map_err(|_| Error::MonitorStopped)
    }

    /// Run the shutdown path and wait for its single drain to finish.
    pub async fn terminate(&self) -> Result<DrainReport> {
        let (reply, response) = oneshot::channel();
        self.send(MonitorMessage::Terminate(reply)).await?;
        response.await.map_err(|_| Error::MonitorStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, message: MonitorMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| Error::MonitorStopped)
    }
}

async fn run(mut monitor: ConnectivityMonitor, mut receiver: mpsc::Receiver<MonitorMessage>) {
    info!("Connectivity monitor started");

    while let Some(message) = receiver.recv().await {
        match message {
            MonitorMessage::Lifecycle(event) => {
                debug!(event = event.as_str(), "Lifecycle signal received");
                monitor.handle_lifecycle(event).await;
            }
            MonitorMessage::Probe(result) => {
                monitor.handle_probe(result).await;
            }
            MonitorMessage::Snapshot(reply) => {
                let _ = reply.send(monitor.snapshot());
            }
            MonitorMessage::Terminate(reply) => {
                let report = monitor.shutdown().await;
                let _ = reply.send(report);
                break;
            }
        }
    }

    info!("Connectivity monitor stopped");
}
