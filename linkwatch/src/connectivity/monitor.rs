//! Connectivity monitor.
//!
//! Owns the [`ConnectivityState`] and the [`Dispatcher`], and turns probe
//! results and lifecycle signals into notification side effects:
//!
//! | Input | Effect |
//! |---|---|
//! | first failure or disconnect of an episode | queue one offline set |
//! | success after an outage | drain, then send reconnected immediately |
//! | ready (first time only) | send login immediately |
//! | client error | queue one error set, every time |
//! | shutdown | queue one shutdown set, drain once |

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::lifecycle::LifecycleEvent;
use super::probe::ProbeStatus;
use super::state::{ConnectivityState, Transition};
use crate::Result;
use crate::notification::{
    ChannelKind, Dispatcher, DispatcherStats, DrainReport, NotificationEvent,
};

/// Point-in-time view of the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub state: ConnectivityState,
    /// Queued entries as `(channel, body)`, head first.
    pub pending: Vec<(ChannelKind, String)>,
    pub stats: DispatcherStats,
}

pub struct ConnectivityMonitor {
    state: ConnectivityState,
    dispatcher: Dispatcher,
    login_announced: bool,
}

impl ConnectivityMonitor {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            state: ConnectivityState::default(),
            dispatcher,
            login_announced: false,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Apply one probe result.
    ///
    /// A probe that could not run is a skipped cycle: logged, state untouched.
    pub async fn handle_probe(&mut self, result: Result<ProbeStatus>) -> Transition {
        match result {
            Ok(ProbeStatus::Reachable) => self.on_reachable().await,
            Ok(ProbeStatus::Unreachable) => self.on_outage("probe"),
            Err(e) => {
                warn!(error = %e, "Reachability check could not run, skipping cycle");
                Transition::Unchanged
            }
        }
    }

    /// Apply one client lifecycle signal.
    pub async fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Transition {
        match event {
            LifecycleEvent::Ready => {
                if self.login_announced {
                    debug!("Ready signalled again, login already announced");
                } else {
                    self.login_announced = true;
                    info!(instance = %self.dispatcher.instance(), "Client ready, announcing login");
                    self.dispatcher
                        .send_immediate(&NotificationEvent::Login)
                        .await;
                }
                Transition::Unchanged
            }
            LifecycleEvent::Error(message) => {
                warn!(error = %message, "Client reported an error");
                self.dispatcher
                    .enqueue_event(&NotificationEvent::Error { message });
                Transition::Unchanged
            }
            LifecycleEvent::Disconnect => self.on_outage("client"),
        }
    }

    /// Queue the shutdown set and make one drain attempt.
    pub async fn shutdown(&mut self) -> DrainReport {
        self.dispatcher.enqueue_event(&NotificationEvent::Shutdown);
        let report = self.dispatcher.drain().await;
        if report.is_complete() {
            info!(delivered = report.delivered, "Shutdown notifications delivered");
        } else {
            warn!(
                remaining = report.remaining,
                stalled_on = ?report.stalled_on,
                "Exiting with undelivered notifications"
            );
        }
        report
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            state: self.state,
            pending: self
                .dispatcher
                .pending()
                .iter()
                .map(|n| (n.channel, n.body.clone()))
                .collect(),
            stats: self.dispatcher.stats(),
        }
    }

    fn on_outage(&mut self, source: &'static str) -> Transition {
        let transition = self.state.mark_offline();
        if transition == Transition::WentOffline {
            warn!(source, "Connectivity lost, queueing offline notification");
            self.dispatcher.enqueue_event(&NotificationEvent::Offline);
        } else {
            debug!(source, "Still offline, outage already reported");
        }
        transition
    }

    async fn on_reachable(&mut self) -> Transition {
        let transition = self.state.mark_online();
        if transition != Transition::Recovered {
            return transition;
        }

        info!("Connectivity restored");
        let report = self.dispatcher.drain().await;
        if !report.is_complete() {
            warn!(
                remaining = report.remaining,
                stalled_on = ?report.stalled_on,
                "Backlog not fully delivered, announcing reconnect anyway"
            );
        }
        self.dispatcher
            .send_immediate(&NotificationEvent::Reconnected)
            .await;
        self.state.clear_outage();
        transition
    }
}
