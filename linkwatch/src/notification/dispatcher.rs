//! Notification dispatcher.
//!
//! The dispatcher owns the pending queue and the registered channels and
//! implements the two delivery modes:
//! - immediate: fan out to every channel now, log failures, never retry
//! - queued: one pending notification per channel, delivered by [`Dispatcher::drain`]
//!
//! Draining is head-of-line blocking. A failed head is put back and the pass
//! stops, so nothing enqueued after it is attempted before it succeeds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::channels::NotificationChannel;
use super::events::{ChannelKind, NotificationEvent};
use super::queue::NotificationQueue;

/// Counters describing dispatcher activity since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherStats {
    /// Entries currently waiting in the queue.
    pub pending: usize,
    /// Notifications delivered, immediate and queued.
    pub delivered: u64,
    /// Send attempts that failed, immediate and queued.
    pub failed_attempts: u64,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Entries delivered and removed during this pass.
    pub delivered: usize,
    /// Entries still queued when the pass ended.
    pub remaining: usize,
    /// Channel whose failure halted the pass, if it halted early.
    pub stalled_on: Option<ChannelKind>,
}

impl DrainReport {
    /// Whether the pass emptied the queue.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Outcome of an immediate fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub delivered: Vec<ChannelKind>,
    pub failed: Vec<ChannelKind>,
}

/// Routes notification events to channels.
pub struct Dispatcher {
    instance: String,
    channels: Vec<Arc<dyn NotificationChannel>>,
    queue: NotificationQueue,
    delivered: u64,
    failed_attempts: u64,
}

impl Dispatcher {
    /// Create a dispatcher. `channels` order is the fan-out order.
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            channels,
            queue: NotificationQueue::new(),
            delivered: 0,
            failed_attempts: 0,
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Send `event` to every channel now, in registration order.
    ///
    /// Every channel is attempted even if an earlier one fails. Failures are
    /// logged and reported but never queued or retried.
    pub async fn send_immediate(&mut self, event: &NotificationEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for channel in &self.channels {
            let kind = channel.kind();
            let notification = event.render(&self.instance, kind);

            match channel.send(&notification).await {
                Ok(()) => {
                    self.delivered += 1;
                    report.delivered.push(kind);
                }
                Err(e) => {
                    self.failed_attempts += 1;
                    warn!(
                        channel = %kind,
                        event = event.event_type(),
                        error = %e,
                        "Immediate notification failed"
                    );
                    report.failed.push(kind);
                }
            }
        }

        debug!(
            event = event.event_type(),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Immediate notification dispatched"
        );
        report
    }

    /// Queue one notification per channel for `event`. Returns how many were queued.
    pub fn enqueue_event(&mut self, event: &NotificationEvent) -> usize {
        for channel in &self.channels {
            self.queue.enqueue(event.render(&self.instance, channel.kind()));
        }

        debug!(
            event = event.event_type(),
            pending = self.queue.len(),
            "Notification set queued"
        );
        self.channels.len()
    }

    /// Deliver queued notifications from the head until the queue is empty or
    /// a delivery fails.
    pub async fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();

        while let Some(notification) = self.queue.pop_front() {
            let kind = notification.channel;
            let Some(channel) = self.channel_for(kind) else {
                warn!(channel = %kind, "No channel registered, discarding queued notification");
                continue;
            };

            match channel.send(&notification).await {
                Ok(()) => {
                    self.delivered += 1;
                    report.delivered += 1;
                }
                Err(e) => {
                    self.failed_attempts += 1;
                    self.queue.requeue_front(notification);
                    report.stalled_on = Some(kind);
                    warn!(
                        channel = %kind,
                        error = %e,
                        pending = self.queue.len(),
                        "Queued notification failed, halting drain"
                    );
                    break;
                }
            }
        }

        report.remaining = self.queue.len();
        if report.delivered > 0 || report.remaining > 0 {
            info!(
                delivered = report.delivered,
                remaining = report.remaining,
                "Notification queue drained"
            );
        }
        report
    }

    pub fn pending(&self) -> &NotificationQueue {
        &self.queue
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            pending: self.queue.len(),
            delivered: self.delivered,
            failed_attempts: self.failed_attempts,
        }
    }

    fn channel_for(&self, kind: ChannelKind) -> Option<Arc<dyn NotificationChannel>> {
        self.channels.iter().find(|c| c.kind() == kind).cloned()
    }

    #[cfg(test)]
    pub(crate) fn enqueue_raw(&mut self, notification: super::events::PendingNotification) {
        self.queue.enqueue(notification);
    }
}
