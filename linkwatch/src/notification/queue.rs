//! In-memory FIFO of notifications that have not been delivered yet.
//!
//! Entries are only appended at the tail and taken from the head. A head that
//! failed delivery is put back with [`NotificationQueue::requeue_front`].

use std::collections::VecDeque;

use super::events::{ChannelKind, PendingNotification};

/// Ordered list of pending notifications.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    entries: VecDeque<PendingNotification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    pub fn enqueue(&mut self, notification: PendingNotification) {
        self.entries.push_back(notification);
    }

    /// Take the head, if any.
    pub fn pop_front(&mut self) -> Option<PendingNotification> {
        self.entries.pop_front()
    }

    /// Put a notification back at the head, undoing a [`pop_front`](Self::pop_front).
    pub fn requeue_front(&mut self, notification: PendingNotification) {
        self.entries.push_front(notification);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingNotification> {
        self.entries.iter()
    }

    /// Number of entries addressed to `channel`.
    pub fn count_for(&self, channel: ChannelKind) -> usize {
        self.entries.iter().filter(|n| n.channel == channel).count()
    }
}
