//! Notification delivery.
//!
//! Events are rendered into one notification per channel and either sent
//! immediately or queued for an ordered drain.

pub mod channels;
pub mod dispatcher;
pub mod events;
pub mod queue;

pub use channels::{NotificationChannel, build_channels};
pub use dispatcher::{DeliveryReport, Dispatcher, DispatcherStats, DrainReport};
pub use events::{ChannelKind, NotificationEvent, PendingNotification};
pub use queue::NotificationQueue;
