//! Connectivity tracking.
//!
//! Probe results and client lifecycle signals are fed into a single-owner
//! monitor task that applies the outage/recovery state machine and drives
//! the notification dispatcher.

pub mod actor;
pub mod lifecycle;
pub mod monitor;
pub mod probe;
pub mod state;

pub use actor::{MonitorHandle, MonitorMessage};
pub use lifecycle::{LifecycleEvent, shutdown_signal};
pub use monitor::{ConnectivityMonitor, MonitorSnapshot};
pub use probe::{PingCheck, ProbeStatus, ReachabilityCheck, TcpCheck, spawn_probe_loop};
pub use state::{ConnectivityState, Transition};
