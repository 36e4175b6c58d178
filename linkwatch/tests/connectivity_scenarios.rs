//! End-to-end behaviour of the monitor task with in-memory channels and probes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use linkwatch::connectivity::{
    ConnectivityMonitor, ConnectivityState, LifecycleEvent, MonitorHandle, ProbeStatus,
    ReachabilityCheck, spawn_probe_loop,
};
use linkwatch::heartbeat::HeartbeatEmitter;
use linkwatch::notification::{
    ChannelKind, Dispatcher, NotificationChannel, PendingNotification,
};
use linkwatch::utils::http_client::build_client;
use linkwatch::{Error, Result};

const OFFLINE: &str = "relay-01 has gone offline.";
const RECONNECTED: &str = "relay-01 has reconnected.";
const SHUTDOWN: &str = "relay-01 has been disconnected.";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attempt {
    channel: ChannelKind,
    body: String,
    ok: bool,
}

type Attempts = Arc<Mutex<Vec<Attempt>>>;

/// Channel whose successive outcomes are scripted; succeeds once the script runs out.
struct ScriptedChannel {
    kind: ChannelKind,
    script: Mutex<VecDeque<bool>>,
    always_fail: bool,
    attempts: Attempts,
}

#[async_trait]
impl NotificationChannel for ScriptedChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, notification: &PendingNotification) -> Result<()> {
        let ok = !self.always_fail && self.script.lock().unwrap().pop_front().unwrap_or(true);
        self.attempts.lock().unwrap().push(Attempt {
            channel: self.kind,
            body: notification.body.clone(),
            ok,
        });
        if ok {
            Ok(())
        } else {
            Err(Error::channel(self.kind.as_str(), "scripted failure"))
        }
    }
}

struct Harness {
    monitor: MonitorHandle,
    task: JoinHandle<()>,
    attempts: Attempts,
}

impl Harness {
    fn new(scripts: [&[bool]; 3]) -> Self {
        Self::build(scripts, None)
    }

    fn with_dead_channel(kind: ChannelKind) -> Self {
        Self::build([&[], &[], &[]], Some(kind))
    }

    fn build(scripts: [&[bool]; 3], dead: Option<ChannelKind>) -> Self {
        let attempts: Attempts = Arc::new(Mutex::new(Vec::new()));
        let kinds = [ChannelKind::Email, ChannelKind::ChatBot, ChannelKind::Webhook];
        let channels: Vec<Arc<dyn NotificationChannel>> = kinds
            .into_iter()
            .zip(scripts)
            .map(|(kind, script)| {
                Arc::new(ScriptedChannel {
                    kind,
                    script: Mutex::new(script.iter().copied().collect()),
                    always_fail: dead == Some(kind),
                    attempts: attempts.clone(),
                }) as Arc<dyn NotificationChannel>
            })
            .collect();

        let dispatcher = Dispatcher::new(channels, "relay-01");
        let (monitor, task) = MonitorHandle::spawn(ConnectivityMonitor::new(dispatcher));
        Self {
            monitor,
            task,
            attempts,
        }
    }

    async fn probe(&self, status: ProbeStatus) {
        self.monitor.report_probe(Ok(status)).await.unwrap();
    }

    fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_fail_fail_success_sequence() {
    let harness = Harness::new([&[], &[], &[]]);

    harness.probe(ProbeStatus::Unreachable).await;
    let snapshot = harness.monitor.snapshot().await.unwrap();
    assert_eq!(snapshot.pending.len(), 3);
    assert!(snapshot.pending.iter().all(|(_, body)| body == OFFLINE));

    harness.probe(ProbeStatus::Unreachable).await;
    assert_eq!(harness.monitor.snapshot().await.unwrap().pending.len(), 3);

    harness.probe(ProbeStatus::Reachable).await;
    let snapshot = harness.monitor.snapshot().await.unwrap();
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.state, ConnectivityState::default());

    let attempts = harness.attempts();
    let bodies: Vec<_> = attempts.iter().map(|a| a.body.as_str()).collect();
    assert_eq!(
        bodies,
        vec![OFFLINE, OFFLINE, OFFLINE, RECONNECTED, RECONNECTED, RECONNECTED]
    );
    assert!(attempts.iter().all(|a| a.ok));
}

#[tokio::test]
async fn test_many_failures_queue_exactly_one_outage_set() {
    let harness = Harness::new([&[], &[], &[]]);

    for _ in 0..10 {
        harness.probe(ProbeStatus::Unreachable).await;
    }
    harness
        .monitor
        .signal(LifecycleEvent::Disconnect)
        .await
        .unwrap();

    let snapshot = harness.monitor.snapshot().await.unwrap();
    let kinds: Vec<_> = snapshot.pending.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(
        kinds,
        vec![ChannelKind::Email, ChannelKind::ChatBot, ChannelKind::Webhook]
    );
    assert!(harness.attempts().is_empty());
}

#[tokio::test]
async fn test_failed_head_blocks_later_entries_until_delivered() {
    // Email fails on its first attempt only.
    let harness = Harness::new([&[false], &[], &[]]);

    harness.probe(ProbeStatus::Unreachable).await;
    harness.probe(ProbeStatus::Reachable).await;

    // The drain stopped at the email entry; chat and webhook were not tried.
    let queued: Vec<_> = harness
        .attempts()
        .into_iter()
        .filter(|a| a.body == OFFLINE)
        .collect();
    assert_eq!(
        queued,
        vec![Attempt {
            channel: ChannelKind::Email,
            body: OFFLINE.to_string(),
            ok: false,
        }]
    );
    let snapshot = harness.monitor.snapshot().await.unwrap();
    assert_eq!(snapshot.pending.len(), 3);
    assert_eq!(snapshot.pending[0].0, ChannelKind::Email);

    // Next outage episode, then the next recovery drains the backlog in order.
    harness.probe(ProbeStatus::Unreachable).await;
    harness.probe(ProbeStatus::Reachable).await;

    let offline: Vec<_> = harness
        .attempts()
        .into_iter()
        .filter(|a| a.body == OFFLINE)
        .map(|a| (a.channel, a.ok))
        .collect();
    assert_eq!(
        offline,
        vec![
            (ChannelKind::Email, false),
            (ChannelKind::Email, true),
            (ChannelKind::ChatBot, true),
            (ChannelKind::Webhook, true),
            (ChannelKind::Email, true),
            (ChannelKind::ChatBot, true),
            (ChannelKind::Webhook, true),
        ]
    );
    assert!(harness.monitor.snapshot().await.unwrap().pending.is_empty());
}

#[tokio::test]
async fn test_identical_errors_each_queue_a_set() {
    let harness = Harness::new([&[], &[], &[]]);

    for _ in 0..2 {
        harness
            .monitor
            .signal(LifecycleEvent::Error("socket hang up".to_string()))
            .await
            .unwrap();
    }

    let snapshot = harness.monitor.snapshot().await.unwrap();
    assert_eq!(snapshot.pending.len(), 6);
    assert!(
        snapshot
            .pending
            .iter()
            .all(|(_, body)| body == "An error occurred: socket hang up")
    );
    // Errors do not change reachability.
    assert_eq!(snapshot.state, ConnectivityState::default());
}

#[tokio::test]
async fn test_ready_sends_login_immediately_once() {
    let harness = Harness::new([&[], &[false], &[]]);

    harness.monitor.signal(LifecycleEvent::Ready).await.unwrap();
    harness.monitor.signal(LifecycleEvent::Ready).await.unwrap();

    let snapshot = harness.monitor.snapshot().await.unwrap();
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.stats.delivered, 2);
    assert_eq!(snapshot.stats.failed_attempts, 1);
    assert_eq!(harness.attempts().len(), 3);
}

#[tokio::test]
async fn test_termination_appends_shutdown_and_drains_once() {
    // Chat bot fails once, leaving two outage entries queued after recovery.
    let harness = Harness::new([&[], &[false], &[]]);
    harness.probe(ProbeStatus::Unreachable).await;
    harness.probe(ProbeStatus::Reachable).await;

    let before = harness.monitor.snapshot().await.unwrap();
    let kinds: Vec<_> = before.pending.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(kinds, vec![ChannelKind::ChatBot, ChannelKind::Webhook]);

    let report = harness.monitor.terminate().await.unwrap();
    assert_eq!(report.delivered, 5);
    assert!(report.is_complete());

    let tail: Vec<_> = harness
        .attempts()
        .into_iter()
        .rev()
        .take(5)
        .rev()
        .map(|a| (a.channel, a.body))
        .collect();
    assert_eq!(
        tail,
        vec![
            (ChannelKind::ChatBot, OFFLINE.to_string()),
            (ChannelKind::Webhook, OFFLINE.to_string()),
            (ChannelKind::Email, SHUTDOWN.to_string()),
            (ChannelKind::ChatBot, SHUTDOWN.to_string()),
            (ChannelKind::Webhook, SHUTDOWN.to_string()),
        ]
    );

    harness.task.await.unwrap();
    assert!(matches!(
        harness.monitor.snapshot().await,
        Err(Error::MonitorStopped)
    ));
}

#[tokio::test]
async fn test_termination_returns_even_when_drain_stalls() {
    let harness = Harness::with_dead_channel(ChannelKind::Email);
    harness.probe(ProbeStatus::Unreachable).await;

    let report = harness.monitor.terminate().await.unwrap();
    assert_eq!(report.delivered, 0);
    assert_eq!(report.remaining, 6);
    assert_eq!(report.stalled_on, Some(ChannelKind::Email));
    assert_eq!(harness.attempts().len(), 1);

    harness.task.await.unwrap();
}

#[tokio::test]
async fn test_probe_error_leaves_state_untouched() {
    let harness = Harness::new([&[], &[], &[]]);

    harness
        .monitor
        .report_probe(Err(Error::probe("ping: not found")))
        .await
        .unwrap();

    let snapshot = harness.monitor.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ConnectivityState::default());
    assert!(snapshot.pending.is_empty());
}

#[tokio::test]
async fn test_heartbeat_failure_does_not_touch_monitor() {
    let harness = Harness::new([&[], &[], &[]]);
    harness.probe(ProbeStatus::Unreachable).await;
    let before = harness.monitor.snapshot().await.unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let cancel = CancellationToken::new();
    let heartbeat = HeartbeatEmitter::new(
        format!("http://127.0.0.1:{port}/heartbeat"),
        "relay-01",
        build_client(Some(Duration::from_secs(2))),
    )
    .spawn(Duration::from_millis(50), cancel.clone());

    // Several failed beats go by while the monitor keeps serving requests.
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(harness.monitor.snapshot().await.unwrap(), before);
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), heartbeat)
        .await
        .expect("heartbeat loop did not stop")
        .unwrap();

    let after = harness.monitor.snapshot().await.unwrap();
    assert_eq!(before, after);
    assert!(!harness.monitor.is_closed());
}

/// Probe whose successive results are scripted; reports reachable once the script runs out.
struct ScriptedCheck {
    results: Mutex<VecDeque<ProbeStatus>>,
    calls: AtomicUsize,
}

#[async_trait]
impl ReachabilityCheck for ScriptedCheck {
    fn target(&self) -> String {
        "scripted".to_string()
    }

    async fn check(&self) -> Result<ProbeStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ProbeStatus::Reachable))
    }
}

#[tokio::test(start_paused = true)]
async fn test_probe_loop_runs_on_virtual_clock() {
    let harness = Harness::new([&[], &[], &[]]);
    let check = Arc::new(ScriptedCheck {
        results: Mutex::new(VecDeque::from([
            ProbeStatus::Unreachable,
            ProbeStatus::Unreachable,
            ProbeStatus::Reachable,
        ])),
        calls: AtomicUsize::new(0),
    });
    let cancel = CancellationToken::new();
    let period = Duration::from_secs(600);

    let probe_task = spawn_probe_loop(
        check.clone(),
        period,
        harness.monitor.clone(),
        cancel.clone(),
    );

    // Nothing runs before the first full period.
    tokio::time::sleep(Duration::from_secs(599)).await;
    assert_eq!(check.calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(check.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.monitor.snapshot().await.unwrap().pending.len(), 3);

    tokio::time::sleep(period * 2).await;
    assert_eq!(check.calls.load(Ordering::SeqCst), 3);

    let snapshot = harness.monitor.snapshot().await.unwrap();
    assert!(snapshot.pending.is_empty());
    assert!(snapshot.state.is_online());
    assert_eq!(harness.attempts().len(), 6);

    cancel.cancel();
    probe_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_probe_loop_ends_when_monitor_stops() {
    let harness = Harness::new([&[], &[], &[]]);
    let check = Arc::new(ScriptedCheck {
        results: Mutex::new(VecDeque::new()),
        calls: AtomicUsize::new(0),
    });

    let probe_task = spawn_probe_loop(
        check,
        Duration::from_secs(60),
        harness.monitor.clone(),
        CancellationToken::new(),
    );

    harness.monitor.terminate().await.unwrap();
    harness.task.await.unwrap();

    // The next tick finds the mailbox closed and the loop exits on its own.
    probe_task.await.unwrap();
}
