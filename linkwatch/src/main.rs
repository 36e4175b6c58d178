use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use linkwatch::config::AppConfig;
use linkwatch::connectivity::{
    ConnectivityMonitor, LifecycleEvent, MonitorHandle, shutdown_signal, spawn_probe_loop,
};
use linkwatch::heartbeat::HeartbeatEmitter;
use linkwatch::logging;
use linkwatch::notification::{Dispatcher, NotificationChannel, build_channels};
use linkwatch::utils::http_client;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Load environment variables from this file instead of `./.env`
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Directory for rotated log files
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Send a test notification through every channel and exit
    #[arg(long)]
    test_channels: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let _log_guard = logging::init_logging(&args.log_dir).context("failed to initialize logging")?;

    let config = AppConfig::from_env().context("invalid configuration")?;
    let channels = build_channels(&config).context("invalid channel configuration")?;

    if args.test_channels {
        return Ok(test_channels(&channels).await);
    }

    info!(
        instance = %config.instance_name,
        probe = %config.probe.method,
        heartbeat = config.heartbeat.is_some(),
        "linkwatch starting"
    );

    let cancel = CancellationToken::new();
    let retention_task = logging::start_retention_cleanup(
        args.log_dir.clone(),
        logging::DEFAULT_LOG_RETENTION_DAYS,
        cancel.clone(),
    );

    let dispatcher = Dispatcher::new(channels, config.instance_name.clone());
    let (monitor, monitor_task) = MonitorHandle::spawn(ConnectivityMonitor::new(dispatcher));

    let probe_task = spawn_probe_loop(
        config.probe.build_check(),
        config.probe.interval,
        monitor.clone(),
        cancel.clone(),
    );

    let heartbeat_task = config.heartbeat.as_ref().map(|heartbeat| {
        HeartbeatEmitter::new(
            heartbeat.url.clone(),
            heartbeat.bot_id.clone(),
            http_client::build_client(config.send_timeout),
        )
        .spawn(heartbeat.interval, cancel.clone())
    });

    monitor.signal(LifecycleEvent::Ready).await?;

    shutdown_signal().await;

    // Exit only after the shutdown drain has returned.
    let report = monitor.terminate().await?;
    info!(
        delivered = report.delivered,
        remaining = report.remaining,
        "Shutdown drain finished"
    );

    cancel.cancel();
    join_task("Probe", probe_task).await;
    if let Some(task) = heartbeat_task {
        join_task("Heartbeat", task).await;
    }
    join_task("Log retention", retention_task).await;
    join_task("Monitor", monitor_task).await;

    info!("linkwatch stopped");
    Ok(ExitCode::SUCCESS)
}

/// Wait for a background task, logging a panic or cancellation. Returns whether it ended cleanly.
async fn join_task(name: &str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task = name, error = %e, "{name} task ended abnormally");
            false
        }
    }
}

async fn test_channels(channels: &[Arc<dyn NotificationChannel>]) -> ExitCode {
    let mut failed = 0;

    for channel in channels {
        match channel.test().await {
            Ok(()) => info!(channel = %channel.kind(), "Channel test succeeded"),
            Err(e) => {
                failed += 1;
                error!(channel = %channel.kind(), error = %e, "Channel test failed");
            }
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
