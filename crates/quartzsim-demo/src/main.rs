use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use quartzsim_core::config::SimConfig;
use quartzsim_scheduler::{MonotonicClock, SchedulerEngine};
use tracing::{info, warn};

mod timeline;

/// Short git commit hash embedded at compile time by build.rs.
const GIT_SHA: &str = env!("QUARTZSIM_GIT_SHA");

#[derive(Parser)]
#[command(name = "quartzsim-demo", about = "Run a simulated job scheduler and print its timeline", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long, value_name = "SECS")]
    run_for: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quartzsim_demo=info,quartzsim_scheduler=info".into()),
        )
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), git = GIT_SHA, "quartzsim demo");

    // load config: --config > QUARTZSIM_CONFIG env > ~/.quartzsim/quartzsim.toml
    let mut config = SimConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        SimConfig::default()
    });
    if cli.json {
        config.timeline.json = true;
    }
    if config.schedule.is_empty() {
        info!("no schedule configured, loading the built-in demo tree");
        config.schedule = SimConfig::demo_schedule();
    }

    let engine = SchedulerEngine::from_config(&config, Arc::new(MonotonicClock::new()))
        .context("invalid schedule")?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let (handle, task) = quartzsim_scheduler::spawn(engine, shutdown_rx);

    if config.scheduler.auto_start {
        handle.start().await?;
    } else {
        info!("auto_start disabled, scheduler stays in standby");
    }

    let mut timeline = timeline::Timeline::new(config.timeline.json);
    let mut poll = tokio::time::interval(Duration::from_millis(
        config.timeline.poll_interval_ms.max(1),
    ));
    let deadline = tokio::time::sleep(Duration::from_secs(cli.run_for.unwrap_or_default()));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let events = handle.events_since(timeline.cursor()).await?;
                timeline.render(&events)?;
            }
            _ = &mut deadline, if cli.run_for.is_some() => {
                info!("run time elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    handle.shutdown().await?;
    let snapshot = handle.snapshot().await?;
    timeline.render(&handle.events_since(timeline.cursor()).await?)?;

    // signal the scheduler actor to stop
    let _ = shutdown_tx.send(true);
    let engine = task.await?;
    info!(
        jobs_executed = engine.jobs_executed(),
        abandoned = snapshot.in_progress.len(),
        "scheduler stopped"
    );
    Ok(())
}
