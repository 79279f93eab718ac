//! # convoy-runner
//!
//! Main entry point for the Convoy shipment tracking service.
//!
//! Loads a JSON configuration file, then either runs tracking sessions for
//! every configured movement or prints a viewer projection.
//!
//! While tracking, driver actions are read from stdin, one per line, and
//! routed to the session that owns the movement:
//!
//! ```text
//! begin mv_8f2k 19.07 72.87
//! complete mv_8f2k
//! stop mv_q19x
//! ```
//!
//! # Usage
//!
//! ```bash
//! convoy-runner track config.json --log-level info
//! convoy-runner project config.json mv_8f2k
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use convoy_core::config::AppConfig;
use convoy_core::logging::{LogOptions, init_logging};
use convoy_track::feed::create_feed;
use convoy_track::{
    DriverCommand, LocationResolver, SessionSettings, TrackEvent, TrackEventReceiver, Tracker, ViewerProjection,
    WatchOptions,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Shipment Movement Tracking Runner.
#[derive(Parser)]
#[command(name = "convoy-runner", about = "Shipment Movement Tracking Runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Optional log directory for file output (overrides the config).
    #[arg(long, global = true)]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Track every movement listed under `sessions` until Ctrl+C, taking
    /// driver commands from stdin.
    Track {
        /// Configuration file path (JSON).
        config: PathBuf,
    },
    /// Print the viewer projection of a movement as JSON.
    Project { config: PathBuf, movement_id: String },
}

impl Command {
    fn config_path(&self) -> &Path {
        match self {
            Self::Track { config } | Self::Project { config, .. } => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration (logging settings live there too)
    let config = convoy_core::config::load_config(cli.command.config_path())
        .with_context(|| format!("loading {}", cli.command.config_path().display()))?;

    // 2. Initialize logging
    let module_name = config.module_name();
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    init_logging(&LogOptions {
        level: &cli.log_level,
        dir: log_dir.as_deref(),
        module_name: &module_name,
        json: config.meta.as_ref().is_some_and(|m| m.log_json),
    });
    info!("convoy-runner starting, config={}", cli.command.config_path().display());

    // 3. Build collaborators
    let store = convoy_store::registry::create_movement_store(&config.store)?;

    match cli.command {
        Command::Track { .. } => run_tracking(&config, store).await,
        Command::Project { movement_id, .. } => {
            let geocoder = convoy_store::registry::create_geocoder(&config.geocoder)?;
            let orders = convoy_store::registry::create_order_store(&config.store)?;
            let viewer = ViewerProjection::new(store, LocationResolver::new(geocoder), &config.store.order_relation)
                .with_order_store(orders);
            let projection = viewer.project(&movement_id).await?;
            if projection.journey_not_started() {
                info!("movement {movement_id}: journey not started");
            }
            println!("{}", serde_json::to_string_pretty(&projection)?);
            Ok(())
        }
    }
}

/// Run all configured sessions until Ctrl+C.
async fn run_tracking(config: &AppConfig, store: Arc<dyn convoy_core::store::RecordStore>) -> Result<()> {
    let (mut tracker, events) = Tracker::new(
        store,
        SessionSettings::from_config(&config.tracking),
        WatchOptions::from_config(&config.tracking),
    );
    let event_task = tokio::spawn(log_events(events));

    for (idx, session) in config.sessions.iter().enumerate() {
        let feed = create_feed(&session.movement_id, &session.feed);
        match tracker.open(&session.movement_id, feed).await {
            Ok(status) => info!("session[{idx}]: tracking {} ({status})", session.movement_id),
            Err(e) => error!("session[{idx}]: cannot track {}: {e}", session.movement_id),
        }
    }

    info!("{} session(s) running, press Ctrl+C to stop", tracker.len());

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut commands_open = true;
    let mut reap = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("shutdown signal received");
                break;
            }
            line = commands.next_line(), if commands_open => match line {
                Ok(Some(line)) => handle_command(&mut tracker, &line).await,
                Ok(None) => {
                    info!("stdin closed, driver commands disabled");
                    commands_open = false;
                }
                Err(e) => {
                    warn!("reading driver commands: {e}");
                    commands_open = false;
                }
            },
            _ = reap.tick() => {
                for (id, stats) in tracker.reap_finished().await {
                    info!("movement {id} finished: {stats:?}");
                }
            }
        }
    }

    tracker.close_all().await;
    drop(tracker);
    let _ = event_task.await;
    info!("all sessions stopped");
    Ok(())
}

/// Parse one stdin line and apply it to the tracker.
async fn handle_command(tracker: &mut Tracker, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    let command = match line.parse::<DriverCommand>() {
        Ok(command) => command,
        Err(e) => {
            warn!("{e}");
            return;
        }
    };
    let movement_id = command.movement_id().to_string();
    match tracker.apply(command).await {
        Ok(status) => info!("movement {movement_id}: {status}"),
        Err(e) => warn!("movement {movement_id}: {e}"),
    }
}

/// Log track events until every sender is gone.
async fn log_events(mut events: TrackEventReceiver) {
    while let Some(event) = events.recv().await {
        match event {
            TrackEvent::JourneyStarted { movement_id, position } => {
                info!("journey started for {movement_id} at {position}");
            }
            TrackEvent::JourneyCompleted { movement_id, position } => {
                info!("journey completed for {movement_id} at {position}");
            }
            TrackEvent::TransitionFailed {
                movement_id,
                action,
                message,
            } => {
                warn!("could not {action} for {movement_id}: {message}");
            }
            TrackEvent::PositionPersisted { .. } | TrackEvent::TrackingStopped { .. } => {}
        }
    }
}
