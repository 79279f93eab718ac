//! Per-movement tracking worker.
//!
//! A [`TrackingSession`] owns one [`PositionSource`] and one worker task. The
//! source's sample callback pushes into a bounded queue with `try_send`, so it
//! never blocks; when the worker is busy with a slow write and the queue is
//! full, new samples are dropped. The worker applies the throttle and hands
//! accepted samples to the [`MovementStateMachine`].
//!
//! ```text
//! source callback ──try_send──► [bounded samples] ──┐
//! begin / complete ──────────► [commands] ──────────┼──► worker ──► state machine ──► store
//! stop() ────────────────────► [shutdown watch] ────┘
//! ```
//!
//! `stop()` is synchronous and may be called from anywhere, including an
//! event handler reacting to a completed write. Once it returns, no sample
//! that has not already been accepted by the throttle will be persisted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use convoy_core::config::TrackingConfig;
use convoy_core::error::TrackError;
use convoy_core::types::{Coordinate, MovementStatus, PositionSample};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::event::{TrackEvent, TrackEventSender};
use crate::machine::MovementStateMachine;
use crate::source::{ErrorCallback, PositionSource, SampleCallback};
use crate::throttle::ThrottledPublisher;

/// Capacity of the driver command queue.
const COMMAND_QUEUE: usize = 8;

/// Session tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Minimum time between persisted positions.
    pub throttle_window: Duration,
    /// Bounded sample queue capacity.
    pub queue_capacity: usize,
}

impl SessionSettings {
    pub fn from_config(cfg: &TrackingConfig) -> Self {
        Self {
            throttle_window: cfg.throttle_window(),
            queue_capacity: cfg.queue_capacity,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Samples shown on the local marker.
    pub displayed: u64,
    /// Samples accepted by the throttle.
    pub forwarded: u64,
    /// Accepted samples that reached the store.
    pub persisted: u64,
    /// Samples dropped because the queue was full.
    pub dropped: u64,
    /// Final status.
    pub status: MovementStatus,
}

type Reply = oneshot::Sender<Result<MovementStatus, TrackError>>;

enum Command {
    Begin(Coordinate, Reply),
    Complete(Coordinate, Reply),
}

/// Handle to a running per-movement worker.
pub struct TrackingSession {
    movement_id: String,
    commands: mpsc::Sender<Command>,
    shutdown: watch::Sender<bool>,
    source: Arc<PositionSource>,
    local: watch::Receiver<Option<PositionSample>>,
    task: Option<tokio::task::JoinHandle<SessionStats>>,
}

impl TrackingSession {
    /// Start the source and spawn the worker.
    pub fn spawn(
        machine: MovementStateMachine,
        source: PositionSource,
        settings: SessionSettings,
        events: TrackEventSender,
    ) -> Result<Self, TrackError> {
        let movement_id = machine.movement_id().to_string();
        let label = format!("track-{movement_id}");

        let (sample_tx, sample_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dropped = Arc::new(AtomicU64::new(0));

        let on_sample: SampleCallback = {
            let dropped = Arc::clone(&dropped);
            let label = label.clone();
            Arc::new(move |sample| {
                if let Err(TrySendError::Full(_)) = sample_tx.try_send(sample) {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("[{label}] sample queue full, dropping");
                }
            })
        };
        let on_error: ErrorCallback = {
            let label = label.clone();
            Arc::new(move |e| warn!("[{label}] {e}"))
        };

        let source = Arc::new(source);
        source.start(on_sample, on_error)?;

        let publisher = ThrottledPublisher::new(settings.throttle_window);
        let local = publisher.subscribe();

        let worker = Worker {
            label,
            machine,
            publisher,
            source: Arc::clone(&source),
            events,
            persisted: 0,
        };
        let task = tokio::spawn(worker.run(sample_rx, cmd_rx, shutdown_rx, dropped));

        Ok(Self {
            movement_id,
            commands: cmd_tx,
            shutdown: shutdown_tx,
            source,
            local,
            task: Some(task),
        })
    }

    pub fn movement_id(&self) -> &str {
        &self.movement_id
    }

    /// Latest raw sample, regardless of throttling.
    pub fn latest_position(&self) -> Option<PositionSample> {
        *self.local.borrow()
    }

    /// Receiver for the local "current position" marker.
    pub fn local_position(&self) -> watch::Receiver<Option<PositionSample>> {
        self.local.clone()
    }

    pub async fn begin_journey(&self, position: Coordinate) -> Result<MovementStatus, TrackError> {
        self.request(|reply| Command::Begin(position, reply)).await
    }

    pub async fn complete_journey(&self, position: Coordinate) -> Result<MovementStatus, TrackError> {
        self.request(|reply| Command::Complete(position, reply)).await
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<MovementStatus, TrackError> {
        let closed = || TrackError::SessionClosed(self.movement_id.clone());
        let (tx, rx) = oneshot::channel();
        self.commands.send(make(tx)).await.map_err(|_| closed())?;
        rx.await.map_err(|_| closed())?
    }

    /// Stop acquisition and persistence. Idempotent.
    pub fn stop(&self) {
        self.source.stop();
        let _ = self.shutdown.send(true);
    }

    /// The worker has exited (stopped or delivered).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Stop and wait for the worker, returning its counters.
    pub async fn close(mut self) -> SessionStats {
        self.stop();
        match self.task.take() {
            Some(task) => task.await.unwrap_or_else(|e| {
                warn!("[track-{}] worker panicked: {e}", self.movement_id);
                SessionStats::default()
            }),
            None => SessionStats::default(),
        }
    }
}

/// State owned by the worker task.
struct Worker {
    label: String,
    machine: MovementStateMachine,
    publisher: ThrottledPublisher,
    source: Arc<PositionSource>,
    events: TrackEventSender,
    persisted: u64,
}

impl Worker {
    async fn run(
        mut self,
        mut samples: mpsc::Receiver<PositionSample>,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<bool>,
        dropped: Arc<AtomicU64>,
    ) -> SessionStats {
        let label = self.label.clone();
        info!("[{label}] tracking started (status={})", self.machine.status());
        let mut samples_open = true;

        while !self.machine.status().is_terminal() && !*shutdown.borrow() {
            tokio::select! {
                biased;

                // Sender dropped counts as shutdown too.
                _ = shutdown.changed() => break,

                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },

                sample = samples.recv(), if samples_open => match sample {
                    Some(sample) => self.handle_sample(sample, &shutdown).await,
                    None => {
                        debug!("[{label}] position source ended");
                        samples_open = false;
                    }
                },
            }
        }

        self.source.stop();
        let stats = SessionStats {
            displayed: self.publisher.displayed(),
            forwarded: self.publisher.forwarded(),
            persisted: self.persisted,
            dropped: dropped.load(Ordering::Relaxed),
            status: self.machine.status(),
        };
        info!("[{label}] tracking stopped: {stats:?}");
        let _ = self.events.send(TrackEvent::TrackingStopped {
            movement_id: self.machine.movement_id().to_string(),
        });
        stats
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Begin(position, reply) => {
                let _ = reply.send(self.machine.begin_journey(position).await);
            }
            Command::Complete(position, reply) => {
                let _ = reply.send(self.machine.complete_journey(position).await);
            }
        }
    }

    async fn handle_sample(&mut self, sample: PositionSample, shutdown: &watch::Receiver<bool>) {
        // Before the journey starts, or once the session is stopping, the
        // marker still moves but nothing is persisted and the throttle window
        // is not consumed.
        if self.machine.status() != MovementStatus::InTransit || *shutdown.borrow() {
            self.publisher.display(sample);
            return;
        }

        let Some(accepted) = self.publisher.offer(sample, Instant::now()) else {
            return;
        };
        if self.machine.report_position(accepted.coord).await.is_ok() {
            self.persisted += 1;
        }
    }
}
