//! Registry of tracking sessions, one per movement id.
//!
//! Sessions are fully independent; the tracker only routes driver actions to
//! the right session and reaps sessions whose journey has ended.

use std::sync::Arc;

use ahash::AHashMap;
use convoy_core::error::TrackError;
use convoy_core::store::RecordStore;
use convoy_core::types::{Coordinate, MovementStatus};
use tracing::info;

use crate::control::DriverCommand;
use crate::event::{TrackEventReceiver, TrackEventSender};
use crate::machine::MovementStateMachine;
use crate::session::{SessionSettings, SessionStats, TrackingSession};
use crate::source::{HostPositionApi, PositionSource, WatchOptions};

/// Multi-movement tracker.
pub struct Tracker {
    store: Arc<dyn RecordStore>,
    settings: SessionSettings,
    options: WatchOptions,
    events: TrackEventSender,
    sessions: AHashMap<String, TrackingSession>,
}

impl Tracker {
    /// Create a tracker and the receiver for its [`TrackEvent`](crate::TrackEvent)s.
    pub fn new(
        store: Arc<dyn RecordStore>,
        settings: SessionSettings,
        options: WatchOptions,
    ) -> (Self, TrackEventReceiver) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let tracker = Self {
            store,
            settings,
            options,
            events: tx,
            sessions: AHashMap::new(),
        };
        (tracker, rx)
    }

    /// Load the movement and start tracking it with positions from `api`.
    ///
    /// A movement that is already delivered cannot be tracked. Opening an
    /// already tracked movement replaces its session.
    pub async fn open(&mut self, movement_id: &str, api: Arc<dyn HostPositionApi>) -> Result<MovementStatus, TrackError> {
        let machine = MovementStateMachine::load(movement_id, Arc::clone(&self.store), self.events.clone()).await?;
        let status = machine.status();
        if status.is_terminal() {
            return Err(TrackError::NotTrackable {
                movement_id: movement_id.to_string(),
                status,
            });
        }

        if let Some(old) = self.sessions.remove(movement_id) {
            old.close().await;
        }

        let source = PositionSource::new(api, self.options);
        let session = TrackingSession::spawn(machine, source, self.settings, self.events.clone())?;
        self.sessions.insert(movement_id.to_string(), session);
        info!("[tracker] tracking {movement_id} ({status})");
        Ok(status)
    }

    fn session(&self, movement_id: &str) -> Result<&TrackingSession, TrackError> {
        self.sessions
            .get(movement_id)
            .filter(|s| !s.is_finished())
            .ok_or_else(|| TrackError::SessionClosed(movement_id.to_string()))
    }

    /// Position to use for a driver action: explicit, or the latest reading.
    fn action_position(session: &TrackingSession, position: Option<Coordinate>) -> Result<Coordinate, TrackError> {
        position
            .or_else(|| session.latest_position().map(|s| s.coord))
            .ok_or_else(|| TrackError::Acquisition("no position available yet".to_string()))
    }

    /// Driver pressed "start journey".
    pub async fn begin_journey(
        &self,
        movement_id: &str,
        position: Option<Coordinate>,
    ) -> Result<MovementStatus, TrackError> {
        let session = self.session(movement_id)?;
        let position = Self::action_position(session, position)?;
        session.begin_journey(position).await
    }

    /// Driver pressed "complete journey". On success the session is closed.
    pub async fn complete_journey(
        &mut self,
        movement_id: &str,
        position: Option<Coordinate>,
    ) -> Result<MovementStatus, TrackError> {
        let session = self.session(movement_id)?;
        let position = Self::action_position(session, position)?;
        let status = session.complete_journey(position).await?;
        self.close(movement_id).await;
        Ok(status)
    }

    /// Route a driver command to the session that owns the movement.
    ///
    /// Returns the movement status after the command.
    pub async fn apply(&mut self, command: DriverCommand) -> Result<MovementStatus, TrackError> {
        match command {
            DriverCommand::Begin { movement_id, position } => self.begin_journey(&movement_id, position).await,
            DriverCommand::Complete { movement_id, position } => self.complete_journey(&movement_id, position).await,
            DriverCommand::Stop { movement_id } => self
                .close(&movement_id)
                .await
                .map(|stats| stats.status)
                .ok_or(TrackError::SessionClosed(movement_id)),
        }
    }

    /// Stop tracking one movement.
    pub async fn close(&mut self, movement_id: &str) -> Option<SessionStats> {
        let session = self.sessions.remove(movement_id)?;
        let stats = session.close().await;
        info!("[tracker] closed {movement_id}: {stats:?}");
        Some(stats)
    }

    /// Stop every session.
    pub async fn close_all(&mut self) {
        let ids: Vec<String> = self.sessions.keys().cloned().collect();
        for id in ids {
            self.close(&id).await;
        }
    }

    /// Drop sessions whose worker already exited.
    pub async fn reap_finished(&mut self) -> Vec<(String, SessionStats)> {
        let finished: Vec<String> =
            self.sessions.iter().filter(|(_, s)| s.is_finished()).map(|(id, _)| id.clone()).collect();
        let mut reaped = Vec::with_capacity(finished.len());
        for id in finished {
            if let Some(stats) = self.close(&id).await {
                reaped.push((id, stats));
            }
        }
        reaped
    }

    pub fn is_tracking(&self, movement_id: &str) -> bool {
        self.session(movement_id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
