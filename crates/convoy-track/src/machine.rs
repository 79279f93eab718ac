//! Movement status state machine.
//!
//! ```text
//! NotStarted ──beginJourney──► InTransit ──completeJourney──► Delivered
//!                              │      ▲
//!                              └──────┘ reportPosition
//! ```
//!
//! The state machine is the only writer of `status` and `currentLocation`.
//! Every transition is validated against the local status before any network
//! call; a failed write leaves the local status unchanged because the store
//! is the source of truth.

use std::sync::Arc;

use convoy_core::error::TrackError;
use convoy_core::store::RecordStore;
use convoy_core::types::{Coordinate, JourneyAction, Movement, MovementPatch, MovementStatus};
use tracing::{debug, info, warn};

use crate::event::{TrackEvent, TrackEventSender};

/// Lifecycle owner for one movement record.
pub struct MovementStateMachine {
    movement_id: String,
    status: MovementStatus,
    store: Arc<dyn RecordStore>,
    events: TrackEventSender,
}

impl MovementStateMachine {
    pub fn new(
        movement_id: impl Into<String>,
        status: MovementStatus,
        store: Arc<dyn RecordStore>,
        events: TrackEventSender,
    ) -> Self {
        Self {
            movement_id: movement_id.into(),
            status,
            store,
            events,
        }
    }

    /// Read the movement and start from its stored status.
    pub async fn load(
        movement_id: &str,
        store: Arc<dyn RecordStore>,
        events: TrackEventSender,
    ) -> Result<Self, TrackError> {
        let movement = Movement::from_record(store.read(movement_id, &[]).await?)?;
        debug!("[movement-{movement_id}] loaded with status {}", movement.status);
        Ok(Self::new(movement_id, movement.status, store, events))
    }

    pub fn movement_id(&self) -> &str {
        &self.movement_id
    }

    pub fn status(&self) -> MovementStatus {
        self.status
    }

    /// `NotStarted → InTransit`, seeding `currentLocation` with `position`.
    pub async fn begin_journey(&mut self, position: Coordinate) -> Result<MovementStatus, TrackError> {
        self.apply(JourneyAction::BeginJourney, position).await
    }

    /// Persist a routine position while in transit.
    pub async fn report_position(&mut self, position: Coordinate) -> Result<(), TrackError> {
        self.apply(JourneyAction::ReportPosition, position).await.map(|_| ())
    }

    /// `InTransit → Delivered`, writing the final position.
    pub async fn complete_journey(&mut self, position: Coordinate) -> Result<MovementStatus, TrackError> {
        self.apply(JourneyAction::CompleteJourney, position).await
    }

    async fn apply(&mut self, action: JourneyAction, position: Coordinate) -> Result<MovementStatus, TrackError> {
        let result = self.write(action, position).await;
        match &result {
            Ok(next) => {
                self.status = *next;
                self.notify_success(action, position);
            }
            Err(e) if action.is_user_initiated() => {
                warn!("[movement-{}] {action} failed: {e}", self.movement_id);
                let _ = self.events.send(TrackEvent::TransitionFailed {
                    movement_id: self.movement_id.clone(),
                    action,
                    message: user_message(e),
                });
            }
            Err(e) => {
                warn!("[movement-{}] position update dropped: {e}", self.movement_id);
            }
        }
        result
    }

    /// Validate, then issue the single store write for `action`.
    async fn write(&self, action: JourneyAction, position: Coordinate) -> Result<MovementStatus, TrackError> {
        let next = action.check(self.status)?;
        if !position.is_valid() {
            return Err(TrackError::Acquisition(format!("invalid position {position}")));
        }

        let patch = MovementPatch {
            current_location: Some(position),
            status: (action != JourneyAction::ReportPosition).then_some(next),
        };
        self.store.update(&self.movement_id, patch.into_fields()).await?;
        Ok(next)
    }

    fn notify_success(&self, action: JourneyAction, position: Coordinate) {
        let movement_id = self.movement_id.clone();
        let event = match action {
            JourneyAction::BeginJourney => {
                info!("[movement-{movement_id}] journey started at {position}");
                TrackEvent::JourneyStarted { movement_id, position }
            }
            JourneyAction::CompleteJourney => {
                info!("[movement-{movement_id}] delivered at {position}");
                TrackEvent::JourneyCompleted { movement_id, position }
            }
            JourneyAction::ReportPosition => {
                debug!("[movement-{movement_id}] position {position} persisted");
                TrackEvent::PositionPersisted { movement_id, position }
            }
        };
        let _ = self.events.send(event);
    }
}

/// Message shown in the error notification.
fn user_message(e: &TrackError) -> String {
    match e {
        TrackError::Persistence(store) => store.message.clone(),
        other => other.to_string(),
    }
}
