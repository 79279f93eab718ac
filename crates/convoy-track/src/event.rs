//! Event types emitted by the tracking engine to the UI layer.
//!
//! These stand in for the user-facing notifications: a success toast when a
//! journey starts or ends, an error toast when a driver action fails. Routine
//! position updates produce `PositionPersisted` but failures of those are only
//! logged.

use convoy_core::types::{Coordinate, JourneyAction};

/// A typed event emitted by a tracking session.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// `beginJourney` was persisted; the movement is in transit.
    JourneyStarted { movement_id: String, position: Coordinate },

    /// `completeJourney` was persisted; the movement is delivered.
    JourneyCompleted { movement_id: String, position: Coordinate },

    /// A throttled position update reached the store.
    PositionPersisted { movement_id: String, position: Coordinate },

    /// A driver-initiated transition failed. Local status is unchanged.
    TransitionFailed {
        movement_id: String,
        action: JourneyAction,
        /// Human-readable reason.
        message: String,
    },

    /// The session worker exited and its position source was stopped.
    TrackingStopped { movement_id: String },
}

impl TrackEvent {
    pub fn movement_id(&self) -> &str {
        match self {
            Self::JourneyStarted { movement_id, .. }
            | Self::JourneyCompleted { movement_id, .. }
            | Self::PositionPersisted { movement_id, .. }
            | Self::TransitionFailed { movement_id, .. }
            | Self::TrackingStopped { movement_id } => movement_id,
        }
    }
}

/// Sender half of the track event channel.
pub type TrackEventSender = tokio::sync::mpsc::UnboundedSender<TrackEvent>;

/// Receiver half of the track event channel.
pub type TrackEventReceiver = tokio::sync::mpsc::UnboundedReceiver<TrackEvent>;
