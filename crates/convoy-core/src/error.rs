//! Typed error definitions for the Convoy tracking system.
//!
//! Provides [`TrackError`] for the tracking taxonomy and [`StoreError`] for
//! record store failures. All variants implement `std::error::Error` via
//! `thiserror`, so they integrate with `anyhow::Result` in the runner.

use thiserror::Error;

use crate::types::{JourneyAction, MovementStatus};

/// A failed read or write against the record store.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    /// Human-readable message suitable for a user notification.
    pub message: String,
    /// HTTP status when the failure came from the remote store.
    pub status: Option<u16>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// The record does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Domain-specific errors for the tracking subsystem.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The position source failed to produce a sample. Recoverable.
    #[error("acquisition error: {0}")]
    Acquisition(String),

    /// A write to (or read from) the record store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Geocoding failed or returned no match.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// A transition was requested from a status that does not permit it.
    #[error("cannot {action} while movement is {from}")]
    IllegalTransition {
        from: MovementStatus,
        action: JourneyAction,
    },

    /// A store record could not be interpreted as a movement.
    #[error("record error: {0}")]
    Record(String),

    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The tracking session for this movement is no longer running.
    #[error("tracking session closed: {0}")]
    SessionClosed(String),

    /// The movement's status does not allow tracking it.
    #[error("cannot track {movement_id}: movement is {status}")]
    NotTrackable {
        movement_id: String,
        status: MovementStatus,
    },

    /// A driver command line could not be parsed.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl TrackError {
    /// Rejected because the movement already reached its terminal state.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::IllegalTransition { from, .. } => from.is_terminal(),
            Self::NotTrackable { status, .. } => status.is_terminal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_rejection_is_flagged() {
        let e = TrackError::IllegalTransition {
            from: MovementStatus::Delivered,
            action: JourneyAction::ReportPosition,
        };
        assert!(e.is_terminal());
        assert_eq!(e.to_string(), "cannot report position while movement is Delivered");

        let e = TrackError::IllegalTransition {
            from: MovementStatus::NotStarted,
            action: JourneyAction::CompleteJourney,
        };
        assert!(!e.is_terminal());
    }

    #[test]
    fn delivered_movement_is_not_trackable() {
        let e = TrackError::NotTrackable {
            movement_id: "mv1".to_string(),
            status: MovementStatus::Delivered,
        };
        assert!(e.is_terminal());
        assert_eq!(e.to_string(), "cannot track mv1: movement is Delivered");
    }

    #[test]
    fn store_error_keeps_message() {
        let e: TrackError = StoreError::with_status("Failed to update record.", 400).into();
        assert_eq!(e.to_string(), "persistence error: Failed to update record.");
    }
}
