//! Movement records, parent orders and the journey lifecycle enums.
//!
//! Field names follow the record store's camelCase JSON. A movement read with
//! its `order` relation expanded carries the parent order under
//! `expand.order`.

use serde::{Deserialize, Serialize};

use super::geo::{Coordinate, Role, deserialize_stored_coordinate};
use crate::error::TrackError;

// ---------------------------------------------------------------------------
// Status and actions
// ---------------------------------------------------------------------------

/// Lifecycle status of a movement. Only advances forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MovementStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Delivered")]
    Delivered,
}

impl MovementStatus {
    /// `Delivered` admits no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not Started"),
            Self::InTransit => write!(f, "In Transit"),
            Self::Delivered => write!(f, "Delivered"),
        }
    }
}

/// A write the state machine can issue against a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyAction {
    BeginJourney,
    ReportPosition,
    CompleteJourney,
}

impl JourneyAction {
    /// The only status from which this action is permitted.
    pub fn required_status(&self) -> MovementStatus {
        match self {
            Self::BeginJourney => MovementStatus::NotStarted,
            Self::ReportPosition | Self::CompleteJourney => MovementStatus::InTransit,
        }
    }

    /// Status after the action succeeds.
    pub fn next_status(&self) -> MovementStatus {
        match self {
            Self::BeginJourney | Self::ReportPosition => MovementStatus::InTransit,
            Self::CompleteJourney => MovementStatus::Delivered,
        }
    }

    /// Validate the action against `from`, returning the resulting status.
    pub fn check(&self, from: MovementStatus) -> Result<MovementStatus, TrackError> {
        if from == self.required_status() {
            Ok(self.next_status())
        } else {
            Err(TrackError::IllegalTransition { from, action: *self })
        }
    }

    /// Whether a failure of this action is shown to the user.
    pub fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::ReportPosition)
    }
}

impl std::fmt::Display for JourneyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeginJourney => write!(f, "begin journey"),
            Self::ReportPosition => write!(f, "report position"),
            Self::CompleteJourney => write!(f, "complete journey"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Parent order of a movement. Read-only from the tracking subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: String,
    /// Origin address (free text).
    #[serde(default)]
    pub start_location: Option<String>,
    /// Destination address (free text).
    #[serde(default)]
    pub end_location: Option<String>,
    /// Origin coordinate, when the order form captured one.
    #[serde(default, deserialize_with = "deserialize_stored_coordinate")]
    pub start_coordinates: Option<Coordinate>,
    /// Destination coordinate, when the order form captured one.
    #[serde(default, deserialize_with = "deserialize_stored_coordinate")]
    pub end_coordinates: Option<Coordinate>,
}

impl Order {
    /// Non-blank address string for `role`. Orders carry no current address.
    pub fn address(&self, role: Role) -> Option<&str> {
        let addr = match role {
            Role::Start => self.start_location.as_deref(),
            Role::End => self.end_location.as_deref(),
            Role::Current => None,
        };
        addr.map(str::trim).filter(|a| !a.is_empty())
    }

    /// Coordinate carried on the order for `role`.
    pub fn coordinate(&self, role: Role) -> Option<Coordinate> {
        match role {
            Role::Start => self.start_coordinates,
            Role::End => self.end_coordinates,
            Role::Current => None,
        }
    }
}

/// Relations expanded on a movement read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementExpand {
    #[serde(default)]
    pub order: Option<Order>,
}

/// The tracked record for one shipment's transit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: String,
    #[serde(default)]
    pub status: MovementStatus,
    #[serde(default, deserialize_with = "deserialize_stored_coordinate")]
    pub start_location: Option<Coordinate>,
    #[serde(default, deserialize_with = "deserialize_stored_coordinate")]
    pub end_location: Option<Coordinate>,
    #[serde(default, deserialize_with = "deserialize_stored_coordinate")]
    pub current_location: Option<Coordinate>,
    /// Id of the parent order.
    #[serde(default, rename = "order")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub expand: MovementExpand,
}

impl Movement {
    /// Parse a movement from a raw store record.
    pub fn from_record(record: serde_json::Value) -> Result<Self, TrackError> {
        serde_json::from_value(record).map_err(|e| TrackError::Record(e.to_string()))
    }

    /// The expanded parent order, if the read requested it.
    pub fn order(&self) -> Option<&Order> {
        self.expand.order.as_ref()
    }

    /// Stored coordinate for `role`.
    pub fn location(&self, role: Role) -> Option<Coordinate> {
        match role {
            Role::Start => self.start_location,
            Role::Current => self.current_location,
            Role::End => self.end_location,
        }
    }
}

/// Partial update issued by the state machine. Absent fields are not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MovementStatus>,
}

impl MovementPatch {
    /// Field map for [`RecordStore::update`](crate::store::RecordStore::update).
    pub fn into_fields(self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_value(MovementStatus::InTransit).unwrap(), json!("In Transit"));
        let s: MovementStatus = serde_json::from_value(json!("Not Started")).unwrap();
        assert_eq!(s, MovementStatus::NotStarted);
        assert!(serde_json::from_value::<MovementStatus>(json!("Cancelled")).is_err());
    }

    #[test]
    fn actions_only_move_forward() {
        use JourneyAction::*;
        use MovementStatus::*;
        assert_eq!(BeginJourney.check(NotStarted).unwrap(), InTransit);
        assert_eq!(ReportPosition.check(InTransit).unwrap(), InTransit);
        assert_eq!(CompleteJourney.check(InTransit).unwrap(), Delivered);

        assert!(BeginJourney.check(InTransit).is_err());
        assert!(BeginJourney.check(Delivered).is_err());
        assert!(ReportPosition.check(NotStarted).is_err());
        assert!(ReportPosition.check(Delivered).is_err());
        assert!(CompleteJourney.check(NotStarted).is_err());
        assert!(CompleteJourney.check(Delivered).is_err());
    }

    #[test]
    fn movement_tolerates_missing_and_zeroed_coordinates() {
        let m = Movement::from_record(json!({
            "id": "mv1",
            "status": "In Transit",
            "startLocation": {"lat": 0, "lon": 0},
            "endLocation": "",
            "currentLocation": {"lat": 19.07, "lon": 72.87},
            "order": "ord1",
            "expand": {"order": {"id": "ord1", "startLocation": "Port X", "endLocation": "  "}}
        }))
        .unwrap();

        assert_eq!(m.start_location, None);
        assert_eq!(m.end_location, None);
        assert_eq!(m.current_location, Some(Coordinate::new(19.07, 72.87)));
        let order = m.order().unwrap();
        assert_eq!(order.address(Role::Start), Some("Port X"));
        assert_eq!(order.address(Role::End), None);
        assert_eq!(order.address(Role::Current), None);
    }

    #[test]
    fn patch_omits_absent_fields() {
        let patch = MovementPatch {
            current_location: Some(Coordinate::new(19.07, 72.87)),
            status: Some(MovementStatus::InTransit),
        };
        assert_eq!(
            serde_json::Value::Object(patch.into_fields()),
            json!({"currentLocation": {"lat": 19.07, "lon": 72.87}, "status": "In Transit"})
        );

        let only_pos = MovementPatch {
            current_location: Some(Coordinate::new(1.0, 2.0)),
            status: None,
        };
        assert_eq!(only_pos.into_fields().len(), 1);
    }
}
