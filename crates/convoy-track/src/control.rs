//! Driver commands for a running [`Tracker`](crate::Tracker).
//!
//! In `track` mode the runner reads one command per line and hands it to
//! [`Tracker::apply`](crate::Tracker::apply), so every transition goes through
//! the session that owns the movement:
//!
//! ```text
//! begin <movement_id> [<lat> <lon>]
//! complete <movement_id> [<lat> <lon>]
//! stop <movement_id>
//! ```
//!
//! Without coordinates, begin/complete use the session's latest reading.

use std::str::FromStr;

use convoy_core::error::TrackError;
use convoy_core::types::Coordinate;

/// One driver action addressed to a movement.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    Begin {
        movement_id: String,
        position: Option<Coordinate>,
    },
    Complete {
        movement_id: String,
        position: Option<Coordinate>,
    },
    Stop {
        movement_id: String,
    },
}

impl DriverCommand {
    pub fn movement_id(&self) -> &str {
        match self {
            Self::Begin { movement_id, .. } | Self::Complete { movement_id, .. } | Self::Stop { movement_id } => {
                movement_id
            }
        }
    }
}

impl FromStr for DriverCommand {
    type Err = TrackError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: &str| TrackError::InvalidCommand(format!("{msg}: {:?}", line.trim()));
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| invalid("empty command"))?;
        let movement_id = parts.next().ok_or_else(|| invalid("missing movement id"))?.to_string();
        let rest: Vec<&str> = parts.collect();

        let position = match rest.as_slice() {
            [] => None,
            [lat, lon] => {
                let lat: f64 = lat.parse().map_err(|_| invalid("bad latitude"))?;
                let lon: f64 = lon.parse().map_err(|_| invalid("bad longitude"))?;
                let coord = Coordinate::new(lat, lon);
                if !coord.is_usable() {
                    return Err(invalid("unusable coordinate"));
                }
                Some(coord)
            }
            _ => return Err(invalid("expected <lat> <lon>")),
        };

        match verb.to_ascii_lowercase().as_str() {
            "begin" => Ok(Self::Begin { movement_id, position }),
            "complete" => Ok(Self::Complete { movement_id, position }),
            "stop" if position.is_none() => Ok(Self::Stop { movement_id }),
            "stop" => Err(invalid("stop takes no position")),
            _ => Err(invalid("unknown command")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_and_without_position() {
        assert_eq!(
            "begin mv1 19.07 72.87".parse::<DriverCommand>().unwrap(),
            DriverCommand::Begin {
                movement_id: "mv1".to_string(),
                position: Some(Coordinate::new(19.07, 72.87)),
            }
        );
        assert_eq!(
            "  COMPLETE mv1 ".parse::<DriverCommand>().unwrap(),
            DriverCommand::Complete {
                movement_id: "mv1".to_string(),
                position: None,
            }
        );
        let stop = "stop mv2".parse::<DriverCommand>().unwrap();
        assert_eq!(stop.movement_id(), "mv2");
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["", "begin", "begin mv1 19.0", "begin mv1 north 72.0", "begin mv1 0 0", "fly mv1", "stop mv1 1 2"] {
            let err = line.parse::<DriverCommand>().unwrap_err();
            assert!(matches!(err, TrackError::InvalidCommand(_)), "{line:?} gave {err}");
        }
    }
}
