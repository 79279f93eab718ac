//! Host position feeds.
//!
//! - [`WsPositionFeed`]: device position stream over WebSocket
//! - [`ReplayPositionFeed`]: recorded JSON-lines trace
//! - [`ManualPositionFeed`]: readings pushed in-process
//!
//! All feeds accept the same frame shapes, handled by [`parse_frame`]:
//!
//! ```text
//! {"lat": 19.07, "lon": 72.87, "sampledAt": 1700000000000}
//! {"coords": {"latitude": 19.07, "longitude": 72.87}, "timestamp": 1700000000000}
//! {"error": {"code": 1, "message": "User denied Geolocation"}}
//! ```

pub mod manual;
pub mod replay;
pub mod ws;

pub use manual::ManualPositionFeed;
pub use replay::ReplayPositionFeed;
pub use ws::WsPositionFeed;

use std::sync::Arc;

use convoy_core::config::FeedConfig;
use convoy_core::error::TrackError;
use convoy_core::types::{Coordinate, PositionSample};
use serde::Deserialize;

use crate::source::HostPositionApi;

#[derive(Debug, Deserialize)]
struct FrameError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrowserCoords {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Frame {
    Error {
        error: FrameError,
    },
    Browser {
        coords: BrowserCoords,
        #[serde(default)]
        timestamp: Option<f64>,
    },
    Flat {
        lat: f64,
        lon: f64,
        #[serde(default, rename = "sampledAt")]
        sampled_at: Option<u64>,
    },
}

/// Parse one feed frame into a sample.
///
/// Host errors, malformed frames and unusable coordinates all come back as
/// [`TrackError::Acquisition`]. Frames without a timestamp are stamped with
/// `now_ms`.
pub fn parse_frame(text: &str, now_ms: u64) -> Result<PositionSample, TrackError> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| TrackError::Acquisition(format!("malformed position frame: {e}")))?;

    let (coord, sampled_at) = match frame {
        Frame::Error { error } => {
            let code = error.code.map(host_error_name).unwrap_or("UNKNOWN");
            let message = error.message.unwrap_or_default();
            return Err(TrackError::Acquisition(format!("host error {code}: {message}")));
        }
        Frame::Browser { coords, timestamp } => (
            Coordinate::new(coords.latitude, coords.longitude),
            timestamp.map(|t| t as u64),
        ),
        Frame::Flat { lat, lon, sampled_at } => (Coordinate::new(lat, lon), sampled_at),
    };

    if !coord.is_usable() {
        return Err(TrackError::Acquisition(format!("unusable coordinate {coord}")));
    }
    Ok(PositionSample::new(coord, sampled_at.unwrap_or(now_ms)))
}

/// Geolocation error code names.
fn host_error_name(code: i64) -> &'static str {
    match code {
        1 => "PERMISSION_DENIED",
        2 => "POSITION_UNAVAILABLE",
        3 => "TIMEOUT",
        _ => "UNKNOWN",
    }
}

/// Build the host position API for a configured session feed.
pub fn create_feed(movement_id: &str, config: &FeedConfig) -> Arc<dyn HostPositionApi> {
    match config {
        FeedConfig::Ws { url, extra_headers } => {
            Arc::new(WsPositionFeed::new(url.clone(), extra_headers.clone(), format!("ws-feed-{movement_id}")))
        }
        FeedConfig::Replay { path, pace_ms } => Arc::new(ReplayPositionFeed::new(
            path.into(),
            std::time::Duration::from_millis(*pace_ms),
            format!("replay-{movement_id}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_frame() {
        let s = parse_frame(r#"{"lat": 19.07, "lon": 72.87, "sampledAt": 1700000000000}"#, 5).unwrap();
        assert_eq!(s, PositionSample::new(Coordinate::new(19.07, 72.87), 1_700_000_000_000));
    }

    #[test]
    fn browser_frame_and_default_timestamp() {
        let s = parse_frame(r#"{"coords": {"latitude": 19.07, "longitude": 72.87, "accuracy": 12.0}}"#, 42).unwrap();
        assert_eq!(s.coord, Coordinate::new(19.07, 72.87));
        assert_eq!(s.sampled_at, 42);
    }

    #[test]
    fn host_errors_and_bad_coordinates_are_acquisition_errors() {
        let e = parse_frame(r#"{"error": {"code": 1, "message": "User denied Geolocation"}}"#, 0).unwrap_err();
        assert_eq!(e.to_string(), "acquisition error: host error PERMISSION_DENIED: User denied Geolocation");

        for bad in [r#"{"lat": 0, "lon": 0}"#, r#"{"lat": 123.0, "lon": 10.0}"#, "not json", r#"{"lat": 1.0}"#] {
            assert!(matches!(parse_frame(bad, 0), Err(TrackError::Acquisition(_))), "{bad}");
        }
    }
}
