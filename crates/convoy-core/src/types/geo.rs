//! Geographic value types.
//!
//! A [`Coordinate`] is a plain `{lat, lon}` pair in decimal degrees, the same
//! shape the record store keeps in `startLocation`, `endLocation` and
//! `currentLocation`. Unresolved coordinates are always `None`; the `{0,0}`
//! placeholder exists only at the rendering edge.

use serde::{Deserialize, Deserializer, Serialize};

/// A geographic coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// The degenerate placeholder rendered for unresolved roles.
    pub const PLACEHOLDER: Coordinate = Coordinate { lat: 0.0, lon: 0.0 };

    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }

    /// Finite and inside the WGS84 latitude/longitude ranges.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// A coordinate that may be used directly: valid and not the zero pair.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.is_valid() && !self.is_zero()
    }

    /// `Some(self)` if usable, otherwise `None`.
    pub fn usable(self) -> Option<Self> {
        self.is_usable().then_some(self)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Lenient deserializer for stored coordinate fields.
///
/// Record stores return `null`, an empty string, a zeroed pair or garbage for
/// a location that was never written. All of those become `None`, as do pairs
/// outside the valid range.
pub fn deserialize_stored_coordinate<'de, D>(deserializer: D) -> Result<Option<Coordinate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|v| serde_json::from_value::<Coordinate>(v).ok())
        .and_then(Coordinate::usable))
}

/// One raw reading from a position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    #[serde(flatten)]
    pub coord: Coordinate,
    /// Milliseconds since Unix epoch at which the reading was taken.
    pub sampled_at: u64,
}

impl PositionSample {
    pub fn new(coord: Coordinate, sampled_at: u64) -> Self {
        Self { coord, sampled_at }
    }

    /// Sample stamped with the current wall-clock time.
    pub fn now(coord: Coordinate) -> Self {
        Self::new(coord, crate::time_util::now_ms())
    }
}

/// Display role of a coordinate on the tracking map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Start,
    Current,
    End,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Current => write!(f, "current"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Where a resolved coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The movement's own stored field.
    Stored,
    /// A coordinate carried on the parent order.
    Order,
    /// Geocoded from the parent order's address string.
    Geocoded,
}

/// Result of resolving one role. `coord` is `None` when unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCoordinate {
    pub coord: Option<Coordinate>,
    pub provenance: Option<Provenance>,
}

impl ResolvedCoordinate {
    pub const UNRESOLVED: ResolvedCoordinate = ResolvedCoordinate { coord: None, provenance: None };

    pub fn resolved(coord: Coordinate, provenance: Provenance) -> Self {
        Self {
            coord: Some(coord),
            provenance: Some(provenance),
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.coord.is_some()
    }

    /// Coordinate for rendering: unresolved roles fall back to `{0,0}`.
    pub fn or_placeholder(&self) -> Coordinate {
        self.coord.unwrap_or(Coordinate::PLACEHOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_rejects_zero_and_out_of_range() {
        assert!(Coordinate::new(19.07, 72.87).is_usable());
        assert!(!Coordinate::new(0.0, 0.0).is_usable());
        assert!(!Coordinate::new(91.0, 10.0).is_usable());
        assert!(!Coordinate::new(10.0, -180.5).is_usable());
        assert!(!Coordinate::new(f64::NAN, 10.0).is_usable());
        // A single zero component is still a real place.
        assert!(Coordinate::new(0.0, 32.5).is_usable());
    }

    #[test]
    fn sample_wire_shape_is_flat() {
        let s = PositionSample::new(Coordinate::new(1.5, 2.5), 1_700_000_000_000);
        let v = serde_json::to_value(s).unwrap();
        assert_eq!(v, serde_json::json!({"lat": 1.5, "lon": 2.5, "sampledAt": 1_700_000_000_000u64}));
    }

    #[test]
    fn placeholder_only_for_unresolved() {
        assert_eq!(ResolvedCoordinate::UNRESOLVED.or_placeholder(), Coordinate::PLACEHOLDER);
        let r = ResolvedCoordinate::resolved(Coordinate::new(5.0, 6.0), Provenance::Stored);
        assert_eq!(r.or_placeholder(), Coordinate::new(5.0, 6.0));
    }
}
