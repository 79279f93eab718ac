//! Location resolution for the start, current and end map markers.
//!
//! Per role, first match wins:
//!
//! 1. the movement's own stored coordinate (non-zero, in range);
//! 2. a coordinate carried on the parent order;
//! 3. the parent order's address string, geocoded.
//!
//! `current` only ever uses step 1: a current position has no static address.
//! Geocoding misses and failures leave the role unresolved; they are logged,
//! never raised. Resolution has no side effects, so it is safe to re-run.

use std::sync::Arc;

use convoy_core::geocode::Geocoder;
use convoy_core::types::{Movement, Provenance, ResolvedCoordinate, Role};
use serde::Serialize;
use tracing::{debug, warn};

/// Resolved coordinates for all three roles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedLocations {
    pub start: ResolvedCoordinate,
    pub current: ResolvedCoordinate,
    pub end: ResolvedCoordinate,
}

impl ResolvedLocations {
    pub fn get(&self, role: Role) -> ResolvedCoordinate {
        match role {
            Role::Start => self.start,
            Role::Current => self.current,
            Role::End => self.end,
        }
    }
}

/// Cascading stored → order → geocoded resolver.
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve one role. Reads `movement.expand.order` for the fallbacks.
    pub async fn resolve(&self, movement: &Movement, role: Role) -> ResolvedCoordinate {
        if let Some(coord) = movement.location(role).and_then(|c| c.usable()) {
            return ResolvedCoordinate::resolved(coord, Provenance::Stored);
        }
        if role == Role::Current {
            return ResolvedCoordinate::UNRESOLVED;
        }

        let Some(order) = movement.order() else {
            debug!("[resolver] {}: no parent order for {role}", movement.id);
            return ResolvedCoordinate::UNRESOLVED;
        };

        if let Some(coord) = order.coordinate(role).and_then(|c| c.usable()) {
            return ResolvedCoordinate::resolved(coord, Provenance::Order);
        }

        let Some(address) = order.address(role) else {
            return ResolvedCoordinate::UNRESOLVED;
        };

        match self.geocoder.geocode(address).await {
            Ok(Some(coord)) if coord.is_usable() => ResolvedCoordinate::resolved(coord, Provenance::Geocoded),
            Ok(_) => {
                debug!("[resolver] {}: no match for {role} address {address:?}", movement.id);
                ResolvedCoordinate::UNRESOLVED
            }
            Err(e) => {
                warn!("[resolver] {}: {role} lookup failed: {e}", movement.id);
                ResolvedCoordinate::UNRESOLVED
            }
        }
    }

    /// Resolve all roles; start and end lookups run concurrently.
    pub async fn resolve_all(&self, movement: &Movement) -> ResolvedLocations {
        let (start, current, end) = tokio::join!(
            self.resolve(movement, Role::Start),
            self.resolve(movement, Role::Current),
            self.resolve(movement, Role::End),
        );
        ResolvedLocations { start, current, end }
    }
}
