//! Read-only reconstruction of tracking state for viewers.
//!
//! Viewers never write. Each projection re-reads the movement with its parent
//! order expanded and runs the [`LocationResolver`]; with a caching geocoder
//! behind the resolver, repeated projections do not repeat address lookups.
//! When the store returns the movement without the expanded order, the order
//! is read by id from the orders collection, if one is configured.

use std::sync::Arc;

use convoy_core::error::TrackError;
use convoy_core::store::RecordStore;
use convoy_core::types::{Movement, MovementStatus, Order, ResolvedCoordinate};
use serde::Serialize;
use tracing::{debug, warn};

use crate::resolver::LocationResolver;

/// What a viewer renders for one movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub movement_id: String,
    pub status: MovementStatus,
    pub start: ResolvedCoordinate,
    pub current: ResolvedCoordinate,
    pub end: ResolvedCoordinate,
    /// False while the journey has not started: the consumer shows a
    /// "journey not started" notice instead of an empty map.
    pub map_visible: bool,
}

impl Projection {
    pub fn journey_not_started(&self) -> bool {
        self.status == MovementStatus::NotStarted
    }
}

/// Viewer read path over a record store.
pub struct ViewerProjection {
    store: Arc<dyn RecordStore>,
    orders: Option<Arc<dyn RecordStore>>,
    resolver: LocationResolver,
    order_relation: String,
}

impl ViewerProjection {
    pub fn new(store: Arc<dyn RecordStore>, resolver: LocationResolver, order_relation: impl Into<String>) -> Self {
        Self {
            store,
            orders: None,
            resolver,
            order_relation: order_relation.into(),
        }
    }

    /// Read orders from `orders` when the relation was not expanded.
    pub fn with_order_store(mut self, orders: Arc<dyn RecordStore>) -> Self {
        self.orders = Some(orders);
        self
    }

    async fn fetch_order(&self, movement: &mut Movement) {
        let (Some(orders), Some(order_id)) = (&self.orders, movement.order_id.as_deref()) else {
            return;
        };
        let order = match orders.read(order_id, &[]).await {
            Ok(record) => serde_json::from_value::<Order>(record).map_err(|e| e.to_string()),
            Err(e) => Err(e.message),
        };
        match order {
            Ok(order) => movement.expand.order = Some(order),
            Err(e) => warn!("[projection] {}: order {order_id} unavailable: {e}", movement.id),
        }
    }

    /// Fetch the movement and its order, then resolve every marker.
    pub async fn project(&self, movement_id: &str) -> Result<Projection, TrackError> {
        let record = self.store.read(movement_id, &[self.order_relation.as_str()]).await?;
        let mut movement = Movement::from_record(record)?;
        if movement.order().is_none() {
            self.fetch_order(&mut movement).await;
        }
        let resolved = self.resolver.resolve_all(&movement).await;

        debug!(
            "[projection] {movement_id}: status={} start={} current={} end={}",
            movement.status,
            resolved.start.is_resolved(),
            resolved.current.is_resolved(),
            resolved.end.is_resolved()
        );

        Ok(Projection {
            movement_id: movement_id.to_string(),
            status: movement.status,
            start: resolved.start,
            current: resolved.current,
            end: resolved.end,
            map_visible: movement.status != MovementStatus::NotStarted,
        })
    }
}

#[cfg(test)]
mod tests {
    use convoy_core::store::RecordStore;
    use convoy_core::types::{Coordinate, MovementPatch, Provenance};
    use convoy_store::{CachedGeocoder, MemoryStore, StaticGeocoder};
    use serde_json::json;

    use super::*;

    const PORT_X: Coordinate = Coordinate::new(18.95, 72.95);

    fn viewer(store: Arc<MemoryStore>, geocoder: Arc<StaticGeocoder>) -> ViewerProjection {
        let resolver = LocationResolver::new(Arc::new(CachedGeocoder::new(geocoder)));
        ViewerProjection::new(store, resolver, "order")
    }

    #[tokio::test]
    async fn not_started_movement_geocodes_start_and_hides_map() {
        let store = Arc::new(
            MemoryStore::new()
                .with_record("mv1", json!({"id": "mv1", "status": "Not Started", "order": "ord1"}))
                .with_record("ord1", json!({"id": "ord1", "startLocation": "Port X"})),
        );
        let geocoder = Arc::new(StaticGeocoder::default().with_entry("Port X", PORT_X));
        let p = viewer(store.clone(), geocoder).project("mv1").await.unwrap();

        assert_eq!(p.start, ResolvedCoordinate::resolved(PORT_X, Provenance::Geocoded));
        assert!(!p.current.is_resolved());
        assert!(!p.end.is_resolved());
        assert!(p.journey_not_started());
        assert!(!p.map_visible);
        assert!(store.updates().await.is_empty());
    }

    #[tokio::test]
    async fn in_transit_movement_uses_stored_current() {
        let store = Arc::new(
            MemoryStore::new()
                .with_record(
                    "mv1",
                    json!({"id": "mv1", "status": "In Transit", "order": "ord1",
                           "currentLocation": {"lat": 19.07, "lon": 72.87}}),
                )
                .with_record("ord1", json!({"id": "ord1", "startLocation": "Port X", "endLocation": "Atlantis"})),
        );
        let geocoder = Arc::new(StaticGeocoder::default().with_entry("Port X", PORT_X));
        let p = viewer(store, geocoder).project("mv1").await.unwrap();

        assert!(p.map_visible);
        assert_eq!(p.current, ResolvedCoordinate::resolved(Coordinate::new(19.07, 72.87), Provenance::Stored));
        // Unknown destination renders as the placeholder without failing.
        assert_eq!(p.end.or_placeholder(), Coordinate::PLACEHOLDER);
    }

    #[tokio::test]
    async fn repeated_projections_reuse_geocoding() {
        let store = Arc::new(
            MemoryStore::new()
                .with_record("mv1", json!({"id": "mv1", "status": "In Transit", "order": "ord1"}))
                .with_record("ord1", json!({"id": "ord1", "startLocation": "Port X", "endLocation": "Port X"})),
        );
        let geocoder = Arc::new(StaticGeocoder::default().with_entry("Port X", PORT_X));
        let v = viewer(store.clone(), geocoder.clone());

        let first = v.project("mv1").await.unwrap();
        let second = v.project("mv1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.read_count(), 2);
        assert!(geocoder.lookups() <= 2);

        let third = v.project("mv1").await.unwrap();
        assert_eq!(third, first);
        assert!(geocoder.lookups() <= 2);
    }

    #[tokio::test]
    async fn projection_reflects_writes_on_next_read() {
        let store = Arc::new(
            MemoryStore::new().with_record("mv1", json!({"id": "mv1", "status": "Not Started"})),
        );
        let v = viewer(store.clone(), Arc::new(StaticGeocoder::default()));
        assert!(v.project("mv1").await.unwrap().journey_not_started());

        let patch = MovementPatch {
            current_location: Some(Coordinate::new(19.07, 72.87)),
            status: Some(MovementStatus::InTransit),
        };
        store.update("mv1", patch.into_fields()).await.unwrap();

        let p = v.project("mv1").await.unwrap();
        assert_eq!(p.status, MovementStatus::InTransit);
        assert_eq!(p.current.coord, Some(Coordinate::new(19.07, 72.87)));
    }

    #[tokio::test]
    async fn unexpanded_order_is_read_from_orders_collection() {
        let movements = Arc::new(
            MemoryStore::new().with_record("mv1", json!({"id": "mv1", "status": "Not Started", "order": "ord1"})),
        );
        let orders = Arc::new(MemoryStore::new().with_record(
            "ord1",
            json!({"id": "ord1", "startLocation": "Port X", "endCoordinates": {"lat": 28.6, "lon": 77.2}}),
        ));
        let geocoder = Arc::new(StaticGeocoder::default().with_entry("Port X", PORT_X));

        let without = viewer(movements.clone(), geocoder.clone()).project("mv1").await.unwrap();
        assert!(!without.start.is_resolved());
        assert_eq!(orders.read_count(), 0);

        let p = viewer(movements, geocoder)
            .with_order_store(orders.clone())
            .project("mv1")
            .await
            .unwrap();
        assert_eq!(p.start, ResolvedCoordinate::resolved(PORT_X, Provenance::Geocoded));
        assert_eq!(p.end.coord, Some(Coordinate::new(28.6, 77.2)));
        assert_eq!(orders.read_count(), 1);
    }

    #[tokio::test]
    async fn missing_order_record_leaves_roles_unresolved() {
        let movements = Arc::new(
            MemoryStore::new().with_record("mv1", json!({"id": "mv1", "status": "In Transit", "order": "gone"})),
        );
        let p = viewer(movements, Arc::new(StaticGeocoder::default()))
            .with_order_store(Arc::new(MemoryStore::new()))
            .project("mv1")
            .await
            .unwrap();
        assert!(!p.start.is_resolved());
        assert!(!p.end.is_resolved());
        assert!(p.map_visible);
    }

    #[tokio::test]
    async fn missing_movement_is_an_error() {
        let v = viewer(Arc::new(MemoryStore::new()), Arc::new(StaticGeocoder::default()));
        assert!(matches!(v.project("nope").await, Err(TrackError::Persistence(_))));
    }
}
