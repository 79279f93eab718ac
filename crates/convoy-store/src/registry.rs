//! Factory for building collaborators from config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use convoy_core::config::{GeocoderConfig, StoreConfig};
use convoy_core::geocode::Geocoder;
use convoy_core::store::RecordStore;
use tracing::info;

use crate::{CachedGeocoder, HttpRecordStore, NominatimGeocoder, StaticGeocoder};

/// Create the configured geocoder, wrapped in a [`CachedGeocoder`].
pub fn create_geocoder(config: &GeocoderConfig) -> Result<Arc<dyn Geocoder>> {
    let inner: Arc<dyn Geocoder> = match config {
        GeocoderConfig::Nominatim {
            base_url,
            user_agent,
            timeout_ms,
        } => {
            info!("geocoder: nominatim at {base_url}");
            Arc::new(NominatimGeocoder::new(base_url, user_agent, Duration::from_millis(*timeout_ms))?)
        }
        GeocoderConfig::Static { entries } => {
            info!("geocoder: static table ({} entries)", entries.len());
            Arc::new(StaticGeocoder::new(entries))
        }
    };
    Ok(Arc::new(CachedGeocoder::new(inner)))
}

/// Create the HTTP store for the movements collection.
pub fn create_movement_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    info!("store: {} (collection={})", config.base_url, config.movements_collection);
    Ok(Arc::new(HttpRecordStore::new(
        &config.base_url,
        &config.movements_collection,
        config.timeout(),
    )?))
}

/// Create the HTTP store for the orders collection, used by viewers when the
/// movement read does not expand its order.
pub fn create_order_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    info!("store: {} (collection={})", config.base_url, config.orders_collection);
    Ok(Arc::new(HttpRecordStore::new(
        &config.base_url,
        &config.orders_collection,
        config.timeout(),
    )?))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use convoy_core::types::Coordinate;

    use super::*;

    #[tokio::test]
    async fn static_config_builds_cached_table() {
        let mut entries = HashMap::new();
        entries.insert("Port X".to_string(), Coordinate::new(18.95, 72.95));
        let g = create_geocoder(&GeocoderConfig::Static { entries }).unwrap();
        assert_eq!(g.geocode("port x").await.unwrap(), Some(Coordinate::new(18.95, 72.95)));
    }
}
