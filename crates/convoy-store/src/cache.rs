//! Memoizing geocoder decorator.
//!
//! Geocoding is treated as a pure lookup: the same address always resolves to
//! the same coordinate. Found and not-found answers are cached per normalized
//! address so viewers re-projecting a movement do not hit the remote service
//! again. Transport errors are never cached.

use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use convoy_core::error::TrackError;
use convoy_core::geocode::{Geocoder, normalize_address};
use convoy_core::types::Coordinate;
use tokio::sync::Mutex;
use tracing::debug;

/// Caching wrapper around another [`Geocoder`].
pub struct CachedGeocoder {
    inner: Arc<dyn Geocoder>,
    cache: Mutex<AHashMap<String, Option<Coordinate>>>,
}

impl CachedGeocoder {
    pub fn new(inner: Arc<dyn Geocoder>) -> Self {
        Self {
            inner,
            cache: Mutex::new(AHashMap::new()),
        }
    }

    /// Number of cached addresses.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Geocoder for CachedGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, TrackError> {
        let key = normalize_address(address);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            debug!("[geocode-cache] hit {key:?}");
            return Ok(*hit);
        }

        // Lock is not held across the lookup; concurrent misses may both ask
        // the inner geocoder, which is harmless for a pure lookup.
        let answer = self.inner.geocode(address).await?;
        self.cache.lock().await.insert(key, answer);
        Ok(answer)
    }
}
