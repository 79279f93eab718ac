//! Fixed-table geocoder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use async_trait::async_trait;
use convoy_core::error::TrackError;
use convoy_core::geocode::{Geocoder, normalize_address};
use convoy_core::types::Coordinate;

/// Geocoder answering from an in-memory address table.
///
/// Keys are normalized, so `"Port X"` and `" port  x"` hit the same entry.
#[derive(Default)]
pub struct StaticGeocoder {
    entries: AHashMap<String, Coordinate>,
    lookups: AtomicUsize,
}

impl StaticGeocoder {
    pub fn new(entries: &HashMap<String, Coordinate>) -> Self {
        Self {
            entries: entries.iter().map(|(k, v)| (normalize_address(k), *v)).collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_entry(mut self, address: &str, coord: Coordinate) -> Self {
        self.entries.insert(normalize_address(address), coord);
        self
    }

    /// Number of lookups served.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, TrackError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.get(&normalize_address(address)).copied())
    }
}
