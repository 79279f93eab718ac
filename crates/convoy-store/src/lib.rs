//! # convoy-store
//!
//! Collaborator implementations for the tracking engine.
//!
//! | Component          | Contract                  | Backing                         |
//! |--------------------|---------------------------|---------------------------------|
//! | [`HttpRecordStore`]| `RecordStore`             | REST record API (`reqwest`)     |
//! | [`MemoryStore`]    | `RecordStore`             | in-process map, records writes  |
//! | [`NominatimGeocoder`] | `Geocoder`             | OpenStreetMap Nominatim search  |
//! | [`StaticGeocoder`] | `Geocoder`                | fixed address table             |
//! | [`CachedGeocoder`] | `Geocoder` (decorator)    | memoizes another geocoder       |
//!
//! [`registry`] builds the configured geocoder from a [`GeocoderConfig`](convoy_core::config::GeocoderConfig).

pub mod cache;
pub mod http;
pub mod memory;
pub mod nominatim;
pub mod registry;
pub mod static_geocoder;

pub use cache::CachedGeocoder;
pub use http::HttpRecordStore;
pub use memory::MemoryStore;
pub use nominatim::NominatimGeocoder;
pub use static_geocoder::StaticGeocoder;
