//! OpenStreetMap Nominatim geocoder.
//!
//! Issues `GET {base}/search?q=<address>&format=jsonv2&limit=1` and takes the
//! first hit. Nominatim returns coordinates as decimal strings.

use std::time::Duration;

use async_trait::async_trait;
use convoy_core::error::TrackError;
use convoy_core::geocode::Geocoder;
use convoy_core::types::Coordinate;
use serde::Deserialize;
use tracing::debug;

/// One entry of a Nominatim search response.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim instance.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().user_agent(user_agent).timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}/search?q={}&format=jsonv2&limit=1",
            self.base_url,
            urlencoding::encode(address)
        )
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, TrackError> {
        let url = self.search_url(address);
        debug!("[nominatim] GET {url}");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackError::Resolution(format!("lookup of {address:?} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TrackError::Resolution(format!("lookup of {address:?} returned {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TrackError::Resolution(format!("lookup of {address:?} body: {e}")))?;
        parse_search_response(&body)
    }
}

/// First usable hit of a search response body, `None` if there is none.
pub fn parse_search_response(body: &str) -> Result<Option<Coordinate>, TrackError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| TrackError::Resolution(format!("malformed search response: {e}")))?;

    Ok(hits.iter().find_map(|hit| {
        let lat = hit.lat.trim().parse::<f64>().ok()?;
        let lon = hit.lon.trim().parse::<f64>().ok()?;
        Coordinate::new(lat, lon).usable()
    }))
}
