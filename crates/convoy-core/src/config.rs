//! Configuration parsing for the Convoy tracking runner.
//!
//! All settings come from a single JSON config file: logging metadata, the
//! record store endpoint, the geocoder, tracking tunables and the list of
//! movements to track.
//!
//! # Example config
//!
//! ```json
//! {
//!   "Convoy": { "module_name": "convoy_tracker", "log_path": "/tmp/log" },
//!   "store": { "base_url": "http://127.0.0.1:8090" },
//!   "geocoder": { "kind": "nominatim", "user_agent": "convoy/0.1" },
//!   "tracking": { "throttle_secs": 30 },
//!   "sessions": [
//!     { "movement_id": "mv_8f2k", "feed": { "kind": "ws", "url": "wss://devices.example/positions" } }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Deserialize;

use crate::error::TrackError;
use crate::types::Coordinate;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(rename = "Convoy")]
    pub meta: Option<ModuleMeta>,

    pub store: StoreConfig,

    #[serde(default)]
    pub geocoder: GeocoderConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Movements tracked by the `track` command.
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

impl AppConfig {
    /// Returns the module name, defaulting to `"convoy"`.
    pub fn module_name(&self) -> String {
        self.meta.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "convoy".to_string())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.meta.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Reject settings the tracking engine cannot run with.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.tracking.throttle_secs == 0 {
            return Err(TrackError::Config("tracking.throttle_secs must be positive".into()));
        }
        if self.tracking.queue_capacity == 0 {
            return Err(TrackError::Config("tracking.queue_capacity must be positive".into()));
        }
        if self.store.base_url.trim().is_empty() {
            return Err(TrackError::Config("store.base_url is empty".into()));
        }
        let mut seen = HashSet::new();
        for s in &self.sessions {
            if !seen.insert(s.movement_id.as_str()) {
                return Err(TrackError::Config(format!("duplicate session for movement {}", s.movement_id)));
            }
        }
        Ok(())
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
    /// Write file logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

/// Record store endpoint and collection names.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the record store (e.g. `http://127.0.0.1:8090`).
    pub base_url: String,

    #[serde(default = "default_movements_collection")]
    pub movements_collection: String,

    /// Collection read by viewers when a movement's order is not expanded.
    #[serde(default = "default_orders_collection")]
    pub orders_collection: String,

    /// Name of the movement → order relation field.
    #[serde(default = "default_order_relation")]
    pub order_relation: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Geocoding collaborator selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeocoderConfig {
    /// OpenStreetMap Nominatim search API.
    Nominatim {
        #[serde(default = "default_nominatim_url")]
        base_url: String,
        /// Nominatim's usage policy requires an identifying user agent.
        #[serde(default = "default_user_agent")]
        user_agent: String,
        #[serde(default = "default_geocoder_timeout_ms")]
        timeout_ms: u64,
    },
    /// Fixed address table, for offline runs and tests.
    Static {
        #[serde(default)]
        entries: HashMap<String, Coordinate>,
    },
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self::Nominatim {
            base_url: default_nominatim_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_geocoder_timeout_ms(),
        }
    }
}

/// Tracking engine tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Minimum seconds between persisted position updates (default: 30).
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,

    /// Per-movement sample queue capacity (default: 64).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Request high-accuracy positioning from the host (default: true).
    #[serde(default = "default_true")]
    pub high_accuracy: bool,

    /// Report an acquisition error if no sample arrives within this many
    /// milliseconds (default: 27000).
    #[serde(default = "default_watch_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum acceptable age of a cached host position (default: 30000).
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

impl TrackingConfig {
    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            throttle_secs: default_throttle_secs(),
            queue_capacity: default_queue_capacity(),
            high_accuracy: true,
            timeout_ms: default_watch_timeout_ms(),
            max_age_ms: default_max_age_ms(),
        }
    }
}

/// One tracked movement and where its positions come from.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub movement_id: String,
    pub feed: FeedConfig,
}

/// Host position feed for a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedConfig {
    /// Device position stream over WebSocket.
    Ws {
        url: String,
        #[serde(default)]
        extra_headers: HashMap<String, String>,
    },
    /// JSON-lines file of recorded samples.
    Replay {
        path: String,
        /// Delay between emitted samples in milliseconds (default: 1000).
        #[serde(default = "default_pace_ms")]
        pace_ms: u64,
    },
}

fn default_movements_collection() -> String {
    "movements".to_string()
}

fn default_orders_collection() -> String {
    "orders".to_string()
}

fn default_order_relation() -> String {
    "order".to_string()
}

fn default_store_timeout_ms() -> u64 {
    10_000
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    concat!("convoy/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_geocoder_timeout_ms() -> u64 {
    5_000
}

fn default_throttle_secs() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_watch_timeout_ms() -> u64 {
    27_000
}

fn default_max_age_ms() -> u64 {
    30_000
}

fn default_pace_ms() -> u64 {
    1_000
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"store": {"base_url": "http://localhost:8090"}}"#).unwrap();
        assert_eq!(cfg.store.movements_collection, "movements");
        assert_eq!(cfg.store.order_relation, "order");
        assert_eq!(cfg.tracking.throttle_window(), Duration::from_secs(30));
        assert_eq!(cfg.tracking.queue_capacity, 64);
        assert!(matches!(cfg.geocoder, GeocoderConfig::Nominatim { .. }));
        assert_eq!(cfg.module_name(), "convoy");
        cfg.validate().unwrap();
    }

    #[test]
    fn full_config_parses() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{
                "Convoy": {"module_name": "tracker", "log_path": "/tmp/log"},
                "store": {"base_url": "http://db", "timeout_ms": 2000},
                "geocoder": {"kind": "static", "entries": {"Port X": {"lat": 18.95, "lon": 72.95}}},
                "tracking": {"throttle_secs": 10, "queue_capacity": 8},
                "sessions": [
                    {"movement_id": "a", "feed": {"kind": "ws", "url": "wss://dev/a"}},
                    {"movement_id": "b", "feed": {"kind": "replay", "path": "trace.jsonl"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.module_name(), "tracker");
        assert_eq!(cfg.store.timeout(), Duration::from_millis(2000));
        match &cfg.geocoder {
            GeocoderConfig::Static { entries } => assert_eq!(entries["Port X"], Coordinate::new(18.95, 72.95)),
            other => panic!("unexpected geocoder {other:?}"),
        }
        assert!(matches!(cfg.sessions[1].feed, FeedConfig::Replay { pace_ms: 1000, .. }));
        cfg.validate().unwrap();
    }

    #[test]
    fn shipped_example_config_is_valid() {
        let cfg: AppConfig = serde_json::from_str(include_str!("../../../config/convoy.example.json")).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.sessions.len(), 2);
        assert!(matches!(cfg.sessions[0].feed, FeedConfig::Ws { .. }));
        assert_eq!(cfg.log_path().as_deref(), Some("/tmp/convoy-log"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg: AppConfig = serde_json::from_str(
            r#"{"store": {"base_url": "http://db"},
                "sessions": [
                    {"movement_id": "a", "feed": {"kind": "ws", "url": "wss://x"}},
                    {"movement_id": "a", "feed": {"kind": "ws", "url": "wss://y"}}
                ]}"#,
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(TrackError::Config(_))));

        cfg.sessions.pop();
        cfg.tracking.throttle_secs = 0;
        assert!(cfg.validate().is_err());
    }
}
