//! Position source: the host's continuous location capability behind an
//! explicit watch handle.
//!
//! A [`HostPositionApi`] mirrors the platform `watch` / `clearWatch` pair.
//! [`PositionSource`] owns at most one active watch for one movement, so
//! concurrent sessions never share implicit global state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use convoy_core::config::TrackingConfig;
use convoy_core::error::TrackError;
use convoy_core::types::PositionSample;
use tracing::debug;
use uuid::Uuid;

/// Invoked for every raw reading. Must not block.
pub type SampleCallback = Arc<dyn Fn(PositionSample) + Send + Sync>;

/// Invoked on acquisition failure. The watch keeps running.
pub type ErrorCallback = Arc<dyn Fn(TrackError) + Send + Sync>;

/// Options passed to the host when a watch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Report an acquisition error if no reading arrives within this time.
    pub timeout: Duration,
    /// Maximum acceptable age of a cached reading.
    pub max_age: Duration,
}

impl WatchOptions {
    pub fn from_config(cfg: &TrackingConfig) -> Self {
        Self {
            high_accuracy: cfg.high_accuracy,
            timeout: Duration::from_millis(cfg.timeout_ms),
            max_age: Duration::from_millis(cfg.max_age_ms),
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}

/// Token identifying one active watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(Uuid);

impl WatchHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WatchHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch-{}", &self.0.simple().to_string()[..8])
    }
}

/// Host capability producing position readings.
///
/// Implementations deliver readings in the order they are produced and never
/// filter them. `clear_watch` must be idempotent and must drop the callbacks
/// registered for that handle.
pub trait HostPositionApi: Send + Sync {
    fn watch(
        &self,
        on_sample: SampleCallback,
        on_error: ErrorCallback,
        options: WatchOptions,
    ) -> Result<WatchHandle, TrackError>;

    fn clear_watch(&self, handle: WatchHandle);
}

/// Lock a std mutex, ignoring poisoning (the guarded maps stay consistent).
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start/stop wrapper around a host position API for one movement.
pub struct PositionSource {
    api: Arc<dyn HostPositionApi>,
    options: WatchOptions,
    active: Mutex<Option<WatchHandle>>,
}

impl PositionSource {
    pub fn new(api: Arc<dyn HostPositionApi>, options: WatchOptions) -> Self {
        Self {
            api,
            options,
            active: Mutex::new(None),
        }
    }

    /// Begin continuous acquisition. A previous watch is cleared first.
    pub fn start(&self, on_sample: SampleCallback, on_error: ErrorCallback) -> Result<WatchHandle, TrackError> {
        let mut active = lock(&self.active);
        if let Some(old) = active.take() {
            self.api.clear_watch(old);
        }
        let handle = self.api.watch(on_sample, on_error, self.options)?;
        debug!("[source] started {handle}");
        *active = Some(handle);
        Ok(handle)
    }

    /// End acquisition. Idempotent, safe before `start`, callable from any
    /// callback.
    pub fn stop(&self) {
        let handle = lock(&self.active).take();
        if let Some(handle) = handle {
            debug!("[source] stopping {handle}");
            self.api.clear_watch(handle);
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.active).is_some()
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use convoy_core::types::Coordinate;

    use super::*;
    use crate::feed::ManualPositionFeed;

    #[test]
    fn stop_is_idempotent_and_safe_before_start() {
        let feed = Arc::new(ManualPositionFeed::new());
        let source = PositionSource::new(feed.clone(), WatchOptions::default());
        source.stop();
        assert!(!source.is_active());

        source.start(Arc::new(|_| {}), Arc::new(|_| {})).unwrap();
        assert!(source.is_active());
        assert_eq!(feed.active_watches(), 1);

        source.stop();
        source.stop();
        assert!(!source.is_active());
        assert_eq!(feed.active_watches(), 0);
    }

    #[test]
    fn errors_do_not_end_the_stream() {
        let feed = Arc::new(ManualPositionFeed::new());
        let source = PositionSource::new(feed.clone(), WatchOptions::default());
        let samples = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let (s, e) = (samples.clone(), errors.clone());
        source
            .start(
                Arc::new(move |_| {
                    s.fetch_add(1, Ordering::SeqCst);
                }),
                Arc::new(move |_| {
                    e.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        feed.push(PositionSample::new(Coordinate::new(19.0, 72.0), 1));
        feed.fail("signal lost");
        feed.push(PositionSample::new(Coordinate::new(19.1, 72.1), 2));

        assert_eq!(samples.load(Ordering::SeqCst), 2);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn restart_replaces_previous_watch() {
        let feed = Arc::new(ManualPositionFeed::new());
        let source = PositionSource::new(feed.clone(), WatchOptions::default());
        let first = source.start(Arc::new(|_| {}), Arc::new(|_| {})).unwrap();
        let second = source.start(Arc::new(|_| {}), Arc::new(|_| {})).unwrap();
        assert_ne!(first, second);
        assert_eq!(feed.active_watches(), 1);
    }
}
