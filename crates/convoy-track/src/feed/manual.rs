//! In-process position feed.
//!
//! Readings are pushed by the embedding code, e.g. from an HTTP endpoint the
//! driver app posts to. Every active watch receives every reading.

use std::sync::Mutex;

use ahash::AHashMap;
use convoy_core::error::TrackError;
use convoy_core::types::PositionSample;

use crate::source::{ErrorCallback, HostPositionApi, SampleCallback, WatchHandle, WatchOptions, lock};

/// Host position API driven by explicit `push` / `fail` calls.
#[derive(Default)]
pub struct ManualPositionFeed {
    watches: Mutex<AHashMap<WatchHandle, (SampleCallback, ErrorCallback)>>,
}

impl ManualPositionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a reading. Returns the number of watches it reached.
    pub fn push(&self, sample: PositionSample) -> usize {
        // Callbacks run without the lock held so they may clear their watch.
        let targets: Vec<SampleCallback> = lock(&self.watches).values().map(|(s, _)| s.clone()).collect();
        for cb in &targets {
            cb(sample);
        }
        targets.len()
    }

    /// Report an acquisition failure to every watch.
    pub fn fail(&self, message: &str) {
        let targets: Vec<ErrorCallback> = lock(&self.watches).values().map(|(_, e)| e.clone()).collect();
        for cb in &targets {
            cb(TrackError::Acquisition(message.to_string()));
        }
    }

    pub fn active_watches(&self) -> usize {
        lock(&self.watches).len()
    }
}

impl HostPositionApi for ManualPositionFeed {
    fn watch(
        &self,
        on_sample: SampleCallback,
        on_error: ErrorCallback,
        _options: WatchOptions,
    ) -> Result<WatchHandle, TrackError> {
        let handle = WatchHandle::new();
        lock(&self.watches).insert(handle, (on_sample, on_error));
        Ok(handle)
    }

    fn clear_watch(&self, handle: WatchHandle) {
        lock(&self.watches).remove(&handle);
    }
}
