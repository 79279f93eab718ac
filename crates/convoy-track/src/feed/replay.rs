//! Replay of a recorded position trace.
//!
//! The trace is a JSON-lines file in any frame shape [`parse_frame`] accepts.
//! Blank lines and lines starting with `#` are skipped. Readings are emitted
//! one per `pace`; the watch goes quiet at end of file.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use ahash::AHashMap;
use convoy_core::error::TrackError;
use convoy_core::time_util::now_ms;
use tokio::sync::watch;
use tracing::info;

use super::parse_frame;
use crate::source::{ErrorCallback, HostPositionApi, SampleCallback, WatchHandle, WatchOptions, lock};

/// File-backed [`HostPositionApi`].
pub struct ReplayPositionFeed {
    path: PathBuf,
    pace: Duration,
    label: String,
    watches: Mutex<AHashMap<WatchHandle, watch::Sender<bool>>>,
}

impl ReplayPositionFeed {
    pub fn new(path: PathBuf, pace: Duration, label: String) -> Self {
        Self {
            path,
            pace,
            label,
            watches: Mutex::new(AHashMap::new()),
        }
    }
}

impl HostPositionApi for ReplayPositionFeed {
    fn watch(
        &self,
        on_sample: SampleCallback,
        on_error: ErrorCallback,
        _options: WatchOptions,
    ) -> Result<WatchHandle, TrackError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TrackError::Acquisition(format!("no async runtime for replay: {e}")))?;

        let handle = WatchHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        runtime.spawn(replay_loop(
            self.path.clone(),
            self.pace,
            self.label.clone(),
            on_sample,
            on_error,
            shutdown_rx,
        ));
        lock(&self.watches).insert(handle, shutdown_tx);
        Ok(handle)
    }

    fn clear_watch(&self, handle: WatchHandle) {
        if let Some(tx) = lock(&self.watches).remove(&handle) {
            let _ = tx.send(true);
        }
    }
}

async fn replay_loop(
    path: PathBuf,
    pace: Duration,
    label: String,
    on_sample: SampleCallback,
    on_error: ErrorCallback,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) => {
            on_error(TrackError::Acquisition(format!("cannot read trace {}: {e}", path.display())));
            return;
        }
    };

    let mut emitted = 0usize;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if *shutdown_rx.borrow() {
            break;
        }
        match parse_frame(line, now_ms()) {
            Ok(sample) => {
                on_sample(sample);
                emitted += 1;
            }
            Err(e) => on_error(e),
        }
        tokio::select! {
            _ = tokio::time::sleep(pace) => {},
            _ = shutdown_rx.changed() => break,
        }
    }

    info!("[{label}] replay finished after {emitted} readings");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use convoy_core::types::Coordinate;

    use super::*;

    #[tokio::test]
    async fn replays_trace_in_order_and_reports_bad_lines() {
        let path = std::env::temp_dir().join(format!("convoy-replay-{}.jsonl", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "# trace\n{\"lat\": 19.07, \"lon\": 72.87, \"sampledAt\": 1}\n\nnot json\n{\"lat\": 19.08, \"lon\": 72.88, \"sampledAt\": 2}\n",
        )
        .unwrap();

        let feed = ReplayPositionFeed::new(path.clone(), Duration::from_millis(1), "replay-test".into());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let err_tx = tx.clone();
        feed.watch(
            Arc::new(move |s| {
                let _ = tx.send(Ok(s));
            }),
            Arc::new(move |e| {
                let _ = err_tx.send(Err(e));
            }),
            WatchOptions::default(),
        )
        .unwrap();

        let mut got = Vec::new();
        while let Some(item) = rx.recv().await {
            got.push(item);
        }
        std::fs::remove_file(&path).ok();

        assert_eq!(got.len(), 3);
        assert_eq!(got[0].as_ref().unwrap().coord, Coordinate::new(19.07, 72.87));
        assert!(got[1].is_err());
        assert_eq!(got[2].as_ref().unwrap().sampled_at, 2);
    }
}
