//! Persistence throttling.
//!
//! [`Throttle`] is a leaky bucket of one: a sample is accepted only if
//! strictly more than `window` has elapsed since the last accepted one. No
//! burst allowance, no smoothing.
//!
//! [`ThrottledPublisher`] puts the throttle in front of persistence while
//! still updating the local "current position" marker with every sample.

use std::time::Duration;

use convoy_core::types::PositionSample;
use tokio::sync::watch;
use tokio::time::Instant;

/// Accept at most one event per window.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last_published: Option<Instant>,
}

impl Throttle {
    /// A primed throttle: the first offer is accepted.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_published: None,
        }
    }

    /// A throttle whose window starts at `started`, so nothing is accepted
    /// until `window` has passed.
    pub fn starting_at(window: Duration, started: Instant) -> Self {
        Self {
            window,
            last_published: Some(started),
        }
    }

    /// Accept or reject an event at `now`. Acceptance restarts the window.
    pub fn offer(&mut self, now: Instant) -> bool {
        match self.last_published {
            Some(last) if now.saturating_duration_since(last) <= self.window => false,
            _ => {
                self.last_published = Some(now);
                true
            }
        }
    }

    pub fn last_published(&self) -> Option<Instant> {
        self.last_published
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Throttle plus local display marker.
#[derive(Debug)]
pub struct ThrottledPublisher {
    throttle: Throttle,
    local: watch::Sender<Option<PositionSample>>,
    displayed: u64,
    forwarded: u64,
}

impl ThrottledPublisher {
    pub fn new(window: Duration) -> Self {
        Self::with_throttle(Throttle::new(window))
    }

    pub fn with_throttle(throttle: Throttle) -> Self {
        let (local, _) = watch::channel(None);
        Self {
            throttle,
            local,
            displayed: 0,
            forwarded: 0,
        }
    }

    /// Receiver for the local "current position" marker.
    pub fn subscribe(&self) -> watch::Receiver<Option<PositionSample>> {
        self.local.subscribe()
    }

    /// Update the local marker only.
    pub fn display(&mut self, sample: PositionSample) {
        self.local.send_replace(Some(sample));
        self.displayed += 1;
    }

    /// Update the local marker, then return the sample if it should be
    /// persisted.
    pub fn offer(&mut self, sample: PositionSample, now: Instant) -> Option<PositionSample> {
        self.display(sample);
        if self.throttle.offer(now) {
            self.forwarded += 1;
            Some(sample)
        } else {
            None
        }
    }

    /// Samples shown on the local marker.
    pub fn displayed(&self) -> u64 {
        self.displayed
    }

    /// Samples forwarded for persistence.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

#[cfg(test)]
mod tests {
    use convoy_core::types::Coordinate;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(30);

    #[test]
    fn at_most_one_per_window() {
        let t0 = Instant::now();
        let mut t = Throttle::new(WINDOW);
        assert!(t.offer(t0));
        assert!(!t.offer(t0 + Duration::from_secs(10)));
        // Exactly the window is not enough.
        assert!(!t.offer(t0 + WINDOW));
        assert!(t.offer(t0 + WINDOW + Duration::from_millis(1)));
        assert!(!t.offer(t0 + Duration::from_secs(45)));
        assert!(t.offer(t0 + Duration::from_secs(61)));
    }

    #[test]
    fn any_sequence_respects_window() {
        // Irregular arrival times over five minutes.
        let t0 = Instant::now();
        let offsets_ms: Vec<u64> = (0..600u64).map(|i| i * 500 + (i * 7919) % 450).collect();
        let mut t = Throttle::new(WINDOW);
        let accepted: Vec<u64> = offsets_ms
            .iter()
            .copied()
            .filter(|ms| t.offer(t0 + Duration::from_millis(*ms)))
            .collect();

        assert!(!accepted.is_empty());
        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] > WINDOW.as_millis() as u64);
        }
    }

    #[test]
    fn starting_at_waits_a_full_window() {
        let t0 = Instant::now();
        let mut t = Throttle::starting_at(WINDOW, t0);
        assert!(!t.offer(t0 + Duration::from_secs(5)));
        assert!(t.offer(t0 + Duration::from_secs(31)));
    }

    #[test]
    fn clock_going_backwards_is_rejected() {
        let t0 = Instant::now() + Duration::from_secs(100);
        let mut t = Throttle::new(WINDOW);
        assert!(t.offer(t0));
        assert!(!t.offer(t0 - Duration::from_secs(50)));
    }

    #[test]
    fn every_sample_reaches_display() {
        // 40 samples over 10 seconds: one forwarded, 40 displayed.
        let t0 = Instant::now();
        let mut p = ThrottledPublisher::new(WINDOW);
        let rx = p.subscribe();
        let mut forwarded = Vec::new();
        for i in 0..40u64 {
            let s = PositionSample::new(Coordinate::new(19.0 + i as f64 * 0.001, 72.8), i);
            if let Some(s) = p.offer(s, t0 + Duration::from_millis(i * 250)) {
                forwarded.push(s);
            }
        }
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].sampled_at, 0);
        assert_eq!(p.displayed(), 40);
        assert_eq!(p.forwarded(), 1);
        assert_eq!(rx.borrow().map(|s| s.sampled_at), Some(39));
    }
}
