//! Wall-clock time utilities.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default()
}

/// Milliseconds elapsed since `ts_ms`, saturating at zero for future stamps.
#[inline]
pub fn age_ms(ts_ms: u64) -> u64 {
    now_ms().saturating_sub(ts_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_saturates() {
        assert_eq!(age_ms(u64::MAX), 0);
        assert!(age_ms(0) > 1_600_000_000_000);
    }
}
