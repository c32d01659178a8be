//! # Dedup Window
//!
//! The backend re-pushes the same violation on every detection frame. The
//! window remembers which subjects were alerted recently so that one
//! real-world event produces one visible alert.
//!
//! Expired keys are purged lazily on each admission, so the set only ever
//! holds subjects alerted within the last window.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default suppression window for a subject key.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(60_000);

/// Subject keys currently suppressed from re-alerting, with their expiry.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    window: Duration,
    expiries: HashMap<String, Instant>,
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl DedupWindow {
    /// Creates an empty window that suppresses a key for `window` after it alerts.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            expiries: HashMap::new(),
        }
    }

    /// Decides whether an alert for `key` may surface at `now`.
    ///
    /// Returns `true` and starts a fresh suppression period when the key is
    /// absent or expired. Returns `false`, leaving the original expiry in
    /// place, while the key is still suppressed. An expiry equal to `now`
    /// counts as expired.
    pub fn admit(&mut self, key: &str, now: Instant) -> bool {
        self.purge_expired(now);
        if self.expiries.contains_key(key) {
            return false;
        }
        self.expiries.insert(key.to_owned(), now + self.window);
        true
    }

    /// Whether `key` would be suppressed at `now`. Does not modify the window.
    pub fn is_suppressed(&self, key: &str, now: Instant) -> bool {
        self.expiries.get(key).is_some_and(|expiry| *expiry > now)
    }

    /// Number of tracked keys, expired ones included until the next purge.
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    /// True when no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    /// Forgets every key.
    pub fn clear(&mut self) {
        self.expiries.clear();
    }

    fn purge_expired(&mut self, now: Instant) {
        self.expiries.retain(|_, expiry| *expiry > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "A2-AA-11-BB";

    #[test]
    fn test_duplicate_within_window_is_suppressed() {
        let mut window = DedupWindow::default();
        let t0 = Instant::now();

        assert!(window.admit(KEY, t0));
        assert!(!window.admit(KEY, t0 + Duration::from_secs(2)));
        assert!(!window.admit(KEY, t0 + Duration::from_millis(59_999)));
        assert!(window.is_suppressed(KEY, t0 + Duration::from_secs(30)));
    }

    #[test]
    fn test_suppression_does_not_extend_expiry() {
        let mut window = DedupWindow::default();
        let t0 = Instant::now();

        assert!(window.admit(KEY, t0));
        assert!(!window.admit(KEY, t0 + Duration::from_secs(50)));
        // Still anchored to the first alert, not the suppressed repeat.
        assert!(window.admit(KEY, t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_expired_key_alerts_again() {
        let mut window = DedupWindow::new(Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(window.admit(KEY, t0));
        assert!(window.admit(KEY, t0 + Duration::from_secs(60)));
        assert!(!window.is_suppressed(KEY, t0 + Duration::from_secs(120)));
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let mut window = DedupWindow::default();
        let t0 = Instant::now();

        assert!(window.admit("A1-X", t0));
        assert!(window.admit("A2-X", t0));
        assert!(window.admit("A1-Y", t0));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_expired_entries_are_purged_lazily() {
        let mut window = DedupWindow::new(Duration::from_secs(1));
        let t0 = Instant::now();

        window.admit("A1-X", t0);
        window.admit("A2-X", t0);
        assert_eq!(window.len(), 2);

        window.admit("A3-X", t0 + Duration::from_secs(5));
        assert_eq!(window.len(), 1);

        window.clear();
        assert!(window.is_empty());
    }
}
