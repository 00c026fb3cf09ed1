//! Fixed-window request limiter.
//!
//! Counts hits per caller key inside a rolling window and rejects a key once
//! it exhausts its allowance. Purely in-memory and process-local; callers
//! decide what a key is (a username, a peer address).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Upper bound on tracked keys before old windows are evicted.
const DEFAULT_CAPACITY: usize = 10_000;

pub struct RateLimiter {
    max_hits: u32,
    window: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Window>>,
}

struct Window {
    count: u32,
    started_at: Instant,
}

impl RateLimiter {
    /// Limiter allowing `max_hits` per key within each `window`.
    pub fn new(max_hits: u32, window: Duration) -> Self {
        Self {
            max_hits,
            window,
            capacity: DEFAULT_CAPACITY,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Record a hit for `key`. Returns false when the key has exhausted its
    /// allowance for the current window.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.lock_entries();

        if let Some(win) = entries.get_mut(key) {
            if now.duration_since(win.started_at) >= self.window {
                win.count = 1;
                win.started_at = now;
                return true;
            }
            if win.count >= self.max_hits {
                return false;
            }
            win.count += 1;
            return true;
        }

        if entries.len() >= self.capacity {
            let window = self.window;
            entries.retain(|_, w| now.duration_since(w.started_at) < window);
            if entries.len() >= self.capacity {
                // still full of live windows; drop the one closest to expiry
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, w)| w.started_at)
                    .map(|(k, _)| k.clone());
                if let Some(key) = oldest {
                    entries.remove(&key);
                }
            }
        }

        entries.insert(
            key.to_string(),
            Window {
                count: 1,
                started_at: now,
            },
        );
        true
    }

    /// Drop every expired window.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.window;
        self.lock_entries()
            .retain(|_, w| now.duration_since(w.started_at) < window);
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.lock_entries().len()
    }

    // The map holds plain counters; a poisoning panic cannot leave it in a
    // half-written state, so the poison flag is ignored.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_blocks() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("alice"));
        assert!(limiter.check("alice"));
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        assert!(!limiter.check("alice"));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        assert!(limiter.check("bob"));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check("alice"));
    }

    #[test]
    fn capacity_evicts_the_oldest_window() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60)).with_capacity(2);
        assert!(limiter.check("a"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(limiter.check("b"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(limiter.check("c"));
        assert_eq!(limiter.tracked(), 2);
        // "a" was the oldest window, so a fresh hit starts over
        assert!(limiter.check("a"));
    }

    #[test]
    fn sweep_drops_expired_windows() {
        let limiter = RateLimiter::new(1, Duration::from_millis(5));
        limiter.check("alice");
        limiter.check("bob");
        assert_eq!(limiter.tracked(), 2);
        std::thread::sleep(Duration::from_millis(10));
        limiter.sweep();
        assert_eq!(limiter.tracked(), 0);
    }
}
