//! Sliding-window rate limiter.
//!
//! Each key keeps the timestamps of its admitted actions. One mutex covers
//! prune, compare, and record, so two concurrent requests can never both
//! observe "under limit" and both pass the limit.
//!
//! Windows are measured against the request timestamp. Clock skew and
//! backdated requests are not defended against. Keys with nothing left in
//! their window are swept every [`SWEEP_INTERVAL`] calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use tollgate_contracts::policy::RateLimit;

/// Calls between sweeps of idle keys.
pub const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug)]
struct KeyWindow {
    window: Duration,
    admitted: VecDeque<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Windows {
    keys: HashMap<String, KeyWindow>,
    calls: u64,
}

impl Windows {
    fn sweep(&mut self, at: DateTime<Utc>) {
        self.keys.retain(|_, w| {
            let cutoff = window_start(at, w.window);
            w.admitted.back().is_some_and(|last| *last > cutoff)
        });
    }
}

/// Start of the window ending at `at`, clamped to the earliest
/// representable instant.
fn window_start(at: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    at.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Per-key sliding-window counters.
#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    windows: Mutex<Windows>,
}

impl SlidingWindowLimiter {
    /// A limiter with no recorded actions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one action for `key` at time `at` if the window has room.
    ///
    /// Returns `false` without recording anything when the number of
    /// actions in `(at - window, at]` already equals `limit.max_actions`.
    pub fn check_and_increment(&self, key: &str, limit: &RateLimit, at: DateTime<Utc>) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows.calls += 1;
        if windows.calls % SWEEP_INTERVAL == 0 {
            windows.sweep(at);
        }

        let window = limit.window();
        let cutoff = window_start(at, window);
        let entry = windows.keys.entry(key.to_string()).or_insert_with(|| KeyWindow {
            window,
            admitted: VecDeque::new(),
        });
        entry.window = window;
        entry.admitted.retain(|t| *t > cutoff);

        if entry.admitted.len() >= limit.max_actions as usize {
            if entry.admitted.is_empty() {
                windows.keys.remove(key);
            }
            return false;
        }
        entry.admitted.push_back(at);
        true
    }

    /// Actions currently counted against `key` in the window ending at `at`.
    pub fn in_window(&self, key: &str, limit: &RateLimit, at: DateTime<Utc>) -> usize {
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let cutoff = window_start(at, limit.window());
        windows
            .keys
            .get(key)
            .map(|w| w.admitted.iter().filter(|t| **t > cutoff && **t <= at).count())
            .unwrap_or(0)
    }

    /// Number of keys currently holding counters.
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner).keys.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn limit(max_actions: u32, window_secs: u64) -> RateLimit {
        RateLimit { max_actions, window_secs }
    }

    #[test]
    fn nth_request_allowed_next_refused() {
        let limiter = SlidingWindowLimiter::new();
        let l = limit(3, 60);
        let t0 = Utc::now();

        for i in 0..3 {
            assert!(limiter.check_and_increment("k", &l, t0 + Duration::seconds(i)), "request {} should pass", i + 1);
        }
        assert!(!limiter.check_and_increment("k", &l, t0 + Duration::seconds(3)));
        assert_eq!(limiter.in_window("k", &l, t0 + Duration::seconds(3)), 3);
    }

    #[test]
    fn refusal_does_not_consume_a_slot() {
        let limiter = SlidingWindowLimiter::new();
        let l = limit(1, 60);
        let t0 = Utc::now();

        assert!(limiter.check_and_increment("k", &l, t0));
        for _ in 0..5 {
            assert!(!limiter.check_and_increment("k", &l, t0 + Duration::seconds(1)));
        }
        // The only counted action expires at t0 + 60s, not later.
        assert!(limiter.check_and_increment("k", &l, t0 + Duration::seconds(60)));
    }

    #[test]
    fn window_slides() {
        let limiter = SlidingWindowLimiter::new();
        let l = limit(2, 10);
        let t0 = Utc::now();

        assert!(limiter.check_and_increment("k", &l, t0));
        assert!(limiter.check_and_increment("k", &l, t0 + Duration::seconds(5)));
        assert!(!limiter.check_and_increment("k", &l, t0 + Duration::seconds(9)));
        // First action left the window; one slot frees up.
        assert!(limiter.check_and_increment("k", &l, t0 + Duration::seconds(11)));
        assert!(!limiter.check_and_increment("k", &l, t0 + Duration::seconds(12)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindowLimiter::new();
        let l = limit(1, 60);
        let t0 = Utc::now();

        assert!(limiter.check_and_increment("a", &l, t0));
        assert!(limiter.check_and_increment("b", &l, t0));
        assert!(!limiter.check_and_increment("a", &l, t0));
    }

    /// Many threads racing on one key must admit exactly `max_actions`.
    #[test]
    fn concurrent_requests_never_exceed_limit() {
        let limiter = Arc::new(SlidingWindowLimiter::new());
        let l = limit(10, 3600);
        let t0 = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || {
                    (0..25).filter(|_| limiter.check_and_increment("shared", &l, t0)).count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 10);
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let limiter = SlidingWindowLimiter::new();
        let l = limit(1, 10_000_000_000_000);
        let t0 = Utc::now();

        assert!(limiter.check_and_increment("k", &l, t0));
        assert!(!limiter.check_and_increment("k", &l, t0 + Duration::seconds(1)));
        assert_eq!(limiter.in_window("k", &l, t0 + Duration::seconds(1)), 1);

        let max = limit(1, u64::MAX);
        assert!(limiter.check_and_increment("m", &max, t0));
        assert!(!limiter.check_and_increment("m", &max, t0 + Duration::days(365)));
    }

    #[test]
    fn idle_keys_are_swept() {
        let limiter = SlidingWindowLimiter::new();
        let short = limit(1, 10);
        let t0 = Utc::now();

        for i in 0..300 {
            assert!(limiter.check_and_increment(&format!("principal-{i}"), &short, t0));
        }
        assert_eq!(limiter.tracked_keys(), 300);

        // The next sweep falls within these calls, after every earlier
        // window has closed.
        let later = t0 + Duration::seconds(60);
        let roomy = limit(1000, 10);
        for _ in 0..SWEEP_INTERVAL {
            assert!(limiter.check_and_increment("active", &roomy, later));
        }
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.in_window("active", &roomy, later), SWEEP_INTERVAL as usize);
    }

    #[test]
    fn refusal_with_no_capacity_leaves_no_key() {
        let limiter = SlidingWindowLimiter::new();
        assert!(!limiter.check_and_increment("k", &limit(0, 60), Utc::now()));
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
