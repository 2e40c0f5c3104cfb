use crate::rate_limit::policy::Policy;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

type Registry = HashMap<String, VecDeque<DateTime<Utc>>>;

/// In-process sliding window log rate limiter.
///
/// Every key owns a chronologically ordered log of admitted request
/// timestamps. All reads and writes of the registry happen under one lock, so
/// check-then-record is atomic across concurrent callers.
///
/// Timestamps come from a monotonic clock anchored to the wall clock at
/// construction, so wall-clock steps never reorder or strand log entries.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    registry: Mutex<Registry>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

impl SlidingWindowRateLimiter {
    /// Create a new limiter with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time on the limiter's monotonic clock
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.started.elapsed()).unwrap_or_else(|_| Duration::zero());
        self.started_at + elapsed
    }

    /// Check a request against `policy` at the current time.
    ///
    /// The clock is read while holding the registry lock so entries are
    /// appended in timestamp order.
    pub fn check(&self, key: &str, policy: &Policy) -> RateLimitResult {
        let mut registry = self.lock();
        let now = self.now();
        let result = admit(&mut registry, key, policy, now);
        drop(registry);

        trace_result(key, &result);
        result
    }

    /// Check if a request is allowed at `now` and record it when it is.
    ///
    /// `now` must be non-decreasing across calls; earlier values can prune the
    /// wrong entries. Rejected requests are never recorded.
    pub fn check_and_record(&self, key: &str, policy: &Policy, now: DateTime<Utc>) -> RateLimitResult {
        let result = admit(&mut self.lock(), key, policy, now);

        trace_result(key, &result);
        result
    }

    /// Evict entries older than `staleness` and drop keys left with nothing.
    ///
    /// Returns the number of keys removed from the registry.
    pub fn sweep(&self, now: DateTime<Utc>, staleness: Duration) -> usize {
        evict_stale(&mut self.lock(), now, staleness)
    }

    /// Sweep at the current time, read under the registry lock
    pub fn sweep_stale(&self, staleness: Duration) -> usize {
        let mut registry = self.lock();
        let now = self.now();
        evict_stale(&mut registry, now, staleness)
    }

    /// Number of keys currently held in the registry
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Number of recorded entries for a key, stale ones included
    pub fn entry_count(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, VecDeque::len)
    }

    // Every mutation leaves the registry consistent, so a panic elsewhere while
    // holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn admit(registry: &mut Registry, key: &str, policy: &Policy, now: DateTime<Utc>) -> RateLimitResult {
    let limit = policy.max_requests();
    let window = policy.window();

    let log = registry.entry(key.to_string()).or_default();

        prune(log, now, window);

    let current = log.len() as u64;
    if current >= limit {
        // The oldest surviving entry is the next one to leave the window
        let reset = log.front().map_or(now, |oldest| *oldest) + window;
        RateLimitResult {
            allowed: false,
            limit,
            remaining: 0,
            reset,
            current,
            retry_after: Some(policy.window_std()),
        }
    } else {
        log.push_back(now);
        let current = current + 1;
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit - current,
            reset: now + window,
            current,
            retry_after: None,
        }
    }
}

fn evict_stale(registry: &mut Registry, now: DateTime<Utc>, staleness: Duration) -> usize {
    let before = registry.len();

    registry.retain(|_, log| {
        prune(log, now, staleness);
        !log.is_empty()
    });

    before - registry.len()
}

fn trace_result(key: &str, result: &RateLimitResult) {
    tracing::trace!(
        key = %key,
        allowed = result.allowed,
        current = result.current,
        remaining = result.remaining,
        "Rate limit check result"
    );
}

/// Drop entries strictly older than `window` relative to `now`
fn prune(log: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
    while let Some(oldest) = log.front() {
        if now - *oldest > window {
            log.pop_front();
        } else {
            break;
        }
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// The rate limit (max requests)
    pub limit: u64,
    /// Number of requests remaining in the current window
    pub remaining: u64,
    /// When the current window frees up a slot
    pub reset: DateTime<Utc>,
    /// Number of requests in the window, this one included when admitted
    pub current: u64,
    /// How long a rejected caller should wait; always the policy window
    pub retry_after: Option<std::time::Duration>,
}

impl RateLimitResult {
    /// Seconds until retry, rounded up; only set when the request was rejected
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|d| {
            let secs = d.as_secs();
            if d.subsec_nanos() > 0 {
                secs + 1
            } else {
                secs
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn policy(max: u64, window_secs: u64) -> Policy {
        Policy::new(max, std::time::Duration::from_secs(window_secs)).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_admits_under_capacity_with_decreasing_remaining() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(5, 60);

        for (i, expected) in (0..5u64).rev().enumerate() {
            let result = limiter.check_and_record("10.0.0.1", &policy, at(i as i64));
            assert!(result.allowed, "Request {} should be allowed", i + 1);
            assert_eq!(result.remaining, expected);
            assert_eq!(result.limit, 5);
            assert_eq!(result.current, i as u64 + 1);
            assert_eq!(result.reset, at(i as i64) + Duration::seconds(60));
            assert!(result.retry_after.is_none());
        }
    }

    #[test]
    fn test_rejects_over_capacity_without_recording() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(3, 60);

        for i in 0..3 {
            assert!(limiter.check_and_record("k", &policy, at(i)).allowed);
        }

        let rejected = limiter.check_and_record("k", &policy, at(5));
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.current, 3);
        assert_eq!(rejected.retry_after, Some(std::time::Duration::from_secs(60)));
        assert_eq!(rejected.retry_after_secs(), Some(60));
        // Oldest entry at t=0 frees up at t=60
        assert_eq!(rejected.reset, at(60));

        let again = limiter.check_and_record("k", &policy, at(5));
        assert!(!again.allowed);
        assert_eq!(again.remaining, 0);
        assert_eq!(limiter.entry_count("k"), 3);
    }

    #[test]
    fn test_window_expiry_admits_again() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(2, 10);

        assert!(limiter.check_and_record("k", &policy, at(0)).allowed);
        assert!(limiter.check_and_record("k", &policy, at(1)).allowed);
        assert!(!limiter.check_and_record("k", &policy, at(9)).allowed);

        // Exactly one window after the first entry it is still counted
        assert!(!limiter.check_and_record("k", &policy, at(10)).allowed);

        let result = limiter.check_and_record("k", &policy, at(11));
        assert!(result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(limiter.entry_count("k"), 2);
    }

    #[test]
    fn test_keys_are_isolated() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(2, 60);

        assert!(limiter.check_and_record("a", &policy, at(0)).allowed);
        assert!(limiter.check_and_record("a", &policy, at(1)).allowed);
        assert!(!limiter.check_and_record("a", &policy, at(2)).allowed);

        let other = limiter.check_and_record("b", &policy, at(2));
        assert!(other.allowed);
        assert_eq!(other.remaining, 1);
    }

    #[test]
    fn test_policies_share_one_timeline_per_key() {
        let limiter = SlidingWindowRateLimiter::new();
        let loose = policy(10, 60);
        let strict = policy(2, 60);

        assert!(limiter.check_and_record("k", &loose, at(0)).allowed);
        assert!(limiter.check_and_record("k", &loose, at(1)).allowed);

        // Entries recorded under the loose policy count against the strict one
        assert!(!limiter.check_and_record("k", &strict, at(2)).allowed);
        assert_eq!(limiter.check_and_record("k", &loose, at(3)).remaining, 7);
    }

    #[test]
    fn test_single_request_per_window() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(1, 5);

        assert!(limiter.check_and_record("k", &policy, at(0)).allowed);
        assert!(!limiter.check_and_record("k", &policy, at(3)).allowed);
        assert!(limiter.check_and_record("k", &policy, at(6)).allowed);
    }

    #[test]
    fn test_concurrent_same_key_admits_exactly_limit() {
        const LIMIT: u64 = 20;
        const EXTRA: usize = 15;

        let limiter = Arc::new(SlidingWindowRateLimiter::new());
        let policy = policy(LIMIT, 60);
        let barrier = Arc::new(Barrier::new(LIMIT as usize + EXTRA));
        let now = Utc::now();

        let handles: Vec<_> = (0..LIMIT as usize + EXTRA)
            .map(|_| {
                let limiter = limiter.clone();
                let policy = policy.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    limiter.check_and_record("shared", &policy, now).allowed
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(admitted, LIMIT as usize);
        assert_eq!(limiter.entry_count("shared"), LIMIT as usize);
    }

    #[test]
    fn test_sweep_removes_stale_keys() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(5, 60);

        limiter.check_and_record("old", &policy, at(0));
        limiter.check_and_record("fresh", &policy, at(3560));
        limiter.check_and_record("fresh", &policy, at(3590));
        assert_eq!(limiter.tracked_keys(), 2);

        let evicted = limiter.sweep(at(3700), Duration::hours(1));
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.entry_count("old"), 0);
        assert_eq!(limiter.entry_count("fresh"), 2);

        let evicted = limiter.sweep(at(7300), Duration::hours(1));
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let limiter = SlidingWindowRateLimiter::new();

        let mut previous = limiter.now();
        for _ in 0..1000 {
            let now = limiter.now();
            assert!(now >= previous);
            previous = now;
        }
    }

    #[test]
    fn test_concurrent_checks_keep_log_sorted() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 200;

        let limiter = Arc::new(SlidingWindowRateLimiter::new());
        let policy = policy((THREADS * PER_THREAD) as u64, 3600);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let limiter = limiter.clone();
                let policy = policy.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..PER_THREAD {
                        assert!(limiter.check("shared", &policy).allowed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let registry = limiter.lock();
        let log = &registry["shared"];
        assert_eq!(log.len(), THREADS * PER_THREAD);
        assert!(log.iter().zip(log.iter().skip(1)).all(|(a, b)| a <= b));
    }

    #[test]
    fn test_sweep_stale_uses_limiter_clock() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(5, 60);

        limiter.check_and_record("old", &policy, limiter.now() - Duration::hours(2));
        assert!(limiter.check("live", &policy).allowed);

        assert_eq!(limiter.sweep_stale(Duration::hours(1)), 1);
        assert_eq!(limiter.entry_count("old"), 0);
        assert_eq!(limiter.entry_count("live"), 1);
    }

    #[test]
    fn test_scenario_three_per_minute() {
        let limiter = SlidingWindowRateLimiter::new();
        let policy = policy(3, 60);
        let key = "10.0.0.1";

        let remaining: Vec<u64> = [0, 10, 20]
            .iter()
            .map(|t| {
                let result = limiter.check_and_record(key, &policy, at(*t));
                assert!(result.allowed);
                result.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let rejected = limiter.check_and_record(key, &policy, at(30));
        assert!(!rejected.allowed);
        assert_eq!(rejected.retry_after_secs(), Some(60));

        let result = limiter.check_and_record(key, &policy, at(65));
        assert!(result.allowed);
        assert_eq!(result.remaining, 0);
    }
}
