//! Sliding-window request rate limiting.
//!
//! Bounds call frequency per identity. The counter store is injected through
//! the [`RateStore`] trait rather than living in a module-level singleton, so
//! hosts can plug in a shared cache while tests and the default deployment
//! use the bounded in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Backing store for per-identity request timestamps.
pub trait RateStore: Send + Sync {
    /// Record an attempt for `identity` at `now`; returns true when the
    /// attempt is within `limit` calls per `window`.
    fn try_record(&self, identity: &str, now: Instant, window: Duration, limit: usize) -> bool;
}

/// Bounded in-memory store. When the identity map grows past its cap, stale
/// identities (no call within the window) are evicted.
pub struct InMemoryRateStore {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
    max_identities: usize,
}

impl InMemoryRateStore {
    pub fn new(max_identities: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_identities,
        }
    }
}

impl Default for InMemoryRateStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl RateStore for InMemoryRateStore {
    fn try_record(&self, identity: &str, now: Instant, window: Duration, limit: usize) -> bool {
        let mut entries = self.entries.lock().expect("rate store poisoned");

        if entries.len() >= self.max_identities && !entries.contains_key(identity) {
            entries.retain(|_, stamps| {
                stamps.last().is_some_and(|last| now.duration_since(*last) < window)
            });
        }

        let stamps = entries.entry(identity.to_string()).or_default();
        stamps.retain(|t| now.duration_since(*t) < window);
        if stamps.len() >= limit {
            return false;
        }
        stamps.push(now);
        true
    }
}

/// Sliding-window limiter: at most `limit` calls per `window` per identity.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateStore>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self::with_store(Arc::new(InMemoryRateStore::default()), limit, window)
    }

    pub fn with_store(store: Arc<dyn RateStore>, limit: usize, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    /// Returns true when the call is allowed (and counts it).
    pub fn check(&self, identity: &str) -> bool {
        let allowed = self
            .store
            .try_record(identity, Instant::now(), self.window, self.limit);
        if !allowed {
            log::debug!("rate limit exceeded for identity {}", identity);
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_denies() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("alice"));
        assert!(limiter.check("alice"));
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        // Other identities are unaffected.
        assert!(limiter.check("bob"));
    }

    #[test]
    fn window_expiry_frees_capacity() {
        let limiter = RateLimiter::new(1, Duration::from_millis(30));
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.check("alice"));
    }

    #[test]
    fn stale_identities_are_evicted_at_capacity() {
        let store = InMemoryRateStore::new(2);
        let window = Duration::from_millis(20);
        let t0 = Instant::now();
        assert!(store.try_record("a", t0, window, 5));
        assert!(store.try_record("b", t0, window, 5));
        std::thread::sleep(Duration::from_millis(30));
        // Map is at capacity but both entries are stale; the new identity
        // triggers eviction and is admitted.
        assert!(store.try_record("c", Instant::now(), window, 5));
        assert!(store.entries.lock().unwrap().len() <= 2);
    }

    #[test]
    fn injected_store_is_consulted() {
        struct DenyAll;
        impl RateStore for DenyAll {
            fn try_record(&self, _: &str, _: Instant, _: Duration, _: usize) -> bool {
                false
            }
        }
        let limiter = RateLimiter::with_store(Arc::new(DenyAll), 100, Duration::from_secs(1));
        assert!(!limiter.check("anyone"));
    }
}
