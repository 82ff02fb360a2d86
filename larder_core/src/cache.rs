//! In-process response cache with per-entry TTL.
//!
//! Expiry is checked lazily on every read and eagerly by a periodic sweep.
//! The clock is injected so expiry can be driven deterministically in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time via [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
        self.origin + offset
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

/// Key → value store with per-entry expiry.
///
/// Keys are independent: each read or write takes the lock for one
/// operation, so a write is never observed half-applied. A poisoned lock is
/// treated as an empty cache rather than an error.
pub struct ResponseCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
}

impl<V: Clone + Send + 'static> ResponseCache<V> {
    pub fn new(clock: Arc<dyn Clock>, sweep_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            sweep_interval,
        }
    }

    /// A cache on the system clock.
    pub fn with_system_clock(sweep_interval: Duration) -> Self {
        Self::new(Arc::new(SystemClock), sweep_interval)
    }

    /// Look up `key`, dropping the entry if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().ok()?;

        let expired = entries.get(key)?.is_expired(now);
        if expired {
            entries.remove(key);
            debug!(target: "larder.cache", key, "expired");
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value` under `key`. Last write wins.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let stored_at = self.clock.now();
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(
                    key.into(),
                    Entry {
                        value,
                        stored_at,
                        ttl,
                    },
                );
            }
            Err(_) => warn!(target: "larder.cache", "cache lock poisoned; dropping write"),
        }
    }

    /// Remove `key`. Returns whether an entry (live or expired) was present.
    pub fn delete(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(target: "larder.cache", removed, remaining = entries.len(), "swept expired entries");
        }
        removed
    }

    /// Number of stored entries, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Spawn the periodic sweeper on the current tokio runtime.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.sweep_interval.max(Duration::from_millis(10));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(cache) => {
                        cache.sweep();
                    }
                    None => break,
                }
            }
        })
    }
}
