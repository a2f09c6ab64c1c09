//! Bounded, time-limited cache of road query results.
//!
//! Eviction is least-recently-used: a successful lookup refreshes an entry's
//! position. Entries older than the TTL are treated as absent and dropped on
//! access. Time comes from an injectable [`Clock`] so expiry is testable
//! without sleeping.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use super::RoadFetchOptions;
use crate::feature::RoadFeature;

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Canonical cache key for a road query.
///
/// Target order and duplicates do not matter: `{A, B}` and `{B, A, A}` with
/// the same class flags produce equal signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoadQuerySignature(String);

impl RoadQuerySignature {
    pub fn new<'a>(targets: impl IntoIterator<Item = &'a str>, options: RoadFetchOptions) -> Self {
        let mut ids: Vec<&str> = targets.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self(format!(
            "{}#f{}r{}",
            ids.join("|"),
            u8::from(options.federal),
            u8::from(options.regional)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoadQuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Entry {
    roads: Arc<Vec<RoadFeature>>,
    stored_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<RoadQuerySignature, Entry>,
    /// Least recently used at the front.
    order: VecDeque<RoadQuerySignature>,
}

impl Inner {
    /// Linear in the number of entries; capacities stay in the tens.
    fn touch(&mut self, key: &RoadQuerySignature) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &RoadQuerySignature) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoadCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// LRU + TTL cache of de-duplicated road lists.
pub struct RoadQueryCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl RoadQueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &RoadQuerySignature) -> Option<Arc<Vec<RoadFeature>>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let lookup = inner
            .entries
            .get(key)
            .map(|entry| (entry.roads.clone(), now.duration_since(entry.stored_at) < self.ttl));

        let fresh = match lookup {
            Some((roads, true)) => Some(roads),
            Some((_, false)) => {
                inner.remove(key);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Road cache entry expired");
                None
            }
            None => None,
        };

        match fresh {
            Some(roads) => {
                inner.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(roads)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: RoadQuerySignature, roads: Arc<Vec<RoadFeature>>) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&key) {
            inner.touch(&key);
        } else {
            inner.order.push_back(key.clone());
        }
        inner.entries.insert(key, Entry { roads, stored_at: now });

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(key = %oldest, "Road cache entry evicted");
        }
    }

    /// Drops one entry. Returns `true` when it was present.
    pub fn remove(&self, key: &RoadQuerySignature) -> bool {
        let mut inner = self.inner.lock();
        let present = inner.entries.contains_key(key);
        inner.remove(key);
        present
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> RoadCacheStats {
        RoadCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}
