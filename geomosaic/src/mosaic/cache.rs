//! In-memory raster tile cache using moka.
//!
//! Keys are fully-resolved tile URLs, so tiles from different styles and
//! zoom levels never collide. Entries are weighted by their encoded size
//! and evicted least-recently-used once the byte budget is exceeded.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use moka::future::Cache;

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub size_bytes: u64,
}

/// Encoded tile bytes keyed by URL.
pub struct TileCache {
    cache: Cache<String, Bytes>,
    max_size_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TileCache {
    /// Create a cache holding at most `max_size_bytes` of encoded tiles.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            // moka uses u32 for weights, cap at u32::MAX for very large entries
            .weigher(|_key: &String, value: &Bytes| -> u32 { value.len().min(u32::MAX as usize) as u32 })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, url: &str) -> Option<Bytes> {
        let found = self.cache.get(url).await;
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub async fn insert(&self, url: String, data: Bytes) {
        self.cache.insert(url, data).await;
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Flushes pending evictions so that counts are exact.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
            size_bytes: self.cache.weighted_size(),
        }
    }
}
