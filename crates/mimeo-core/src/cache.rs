//! Per-area entry cache.
//!
//! Memoizes media type lookups with LRU eviction. Lookups compute outside
//! the lock, so two threads missing on the same key may both compute; the
//! stored value is the same either way.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::entry::MimeEntry;
use crate::media_type::MediaType;

/// Entries kept per area unless configured otherwise.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Maximum number of cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCapacity {
    Bounded(NonZeroUsize),
    Unbounded,
}

impl CacheCapacity {
    /// `0` means unbounded.
    pub fn from_count(count: usize) -> Self {
        NonZeroUsize::new(count).map_or(CacheCapacity::Unbounded, CacheCapacity::Bounded)
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            CacheCapacity::Bounded(n) => Some(n.get()),
            CacheCapacity::Unbounded => None,
        }
    }
}

impl Default for CacheCapacity {
    fn default() -> Self {
        CacheCapacity::from_count(DEFAULT_CACHE_CAPACITY)
    }
}

/// Hit and miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct Inner {
    lru: LruCache<MediaType, Arc<MimeEntry>>,
    capacity: CacheCapacity,
    stats: CacheStats,
}

pub struct EntryCache {
    inner: Mutex<Inner>,
}

impl EntryCache {
    pub fn new(capacity: CacheCapacity) -> Self {
        let lru = match capacity {
            CacheCapacity::Bounded(n) => LruCache::new(n),
            CacheCapacity::Unbounded => LruCache::unbounded(),
        };
        Self {
            inner: Mutex::new(Inner {
                lru,
                capacity,
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &MediaType) -> Option<Arc<MimeEntry>> {
        let mut inner = self.lock();
        let hit = inner.lru.get(key).cloned();
        match hit {
            Some(_) => inner.stats.hits += 1,
            None => inner.stats.misses += 1,
        }
        hit
    }

    pub fn insert(&self, key: MediaType, entry: Arc<MimeEntry>) {
        self.lock().lru.put(key, entry);
    }

    /// Cached value for `key`, or the result of `compute` (stored when
    /// `Some`). `compute` runs without the lock held.
    pub fn get_or_insert_with<F>(&self, key: MediaType, compute: F) -> Option<Arc<MimeEntry>>
    where
        F: FnOnce() -> Option<Arc<MimeEntry>>,
    {
        if let Some(hit) = self.get(&key) {
            return Some(hit);
        }
        let entry = compute()?;
        self.insert(key, Arc::clone(&entry));
        Some(entry)
    }

    pub fn contains(&self, key: &MediaType) -> bool {
        self.lock().lru.contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> CacheCapacity {
        self.lock().capacity
    }

    /// Change the limit, evicting least recently used entries as needed.
    pub fn set_capacity(&self, capacity: CacheCapacity) {
        let mut inner = self.lock();
        let limit = match capacity {
            CacheCapacity::Bounded(n) => n,
            CacheCapacity::Unbounded => NonZeroUsize::MAX,
        };
        inner.lru.resize(limit);
        inner.capacity = capacity;
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.lru.clear();
        inner.stats = CacheStats::default();
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new(CacheCapacity::default())
    }
}

impl std::fmt::Debug for EntryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("EntryCache")
            .field("len", &inner.lru.len())
            .field("capacity", &inner.capacity)
            .field("stats", &inner.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(text: &str) -> MediaType {
        MediaType::parse(text).unwrap()
    }

    fn entry(text: &str) -> Arc<MimeEntry> {
        Arc::new(MimeEntry::new(mt(text)))
    }

    fn bounded(n: usize) -> CacheCapacity {
        CacheCapacity::from_count(n)
    }

    #[test]
    fn test_zero_means_unbounded() {
        assert_eq!(CacheCapacity::from_count(0), CacheCapacity::Unbounded);
        assert_eq!(CacheCapacity::from_count(3).limit(), Some(3));
        assert_eq!(CacheCapacity::Unbounded.limit(), None);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EntryCache::new(bounded(2));
        cache.insert(mt("text/a"), entry("text/a"));
        cache.insert(mt("text/b"), entry("text/b"));
        assert!(cache.get(&mt("text/a")).is_some());
        cache.insert(mt("text/c"), entry("text/c"));
        assert!(cache.contains(&mt("text/a")));
        assert!(!cache.contains(&mt("text/b")));
        assert!(cache.contains(&mt("text/c")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let cache = EntryCache::new(CacheCapacity::Unbounded);
        for i in 0..2000 {
            let text = format!("application/x-t{i}");
            cache.insert(mt(&text), entry(&text));
        }
        assert_eq!(cache.len(), 2000);
    }

    #[test]
    fn test_shrinking_evicts() {
        let cache = EntryCache::new(CacheCapacity::Unbounded);
        for text in ["text/a", "text/b", "text/c"] {
            cache.insert(mt(text), entry(text));
        }
        cache.set_capacity(bounded(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&mt("text/c")));
        assert_eq!(cache.capacity(), bounded(1));
    }

    #[test]
    fn test_get_or_insert_with_only_stores_hits() {
        let cache = EntryCache::default();
        assert!(cache.get_or_insert_with(mt("text/x-missing"), || None).is_none());
        assert!(cache.is_empty());

        let first = cache
            .get_or_insert_with(mt("text/plain"), || Some(entry("text/plain")))
            .unwrap();
        let second = cache
            .get_or_insert_with(mt("text/plain"), || panic!("should be cached"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = EntryCache::default();
        cache.insert(mt("text/plain"), entry("text/plain"));
        cache.get(&mt("text/plain"));
        cache.get(&mt("text/html"));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
