//! Byte-bounded LRU cache for record payloads
//!
//! Entries are evicted least-recently-used first until the aggregate payload
//! size fits `max_bytes`. Payloads larger than the whole budget are never
//! cached, and a budget of zero disables caching entirely.

use lru::LruCache;
use std::sync::Arc;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Aggregate payload size in bytes
    pub bytes: u64,
    /// Budget in bytes
    pub max_bytes: u64,
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// LRU cache of canonical key -> payload
pub struct RecordCache {
    cache: LruCache<String, Arc<Vec<u8>>>,
    bytes: u64,
    max_bytes: u64,
    hits: u64,
    misses: u64,
}

impl RecordCache {
    /// Create a cache holding at most `max_bytes` of payload
    pub fn new(max_bytes: u64) -> Self {
        RecordCache {
            cache: LruCache::unbounded(),
            bytes: 0,
            max_bytes,
            hits: 0,
            misses: 0,
        }
    }

    /// Get a cached payload, marking it most recently used
    pub fn get(&mut self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self.cache.get(key) {
            Some(data) => {
                self.hits += 1;
                Some(Arc::clone(data))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    /// Cache a payload; returns false if it doesn't fit the budget
    pub fn put(&mut self, key: &str, data: Arc<Vec<u8>>) -> bool {
        let size = data.len() as u64;
        if size > self.max_bytes {
            self.remove(key);
            return false;
        }

        self.remove(key);
        while self.bytes + size > self.max_bytes {
            match self.cache.pop_lru() {
                Some((_, evicted)) => self.bytes -= evicted.len() as u64,
                None => break,
            }
        }

        self.bytes += size;
        self.cache.put(key.to_string(), data);
        true
    }

    /// Drop an entry
    pub fn remove(&mut self, key: &str) {
        if let Some(old) = self.cache.pop(key) {
            self.bytes -= old.len() as u64;
        }
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
        self.bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            bytes: self.bytes,
            max_bytes: self.max_bytes,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(n: usize) -> Arc<Vec<u8>> {
        Arc::new(vec![b'x'; n])
    }

    #[test]
    fn test_cache_basic() {
        let mut cache = RecordCache::new(100);

        assert!(cache.get("a").is_none());
        assert!(cache.put("a", payload(10)));
        assert_eq!(cache.get("a").unwrap().len(), 10);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.bytes, 10);
    }

    #[test]
    fn test_cache_lru_eviction_by_size() {
        let mut cache = RecordCache::new(30);

        cache.put("a", payload(10));
        cache.put("b", payload(10));
        cache.put("c", payload(10));
        cache.get("a"); // a is now most recent
        cache.put("d", payload(10)); // Should evict b

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
        assert_eq!(cache.stats().bytes, 30);
    }

    #[test]
    fn test_oversized_payload_not_cached() {
        let mut cache = RecordCache::new(8);
        cache.put("small", payload(4));

        assert!(!cache.put("big", payload(9)));
        assert!(!cache.contains("big"));
        assert!(cache.contains("small"));
    }

    #[test]
    fn test_zero_budget_disables_cache() {
        let mut cache = RecordCache::new(0);
        assert!(!cache.put("a", payload(1)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_updates_size() {
        let mut cache = RecordCache::new(100);
        cache.put("a", payload(40));
        cache.put("a", payload(5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().bytes, 5);

        cache.remove("a");
        assert_eq!(cache.stats().bytes, 0);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = RecordCache::new(100);
        cache.put("a", payload(1));
        cache.put("b", payload(1));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().bytes, 0);
    }
}
