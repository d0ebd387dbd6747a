//! In-memory cache implementation with LRU eviction and a tag index.
//!
//! Entries and the tag index live behind a single lock so that every
//! mutation (fill, overwrite, expiry, LRU eviction, tag invalidation) keeps
//! both consistent:
//! - Every key listed under a tag has a live entry
//! - Removing an entry removes it from every tag bucket it appears in
//! - Empty tag buckets are dropped

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use evently_core::cache::{normalize_tags, Cache, CacheEntry, CacheKey, Result};

/// Entries plus the tag index that points into them.
#[derive(Debug)]
struct State {
    entries: LruCache<CacheKey, CacheEntry>,
    /// Maps tag -> set of cache keys.
    tags: HashMap<String, HashSet<CacheKey>>,
}

impl State {
    /// Removes `entry`'s key from each of its tag buckets.
    fn unindex(&mut self, entry: &CacheEntry) {
        for tag in &entry.tags {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(&entry.key);
                // Clean up empty tag buckets
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
    }

    fn index(&mut self, entry: &CacheEntry) {
        for tag in &entry.tags {
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(entry.key.clone());
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.unindex(&entry);
        Some(entry)
    }
}

/// In-memory cache implementation with LRU eviction.
///
/// Thread-safe cache using `Arc<RwLock<_>>` for concurrent access.
/// Supports TTL with lazy expiration (entries are removed on access).
/// Uses LRU eviction to limit memory usage when max_entries is reached.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    state: Arc<RwLock<State>>,
}

impl MemoryCache {
    /// Creates a new in-memory cache with LRU eviction.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Maximum number of entries before LRU eviction kicks in.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).expect("max_entries must be > 0");
        Self {
            state: Arc::new(RwLock::new(State {
                entries: LruCache::new(capacity),
                tags: HashMap::new(),
            })),
        }
    }

    /// Returns the number of live entries (expired ones included until touched).
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        // Write lock: LRU lookups update recency, expiry removes the entry.
        let mut state = self.state.write().await;

        match state.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.clone())),
            Some(_) => {}
        }

        state.remove(key);
        tracing::trace!(key = %key, "Expired cache entry removed");
        Ok(None)
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let mut state = self.state.write().await;

        // Drop the previous entry's tag memberships before replacing it
        state.remove(&entry.key);
        state.index(&entry);

        // `push` hands back the least recently used entry when at capacity
        if let Some((evicted_key, evicted)) = state.entries.push(entry.key.clone(), entry) {
            state.unindex(&evicted);
            tracing::trace!(key = %evicted_key, "Cache entry evicted (LRU)");
        }

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        self.state.write().await.remove(key);
        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[String]) -> Result<usize> {
        let tags = normalize_tags(tags);
        let mut state = self.state.write().await;
        let mut evicted = 0;

        for tag in &tags {
            let Some(keys) = state.tags.remove(tag) else {
                continue;
            };
            for key in keys {
                if state.remove(&key).is_some() {
                    evicted += 1;
                }
            }
        }

        Ok(evicted)
    }

    async fn tag_members(&self, tag: &str) -> Result<Vec<CacheKey>> {
        let state = self.state.read().await;
        let mut keys: Vec<CacheKey> = state
            .tags
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.tags.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Default max entries for tests
    const TEST_MAX_ENTRIES: usize = 1000;

    fn key(name: &str) -> CacheKey {
        CacheKey::from_raw(name)
    }

    fn entry(name: &str, value: &[u8], tags: &[&str]) -> CacheEntry {
        CacheEntry::new(key(name), value.to_vec()).with_tags(tags.iter().copied())
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    /// Asserts the tag index only points at live entries.
    async fn assert_index_consistent(cache: &MemoryCache) {
        let state = cache.state.read().await;
        for (tag, keys) in &state.tags {
            assert!(!keys.is_empty(), "empty bucket left for tag {tag}");
            for key in keys {
                let entry = state.entries.peek(key).expect("dangling key in tag index");
                assert!(entry.tags.contains(tag));
            }
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache.set(entry("test:key", b"test value", &[])).await.unwrap();
        let result = cache.get(&key("test:key")).await.unwrap().unwrap();

        assert_eq!(result.value, b"test value".to_vec());
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        assert!(cache.get(&key("nonexistent:key")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_from_tags() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set(entry("k1", b"1", &["events"])).await.unwrap();

        cache.delete(&key("k1")).await.unwrap();

        assert!(cache.get(&key("k1")).await.unwrap().is_none());
        assert!(cache.tag_members("events").await.unwrap().is_empty());
        assert_index_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let short_lived = entry("test:ttl", b"short-lived", &["events"])
            .with_ttl(Duration::from_millis(50));
        cache.set(short_lived).await.unwrap();

        // Should exist immediately
        assert!(cache.get(&key("test:ttl")).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Expired entries are gone, including from the tag index
        assert!(cache.get(&key("test:ttl")).await.unwrap().is_none());
        assert!(cache.tag_members("events").await.unwrap().is_empty());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_tag() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set(entry("k1", b"1", &["events"])).await.unwrap();
        cache.set(entry("k2", b"2", &["events"])).await.unwrap();
        cache.set(entry("k3", b"3", &["dashboard:events"])).await.unwrap();

        let evicted = cache.invalidate_tags(&tags(&["events"])).await.unwrap();

        assert_eq!(evicted, 2);
        assert!(cache.get(&key("k1")).await.unwrap().is_none());
        assert!(cache.get(&key("k2")).await.unwrap().is_none());
        assert!(cache.get(&key("k3")).await.unwrap().is_some());
        assert_index_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry_from_other_tags() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set(entry("k1", b"1", &["event", "e1"])).await.unwrap();
        cache.set(entry("k2", b"2", &["event", "e2"])).await.unwrap();

        cache.invalidate_tags(&tags(&["e1"])).await.unwrap();

        assert_eq!(cache.tag_members("event").await.unwrap(), vec![key("k2")]);
        assert!(cache.tag_members("e1").await.unwrap().is_empty());
        assert_index_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_invalidate_unknown_and_duplicate_tags() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set(entry("k1", b"1", &["events"])).await.unwrap();

        assert_eq!(cache.invalidate_tags(&tags(&["nope"])).await.unwrap(), 0);
        assert_eq!(
            cache
                .invalidate_tags(&tags(&["events", "events"]))
                .await
                .unwrap(),
            1
        );
        assert_eq!(cache.invalidate_tags(&tags(&["events"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_reindexes_tags() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set(entry("k1", b"first", &["old"])).await.unwrap();
        cache.set(entry("k1", b"second", &["new"])).await.unwrap();

        let result = cache.get(&key("k1")).await.unwrap().unwrap();
        assert_eq!(result.value, b"second".to_vec());
        assert!(cache.tag_members("old").await.unwrap().is_empty());
        assert_eq!(cache.tag_members("new").await.unwrap(), vec![key("k1")]);
        assert_index_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_lru_eviction_unindexes() {
        // Create a cache with only 3 entries max
        let cache = MemoryCache::new(3);

        cache.set(entry("key1", b"value1", &["t"])).await.unwrap();
        cache.set(entry("key2", b"value2", &["t"])).await.unwrap();
        cache.set(entry("key3", b"value3", &["t"])).await.unwrap();

        // Access key1 to make it recently used
        cache.get(&key("key1")).await.unwrap();

        // Insert a 4th entry - should evict key2 (least recently used)
        cache.set(entry("key4", b"value4", &["t"])).await.unwrap();

        assert!(cache.get(&key("key1")).await.unwrap().is_some());
        assert!(cache.get(&key("key2")).await.unwrap().is_none());
        assert!(cache.get(&key("key3")).await.unwrap().is_some());
        assert!(cache.get(&key("key4")).await.unwrap().is_some());

        assert_eq!(
            cache.tag_members("t").await.unwrap(),
            vec![key("key1"), key("key3"), key("key4")]
        );
        assert_index_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_concurrent_fills_and_invalidations_keep_index_consistent() {
        let cache = MemoryCache::new(64);
        let mut handles = Vec::new();

        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("k{i}");
                let tag = if i % 2 == 0 { "even" } else { "odd" };
                cache.set(entry(&name, b"v", &[tag, "all"])).await.unwrap();
                if i % 5 == 0 {
                    cache.invalidate_tags(&tags(&[tag])).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_index_consistent(&cache).await;
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set(entry("k1", b"1", &["events"])).await.unwrap();

        cache.clear().await.unwrap();

        assert!(cache.is_empty().await);
        assert!(cache.tag_members("events").await.unwrap().is_empty());
    }

    #[tokio::test]
    #[should_panic(expected = "max_entries must be > 0")]
    async fn test_zero_max_entries_panics() {
        let _ = MemoryCache::new(0);
    }
}
