use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{CacheEntry, CacheKey, InvalidationEvent, Result};

/// Storage for memoized entries and their tag index.
///
/// Implementations keep entries and the tag index consistent: a key listed
/// under a tag always has a live entry, and removing an entry for any reason
/// removes it from every tag it carries.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a live entry. Expired entries are removed and reported as missing.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Stores an entry, replacing any previous entry under the same key,
    /// and registers its key under each of its tags.
    async fn set(&self, entry: CacheEntry) -> Result<()>;

    /// Deletes an entry by key.
    async fn delete(&self, key: &CacheKey) -> Result<()>;

    /// Evicts every entry registered under any of `tags` and drops the tag
    /// buckets. Unknown tags are ignored. Returns the number of evicted entries.
    async fn invalidate_tags(&self, tags: &[String]) -> Result<usize>;

    /// Lists the keys currently registered under `tag`.
    async fn tag_members(&self, tag: &str) -> Result<Vec<CacheKey>>;

    /// Evicts every entry and tag bucket.
    async fn clear(&self) -> Result<()>;
}

/// Trait for broadcasting tag invalidations between cache instances.
#[async_trait]
pub trait CachePubSub: Send + Sync {
    /// Publishes an invalidation to subscribers.
    async fn publish(&self, event: &InvalidationEvent) -> Result<()>;

    /// Subscribes to invalidations.
    async fn subscribe(&self) -> Result<broadcast::Receiver<InvalidationEvent>>;
}
