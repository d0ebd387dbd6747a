//! Memoization service.
//!
//! [`MemoCache`] owns the cache backends, the invalidation bus and the tag
//! generation counters. [`MemoCache::memoize`] wraps an async producer into a
//! [`Memoized`] function that:
//! - Serves live entries without invoking the producer
//! - Runs at most one producer invocation per key at a time, sharing its
//!   result (or failure) with every concurrent caller
//! - Stores successful results under the call's tags, unless one of those
//!   tags was invalidated while the producer was running
//!
//! Backend failures never fail a call: they are logged and the call behaves
//! as a miss.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use evently_core::cache::{
    derive_key, deserialize_value, normalize_tags, serialize_value, Cache, CacheEntry,
    CachePubSub, CacheKey, InvalidationEvent, LogLabel, MemoError, MemoOptions, Result,
};

use super::generations::{GenerationSnapshot, TagGenerations};

/// Shared handle to the cache backends and the invalidation bus.
///
/// Cloning is cheap; every clone invalidates the same backends and shares
/// the same tag generations.
#[derive(Clone)]
pub struct MemoCache {
    memory: Arc<dyn Cache>,
    persistent: Option<Arc<dyn Cache>>,
    pubsub: Option<Arc<dyn CachePubSub>>,
    generations: Arc<TagGenerations>,
    instance_id: Uuid,
}

impl MemoCache {
    /// Creates a memo cache storing entries in `memory`.
    pub fn new(memory: Arc<dyn Cache>) -> Self {
        Self {
            memory,
            persistent: None,
            pubsub: None,
            generations: Arc::new(TagGenerations::new()),
            instance_id: Uuid::new_v4(),
        }
    }

    /// Sets the durable backend used by producers memoized with `persist`.
    pub fn with_persistent(mut self, persistent: Arc<dyn Cache>) -> Self {
        self.persistent = Some(persistent);
        self
    }

    /// Attaches the bus invalidations are published on.
    pub fn with_pubsub(mut self, pubsub: Arc<dyn CachePubSub>) -> Self {
        self.pubsub = Some(pubsub);
        self
    }

    /// Identity stamped on the invalidations this instance publishes.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Wraps `producer` so its results are cached under `producer_id`.
    pub fn memoize<A, T, E, F, Fut>(
        &self,
        producer_id: impl Into<String>,
        options: MemoOptions<A>,
        producer: F,
    ) -> Memoized<A, T, E>
    where
        A: Serialize + Send + 'static,
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let producer_id = producer_id.into();
        let logid = options.logid.clone().unwrap_or_else(|| producer_id.clone());

        let store = match (&self.persistent, options.persist) {
            (Some(persistent), true) => Arc::clone(persistent),
            (None, true) => {
                if !options.suppress_warnings {
                    tracing::warn!(
                        %logid,
                        "Persistence requested but no durable cache is configured, using memory"
                    );
                }
                Arc::clone(&self.memory)
            }
            (_, false) => Arc::clone(&self.memory),
        };

        Memoized {
            inner: Arc::new(Inner {
                producer_id,
                logid,
                producer: Box::new(move |args| producer(args).boxed()),
                options,
                store,
                generations: Arc::clone(&self.generations),
                in_flight: Mutex::new(HashMap::new()),
                next_fill_id: AtomicU64::new(0),
            }),
        }
    }

    /// Evicts every entry carrying any of `tags` from every backend and
    /// publishes the invalidation. Unknown tags are ignored.
    ///
    /// Once this returns, no fill that started before it can store a result
    /// under those tags.
    pub async fn invalidate<S: AsRef<str>>(&self, tags: &[S]) -> Result<usize> {
        let tags = normalize_tags(tags);
        if tags.is_empty() {
            return Ok(0);
        }

        let evicted = self
            .generations
            .invalidate_with(&tags, self.evict(&tags))
            .await?;
        tracing::debug!(?tags, evicted, "Tags invalidated");

        if let Some(pubsub) = &self.pubsub {
            let event = InvalidationEvent::new(self.instance_id, &tags);
            if let Err(err) = pubsub.publish(&event).await {
                tracing::warn!(?tags, error = %err, "Failed to publish invalidation");
            }
        }

        Ok(evicted)
    }

    /// Removes the tagged entries from every backend.
    ///
    /// If the durable backend cannot evict by tag it is cleared instead, so
    /// no entry carrying an invalidated tag survives there.
    async fn evict(&self, tags: &[String]) -> Result<usize> {
        let mut evicted = self.memory.invalidate_tags(tags).await?;
        if let Some(persistent) = &self.persistent {
            match persistent.invalidate_tags(tags).await {
                Ok(count) => evicted += count,
                Err(err) => {
                    tracing::warn!(?tags, error = %err, "Durable eviction failed, clearing durable cache");
                    persistent.clear().await?;
                }
            }
        }
        Ok(evicted)
    }

    async fn clear(&self) -> Result<()> {
        self.memory.clear().await?;
        if let Some(persistent) = &self.persistent {
            persistent.clear().await?;
        }
        Ok(())
    }

    /// Spawns the task applying invalidations published by other instances.
    ///
    /// Returns `None` when no bus is attached. If the task falls behind the
    /// bus it clears every backend, since the missed tags are unknown.
    pub async fn spawn_invalidation_listener(&self) -> Result<Option<JoinHandle<()>>> {
        let Some(pubsub) = &self.pubsub else {
            return Ok(None);
        };
        let mut receiver = pubsub.subscribe().await?;
        let cache = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.origin == cache.instance_id => {}
                    Ok(event) => {
                        let result = cache
                            .generations
                            .invalidate_with(&event.tags, cache.evict(&event.tags))
                            .await;
                        match result {
                            Ok(evicted) => tracing::debug!(
                                origin = %event.origin,
                                tags = ?event.tags,
                                evicted,
                                "Applied remote invalidation"
                            ),
                            Err(err) => tracing::warn!(
                                origin = %event.origin,
                                error = %err,
                                "Failed to apply remote invalidation"
                            ),
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Invalidation listener lagged, clearing cache");
                        if let Err(err) = cache.generations.invalidate_all_with(cache.clear()).await
                        {
                            tracing::warn!(error = %err, "Failed to clear cache");
                        }
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Invalidation bus closed");
                        break;
                    }
                }
            }
        });

        Ok(Some(handle))
    }
}

type Producer<A, T, E> =
    Box<dyn Fn(A) -> BoxFuture<'static, std::result::Result<T, E>> + Send + Sync>;
type Fill<T, E> = Shared<BoxFuture<'static, std::result::Result<T, MemoError<E>>>>;
type WeakFill<T, E> = WeakShared<BoxFuture<'static, std::result::Result<T, MemoError<E>>>>;

/// A fill currently running for a key.
struct InFlight<T, E> {
    id: u64,
    snapshot: GenerationSnapshot,
    /// Weak so that a fill whose callers all went away is dropped.
    fill: WeakFill<T, E>,
}

struct Inner<A, T, E> {
    producer_id: String,
    logid: String,
    producer: Producer<A, T, E>,
    options: MemoOptions<A>,
    store: Arc<dyn Cache>,
    generations: Arc<TagGenerations>,
    in_flight: Mutex<HashMap<CacheKey, InFlight<T, E>>>,
    next_fill_id: AtomicU64,
}

/// A producer wrapped by [`MemoCache::memoize`].
pub struct Memoized<A, T, E> {
    inner: Arc<Inner<A, T, E>>,
}

impl<A, T, E> Clone for Memoized<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, T, E> Memoized<A, T, E>
where
    A: Serialize + Send + 'static,
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Returns the cached result for `args`, invoking the producer on a miss.
    pub async fn call(&self, args: A) -> std::result::Result<T, MemoError<E>> {
        let inner = &self.inner;

        let key = match derive_key(&inner.producer_id, &args) {
            Ok(key) => key,
            Err(err) if inner.options.suppress_warnings => {
                tracing::trace!(logid = %inner.logid, error = %err, "Uncacheable call, bypassing cache");
                return (inner.producer)(args).await.map_err(MemoError::Producer);
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(value) = inner.lookup(&key).await {
            inner.log_lookup(&key, "hit");
            return Ok(value);
        }

        self.join_or_start(key, args).await
    }

    fn join_or_start(&self, key: CacheKey, args: A) -> Fill<T, E> {
        let inner = &self.inner;
        let mut in_flight = inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(running) = in_flight.get(&key) {
            if inner.generations.is_current(&running.snapshot) {
                if let Some(fill) = running.fill.upgrade() {
                    inner.log_join(&key);
                    return fill;
                }
            }
        }

        let tags = inner.options.tags_for(&args);
        let snapshot = inner.generations.snapshot(&tags);
        let id = inner.next_fill_id.fetch_add(1, Ordering::Relaxed);

        let fill = {
            let inner = Arc::clone(inner);
            let key = key.clone();
            let snapshot = snapshot.clone();
            async move {
                let result = inner.resolve(&key, args, tags, &snapshot).await;
                inner.finish(&key, id);
                result
            }
            .boxed()
            .shared()
        };

        if let Some(weak) = fill.downgrade() {
            in_flight.insert(
                key,
                InFlight {
                    id,
                    snapshot,
                    fill: weak,
                },
            );
        }

        fill
    }
}

impl<A, T, E> Inner<A, T, E>
where
    A: Serialize + Send + 'static,
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    async fn lookup(&self, key: &CacheKey) -> Option<T> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(err) => {
                if !self.options.suppress_warnings {
                    tracing::warn!(logid = %self.logid, %key, error = %err, "Cache read failed");
                }
                return None;
            }
        };

        match deserialize_value(&entry.value) {
            Ok(value) => Some(value),
            Err(err) => {
                if !self.options.suppress_warnings {
                    tracing::warn!(logid = %self.logid, %key, error = %err, "Cache entry deserialization failed");
                }
                None
            }
        }
    }

    async fn resolve(
        &self,
        key: &CacheKey,
        args: A,
        tags: BTreeSet<String>,
        snapshot: &GenerationSnapshot,
    ) -> std::result::Result<T, MemoError<E>> {
        // Another fill may have stored the value since our lookup
        if let Some(value) = self.lookup(key).await {
            self.log_lookup(key, "hit");
            return Ok(value);
        }
        self.log_lookup(key, "miss");

        let started = Instant::now();
        let value = (self.producer)(args).await.map_err(MemoError::Producer)?;

        let stored = self
            .generations
            .store_if_current(snapshot, self.store_value(key, &value, tags))
            .await;

        match stored {
            Some(()) if self.options.logs(LogLabel::Verbose) => tracing::debug!(
                logid = %self.logid,
                %key,
                elapsed = ?started.elapsed(),
                "Fill stored"
            ),
            Some(()) => {}
            None => tracing::debug!(
                logid = %self.logid,
                %key,
                "Tags invalidated during fill, result not stored"
            ),
        }

        Ok(value)
    }

    async fn store_value(&self, key: &CacheKey, value: &T, tags: BTreeSet<String>) {
        let bytes = match serialize_value(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                if !self.options.suppress_warnings {
                    tracing::warn!(logid = %self.logid, %key, error = %err, "Cache value serialization failed");
                }
                return;
            }
        };

        let mut entry = CacheEntry::new(key.clone(), bytes)
            .with_tags(tags)
            .with_labels(self.options.entry_labels());
        if let Some(ttl) = self.options.revalidate {
            entry = entry.with_ttl(ttl);
        }

        if let Err(err) = self.store.set(entry).await {
            if !self.options.suppress_warnings {
                tracing::warn!(logid = %self.logid, %key, error = %err, "Failed to cache value");
            }
        }
    }

    /// Forgets the in-flight record of fill `id`, unless a newer fill replaced it.
    fn finish(&self, key: &CacheKey, id: u64) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(key).is_some_and(|running| running.id == id) {
            in_flight.remove(key);
        }
    }

    fn log_lookup(&self, key: &CacheKey, outcome: &'static str) {
        if !self.options.logs(LogLabel::Datacache) {
            tracing::trace!(logid = %self.logid, %key, outcome, "Memoized lookup");
        } else if self.options.logs(LogLabel::Verbose) {
            tracing::debug!(logid = %self.logid, %key, outcome, "Memoized lookup");
        } else {
            tracing::debug!(logid = %self.logid, outcome, "Memoized lookup");
        }
    }

    fn log_join(&self, key: &CacheKey) {
        if self.options.logs(LogLabel::Dedupe) {
            tracing::debug!(logid = %self.logid, %key, "Joined in-flight fill");
        } else {
            tracing::trace!(logid = %self.logid, %key, "Joined in-flight fill");
        }
    }
}
