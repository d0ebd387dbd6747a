//! Per-tag invalidation counters.
//!
//! A fill snapshots the generations of its tags before invoking its producer
//! and may only store its result while those generations are unchanged.
//! Invalidation bumps the generations and evicts under an exclusive gate, so
//! a fill that raced an invalidation can never write its (possibly stale)
//! result after the invalidation returned.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{PoisonError, RwLock};

use tokio::sync::RwLock as TokioRwLock;

#[derive(Debug, Default)]
struct Counters {
    /// Bumped when every tag must be considered invalidated.
    epoch: u64,
    tags: HashMap<String, u64>,
}

impl Counters {
    fn generation(&self, tag: &str) -> u64 {
        self.tags.get(tag).copied().unwrap_or(0)
    }
}

/// Generations of a fill's tags at the time it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSnapshot {
    epoch: u64,
    tags: Vec<(String, u64)>,
}

/// Invalidation counters shared by every producer of a cache instance.
#[derive(Debug, Default)]
pub struct TagGenerations {
    /// Readers: fills storing a result. Writer: an invalidation.
    gate: TokioRwLock<()>,
    counters: RwLock<Counters>,
}

impl TagGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current generation of each tag.
    pub fn snapshot(&self, tags: &BTreeSet<String>) -> GenerationSnapshot {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        GenerationSnapshot {
            epoch: counters.epoch,
            tags: tags
                .iter()
                .map(|tag| (tag.clone(), counters.generation(tag)))
                .collect(),
        }
    }

    /// Returns true if none of the snapshot's tags was invalidated since.
    pub fn is_current(&self, snapshot: &GenerationSnapshot) -> bool {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        counters.epoch == snapshot.epoch
            && snapshot
                .tags
                .iter()
                .all(|(tag, generation)| counters.generation(tag) == *generation)
    }

    /// Runs `store` if the snapshot is still current, excluding invalidations
    /// while it runs. Returns `None` when the snapshot is stale.
    pub async fn store_if_current<F>(
        &self,
        snapshot: &GenerationSnapshot,
        store: F,
    ) -> Option<F::Output>
    where
        F: Future,
    {
        let _gate = self.gate.read().await;
        if !self.is_current(snapshot) {
            return None;
        }
        Some(store.await)
    }

    /// Bumps the generation of each tag, then runs `evict` before letting
    /// any fill store again.
    pub async fn invalidate_with<F>(&self, tags: &[String], evict: F) -> F::Output
    where
        F: Future,
    {
        let _gate = self.gate.write().await;
        {
            let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
            for tag in tags {
                *counters.tags.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        evict.await
    }

    /// Like [`invalidate_with`](Self::invalidate_with) for every tag at once.
    pub async fn invalidate_all_with<F>(&self, evict: F) -> F::Output
    where
        F: Future,
    {
        let _gate = self.gate.write().await;
        {
            let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
            counters.epoch += 1;
        }
        evict.await
    }
}
