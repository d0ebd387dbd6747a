//! In-memory cache backend implementation.
//!
//! Provides a thread-safe in-memory cache with TTL support, a tag index and
//! pub/sub for single-process deployments.

mod cache;
mod pubsub;

pub use cache::MemoryCache;
pub use pubsub::MemoryPubSub;
#[cfg(test)]
pub(crate) use pubsub::CHANNEL_CAPACITY;
