//! Cache backends and the memoization service built on them.
//!
//! - `memory`: LRU-bounded in-process cache and the in-process invalidation bus
//! - `sqlite`: durable cache used by producers memoized with `persist`
//! - `memo`: [`MemoCache`], which wraps producers and coordinates invalidation
//!   across backends and instances

mod generations;
mod memo;
pub mod memory;
pub mod sqlite;

pub use memo::{MemoCache, Memoized};
pub use memory::{MemoryCache, MemoryPubSub};
pub use sqlite::SqliteCache;
