//! Durable SQLite cache backend, used by producers memoized with `persist`.

mod cache;
mod schema;

pub use cache::SqliteCache;
