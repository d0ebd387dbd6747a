//! SQLite event store.
//!
//! Implements `EventRepository` using `rusqlite` for synchronous operations
//! and `tokio-rusqlite` for async wrapping.

mod conversions;
mod error;
mod repository;
mod schema;

pub use repository::SqliteRepository;
