//! In-memory event store.
//!
//! Stores events, attendees and RSVPs in HashMaps wrapped in
//! `Arc<RwLock<_>>`. Data is lost when the process exits; the binary seeds
//! it with demo data on startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use evently::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
