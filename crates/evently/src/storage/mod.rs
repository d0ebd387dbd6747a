//! Event store implementations.
//!
//! This module provides concrete implementations of `EventRepository`
//! defined in `evently_core::storage`. The implementation is selected at
//! compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): HashMaps behind `tokio::sync::RwLock`, seeded with demo data
//! - `sqlite`: SQLite event store using `rusqlite` and `tokio-rusqlite`
//!
//! These features are mutually exclusive - only one storage backend can be
//! enabled at a time.
//!
//! # Examples
//!
//! Build with the in-memory store (default):
//! ```bash
//! cargo build -p evently
//! ```
//!
//! Build with SQLite:
//! ```bash
//! cargo build -p evently --no-default-features --features sqlite
//! ```

// Compile-time checks for mutual exclusivity
#[cfg(all(feature = "inmemory", feature = "sqlite"))]
compile_error!(
    "Features 'inmemory' and 'sqlite' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'sqlite' feature. \
    Example: cargo build -p evently --features sqlite"
);

#[cfg(any(feature = "inmemory", test))]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "inmemory", test))]
pub use inmemory::InMemoryRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
