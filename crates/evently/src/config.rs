use std::{env, time::Duration};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Lifetime of memoized entries in seconds (default: unset, entries live
    /// until invalidated)
    pub cache_revalidate_seconds: Option<u64>,
    /// Path to the durable cache database (default: "evently-cache.db")
    pub cache_sqlite_path: String,
    /// Path to the SQLite event store (default: "evently.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_MAX_ENTRIES` - Maximum in-memory cache entries (default: 10,000)
    /// - `CACHE_REVALIDATE_SECONDS` - Entry lifetime in seconds (default: none)
    /// - `CACHE_SQLITE_PATH` - Durable cache database path (default: "evently-cache.db")
    /// - `SQLITE_PATH` - SQLite event store path (default: "evently.db")
    pub fn from_env() -> Self {
        Self {
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|max| *max > 0)
                .unwrap_or(10_000),
            cache_revalidate_seconds: env::var("CACHE_REVALIDATE_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok()),
            cache_sqlite_path: env::var("CACHE_SQLITE_PATH")
                .unwrap_or_else(|_| "evently-cache.db".to_string()),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "evently.db".to_string()),
        }
    }

    /// Get the entry lifetime as a Duration, if one is configured.
    pub fn cache_revalidate(&self) -> Option<Duration> {
        self.cache_revalidate_seconds.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
