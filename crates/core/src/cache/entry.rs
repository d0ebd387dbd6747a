use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CacheKey;

/// A memoized result as held by a cache backend.
///
/// Callers of a memoized function never see this type, only the value
/// deserialized from `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// JSON-encoded result.
    pub value: Vec<u8>,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Diagnostic labels (log labels and logid). No effect on lookups.
    pub labels: Vec<String>,
}

impl CacheEntry {
    /// Creates an entry created now, without tags, TTL or labels.
    pub fn new(key: CacheKey, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            tags: BTreeSet::new(),
            created_at: Utc::now(),
            expires_at: None,
            labels: Vec::new(),
        }
    }

    /// Sets the invalidation tags of this entry.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Expires the entry `ttl` after its creation time.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl));
        self
    }

    /// Sets the diagnostic labels of this entry.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Sets a specific creation time (useful for testing).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns true if the entry has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    /// Returns true if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
