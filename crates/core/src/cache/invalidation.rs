use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tag invalidation broadcast to every cache instance on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Instance that performed the invalidation.
    pub origin: Uuid,
    pub tags: Vec<String>,
    pub issued_at: DateTime<Utc>,
}

impl InvalidationEvent {
    /// Creates an event for `tags` issued now.
    pub fn new<S: AsRef<str>>(origin: Uuid, tags: &[S]) -> Self {
        Self {
            origin,
            tags: normalize_tags(tags),
            issued_at: Utc::now(),
        }
    }
}

/// Sorts and deduplicates a tag list, dropping empty tags.
///
/// # Examples
///
/// ```
/// use evently_core::cache::normalize_tags;
///
/// let tags = normalize_tags(&["events", "", "dashboard:events", "events"]);
/// assert_eq!(tags, vec!["dashboard:events", "events"]);
/// ```
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .iter()
        .map(|tag| tag.as_ref())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    tags.sort();
    tags.dedup();
    tags
}
