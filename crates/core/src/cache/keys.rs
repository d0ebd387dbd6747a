use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CacheError, Result};

/// Prefix shared by every memoized cache key.
const MEMO_PREFIX: &str = "memo";

/// Tag covering the dashboard's latest-events slot.
pub const DASHBOARD_EVENTS_TAG: &str = "dashboard:events";

/// Tag covering the dashboard's RSVP slot.
pub const DASHBOARD_RSVPS_TAG: &str = "dashboard:rsvps";

/// Tag covering full event listings.
pub const EVENTS_TAG: &str = "events";

/// Tag covering every single-event lookup.
pub const EVENT_TAG: &str = "event";

/// A cache key derived from a producer identity and its arguments.
///
/// Keys are plain text so they stay stable across process restarts and can
/// be stored as-is in a durable backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an already-derived key, e.g. one read back from storage.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the producer identity embedded in this key.
    ///
    /// # Examples
    ///
    /// ```
    /// use evently_core::cache::derive_key;
    ///
    /// let key = derive_key("all_events", &("u1",)).unwrap();
    /// assert_eq!(key.producer(), Some("all_events"));
    /// ```
    pub fn producer(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(MEMO_PREFIX)?.strip_prefix(':')?;
        // Producer identities are validated to be colon-free, so the first
        // separator ends the identity.
        rest.split(':').next()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the cache key for calling `producer` with `args`.
///
/// Arguments are serialized to canonical JSON: tuples and sequences keep
/// their order and struct fields keep declaration order, so structurally
/// equal arguments always give the same key. The producer identity is part
/// of the key, so two producers never share entries.
///
/// Producer identities must be non-empty and must not contain `:`.
///
/// # Examples
///
/// ```
/// use evently_core::cache::derive_key;
///
/// let key = derive_key("one_event", &("u1", "e1")).unwrap();
/// assert_eq!(key.as_str(), r#"memo:one_event:["u1","e1"]"#);
/// ```
pub fn derive_key<A>(producer: &str, args: &A) -> Result<CacheKey>
where
    A: Serialize + ?Sized,
{
    if producer.is_empty() || producer.contains(':') {
        return Err(CacheError::KeyDerivation {
            producer: producer.to_string(),
            reason: "producer identity must be non-empty and colon-free".to_string(),
        });
    }

    let args = serde_json::to_string(args).map_err(|e| CacheError::KeyDerivation {
        producer: producer.to_string(),
        reason: e.to_string(),
    })?;

    Ok(CacheKey(format!("{MEMO_PREFIX}:{producer}:{args}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Serialize)]
    struct Query {
        user_id: String,
        limit: usize,
    }

    #[test]
    fn test_equal_args_give_equal_keys() {
        let owned = String::from("u1");
        let a = derive_key("all_events", &(owned.as_str(),)).unwrap();
        let b = derive_key("all_events", &("u1",)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_struct_args_are_structural() {
        let a = derive_key(
            "search",
            &Query {
                user_id: "u1".to_string(),
                limit: 5,
            },
        )
        .unwrap();
        let b = derive_key(
            "search",
            &Query {
                user_id: "u1".to_string(),
                limit: 5,
            },
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), r#"memo:search:{"user_id":"u1","limit":5}"#);
    }

    #[test]
    fn test_distinct_producers_never_collide() {
        let a = derive_key("dashboard_events", &("u1",)).unwrap();
        let b = derive_key("all_events", &("u1",)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_argument_order_matters() {
        let a = derive_key("one_event", &("u1", "e1")).unwrap();
        let b = derive_key("one_event", &("e1", "u1")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_string_and_number_args_differ() {
        let a = derive_key("p", &("1",)).unwrap();
        let b = derive_key("p", &(1,)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut args = HashMap::new();
        args.insert((1, 2), "value");

        let err = derive_key("p", &args).unwrap_err();
        assert!(matches!(err, CacheError::KeyDerivation { .. }));
    }

    #[test]
    fn test_invalid_producer_identity() {
        assert!(derive_key("", &()).is_err());
        assert!(derive_key("a:b", &()).is_err());
    }

    #[test]
    fn test_producer_roundtrip() {
        let key = derive_key("dashboard_rsvps", &("u1",)).unwrap();
        assert_eq!(key.producer(), Some("dashboard_rsvps"));
        assert_eq!(CacheKey::from_raw("user:1").producer(), None);
    }
}
