mod entry;
mod error;
mod invalidation;
mod keys;
mod options;
mod serialization;
mod traits;

pub use entry::CacheEntry;
pub use error::{CacheError, MemoError, Result};
pub use invalidation::{normalize_tags, InvalidationEvent};
pub use keys::{
    derive_key, CacheKey, DASHBOARD_EVENTS_TAG, DASHBOARD_RSVPS_TAG, EVENTS_TAG, EVENT_TAG,
};
pub use options::{LogLabel, MemoOptions};
pub use serialization::{deserialize_value, serialize_value, SerializationError};
pub use traits::{Cache, CachePubSub};
