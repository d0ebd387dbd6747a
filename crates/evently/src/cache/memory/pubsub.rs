//! In-memory pub/sub implementation.
//!
//! Broadcasts tag invalidations between cache instances living in the same
//! process using a tokio broadcast channel.

use async_trait::async_trait;
use tokio::sync::broadcast;

use evently_core::cache::{CachePubSub, InvalidationEvent, Result};

/// Channel capacity for pub/sub messages.
pub(crate) const CHANNEL_CAPACITY: usize = 100;

/// In-memory pub/sub implementation.
///
/// Every subscriber receives every invalidation; subscribers filter out the
/// ones they issued themselves.
#[derive(Debug, Clone)]
pub struct MemoryPubSub {
    sender: broadcast::Sender<InvalidationEvent>,
}

impl MemoryPubSub {
    /// Creates a new pub/sub instance with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CachePubSub for MemoryPubSub {
    async fn publish(&self, event: &InvalidationEvent) -> Result<()> {
        // No receivers just means no other instance is listening.
        let _ = self.sender.send(event.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<broadcast::Receiver<InvalidationEvent>> {
        Ok(self.sender.subscribe())
    }
}
