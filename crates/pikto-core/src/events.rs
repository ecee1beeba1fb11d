//! Change-event fan-out for catalog mutations.
//!
//! Subscribers receive events over bounded channels. Delivery is
//! best-effort: a full channel drops that event for that subscriber only,
//! and a closed channel removes the subscriber. Publishing never blocks
//! catalog operations.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::catalog::Collection;
use crate::photos::Photo;

/// Per-subscriber channel capacity.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// A catalog change notification.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// A page of photos was appended to a collection.
    PhotosAppended {
        collection: Collection,
        /// Item count before the append.
        previous_count: usize,
        /// Item count after the append.
        new_count: usize,
    },
    /// A photo's like state changed in a collection.
    ///
    /// Carries the updated photo so subscribers need not re-query.
    LikeChanged { collection: Collection, photo: Photo },
    /// All collections were emptied (logout).
    Cleared,
}

/// Receiver half handed to a subscriber.
pub type CatalogEventRx = mpsc::Receiver<Arc<CatalogEvent>>;

/// Fan-out hub: one publisher, any number of subscribers.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::Sender<Arc<CatalogEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&self) -> CatalogEventRx {
        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        self.subscribers
            .lock()
            .expect("event subscriber lock poisoned")
            .push(tx);
        rx
    }

    /// Delivers an event to every live subscriber.
    ///
    /// A subscriber whose channel is full misses this event; a subscriber
    /// whose receiver was dropped is pruned.
    pub fn publish(&self, event: CatalogEvent) {
        let event = Arc::new(event);
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("event subscriber lock poisoned");
        subscribers.retain(|tx| match tx.try_send(Arc::clone(&event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(?event, "subscriber channel full, dropping event");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}
