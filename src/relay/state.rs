//! Broadcast channel fanning driver events out to viewers.

use tokio::sync::broadcast;

use super::RelayEvent;

/// Default capacity for the event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fans [`RelayEvent`]s out to every subscribed viewer.
///
/// Delivery is FIFO per subscriber. A subscriber that falls more than the
/// channel capacity behind skips the oldest events.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<RelayEvent>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

impl Broadcaster {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send an event to all current subscribers. Returns how many received it.
    pub fn broadcast(&self, event: RelayEvent) -> usize {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::trace!(event = name, receivers, "Broadcast event");
                receivers
            }
            Err(_) => {
                tracing::trace!(event = name, "No viewers connected, event discarded");
                0
            }
        }
    }

    /// Register a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
