use tokio::sync::broadcast;

use crate::dto::events::PlayEvent;

/// Broadcast hub fanning realtime play events out to in-process consumers.
pub struct SignalHub {
    sender: broadcast::Sender<PlayEvent>,
}

impl SignalHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: PlayEvent) {
        let _ = self.sender.send(event);
    }
}
