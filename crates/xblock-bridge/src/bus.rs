//! The shared message channel between both contexts.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;
use xblock_protocols::BridgeMessage;

const BUS_CAPACITY: usize = 256;

/// A window-like broadcast channel: every subscriber sees every message,
/// including its own and any foreign traffic.
#[derive(Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Value>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Posts a raw value. Posting with nobody listening is not an error.
    pub fn post(&self, value: Value) {
        trace!(%value, "bus post");
        let _ = self.tx.send(value);
    }

    pub fn post_message(&self, message: &BridgeMessage) {
        self.post(message.to_value());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
