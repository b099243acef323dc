//! The page side of the bridge.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use xblock_protocols::BridgeMessage;

use crate::bus::MessageBus;
use crate::executor::ActionExecutor;

/// Listens on the bus and answers every request with exactly one `RESULT`.
pub struct BridgeServer {
    executor: Arc<ActionExecutor>,
    bus: MessageBus,
}

impl BridgeServer {
    pub fn new(executor: Arc<ActionExecutor>, bus: MessageBus) -> Self {
        Self { executor, bus }
    }

    /// Starts listening, then announces `READY`.
    ///
    /// Requests are handled concurrently, so results may be posted in any
    /// order. The task ends when the bus closes.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        self.bus.post_message(&BridgeMessage::Ready);
        info!("Action bridge ready");

        tokio::spawn(async move {
            loop {
                let value = match rx.recv().await {
                    Ok(value) => value,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Bridge server lagged behind the bus");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let Some(message) = BridgeMessage::from_value(&value) else {
                    continue;
                };
                if matches!(message, BridgeMessage::Result { .. } | BridgeMessage::Ready) {
                    continue;
                }

                debug!(request_id = ?message.request_id(), "Bridge request");
                let executor = self.executor.clone();
                let bus = self.bus.clone();
                tokio::spawn(async move {
                    if let Some(reply) = executor.handle(message).await {
                        bus.post_message(&reply);
                    }
                });
            }
            debug!("Bridge server stopped");
        })
    }
}
