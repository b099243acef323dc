//! The annotator side of the bridge.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use xblock_config::TimingConfig;
use xblock_protocols::{
    ActionBridge, ActionErrorCode, ActionFailure, ActionKind, ActionOutcome, BridgeMessage,
    Identifier, MessageKey, Messages, RequestId, ResultPayload,
};

use crate::bus::MessageBus;

/// Prefix of every correlation id this client issues.
pub const REQUEST_ID_PREFIX: &str = "__xb_";

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ResultPayload>>>>;

/// How long the client waits for each request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeTimeouts {
    pub action: Duration,
    pub relationship: Duration,
}

impl BridgeTimeouts {
    pub fn from_timing(timing: &TimingConfig) -> Self {
        Self {
            action: timing.action_timeout(),
            relationship: timing.relationship_timeout(),
        }
    }
}

impl Default for BridgeTimeouts {
    fn default() -> Self {
        Self {
            action: Duration::from_secs(15),
            relationship: Duration::from_secs(5),
        }
    }
}

/// Posts correlated requests on the bus and resolves them from `RESULT`
/// messages. Every request resolves exactly once: on its result, or locally
/// when its timeout elapses, after which a late result is discarded.
pub struct BridgeClient {
    bus: MessageBus,
    pending: PendingMap,
    next_id: AtomicU64,
    ready: watch::Receiver<bool>,
    timeouts: BridgeTimeouts,
    messages: Messages,
    recv_task: JoinHandle<()>,
}

impl BridgeClient {
    /// Must be called inside a Tokio runtime.
    pub fn new(bus: MessageBus, timeouts: BridgeTimeouts, messages: Messages) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (ready_tx, ready) = watch::channel(false);

        // Subscribe before spawning so nothing posted after `new` returns is missed.
        let rx = bus.subscribe();
        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(rx, pending, ready_tx).await;
            })
        };

        Self {
            bus,
            pending,
            next_id: AtomicU64::new(1),
            ready,
            timeouts,
            messages,
            recv_task,
        }
    }

    async fn receive_loop(
        mut rx: broadcast::Receiver<Value>,
        pending: PendingMap,
        ready_tx: watch::Sender<bool>,
    ) {
        loop {
            let value = match rx.recv().await {
                Ok(value) => value,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Bridge client lagged behind the bus");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match BridgeMessage::from_value(&value) {
                Some(BridgeMessage::Ready) => {
                    debug!("Executor reported ready");
                    ready_tx.send_replace(true);
                }
                Some(message) => {
                    let Some((request_id, payload)) = message.into_result() else {
                        continue;
                    };
                    let waiter = pending.lock().remove(&request_id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(payload);
                        }
                        None => trace!(%request_id, "Result for unknown or expired request"),
                    }
                }
                None => trace!("Ignoring foreign bus message"),
            }
        }
    }

    fn next_request_id(&self) -> RequestId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{REQUEST_ID_PREFIX}{n}")
    }

    /// Posts a request built around a fresh id and waits for its result.
    ///
    /// `None` means the wait timed out; the pending entry is gone by then.
    async fn request(
        &self,
        build: impl FnOnce(RequestId) -> BridgeMessage,
        timeout: Duration,
    ) -> Option<ResultPayload> {
        let request_id = self.next_request_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id.clone(), tx);

        self.bus.post_message(&build(request_id.clone()));

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(payload)) => Some(payload),
            Ok(Err(_)) => {
                self.pending.lock().remove(&request_id);
                None
            }
            Err(_) => {
                self.pending.lock().remove(&request_id);
                debug!(%request_id, "Bridge request timed out");
                None
            }
        }
    }

    /// Sends a raw action verb. Unknown verbs come back as `INVALID_ACTION`.
    pub async fn perform_raw(&self, action: &str, target: &Identifier) -> ActionOutcome {
        let payload = self
            .request(
                |request_id| BridgeMessage::Action {
                    request_id,
                    action: action.to_string(),
                    screen_name: target.clone(),
                },
                self.timeouts.action,
            )
            .await;

        match payload {
            Some(payload) => payload.into_outcome(),
            None => Err(ActionFailure::new(
                ActionErrorCode::Timeout,
                self.messages.get(MessageKey::ErrorTimeout),
            )),
        }
    }

    pub async fn check_following(&self, target: &Identifier) -> bool {
        self.request(
            |request_id| BridgeMessage::CheckFollowing {
                request_id,
                screen_name: target.clone(),
            },
            self.timeouts.relationship,
        )
        .await
        .is_some_and(|payload| payload.is_following())
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Waits up to `timeout` for the executor's `READY`.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut ready = self.ready.clone();
        matches!(
            tokio::time::timeout(timeout, ready.wait_for(|r| *r)).await,
            Ok(Ok(_))
        )
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[async_trait]
impl ActionBridge for BridgeClient {
    async fn perform(&self, action: ActionKind, target: &Identifier) -> ActionOutcome {
        self.perform_raw(action.as_str(), target).await
    }

    async fn is_following(&self, target: &Identifier) -> bool {
        self.check_following(target).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
