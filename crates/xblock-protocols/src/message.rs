//! Messages exchanged over the cross-context bridge.
//!
//! Both sides see every message on the shared channel, so each variant is
//! self-describing through its `type` tag and anything that does not decode
//! into this closed union is ignored by the receiver.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ActionErrorCode, ActionFailure, ActionOutcome};
use crate::identifier::Identifier;

/// Correlation token of a request, unique per requester session.
pub type RequestId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum BridgeMessage {
    /// Perform an action on behalf of the annotator.
    ///
    /// The action stays a raw string so that an unknown kind can be answered
    /// with `INVALID_ACTION` instead of being dropped.
    Action {
        request_id: RequestId,
        action: String,
        screen_name: Identifier,
    },
    /// Ask whether the current session follows the subject.
    CheckFollowing {
        request_id: RequestId,
        screen_name: Identifier,
    },
    /// Response to either request kind.
    Result {
        request_id: RequestId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        success: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ActionErrorCode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        following: Option<bool>,
    },
    /// Posted once by the executor when it starts listening.
    Ready,
}

impl BridgeMessage {
    pub fn result(request_id: impl Into<RequestId>, payload: ResultPayload) -> Self {
        Self::Result {
            request_id: request_id.into(),
            success: payload.success,
            error: payload.error,
            message: payload.message,
            data: payload.data,
            following: payload.following,
        }
    }

    /// Splits a `Result` message into its correlation id and payload.
    pub fn into_result(self) -> Option<(RequestId, ResultPayload)> {
        match self {
            Self::Result {
                request_id,
                success,
                error,
                message,
                data,
                following,
            } => Some((
                request_id,
                ResultPayload {
                    success,
                    error,
                    message,
                    data,
                    following,
                },
            )),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Action { request_id, .. }
            | Self::CheckFollowing { request_id, .. }
            | Self::Result { request_id, .. } => Some(request_id),
            Self::Ready => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decodes a raw channel value, `None` for anything outside the union.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Body of a `RESULT` message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPayload {
    pub success: Option<bool>,
    pub error: Option<ActionErrorCode>,
    pub message: Option<String>,
    pub data: Option<Value>,
    pub following: Option<bool>,
}

impl ResultPayload {
    pub fn from_outcome(outcome: ActionOutcome) -> Self {
        match outcome {
            Ok(data) => Self {
                success: Some(true),
                data: Some(data),
                ..Default::default()
            },
            Err(failure) => Self {
                success: Some(false),
                error: Some(failure.code),
                message: Some(failure.message),
                ..Default::default()
            },
        }
    }

    pub fn relationship(following: bool) -> Self {
        Self {
            following: Some(following),
            ..Default::default()
        }
    }

    /// Interprets the payload as an action outcome.
    ///
    /// A failure without a code is reported as `NETWORK`.
    pub fn into_outcome(self) -> ActionOutcome {
        if self.success == Some(true) {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        Err(ActionFailure::new(
            self.error.unwrap_or(ActionErrorCode::Network),
            self.message.unwrap_or_default(),
        ))
    }

    pub fn is_following(&self) -> bool {
        self.following.unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
