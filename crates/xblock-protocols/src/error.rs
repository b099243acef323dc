//! Action failure taxonomy.
//!
//! These are values carried across the bridge and rendered on controls, not
//! Rust errors raised inside a crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable code of a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionErrorCode {
    /// No response within the action deadline.
    Timeout,
    /// No credential pair could be captured or derived.
    NoAuth,
    /// The requested action is not one of the four known kinds.
    InvalidAction,
    /// Still 403 after the single CSRF refresh retry.
    Forbidden,
    /// 429 from the platform.
    RateLimited,
    /// Any other non-success status.
    Http(u16),
    /// Transport failure or undecodable success body.
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action error code: {0}")]
pub struct ParseCodeError(pub String);

impl fmt::Display for ActionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("TIMEOUT"),
            Self::NoAuth => f.write_str("NO_AUTH"),
            Self::InvalidAction => f.write_str("INVALID_ACTION"),
            Self::Forbidden => f.write_str("FORBIDDEN"),
            Self::RateLimited => f.write_str("RATE_LIMITED"),
            Self::Http(status) => write!(f, "HTTP_{status}"),
            Self::Network => f.write_str("NETWORK"),
        }
    }
}

impl FromStr for ActionErrorCode {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TIMEOUT" => Ok(Self::Timeout),
            "NO_AUTH" => Ok(Self::NoAuth),
            "INVALID_ACTION" => Ok(Self::InvalidAction),
            "FORBIDDEN" => Ok(Self::Forbidden),
            "RATE_LIMITED" => Ok(Self::RateLimited),
            "NETWORK" => Ok(Self::Network),
            other => other
                .strip_prefix("HTTP_")
                .and_then(|status| status.parse().ok())
                .map(Self::Http)
                .ok_or_else(|| ParseCodeError(other.to_string())),
        }
    }
}

impl TryFrom<String> for ActionErrorCode {
    type Error = ParseCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActionErrorCode> for String {
    fn from(value: ActionErrorCode) -> Self {
        value.to_string()
    }
}

/// A failed action: code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ActionFailure {
    pub code: ActionErrorCode,
    pub message: String,
}

impl ActionFailure {
    pub fn new(code: ActionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of an action: the platform's decoded response body or a failure.
pub type ActionOutcome = Result<serde_json::Value, ActionFailure>;
