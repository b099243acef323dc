//! Transport-level bridge errors.
//!
//! Action failures are not errors here; they travel as `ActionFailure` values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("HTTP client error: {0}")]
    Client(String),
}
