//! Seams between controls and whatever carries their requests.

use async_trait::async_trait;

use crate::action::ActionKind;
use crate::error::ActionOutcome;
use crate::identifier::Identifier;

/// Request side of the bridge as seen by a control.
#[async_trait]
pub trait ActionBridge: Send + Sync {
    /// Runs `action` against `target`. Never hangs past the action deadline.
    async fn perform(&self, action: ActionKind, target: &Identifier) -> ActionOutcome;

    /// Whether the session follows `target`. Any failure reads as `false`.
    async fn is_following(&self, target: &Identifier) -> bool;
}

/// Asks the user to confirm a destructive action.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Prompt that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}
