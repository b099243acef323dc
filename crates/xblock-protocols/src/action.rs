//! Action kinds and the control kinds that trigger them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionErrorCode;

/// An account-relationship mutation the executor knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Block,
    Unblock,
    Mute,
    Unmute,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [Self::Block, Self::Unblock, Self::Mute, Self::Unmute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Unblock => "unblock",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
        }
    }

    /// The action that reverts this one.
    pub fn inverse(&self) -> Self {
        match self {
            Self::Block => Self::Unblock,
            Self::Unblock => Self::Block,
            Self::Mute => Self::Unmute,
            Self::Unmute => Self::Mute,
        }
    }

    pub fn is_undo(&self) -> bool {
        matches!(self, Self::Unblock | Self::Unmute)
    }

    pub fn control(&self) -> ControlKind {
        match self {
            Self::Block | Self::Unblock => ControlKind::Block,
            Self::Mute | Self::Unmute => ControlKind::Mute,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Self::Block),
            "unblock" => Ok(Self::Unblock),
            "mute" => Ok(Self::Mute),
            "unmute" => Ok(Self::Unmute),
            _ => Err(ActionErrorCode::InvalidAction),
        }
    }
}

/// The two control kinds rendered next to a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Block,
    Mute,
}

impl ControlKind {
    pub const ALL: [ControlKind; 2] = [Self::Block, Self::Mute];

    pub fn action(&self) -> ActionKind {
        match self {
            Self::Block => ActionKind::Block,
            Self::Mute => ActionKind::Mute,
        }
    }

    pub fn undo_action(&self) -> ActionKind {
        self.action().inverse()
    }

    /// Class carried by the rendered button next to the shared button class.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Block => "xblock-block",
            Self::Mute => "xblock-mute",
        }
    }
}
