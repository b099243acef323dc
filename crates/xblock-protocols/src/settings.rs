//! Records held by the external key-value store.

use serde::{Deserialize, Serialize};

use crate::action::{ActionKind, ControlKind};

/// User preferences. Missing fields fall back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub show_block: bool,
    pub show_mute: bool,
    pub confirm_block_following: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_block: true,
            show_mute: true,
            confirm_block_following: false,
        }
    }
}

impl Settings {
    pub fn shows(&self, kind: ControlKind) -> bool {
        match kind {
            ControlKind::Block => self.show_block,
            ControlKind::Mute => self.show_mute,
        }
    }
}

/// Running counters of successful block and mute actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub blocked: u64,
    pub muted: u64,
}

impl Stats {
    /// Counts a successful action. Undo actions are not counted.
    pub fn record(&mut self, action: ActionKind) {
        match action {
            ActionKind::Block => self.blocked += 1,
            ActionKind::Mute => self.muted += 1,
            ActionKind::Unblock | ActionKind::Unmute => {}
        }
    }
}

/// Learned icon markup for each control kind. Empty means not yet learned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconPair {
    pub block: String,
    pub mute: String,
}

impl IconPair {
    pub fn get(&self, kind: ControlKind) -> Option<&str> {
        let markup = match kind {
            ControlKind::Block => &self.block,
            ControlKind::Mute => &self.mute,
        };
        (!markup.is_empty()).then_some(markup.as_str())
    }

    pub fn set(&mut self, kind: ControlKind, markup: String) {
        match kind {
            ControlKind::Block => self.block = markup,
            ControlKind::Mute => self.mute = markup,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.block.is_empty() && !self.mute.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty() && self.mute.is_empty()
    }
}
