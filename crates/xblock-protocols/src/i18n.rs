//! Localized user-facing strings.
//!
//! Templates use `$1` as the single substitution slot.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::{ActionKind, ControlKind};
use crate::error::ActionErrorCode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ja" => Ok(Self::Ja),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    BlockLabel,
    MuteLabel,
    UnblockLabel,
    UnmuteLabel,
    BlockedStatus,
    MutedStatus,
    ToastBlocked,
    ToastMuted,
    ToastUnblocked,
    ToastUnmuted,
    ConfirmBlockFollowing,
    ErrorTimeout,
    ErrorGeneric,
    ErrorNoAuth,
    ErrorInvalidAction,
    ErrorForbidden,
    ErrorRateLimited,
}

/// String table for one locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn get(&self, key: MessageKey) -> &'static str {
        match self.locale {
            Locale::En => en(key),
            Locale::Ja => ja(key),
        }
    }

    /// Looks up `key` and substitutes `$1`.
    pub fn format(&self, key: MessageKey, arg: &str) -> String {
        self.get(key).replace("$1", arg)
    }

    pub fn label(&self, kind: ControlKind) -> &'static str {
        match kind {
            ControlKind::Block => self.get(MessageKey::BlockLabel),
            ControlKind::Mute => self.get(MessageKey::MuteLabel),
        }
    }

    pub fn undo_label(&self, kind: ControlKind) -> &'static str {
        match kind {
            ControlKind::Block => self.get(MessageKey::UnblockLabel),
            ControlKind::Mute => self.get(MessageKey::UnmuteLabel),
        }
    }

    pub fn status(&self, kind: ControlKind) -> &'static str {
        match kind {
            ControlKind::Block => self.get(MessageKey::BlockedStatus),
            ControlKind::Mute => self.get(MessageKey::MutedStatus),
        }
    }

    /// Toast text announcing a completed action on `target`.
    pub fn toast(&self, action: ActionKind, target: &str) -> String {
        let key = match action {
            ActionKind::Block => MessageKey::ToastBlocked,
            ActionKind::Mute => MessageKey::ToastMuted,
            ActionKind::Unblock => MessageKey::ToastUnblocked,
            ActionKind::Unmute => MessageKey::ToastUnmuted,
        };
        self.format(key, target)
    }

    /// Message for a failure code raised before any HTTP exchange happened.
    pub fn error(&self, code: ActionErrorCode, detail: &str) -> String {
        match code {
            ActionErrorCode::Timeout => self.get(MessageKey::ErrorTimeout).to_string(),
            ActionErrorCode::NoAuth => self.get(MessageKey::ErrorNoAuth).to_string(),
            ActionErrorCode::InvalidAction => self.format(MessageKey::ErrorInvalidAction, detail),
            ActionErrorCode::Forbidden => self.get(MessageKey::ErrorForbidden).to_string(),
            ActionErrorCode::RateLimited => self.get(MessageKey::ErrorRateLimited).to_string(),
            ActionErrorCode::Http(_) | ActionErrorCode::Network => {
                self.get(MessageKey::ErrorGeneric).to_string()
            }
        }
    }
}

fn en(key: MessageKey) -> &'static str {
    match key {
        MessageKey::BlockLabel => "Block",
        MessageKey::MuteLabel => "Mute",
        MessageKey::UnblockLabel => "Unblock",
        MessageKey::UnmuteLabel => "Unmute",
        MessageKey::BlockedStatus => "Blocked",
        MessageKey::MutedStatus => "Muted",
        MessageKey::ToastBlocked => "Blocked @$1",
        MessageKey::ToastMuted => "Muted @$1",
        MessageKey::ToastUnblocked => "Unblocked @$1",
        MessageKey::ToastUnmuted => "Unmuted @$1",
        MessageKey::ConfirmBlockFollowing => "You follow @$1. Block anyway?",
        MessageKey::ErrorTimeout => "Request timed out",
        MessageKey::ErrorGeneric => "An error occurred",
        MessageKey::ErrorNoAuth => {
            "Could not obtain credentials. Interact with the page and try again."
        }
        MessageKey::ErrorInvalidAction => "Unknown action: $1",
        MessageKey::ErrorForbidden => "Session expired. Please reload the page.",
        MessageKey::ErrorRateLimited => "Rate limit reached. Please wait and try again.",
    }
}

fn ja(key: MessageKey) -> &'static str {
    match key {
        MessageKey::BlockLabel => "ブロック",
        MessageKey::MuteLabel => "ミュート",
        MessageKey::UnblockLabel => "ブロック解除",
        MessageKey::UnmuteLabel => "ミュート解除",
        MessageKey::BlockedStatus => "ブロック済み",
        MessageKey::MutedStatus => "ミュート済み",
        MessageKey::ToastBlocked => "@$1 をブロックしました",
        MessageKey::ToastMuted => "@$1 をミュートしました",
        MessageKey::ToastUnblocked => "@$1 のブロックを解除しました",
        MessageKey::ToastUnmuted => "@$1 のミュートを解除しました",
        MessageKey::ConfirmBlockFollowing => "@$1 をフォロー中です。ブロックしますか？",
        MessageKey::ErrorTimeout => "タイムアウトしました",
        MessageKey::ErrorGeneric => "エラーが発生しました",
        MessageKey::ErrorNoAuth => {
            "認証情報が取得できません。ページを操作してから再試行してください。"
        }
        MessageKey::ErrorInvalidAction => "不明なアクション: $1",
        MessageKey::ErrorForbidden => "セッションが期限切れです。ページを再読み込みしてください。",
        MessageKey::ErrorRateLimited => {
            "レート制限に達しました。しばらく待ってから再試行してください。"
        }
    }
}
