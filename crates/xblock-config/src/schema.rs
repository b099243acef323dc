//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use xblock_protocols::Locale;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the privileged endpoints live and how credentials are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path fragment identifying the private API in outgoing page traffic.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Static public bearer token, percent-encoded as embedded in the web app.
    #[serde(default = "default_public_bearer")]
    pub public_bearer: String,

    /// Cookie holding the anti-forgery token.
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            public_bearer: default_public_bearer(),
            csrf_cookie: default_csrf_cookie(),
        }
    }
}

fn default_base_url() -> String {
    "https://x.com".to_string()
}

fn default_api_prefix() -> String {
    "/i/api/".to_string()
}

fn default_public_bearer() -> String {
    concat!(
        "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs",
        "%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA"
    )
    .to_string()
}

fn default_csrf_cookie() -> String {
    "ct0".to_string()
}

/// Every delay and deadline, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub trailing_ms: u64,
    pub location_poll_ms: u64,
    pub location_settle_ms: u64,
    pub initial_pass_delay_ms: u64,
    pub collapse_delay_ms: u64,
    pub error_clear_ms: u64,
    pub toast_ms: u64,
    pub toast_fade_ms: u64,
    pub action_timeout_ms: u64,
    pub relationship_timeout_ms: u64,
    pub icon_probe_delay_ms: u64,
    pub icon_probe_retry_ms: u64,
    pub icon_probe_retries: u32,
    pub icon_probe_window_ms: u64,
    pub passive_icon_delay_ms: u64,
    pub layers_retry_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_ms: 16,
            trailing_ms: 200,
            location_poll_ms: 1000,
            location_settle_ms: 500,
            initial_pass_delay_ms: 300,
            collapse_delay_ms: 300,
            error_clear_ms: 3000,
            toast_ms: 3000,
            toast_fade_ms: 300,
            action_timeout_ms: 15_000,
            relationship_timeout_ms: 5000,
            icon_probe_delay_ms: 2000,
            icon_probe_retry_ms: 2000,
            icon_probe_retries: 5,
            icon_probe_window_ms: 3000,
            passive_icon_delay_ms: 300,
            layers_retry_ms: 1000,
        }
    }
}

impl TimingConfig {
    /// Named millisecond fields, for validation and display.
    pub fn durations(&self) -> [(&'static str, u64); 16] {
        [
            ("frame_ms", self.frame_ms),
            ("trailing_ms", self.trailing_ms),
            ("location_poll_ms", self.location_poll_ms),
            ("location_settle_ms", self.location_settle_ms),
            ("initial_pass_delay_ms", self.initial_pass_delay_ms),
            ("collapse_delay_ms", self.collapse_delay_ms),
            ("error_clear_ms", self.error_clear_ms),
            ("toast_ms", self.toast_ms),
            ("toast_fade_ms", self.toast_fade_ms),
            ("action_timeout_ms", self.action_timeout_ms),
            ("relationship_timeout_ms", self.relationship_timeout_ms),
            ("icon_probe_delay_ms", self.icon_probe_delay_ms),
            ("icon_probe_retry_ms", self.icon_probe_retry_ms),
            ("icon_probe_window_ms", self.icon_probe_window_ms),
            ("passive_icon_delay_ms", self.passive_icon_delay_ms),
            ("layers_retry_ms", self.layers_retry_ms),
        ]
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }

    pub fn trailing(&self) -> Duration {
        Duration::from_millis(self.trailing_ms)
    }

    pub fn location_poll(&self) -> Duration {
        Duration::from_millis(self.location_poll_ms)
    }

    pub fn location_settle(&self) -> Duration {
        Duration::from_millis(self.location_settle_ms)
    }

    pub fn initial_pass_delay(&self) -> Duration {
        Duration::from_millis(self.initial_pass_delay_ms)
    }

    pub fn collapse_delay(&self) -> Duration {
        Duration::from_millis(self.collapse_delay_ms)
    }

    pub fn error_clear(&self) -> Duration {
        Duration::from_millis(self.error_clear_ms)
    }

    pub fn toast(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }

    pub fn toast_fade(&self) -> Duration {
        Duration::from_millis(self.toast_fade_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn relationship_timeout(&self) -> Duration {
        Duration::from_millis(self.relationship_timeout_ms)
    }

    pub fn icon_probe_delay(&self) -> Duration {
        Duration::from_millis(self.icon_probe_delay_ms)
    }

    pub fn icon_probe_retry(&self) -> Duration {
        Duration::from_millis(self.icon_probe_retry_ms)
    }

    pub fn icon_probe_window(&self) -> Duration {
        Duration::from_millis(self.icon_probe_window_ms)
    }

    pub fn passive_icon_delay(&self) -> Duration {
        Duration::from_millis(self.passive_icon_delay_ms)
    }

    pub fn layers_retry(&self) -> Duration {
        Duration::from_millis(self.layers_retry_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub locale: Locale,
}

/// Location of the JSON key-value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("~/.xblock/store.json")
}

impl StorageConfig {
    /// The store path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(crate::ConfigLoader::expand_path(&self.path.to_string_lossy()))
    }
}

/// Session cookies the CLI presents in place of a browser cookie jar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

impl SessionConfig {
    /// Renders the configured cookies as a `name=value; ...` string.
    pub fn cookie_string(&self, csrf_cookie: &str) -> String {
        let mut pairs = Vec::new();
        if let Some(token) = &self.auth_token {
            pairs.push(format!("auth_token={token}"));
        }
        if let Some(csrf) = &self.csrf_token {
            pairs.push(format!("{csrf_cookie}={csrf}"));
        }
        pairs.join("; ")
    }
}
