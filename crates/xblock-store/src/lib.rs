//! # xblock Store
//!
//! The external key-value store holding settings, statistics and learned
//! icons, with push notification of every change.

mod error;
mod records;
mod store;

pub use error::StoreError;
pub use records::{
    full_reset, install_defaults, IconStore, SettingsStore, StatsStore, Watch, ICONS_KEY,
    SETTINGS_KEY, STATS_KEY,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreChange};
