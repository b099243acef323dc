//! Typed records on top of the key-value store.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use xblock_protocols::{ActionKind, IconPair, Settings, Stats};

use crate::error::StoreError;
use crate::store::{KeyValueStore, StoreChange};

pub const SETTINGS_KEY: &str = "settings";
pub const STATS_KEY: &str = "stats";
pub const ICONS_KEY: &str = "icons";

async fn load<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

async fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    store.set(key, serde_json::to_value(value)?).await
}

/// Change stream of one typed record.
pub struct Watch<T> {
    rx: broadcast::Receiver<StoreChange>,
    key: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + Default> Watch<T> {
    fn new(store: &dyn KeyValueStore, key: &'static str) -> Self {
        Self {
            rx: store.subscribe(),
            key,
            _record: PhantomData,
        }
    }

    /// Waits for the next change of the record.
    ///
    /// A removed record reads as its default. Returns `None` once the store
    /// is gone.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.key == self.key => {
                    let Some(value) = change.new_value else {
                        return Some(T::default());
                    };
                    match serde_json::from_value(value) {
                        Ok(record) => return Some(record),
                        Err(e) => warn!("Ignoring malformed '{}' record: {}", self.key, e),
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Watch on '{}' lagged by {} changes", self.key, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// User preferences.
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current settings, defaults when never saved.
    pub async fn load(&self) -> Result<Settings, StoreError> {
        Ok(load(self.store.as_ref(), SETTINGS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        save(self.store.as_ref(), SETTINGS_KEY, settings).await
    }

    pub fn watch(&self) -> Watch<Settings> {
        Watch::new(self.store.as_ref(), SETTINGS_KEY)
    }
}

/// Block and mute counters.
#[derive(Clone)]
pub struct StatsStore {
    store: Arc<dyn KeyValueStore>,
    update: Arc<Mutex<()>>,
}

impl StatsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            update: Arc::new(Mutex::new(())),
        }
    }

    pub async fn load(&self) -> Result<Stats, StoreError> {
        Ok(load(self.store.as_ref(), STATS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Counts a completed action and returns the updated counters.
    pub async fn record(&self, action: ActionKind) -> Result<Stats, StoreError> {
        let _guard = self.update.lock().await;
        let mut stats = self.load().await?;
        stats.record(action);
        save(self.store.as_ref(), STATS_KEY, &stats).await?;
        debug!(%action, blocked = stats.blocked, muted = stats.muted, "Recorded action");
        Ok(stats)
    }

    pub async fn reset(&self) -> Result<(), StoreError> {
        let _guard = self.update.lock().await;
        save(self.store.as_ref(), STATS_KEY, &Stats::default()).await
    }
}

/// Learned icon markup.
#[derive(Clone)]
pub struct IconStore {
    store: Arc<dyn KeyValueStore>,
}

impl IconStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored icons, `None` when nothing was ever learned.
    pub async fn load(&self) -> Result<Option<IconPair>, StoreError> {
        load(self.store.as_ref(), ICONS_KEY).await
    }

    pub async fn save(&self, icons: &IconPair) -> Result<(), StoreError> {
        save(self.store.as_ref(), ICONS_KEY, icons).await
    }

    pub fn watch(&self) -> Watch<IconPair> {
        Watch::new(self.store.as_ref(), ICONS_KEY)
    }
}

/// Writes zeroed statistics and default settings.
pub async fn install_defaults(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    save(store, STATS_KEY, &Stats::default()).await?;
    save(store, SETTINGS_KEY, &Settings::default()).await
}

/// Clears everything, learned icons included, then reinstalls defaults.
pub async fn full_reset(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.clear().await?;
    install_defaults(store).await?;
    info!("Store reset to defaults");
    Ok(())
}
