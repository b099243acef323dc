//! `stats`, `settings` and `reset`: manage the external store.

use std::sync::Arc;

use xblock_store::{KeyValueStore, SettingsStore, StatsStore, full_reset};

pub(crate) async fn handle_stats(
    store: Arc<dyn KeyValueStore>,
    reset: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = StatsStore::new(store);
    if reset {
        stats.reset().await?;
    }
    let current = stats.load().await?;
    println!("blocked: {}", current.blocked);
    println!("muted:   {}", current.muted);
    Ok(())
}

/// Applies whichever flags were given, then prints the stored settings.
pub(crate) async fn handle_settings(
    store: Arc<dyn KeyValueStore>,
    show_block: Option<bool>,
    show_mute: Option<bool>,
    confirm_block_following: Option<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = SettingsStore::new(store);
    let mut settings = records.load().await?;

    let changed = show_block.is_some() || show_mute.is_some() || confirm_block_following.is_some();
    if let Some(value) = show_block {
        settings.show_block = value;
    }
    if let Some(value) = show_mute {
        settings.show_mute = value;
    }
    if let Some(value) = confirm_block_following {
        settings.confirm_block_following = value;
    }
    if changed {
        records.save(&settings).await?;
    }

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub(crate) async fn handle_reset(store: Arc<dyn KeyValueStore>) -> Result<(), Box<dyn std::error::Error>> {
    full_reset(store.as_ref()).await?;
    println!("Store reset to defaults.");
    Ok(())
}
