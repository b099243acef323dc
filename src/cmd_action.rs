//! `action` and `check`: drive the executor over the network.

use std::sync::Arc;

use tracing::{info, warn};

use xblock_bridge::{ActionExecutor, CredentialStore, ExecutorSettings, ReqwestFetch};
use xblock_config::Config;
use xblock_protocols::{Identifier, Messages};

pub(crate) fn executor(config: &Config) -> Result<ActionExecutor, Box<dyn std::error::Error>> {
    let cookies = config.session.cookie_string(&config.platform.csrf_cookie);
    if cookies.is_empty() {
        warn!("No session cookies configured; requests will be anonymous");
    }
    let fetch = ReqwestFetch::new(Some(cookies.clone()))?;
    Ok(ActionExecutor::new(
        Arc::new(fetch),
        Arc::new(CredentialStore::new(config.platform.api_prefix.clone())),
        Arc::new(cookies),
        ExecutorSettings::from_platform(&config.platform),
        Messages::new(config.ui.locale),
    ))
}

fn identifier(raw: &str) -> Result<Identifier, Box<dyn std::error::Error>> {
    Identifier::parse(raw).ok_or_else(|| format!("Invalid account identifier: {raw}").into())
}

/// Performs `verb` on `id` and prints the platform's answer.
pub(crate) async fn handle_action(
    config: &Config,
    verb: &str,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = identifier(id)?;
    let executor = executor(config)?;

    match executor.perform(verb, &target).await {
        Ok(body) => {
            info!(verb, %target, "Action succeeded");
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(failure) => {
            println!("{}: {}", failure.code, failure.message);
            Err(format!("{verb} @{target} failed").into())
        }
    }
}

pub(crate) async fn handle_check(config: &Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let target = identifier(id)?;
    let following = executor(config)?.check_following(&target).await;
    println!("{}", if following { "following" } else { "not following" });
    Ok(())
}
