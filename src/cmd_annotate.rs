//! `annotate`: one pass over a saved page snapshot.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use xblock_annotate::{AnnotateContext, Annotator, ControlFactory, selectors};
use xblock_bridge::{BridgeClient, BridgeServer, BridgeTimeouts, MessageBus};
use xblock_config::Config;
use xblock_dom::{Document, PageSpec, shared};
use xblock_protocols::Messages;
use xblock_store::{IconStore, KeyValueStore, SettingsStore};

use crate::cmd_action::executor;

pub(crate) async fn handle_annotate(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    snapshot: &Path,
    tree: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = tokio::fs::read_to_string(snapshot).await?;
    let page: PageSpec = serde_json::from_str(&content)?;
    let doc = shared(Document::from_page(&page)?);

    let messages = Messages::new(config.ui.locale);
    let bus = MessageBus::new();
    let client = BridgeClient::new(bus.clone(), BridgeTimeouts::from_timing(&config.timing), messages);
    let server = BridgeServer::new(Arc::new(executor(config)?), bus).start();

    let settings = SettingsStore::new(store.clone()).load().await?;
    let ctx = AnnotateContext::new(doc.clone(), Arc::new(client), messages, config.timing.clone())
        .with_settings(settings);
    if let Some(icons) = IconStore::new(store).load().await? {
        ctx.icons().apply(&icons);
    }

    let annotator = Annotator::new(ControlFactory::new(Arc::new(ctx)));
    let report = annotator.run_pass();
    info!(?report, snapshot = %snapshot.display(), "Annotated snapshot");
    server.abort();

    let doc = doc.read();
    if tree {
        println!("{}", doc.dump(doc.root()));
        return Ok(());
    }

    let clusters = doc.query_all(doc.root(), &selectors::cluster());
    println!("{:<20} {:<40} {}", "ACCOUNT", "CLASSES", "CONTROLS");
    println!("{}", "-".repeat(72));
    for cluster in clusters {
        let target = doc.attr(cluster, "data-screen-name").unwrap_or("-");
        let classes = doc.attr(cluster, "class").unwrap_or("");
        let controls: Vec<&str> = doc
            .element_children(cluster)
            .into_iter()
            .filter_map(|button| doc.attr(button, "aria-label"))
            .collect();
        println!("{:<20} {:<40} {}", target, classes, controls.join(", "));
    }
    println!();
    println!(
        "{} attached ({} primary, {} reposts, {} quotes, {} rows, {} typeahead), {} failed",
        report.attached(),
        report.primary,
        report.reposts,
        report.quotes,
        report.rows,
        report.typeahead,
        report.failures
    );
    Ok(())
}
