//! Icon acquisition.
//!
//! The block and mute glyphs are learned from the host's own overflow menu,
//! either passively when the user opens it or by one hidden probe at startup
//! when nothing is cached. Learned icons are persisted and pushed to every
//! control still showing an icon.

use std::collections::HashSet;
use std::sync::LazyLock;

use parking_lot::RwLock;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use xblock_dom::{Document, MutationRecord, NodeId};
use xblock_protocols::{ControlKind, IconPair};
use xblock_store::IconStore;

use crate::controls::ControlFactory;
use crate::selectors::{self, LAYERS_ID};

/// Shown on a control whose action succeeded.
pub const CHECK_ICON: &str = concat!(
    r#"<svg viewBox="0 0 24 24" width="20" height="20">"#,
    r#"<path d="M9 16.17L4.83 12l-1.42 1.41L9 19 21 7l-1.41-1.41L9 16.17z" fill="currentColor"/>"#,
    "</svg>"
);

static BLOCK_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bBlock\b|ブロック").expect("valid regex"));
static BLOCK_EXCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Unblock|ブロック解除").expect("valid regex"));
static MUTE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bMute\b|ミュート").expect("valid regex"));
static MUTE_EXCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Unmute|ミュート解除|conversation|会話").expect("valid regex"));

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Wraps raw path data into a 20px glyph.
pub fn icon_markup(path_data: &str) -> String {
    format!(
        r#"<svg viewBox="0 0 24 24" width="20" height="20"><path d="{}" fill="currentColor"/></svg>"#,
        escape_attr(path_data)
    )
}

/// Whether a menu item's text announces `kind` (and not its inverse).
pub fn matches_kind(kind: ControlKind, text: &str) -> bool {
    match kind {
        ControlKind::Block => BLOCK_TEXT.is_match(text) && !BLOCK_EXCLUDE.is_match(text),
        ControlKind::Mute => MUTE_TEXT.is_match(text) && !MUTE_EXCLUDE.is_match(text),
    }
}

/// Icons found among `items`, first match per kind.
pub fn extract_icons(doc: &Document, items: &[NodeId]) -> IconPair {
    let mut found = IconPair::default();
    for item in items {
        let Some(path) = doc.query(*item, &selectors::svg_path()) else {
            continue;
        };
        let Some(data) = doc.attr(path, "d").filter(|d| !d.is_empty()) else {
            continue;
        };
        let text = doc.text_content(*item);
        for kind in ControlKind::ALL {
            if found.get(kind).is_none() && matches_kind(kind, &text) {
                found.set(kind, icon_markup(data));
            }
        }
    }
    found
}

/// The icons every control draws from.
#[derive(Debug, Default)]
pub struct IconCache {
    pair: RwLock<IconPair>,
}

impl IconCache {
    pub fn pair(&self) -> IconPair {
        self.pair.read().clone()
    }

    /// Markup for `kind`, empty while unknown.
    pub fn markup(&self, kind: ControlKind) -> String {
        self.pair.read().get(kind).unwrap_or_default().to_string()
    }

    pub fn is_complete(&self) -> bool {
        self.pair.read().is_complete()
    }

    pub fn is_empty(&self) -> bool {
        self.pair.read().is_empty()
    }

    /// Applies icons pushed from the store. Empty entries keep what we have.
    pub fn apply(&self, incoming: &IconPair) -> bool {
        let mut pair = self.pair.write();
        let mut changed = false;
        for kind in ControlKind::ALL {
            if let Some(markup) = incoming.get(kind) {
                if pair.get(kind) != Some(markup) {
                    pair.set(kind, markup.to_string());
                    changed = true;
                }
            }
        }
        changed
    }

    /// Fills kinds still missing. A kind once learned is never replaced here.
    pub fn learn(&self, found: &IconPair) -> bool {
        let mut pair = self.pair.write();
        let mut changed = false;
        for kind in ControlKind::ALL {
            if pair.get(kind).is_none() {
                if let Some(markup) = found.get(kind) {
                    pair.set(kind, markup.to_string());
                    changed = true;
                }
            }
        }
        changed
    }

    /// Forgets every learned icon.
    pub fn reset(&self) {
        *self.pair.write() = IconPair::default();
    }
}

/// Result of one active probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Both icons were already known.
    Skipped,
    /// The menu opened and at least one icon was learned.
    Captured,
    /// The menu opened but held nothing new.
    NoMatch,
    /// No menu appeared within the probe window.
    TimedOut,
    /// The overflow affordance or overlay never showed up.
    Unavailable,
}

/// Learns icons and publishes them to the controls and the store.
#[derive(Clone)]
pub struct IconAcquirer {
    factory: ControlFactory,
    store: Option<IconStore>,
}

impl IconAcquirer {
    pub fn new(factory: ControlFactory, store: Option<IconStore>) -> Self {
        Self { factory, store }
    }

    /// Extracts from the menu items currently in the tree.
    ///
    /// Returns the full pair when something new was learned.
    pub fn harvest(&self, doc: &mut Document) -> Option<IconPair> {
        let items = doc.query_all(doc.root(), &selectors::menu_item());
        if items.is_empty() {
            return None;
        }
        let found = extract_icons(doc, &items);
        let icons = self.factory.context().icons();
        if !icons.learn(&found) {
            return None;
        }
        info!(complete = icons.is_complete(), "Learned icons from host menu");
        self.factory.refresh_icons(doc);
        Some(icons.pair())
    }

    async fn persist(&self, pair: &IconPair) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(pair).await {
                warn!(error = %e, "Failed to persist icons");
            }
        }
    }

    /// Subscribes to the overlay container, retrying until it exists.
    async fn attach_layers(&self) -> (NodeId, mpsc::UnboundedReceiver<MutationRecord>) {
        let ctx = self.factory.context();
        loop {
            {
                let mut doc = ctx.doc().write();
                if let Some(layers) = doc.element_by_id(LAYERS_ID) {
                    return (layers, doc.observe());
                }
            }
            tokio::time::sleep(ctx.timing().layers_retry()).await;
        }
    }

    fn within(&self, layers: NodeId, record: &MutationRecord) -> bool {
        record.is_host() && self.factory.context().doc().read().contains(layers, record.target)
    }

    /// Passive mode: learn from menus the user opens whenever an icon is
    /// missing. Stays attached after both are known so a reset can be
    /// relearned.
    pub async fn watch_layers(self) {
        let ctx = self.factory.context().clone();
        let (layers, mut rx) = self.attach_layers().await;
        debug!("Watching overlay for menus");

        while let Some(record) = rx.recv().await {
            if ctx.icons().is_complete() || !self.within(layers, &record) {
                continue;
            }
            tokio::time::sleep(ctx.timing().passive_icon_delay()).await;
            // One harvest covers everything that arrived while waiting.
            while rx.try_recv().is_ok() {}
            let learned = ctx.mutate(|doc| self.harvest(doc));
            if let Some(pair) = learned {
                self.persist(&pair).await;
            }
        }
        debug!("Overlay observation closed");
    }

    /// Active mode: open the first overflow menu out of sight and read it.
    ///
    /// Retries while the affordance or the overlay is missing. Elements the
    /// menu added are hidden, not removed, since the host still owns them.
    pub async fn probe(&self) -> ProbeOutcome {
        let ctx = self.factory.context().clone();
        let timing = ctx.timing().clone();

        for attempt in 0..=timing.icon_probe_retries {
            if ctx.icons().is_complete() {
                return ProbeOutcome::Skipped;
            }
            if attempt > 0 {
                tokio::time::sleep(timing.icon_probe_retry()).await;
            }

            let opened = {
                let mut doc = ctx.doc().write();
                let caret = doc.query(doc.root(), &selectors::caret());
                let layers = doc.element_by_id(LAYERS_ID);
                match (caret, layers) {
                    (Some(caret), Some(layers)) => {
                        let before: HashSet<NodeId> = doc.element_children(layers).into_iter().collect();
                        doc.with_origin(xblock_dom::MutationOrigin::Extension, |doc| {
                            doc.set_style(layers, "visibility", "hidden")
                        })
                        .ok();
                        let rx = doc.observe();
                        if let Err(e) = doc.click(caret) {
                            warn!(error = %e, "Failed to open overflow menu");
                        }
                        Some((layers, before, rx))
                    }
                    _ => None,
                }
            };

            let Some((layers, before, rx)) = opened else {
                debug!(attempt, "Overflow affordance not ready");
                continue;
            };
            return self.finish_probe(layers, before, rx).await;
        }
        info!("Icon probe gave up");
        ProbeOutcome::Unavailable
    }

    async fn finish_probe(
        &self,
        layers: NodeId,
        before: HashSet<NodeId>,
        mut rx: mpsc::UnboundedReceiver<MutationRecord>,
    ) -> ProbeOutcome {
        let ctx = self.factory.context().clone();
        let menu_item = selectors::menu_item();

        let appeared = tokio::time::timeout(ctx.timing().icon_probe_window(), async {
            while let Some(record) = rx.recv().await {
                if !self.within(layers, &record) {
                    continue;
                }
                let doc = ctx.doc().read();
                if doc.query(doc.root(), &menu_item).is_some() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);
        drop(rx);

        if !appeared {
            ctx.mutate(|doc| {
                let _ = doc.set_style(layers, "visibility", "");
            });
            warn!("Overflow menu did not open in time");
            return ProbeOutcome::TimedOut;
        }

        let learned = ctx.mutate(|doc| {
            let learned = self.harvest(doc);
            let _ = doc.set_style(layers, "visibility", "");
            for child in doc.element_children(layers) {
                if !before.contains(&child) {
                    let _ = doc.set_style(child, "display", "none");
                }
            }
            learned
        });

        match learned {
            Some(pair) => {
                self.persist(&pair).await;
                ProbeOutcome::Captured
            }
            None => ProbeOutcome::NoMatch,
        }
    }
}

#[cfg(test)]
#[path = "icons_tests.rs"]
mod tests;
