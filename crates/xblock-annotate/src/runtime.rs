//! Wires the annotator to its store and starts every background task.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use xblock_dom::SharedDocument;
use xblock_protocols::{CookieSource, Settings};
use xblock_store::{IconStore, KeyValueStore, SettingsStore, StatsStore};

use crate::annotator::Annotator;
use crate::context::AnnotateContext;
use crate::controls::ControlFactory;
use crate::icons::{IconAcquirer, ProbeOutcome};
use crate::scheduler::{Scheduler, SchedulerMetrics};

/// The page's cookie string, read live from the document.
#[derive(Clone)]
pub struct DocumentCookies {
    doc: SharedDocument,
}

impl DocumentCookies {
    pub fn new(doc: SharedDocument) -> Self {
        Self { doc }
    }
}

impl CookieSource for DocumentCookies {
    fn cookie_string(&self) -> String {
        self.doc.read().cookie().to_string()
    }
}

/// Typed views of the external store the runtime reads and writes.
#[derive(Clone)]
pub struct RuntimeStores {
    pub settings: SettingsStore,
    pub stats: StatsStore,
    pub icons: IconStore,
}

impl RuntimeStores {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            settings: SettingsStore::new(store.clone()),
            stats: StatsStore::new(store.clone()),
            icons: IconStore::new(store),
        }
    }
}

/// A running annotator. Dropping it stops every task it started.
pub struct Runtime {
    ctx: Arc<AnnotateContext>,
    annotator: Arc<Annotator>,
    metrics: Arc<SchedulerMetrics>,
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Loads settings and cached icons, then starts scheduling, change
    /// watches, statistics recording and icon acquisition.
    pub async fn start(ctx: AnnotateContext, stores: RuntimeStores) -> Self {
        let settings = stores.settings.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        });
        ctx.set_settings(settings);

        match stores.icons.load().await {
            Ok(Some(pair)) => {
                ctx.icons().apply(&pair);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load cached icons"),
        }

        let ctx = Arc::new(ctx);
        let factory = ControlFactory::new(ctx.clone());
        let annotator = Arc::new(Annotator::new(factory.clone()));
        let scheduler = Scheduler::new(annotator.clone());
        let metrics = scheduler.metrics();
        let acquirer = IconAcquirer::new(factory.clone(), Some(stores.icons.clone()));

        let mut tasks = vec![
            scheduler.spawn(),
            Self::watch_settings(factory.clone(), &stores.settings),
            Self::watch_icons(factory.clone(), &stores.icons),
            Self::record_stats(&ctx, stores.stats.clone()),
            tokio::spawn(acquirer.clone().watch_layers()),
        ];
        if ctx.icons().is_empty() {
            let delay = ctx.timing().icon_probe_delay();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let outcome = acquirer.probe().await;
                if outcome != ProbeOutcome::Captured {
                    debug!(?outcome, "Icon probe finished without capture");
                }
            }));
        }

        info!(
            show_block = settings.show_block,
            show_mute = settings.show_mute,
            icons = !ctx.icons().is_empty(),
            "Annotator runtime started"
        );
        Self {
            ctx,
            annotator,
            metrics,
            tasks,
        }
    }

    fn watch_settings(factory: ControlFactory, store: &SettingsStore) -> JoinHandle<()> {
        let mut watch = store.watch();
        tokio::spawn(async move {
            while let Some(settings) = watch.changed().await {
                debug!(?settings, "Settings changed");
                let ctx = factory.context();
                ctx.set_settings(settings);
                ctx.mutate(|doc| factory.apply_visibility(doc));
            }
        })
    }

    fn watch_icons(factory: ControlFactory, store: &IconStore) -> JoinHandle<()> {
        let mut watch = store.watch();
        tokio::spawn(async move {
            while let Some(pair) = watch.changed().await {
                let ctx = factory.context();
                // A cleared record forgets what was learned.
                if pair.is_empty() {
                    if !ctx.icons().is_empty() {
                        info!("Learned icons cleared");
                        ctx.icons().reset();
                        ctx.mutate(|doc| factory.refresh_icons(doc));
                    }
                    continue;
                }
                if ctx.icons().apply(&pair) {
                    debug!("Icons pushed from store");
                    ctx.mutate(|doc| factory.refresh_icons(doc));
                }
            }
        })
    }

    fn record_stats(ctx: &AnnotateContext, stats: StatsStore) -> JoinHandle<()> {
        let mut completions = ctx.completions();
        tokio::spawn(async move {
            loop {
                match completions.recv().await {
                    Ok(action) => {
                        if let Err(e) = stats.record(action).await {
                            warn!(%action, error = %e, "Failed to record statistics");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Statistics recorder lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn context(&self) -> &Arc<AnnotateContext> {
        &self.ctx
    }

    pub fn annotator(&self) -> &Arc<Annotator> {
        &self.annotator
    }

    pub fn factory(&self) -> &ControlFactory {
        self.annotator.factory()
    }

    pub fn metrics(&self) -> &Arc<SchedulerMetrics> {
        &self.metrics
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
