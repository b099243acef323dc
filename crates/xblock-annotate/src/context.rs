//! Process-scoped state shared by every part of the annotator.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use xblock_config::TimingConfig;
use tracing::debug;
use xblock_dom::{Document, MutationOrigin, SharedDocument};
use xblock_protocols::{
    ActionBridge, ActionKind, AlwaysConfirm, ConfirmPrompt, Identifier, Messages, Settings,
};

use crate::extract;
use crate::icons::IconCache;

const COMPLETIONS_CAPACITY: usize = 64;

/// Settings, icons and the cached viewer identity, plus the collaborators a
/// control needs. Settings and icons are only written through the runtime's
/// change notifications and the icon acquirer.
pub struct AnnotateContext {
    doc: SharedDocument,
    bridge: Arc<dyn ActionBridge>,
    confirm: Arc<dyn ConfirmPrompt>,
    messages: Messages,
    timing: TimingConfig,
    settings: RwLock<Settings>,
    icons: IconCache,
    viewer: Mutex<Option<Identifier>>,
    completions: broadcast::Sender<ActionKind>,
}

impl AnnotateContext {
    pub fn new(
        doc: SharedDocument,
        bridge: Arc<dyn ActionBridge>,
        messages: Messages,
        timing: TimingConfig,
    ) -> Self {
        let (completions, _) = broadcast::channel(COMPLETIONS_CAPACITY);
        Self {
            doc,
            bridge,
            confirm: Arc::new(AlwaysConfirm),
            messages,
            timing,
            settings: RwLock::new(Settings::default()),
            icons: IconCache::default(),
            viewer: Mutex::new(None),
            completions,
        }
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn ConfirmPrompt>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_settings(self, settings: Settings) -> Self {
        *self.settings.write() = settings;
        self
    }

    pub fn doc(&self) -> &SharedDocument {
        &self.doc
    }

    pub fn bridge(&self) -> &Arc<dyn ActionBridge> {
        &self.bridge
    }

    pub fn confirm(&self) -> &dyn ConfirmPrompt {
        self.confirm.as_ref()
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn settings(&self) -> Settings {
        *self.settings.read()
    }

    pub fn set_settings(&self, settings: Settings) {
        *self.settings.write() = settings;
    }

    pub fn icons(&self) -> &IconCache {
        &self.icons
    }

    /// The signed-in viewer, resolved once and cached.
    pub fn viewer(&self, doc: &Document) -> Option<Identifier> {
        let mut cached = self.viewer.lock();
        if cached.is_none() {
            *cached = extract::viewer_screen_name(doc);
        }
        cached.clone()
    }

    /// Completion notifications: one per successful non-undo action.
    pub fn completions(&self) -> broadcast::Receiver<ActionKind> {
        self.completions.subscribe()
    }

    pub(crate) fn notify_completed(&self, action: ActionKind) {
        let _ = self.completions.send(action);
    }

    /// Runs `f` under the document lock with its mutations tagged as ours.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut doc = self.doc.write();
        doc.with_origin(MutationOrigin::Extension, f)
    }

    /// Runs `f` like [`Self::mutate`] once `delay` has elapsed.
    ///
    /// Outside a Tokio runtime nothing is scheduled and `false` is returned.
    pub(crate) fn after(
        &self,
        delay: Duration,
        f: impl FnOnce(&mut Document) + Send + 'static,
    ) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime, dropping delayed DOM update");
            return false;
        };
        let doc = self.doc.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut doc = doc.write();
            doc.with_origin(MutationOrigin::Extension, f);
        });
        true
    }
}
