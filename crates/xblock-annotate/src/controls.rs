//! Control clusters and their visual state machine.
//!
//! A control moves `idle -> pending -> success | error`. Success on a
//! forward action flips it active, shows the check icon and later collapses
//! the owning item behind a hidden bar. Success on the inverse action returns
//! it to idle. Errors show the failure as the tooltip and clear themselves.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use xblock_dom::{Document, NodeId};
use xblock_protocols::{
    ActionErrorCode, ActionKind, ActionOutcome, ControlKind, Identifier, MessageKey,
};

use crate::collapse;
use crate::context::AnnotateContext;
use crate::error::Result;
use crate::icons::CHECK_ICON;
use crate::selectors::{self, BUTTON_CLASS, CLUSTER_CLASS};

pub const LOADING_CLASS: &str = "xblock-loading";
pub const SUCCESS_CLASS: &str = "xblock-success";
pub const ERROR_CLASS: &str = "xblock-error";

/// Per-control state. Lives as long as the factory keeps the button
/// registered; [`ControlFactory::prune`] drops detached ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: ControlKind,
    pub target: Identifier,
    pub cluster: NodeId,
    pub active: bool,
    pub pending: bool,
    pub error: Option<ActionErrorCode>,
    /// Set when the cluster sits in a quoted post, which is what collapses.
    pub quoted_block: Option<NodeId>,
    error_epoch: u64,
}

pub(crate) struct FactoryInner {
    ctx: Arc<AnnotateContext>,
    controls: Mutex<HashMap<NodeId, Control>>,
    pub(crate) bars: Mutex<HashMap<NodeId, collapse::HiddenBar>>,
}

/// Builds control clusters and drives every control's state.
#[derive(Clone)]
pub struct ControlFactory {
    pub(crate) inner: Arc<FactoryInner>,
}

impl ControlFactory {
    pub fn new(ctx: Arc<AnnotateContext>) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                ctx,
                controls: Mutex::new(HashMap::new()),
                bars: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn context(&self) -> &Arc<AnnotateContext> {
        &self.inner.ctx
    }

    pub(crate) fn downgrade(&self) -> Weak<FactoryInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<FactoryInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn control(&self, button: NodeId) -> Option<Control> {
        self.inner.controls.lock().get(&button).cloned()
    }

    /// Registered buttons targeting `target`.
    pub fn buttons_for(&self, target: &Identifier) -> Vec<NodeId> {
        let mut buttons: Vec<NodeId> = self
            .inner
            .controls
            .lock()
            .iter()
            .filter(|(_, c)| c.target == *target)
            .map(|(id, _)| *id)
            .collect();
        buttons.sort_by_key(|id| id.index());
        buttons
    }

    pub fn control_count(&self) -> usize {
        self.inner.controls.lock().len()
    }

    /// Drops state for buttons no longer in the tree.
    pub fn prune(&self, doc: &Document) -> usize {
        let mut controls = self.inner.controls.lock();
        let before = controls.len();
        controls.retain(|button, _| doc.is_connected(*button));
        self.inner
            .bars
            .lock()
            .retain(|undo, _| doc.is_connected(*undo));
        before - controls.len()
    }

    fn icon_markup(&self, kind: ControlKind) -> String {
        self.inner.ctx.icons().markup(kind)
    }

    /// Builds a detached cluster for `target` with one button per enabled
    /// kind. `None` when every kind is disabled.
    pub fn create_cluster(
        &self,
        doc: &mut Document,
        target: &Identifier,
        quoted_block: Option<NodeId>,
    ) -> Result<Option<NodeId>> {
        let settings = self.inner.ctx.settings();
        let kinds: Vec<ControlKind> = ControlKind::ALL
            .into_iter()
            .filter(|kind| settings.shows(*kind))
            .collect();
        if kinds.is_empty() {
            return Ok(None);
        }

        let cluster = doc.create_element("div");
        doc.add_class(cluster, CLUSTER_CLASS)?;
        doc.set_attr(cluster, "data-screen-name", target.as_str())?;

        for kind in kinds {
            let button = self.create_button(doc, target, kind)?;
            doc.append_child(cluster, button)?;
            self.inner.controls.lock().insert(
                button,
                Control {
                    kind,
                    target: target.clone(),
                    cluster,
                    active: false,
                    pending: false,
                    error: None,
                    quoted_block,
                    error_epoch: 0,
                },
            );
        }
        Ok(Some(cluster))
    }

    fn create_button(&self, doc: &mut Document, target: &Identifier, kind: ControlKind) -> Result<NodeId> {
        let messages = self.inner.ctx.messages();
        let label = format!("{} @{}", messages.label(kind), target);

        let button = doc.create_element("button");
        doc.add_class(button, BUTTON_CLASS)?;
        doc.add_class(button, kind.css_class())?;
        doc.set_attr(button, "aria-label", &label)?;
        doc.set_attr(button, "title", &label)?;
        doc.set_markup(button, &self.icon_markup(kind))?;

        let weak = self.downgrade();
        doc.on_click(
            button,
            Arc::new(move |doc: &mut Document, _clicked: NodeId| {
                if let Some(factory) = ControlFactory::upgrade(&weak) {
                    factory.on_click(doc, button);
                }
            }),
        );
        Ok(button)
    }

    /// Synchronous half of a click: enter `pending` and hand the request to
    /// a task.
    fn on_click(&self, doc: &mut Document, button: NodeId) {
        if doc.is_disabled(button) {
            return;
        }
        let Some((action, confirm_first)) = self.begin(button) else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("Control clicked outside a runtime");
            self.release(button);
            return;
        };

        doc.with_origin(xblock_dom::MutationOrigin::Extension, |doc| {
            let _ = doc.set_disabled(button, true);
            let _ = doc.add_class(button, LOADING_CLASS);
        });

        let factory = self.clone();
        handle.spawn(async move {
            factory.run_click(button, action, confirm_first).await;
        });
    }

    fn begin(&self, button: NodeId) -> Option<(ActionKind, bool)> {
        let mut controls = self.inner.controls.lock();
        let control = controls.get_mut(&button)?;
        if control.pending {
            return None;
        }
        control.pending = true;

        let action = if control.active {
            control.kind.undo_action()
        } else {
            control.kind.action()
        };
        let confirm_first = self.inner.ctx.settings().confirm_block_following
            && control.kind == ControlKind::Block
            && !control.active;
        Some((action, confirm_first))
    }

    fn release(&self, button: NodeId) {
        if let Some(control) = self.inner.controls.lock().get_mut(&button) {
            control.pending = false;
        }
    }

    async fn run_click(&self, button: NodeId, action: ActionKind, confirm_first: bool) {
        let ctx = self.inner.ctx.clone();
        let Some(target) = self.control(button).map(|c| c.target) else {
            return;
        };

        if confirm_first && ctx.bridge().is_following(&target).await {
            ctx.mutate(|doc| {
                let _ = doc.remove_class(button, LOADING_CLASS);
                let _ = doc.set_disabled(button, false);
            });
            let prompt = ctx
                .messages()
                .format(MessageKey::ConfirmBlockFollowing, target.as_str());
            if !ctx.confirm().confirm(&prompt) {
                debug!(%target, "Block of followed account declined");
                self.release(button);
                return;
            }
            ctx.mutate(|doc| {
                let _ = doc.set_disabled(button, true);
                let _ = doc.add_class(button, LOADING_CLASS);
            });
        }

        let outcome = ctx.bridge().perform(action, &target).await;
        ctx.mutate(|doc| {
            if let Err(e) = self.finish(doc, button, action, outcome) {
                warn!(%target, error = %e, "Failed to update control");
            }
        });
    }

    fn finish(
        &self,
        doc: &mut Document,
        button: NodeId,
        action: ActionKind,
        outcome: ActionOutcome,
    ) -> Result<()> {
        let ctx = &self.inner.ctx;
        let messages = ctx.messages();
        doc.remove_class(button, LOADING_CLASS)?;
        doc.set_disabled(button, false)?;

        let Some(control) = self.settle(button, action, &outcome) else {
            return Ok(());
        };
        let kind = control.kind;
        let target = control.target.clone();

        match outcome {
            Ok(_) if !action.is_undo() => {
                info!(%action, %target, "Action succeeded");
                doc.add_class(button, SUCCESS_CLASS)?;
                doc.set_markup(button, CHECK_ICON)?;
                doc.set_attr(button, "title", &format!("{} @{}", messages.status(kind), target))?;
                ctx.notify_completed(action);
                crate::toast::show(ctx, doc, &messages.toast(action, target.as_str()))?;

                let weak = self.downgrade();
                ctx.after(ctx.timing().collapse_delay(), move |doc| {
                    let Some(factory) = ControlFactory::upgrade(&weak) else {
                        return;
                    };
                    // Undone in the meantime.
                    if factory.control(button).is_some_and(|c| c.active) {
                        if let Err(e) = collapse::collapse_owner(&factory, doc, button) {
                            warn!(error = %e, "Failed to collapse item");
                        }
                    }
                });
            }
            Ok(_) => {
                info!(%action, %target, "Undo succeeded");
                self.reset_visual(doc, button, kind, &target)?;
            }
            Err(failure) => {
                warn!(%action, %target, code = %failure.code, "Action failed");
                doc.add_class(button, ERROR_CLASS)?;
                let title = if failure.message.is_empty() {
                    messages.get(MessageKey::ErrorGeneric).to_string()
                } else {
                    failure.message
                };
                doc.set_attr(button, "title", &title)?;

                let epoch = control.error_epoch;
                let weak = self.downgrade();
                ctx.after(ctx.timing().error_clear(), move |doc| {
                    if let Some(factory) = ControlFactory::upgrade(&weak) {
                        factory.clear_error(doc, button, epoch);
                    }
                });
            }
        }
        Ok(())
    }

    /// Records the outcome in the control's state and returns the new state.
    fn settle(&self, button: NodeId, action: ActionKind, outcome: &ActionOutcome) -> Option<Control> {
        let mut controls = self.inner.controls.lock();
        let control = controls.get_mut(&button)?;
        control.pending = false;
        match outcome {
            Ok(_) => {
                control.active = !action.is_undo();
                control.error = None;
            }
            Err(failure) => {
                control.error = Some(failure.code);
                control.error_epoch += 1;
            }
        }
        Some(control.clone())
    }

    fn clear_error(&self, doc: &mut Document, button: NodeId, epoch: u64) {
        let mut controls = self.inner.controls.lock();
        let Some(control) = controls.get_mut(&button) else {
            return;
        };
        if control.error_epoch != epoch {
            return;
        }
        control.error = None;
        let _ = doc.remove_class(button, ERROR_CLASS);
    }

    /// Returns a control to idle: no success mark, its own icon and label.
    pub(crate) fn reset_visual(
        &self,
        doc: &mut Document,
        button: NodeId,
        kind: ControlKind,
        target: &Identifier,
    ) -> Result<()> {
        let label = format!("{} @{}", self.inner.ctx.messages().label(kind), target);
        doc.remove_class(button, SUCCESS_CLASS)?;
        doc.set_markup(button, &self.icon_markup(kind))?;
        doc.set_attr(button, "title", &label)?;
        Ok(())
    }

    /// Marks `button` idle after an undo performed elsewhere.
    pub(crate) fn reset_control(&self, doc: &mut Document, button: NodeId) -> Result<()> {
        let control = {
            let mut controls = self.inner.controls.lock();
            let Some(control) = controls.get_mut(&button) else {
                return Ok(());
            };
            control.active = false;
            control.clone()
        };
        self.reset_visual(doc, button, control.kind, &control.target)
    }

    /// Rewrites the icon of every button not showing the check mark.
    pub fn refresh_icons(&self, doc: &mut Document) {
        for kind in ControlKind::ALL {
            let markup = self.icon_markup(kind);
            let buttons = doc.query_all(
                doc.root(),
                &selectors::button().class(BUTTON_CLASS).class(kind.css_class()),
            );
            for button in buttons {
                if !doc.has_class(button, SUCCESS_CLASS) {
                    let _ = doc.set_markup(button, &markup);
                }
            }
        }
    }

    /// Shows or hides every button per the current settings, hiding clusters
    /// left without a visible button.
    pub fn apply_visibility(&self, doc: &mut Document) {
        let settings = self.inner.ctx.settings();
        for kind in ControlKind::ALL {
            let display = if settings.shows(kind) { "" } else { "none" };
            for button in doc.query_all(doc.root(), &selectors::button().class(kind.css_class())) {
                let _ = doc.set_style(button, "display", display);
            }
        }
        for cluster in doc.query_all(doc.root(), &selectors::cluster()) {
            let visible = doc
                .query_all(cluster, &selectors::button().class(BUTTON_CLASS))
                .into_iter()
                .any(|b| doc.style(b, "display") != Some("none"));
            let _ = doc.set_style(cluster, "display", if visible { "" } else { "none" });
        }
    }
}

#[cfg(test)]
#[path = "controls_tests.rs"]
mod tests;
