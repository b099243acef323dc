//! Collapsing an acted-on item behind a one-line status bar with undo.

use std::sync::Arc;

use tracing::{debug, info, warn};
use xblock_dom::{Document, MutationOrigin, NodeId, Selector};
use xblock_protocols::{ControlKind, Identifier};

use crate::controls::ControlFactory;
use crate::error::{AnnotateError, Result};
use crate::selectors::{self, HIDDEN_BAR_CLASS};

const LABEL_CLASS: &str = "xblock-hidden-label";
const UNDO_CLASS: &str = "xblock-show-btn";
const IN_FLIGHT_TEXT: &str = "…";

/// A collapsed item: the bar, what it hides and the control to reset.
#[derive(Debug, Clone)]
pub(crate) struct HiddenBar {
    pub bar: NodeId,
    pub hidden: Vec<NodeId>,
    pub control: NodeId,
    pub kind: ControlKind,
    pub target: Identifier,
}

/// Collapses whatever owns the control at `button`: its quoted post when it
/// has one, otherwise the enclosing primary item. Other anchors stay as is.
pub(crate) fn collapse_owner(factory: &ControlFactory, doc: &mut Document, button: NodeId) -> Result<()> {
    let Some(control) = factory.control(button) else {
        return Ok(());
    };
    if let Some(block) = control.quoted_block {
        return hide_quoted(factory, doc, block, button);
    }
    match doc.closest(button, &selectors::primary_item()) {
        Some(item) => hide_item(factory, doc, item, button),
        None => Ok(()),
    }
}

/// Hides a primary item's content wrapper behind a bar.
pub(crate) fn hide_item(
    factory: &ControlFactory,
    doc: &mut Document,
    item: NodeId,
    button: NodeId,
) -> Result<()> {
    let has_bar = doc
        .element_children(item)
        .into_iter()
        .any(|child| doc.has_class(child, HIDDEN_BAR_CLASS));
    if has_bar {
        return Ok(());
    }
    let Some(content) = doc
        .element_children(item)
        .into_iter()
        .find(|child| doc.tag(*child) == Some("div"))
    else {
        return Ok(());
    };

    doc.set_style(content, "display", "none")?;
    let bar = build_bar(factory, doc, button, vec![content])?;
    doc.prepend_child(item, bar)?;
    Ok(())
}

/// Hides every child of a quoted post behind a bar.
pub(crate) fn hide_quoted(
    factory: &ControlFactory,
    doc: &mut Document,
    block: NodeId,
    button: NodeId,
) -> Result<()> {
    if doc.query(block, &selectors::hidden_bar()).is_some() {
        return Ok(());
    }
    let hidden = doc.element_children(block);
    for child in &hidden {
        doc.set_style(*child, "display", "none")?;
    }
    let bar = build_bar(factory, doc, button, hidden)?;
    doc.prepend_child(block, bar)?;
    Ok(())
}

fn build_bar(
    factory: &ControlFactory,
    doc: &mut Document,
    button: NodeId,
    hidden: Vec<NodeId>,
) -> Result<NodeId> {
    let control = factory
        .control(button)
        .ok_or(AnnotateError::MissingStructure("control state"))?;
    let messages = factory.context().messages();

    let bar = doc.create_element("div");
    doc.add_class(bar, HIDDEN_BAR_CLASS)?;

    let label = doc.create_element("span");
    doc.add_class(label, LABEL_CLASS)?;
    doc.set_text(label, &format!("{} @{}", messages.status(control.kind), control.target))?;
    doc.append_child(bar, label)?;

    let undo = doc.create_element("button");
    doc.add_class(undo, UNDO_CLASS)?;
    doc.set_text(undo, messages.undo_label(control.kind))?;
    doc.append_child(bar, undo)?;

    let weak = factory.downgrade();
    doc.on_click(
        undo,
        Arc::new(move |doc: &mut Document, _clicked: NodeId| {
            if let Some(factory) = ControlFactory::upgrade(&weak) {
                on_undo_click(&factory, doc, undo);
            }
        }),
    );

    debug!(target = %control.target, "Collapsed item");
    factory.inner.bars.lock().insert(
        undo,
        HiddenBar {
            bar,
            hidden,
            control: button,
            kind: control.kind,
            target: control.target,
        },
    );
    Ok(bar)
}

/// Finds the undo button inside a bar.
pub fn undo_button(doc: &Document, bar: NodeId) -> Option<NodeId> {
    doc.query(bar, &Selector::tag("button").class(UNDO_CLASS))
}

fn on_undo_click(factory: &ControlFactory, doc: &mut Document, undo: NodeId) {
    if doc.is_disabled(undo) {
        return;
    }
    let Some(entry) = factory.inner.bars.lock().get(&undo).cloned() else {
        return;
    };
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!("Undo clicked outside a runtime");
        return;
    };

    doc.with_origin(MutationOrigin::Extension, |doc| {
        let _ = doc.set_disabled(undo, true);
        let _ = doc.set_text(undo, IN_FLIGHT_TEXT);
    });

    let factory = factory.clone();
    handle.spawn(async move {
        let ctx = factory.context().clone();
        let action = entry.kind.undo_action();
        let outcome = ctx.bridge().perform(action, &entry.target).await;

        ctx.mutate(|doc| {
            let result = match outcome {
                Ok(_) => restore(&factory, doc, undo, &entry),
                Err(failure) => {
                    warn!(target = %entry.target, code = %failure.code, "Undo failed");
                    doc.set_disabled(undo, false)
                        .and_then(|_| doc.set_text(undo, ctx.messages().undo_label(entry.kind)))
                        .map_err(AnnotateError::from)
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to update hidden bar");
            }
        });
    });
}

fn restore(factory: &ControlFactory, doc: &mut Document, undo: NodeId, entry: &HiddenBar) -> Result<()> {
    let ctx = factory.context();
    info!(action = %entry.kind.undo_action(), target = %entry.target, "Undo succeeded");
    for node in &entry.hidden {
        doc.set_style(*node, "display", "")?;
    }
    factory.reset_control(doc, entry.control)?;
    doc.remove(entry.bar)?;
    factory.inner.bars.lock().remove(&undo);
    crate::toast::show(
        ctx,
        doc,
        &ctx.messages().toast(entry.kind.undo_action(), entry.target.as_str()),
    )?;
    Ok(())
}
