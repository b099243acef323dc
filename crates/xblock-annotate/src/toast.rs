//! Transient notifications.

use xblock_dom::{Document, NodeId};

use crate::context::AnnotateContext;
use crate::error::Result;
use crate::selectors::{self, TOAST_CLASS};

const HIDING_CLASS: &str = "xblock-toast-hide";

/// Shows `message`, replacing any toast still on screen.
///
/// The toast is marked hiding after the display time and removed once the
/// fade time has also passed.
pub fn show(ctx: &AnnotateContext, doc: &mut Document, message: &str) -> Result<NodeId> {
    for existing in doc.query_all(doc.body(), &selectors::toast()) {
        doc.remove(existing)?;
    }

    let toast = doc.create_element("div");
    doc.add_class(toast, TOAST_CLASS)?;
    doc.set_text(toast, message)?;
    doc.append_child(doc.body(), toast)?;

    let timing = ctx.timing();
    ctx.after(timing.toast(), move |doc| {
        let _ = doc.add_class(toast, HIDING_CLASS);
    });
    ctx.after(timing.toast() + timing.toast_fade(), move |doc| {
        let _ = doc.remove(toast);
    });
    Ok(toast)
}
