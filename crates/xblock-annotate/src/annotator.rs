//! One annotation pass over the four anchor categories.
//!
//! Primary items (with their quoted posts) come first, then relationship
//! rows, then typeahead rows. Every anchor is marked before it is worked on;
//! a failure clears the mark so a later pass retries it.

use tracing::{debug, trace, warn};
use xblock_dom::{Document, NodeId};
use xblock_protocols::Identifier;

use crate::controls::ControlFactory;
use crate::error::Result;
use crate::extract::{self, ActionRow};
use crate::selectors::{self, PROCESSED_ATTR};

const QUOTE_ROW_LEVELS: usize = 5;
const FOLLOW_ROW_LEVELS: usize = 4;

/// What a pass attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub primary: usize,
    pub reposts: usize,
    pub quotes: usize,
    pub rows: usize,
    pub typeahead: usize,
    /// Anchors whose processing failed and were unmarked.
    pub failures: usize,
}

impl PassReport {
    pub fn attached(&self) -> usize {
        self.primary + self.reposts + self.quotes + self.rows + self.typeahead
    }
}

/// Relationship row placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowContext {
    /// The profile header of the page being viewed.
    Profile,
    /// User cells, hover cards and anything unclassified.
    List,
}

impl RowContext {
    fn css_class(&self) -> &'static str {
        match self {
            Self::Profile => "xblock-profile",
            Self::List => "xblock-sidebar",
        }
    }
}

pub struct Annotator {
    factory: ControlFactory,
}

impl Annotator {
    pub fn new(factory: ControlFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &ControlFactory {
        &self.factory
    }

    /// Locks the document and runs one pass.
    pub fn run_pass(&self) -> PassReport {
        self.factory.context().mutate(|doc| self.pass(doc))
    }

    pub fn pass(&self, doc: &mut Document) -> PassReport {
        let viewer = self.factory.context().viewer(doc);
        let mut report = PassReport::default();

        self.process_primary_items(doc, viewer.as_ref(), &mut report);
        self.process_relationship_rows(doc, viewer.as_ref(), &mut report);
        self.process_typeahead(doc, viewer.as_ref(), &mut report);

        let pruned = self.factory.prune(doc);
        if report.attached() > 0 || report.failures > 0 || pruned > 0 {
            debug!(?report, pruned, "Annotation pass");
        }
        report
    }

    /// Marks `anchor`, runs `f`, and unmarks on failure.
    fn guarded(
        doc: &mut Document,
        anchor: NodeId,
        report: &mut PassReport,
        f: impl FnOnce(&mut Document, &mut PassReport) -> Result<()>,
    ) {
        if let Err(e) = doc.set_attr(anchor, PROCESSED_ATTR, "1") {
            warn!(%anchor, error = %e, "Failed to mark anchor");
            return;
        }
        if let Err(e) = f(doc, report) {
            warn!(%anchor, error = %e, "Annotation failed, will retry");
            let _ = doc.remove_attr(anchor, PROCESSED_ATTR);
            report.failures += 1;
        }
    }

    // ---- primary items ----

    fn process_primary_items(&self, doc: &mut Document, viewer: Option<&Identifier>, report: &mut PassReport) {
        let pending = selectors::primary_item().without_attr(PROCESSED_ATTR);
        for item in doc.query_all(doc.root(), &pending) {
            let rendered = doc.query(item, &selectors::user_name()).is_some()
                && doc.query(item, &selectors::caret()).is_some();
            if !rendered {
                trace!(%item, "Primary item not rendered yet");
                continue;
            }
            Self::guarded(doc, item, report, |doc, report| {
                self.annotate_item(doc, item, viewer, report)
            });
        }
    }

    fn annotate_item(
        &self,
        doc: &mut Document,
        item: NodeId,
        viewer: Option<&Identifier>,
        report: &mut PassReport,
    ) -> Result<()> {
        let repost = extract::repost_info(doc, item);
        if let Some(info) = &repost {
            if Some(&info.reposter) != viewer {
                if let Some(cluster) = self.factory.create_cluster(doc, &info.reposter, None)? {
                    doc.add_class(cluster, "xblock-tweet")?;
                    doc.add_class(cluster, "xblock-repost")?;
                    doc.add_class(info.link_parent, "xblock-repost-row")?;
                    doc.append_child(info.link_parent, cluster)?;
                    report.reposts += 1;
                }
            }
        }

        let author = extract::author_screen_name(doc, item, repost.is_some());
        if let Some(author) = author.filter(|a| Some(a) != viewer) {
            if let Some(row) = extract::find_action_row(doc, item) {
                if self.attach_author(doc, &author, row)? {
                    report.primary += 1;
                }
            }
        }

        self.process_quotes(doc, item, viewer, report);
        Ok(())
    }

    fn attach_author(&self, doc: &mut Document, author: &Identifier, found: ActionRow) -> Result<bool> {
        let Some(cluster) = self.factory.create_cluster(doc, author, None)? else {
            return Ok(false);
        };
        doc.add_class(cluster, "xblock-tweet")?;
        doc.set_style(cluster, "margin-left", "auto")?;

        let row = found.row;
        match found.grok {
            Some(grok) => match extract::child_containing(doc, row, grok) {
                Some(reference) => doc.insert_before(row, cluster, reference)?,
                None => doc.prepend_child(row, cluster)?,
            },
            None => match extract::child_containing(doc, row, found.caret) {
                Some(reference) => doc.insert_before(row, cluster, reference)?,
                None => doc.append_child(row, cluster)?,
            },
        }
        Ok(true)
    }

    // ---- quoted posts ----

    fn process_quotes(&self, doc: &mut Document, item: NodeId, viewer: Option<&Identifier>, report: &mut PassReport) {
        let own_identity = doc.query(item, &selectors::user_name());

        for block in doc.query_all(item, &selectors::quote_block()) {
            if doc.has_attr(block, PROCESSED_ATTR) {
                continue;
            }
            if doc.closest(block, &selectors::article()) != Some(item) {
                continue;
            }
            let Some(identity) = doc.query(block, &selectors::user_name()) else {
                continue;
            };
            if Some(identity) == own_identity {
                continue;
            }
            let Some(quoted) = extract::screen_name(doc, block).filter(|q| Some(q) != viewer) else {
                continue;
            };

            Self::guarded(doc, block, report, |doc, report| {
                if self.attach_quote(doc, block, identity, &quoted)? {
                    report.quotes += 1;
                }
                Ok(())
            });
        }
    }

    fn attach_quote(
        &self,
        doc: &mut Document,
        block: NodeId,
        identity: NodeId,
        quoted: &Identifier,
    ) -> Result<bool> {
        let Some(row) =
            extract::find_flex_row(doc, doc.parent_element(identity), QUOTE_ROW_LEVELS, Some(block))
        else {
            return Ok(false);
        };
        if doc.query(row, &selectors::cluster()).is_some() {
            return Ok(false);
        }
        let Some(cluster) = self.factory.create_cluster(doc, quoted, Some(block))? else {
            return Ok(false);
        };

        // Let the identity row span the quote so the cluster can sit at its end.
        let mut ancestor = Some(row);
        while let Some(node) = ancestor.filter(|n| *n != block) {
            doc.set_style(node, "flex-grow", "1")?;
            doc.set_style(node, "min-width", "0")?;
            ancestor = doc.parent_element(node);
        }

        doc.add_class(cluster, "xblock-tweet")?;
        doc.set_style(cluster, "margin-left", "auto")?;
        doc.set_style(cluster, "padding-left", "8px")?;
        doc.append_child(row, cluster)?;
        Ok(true)
    }

    // ---- relationship rows ----

    fn process_relationship_rows(
        &self,
        doc: &mut Document,
        viewer: Option<&Identifier>,
        report: &mut PassReport,
    ) {
        for affordance in doc.query_all(doc.root(), &selectors::follow_affordance()) {
            if doc.closest(affordance, &selectors::primary_item()).is_some() {
                continue;
            }
            Self::guarded(doc, affordance, report, |doc, report| {
                if self.attach_row(doc, affordance, viewer)? {
                    report.rows += 1;
                }
                Ok(())
            });
        }
    }

    fn attach_row(&self, doc: &mut Document, affordance: NodeId, viewer: Option<&Identifier>) -> Result<bool> {
        let hover_card = doc.closest(affordance, &selectors::hover_card());
        let user_cell = doc.closest(affordance, &selectors::user_cell());
        let placement = doc
            .closest(affordance, &selectors::placement())
            .filter(|_| user_cell.is_none() && hover_card.is_none());
        let context = if placement.is_some() {
            RowContext::Profile
        } else {
            RowContext::List
        };

        let subject = match placement {
            Some(_) => extract::profile_screen_name(doc),
            None => user_cell
                .or(hover_card)
                .or_else(|| doc.parent_element(affordance))
                .and_then(|scope| extract::screen_name(doc, scope)),
        };
        let Some(subject) = subject.filter(|s| Some(s) != viewer) else {
            return Ok(false);
        };

        let start = match placement {
            Some(placement) => doc.parent_element(placement),
            None => doc.parent_element(affordance),
        };
        let Some(row) = extract::find_flex_row(doc, start, FOLLOW_ROW_LEVELS, None) else {
            return Ok(false);
        };
        if doc.query(row, &selectors::cluster()).is_some() {
            return Ok(false);
        }
        let Some(follow_child) = extract::child_containing(doc, row, placement.unwrap_or(affordance)) else {
            return Ok(false);
        };
        let Some(cluster) = self.factory.create_cluster(doc, &subject, None)? else {
            return Ok(false);
        };
        doc.add_class(cluster, context.css_class())?;

        let wrapper = doc.create_element("div");
        doc.add_class(wrapper, "xblock-follow-wrapper")?;
        doc.insert_before(row, wrapper, follow_child)?;
        doc.append_child(wrapper, cluster)?;
        doc.append_child(wrapper, follow_child)?;
        doc.set_style(follow_child, "margin-left", "0")?;

        if context == RowContext::Profile {
            doc.set_style(cluster, "align-self", "flex-start")?;
            doc.set_style(cluster, "gap", "8px")?;
            doc.set_style(wrapper, "gap", "8px")?;
        }
        Ok(true)
    }

    // ---- typeahead ----

    fn process_typeahead(&self, doc: &mut Document, viewer: Option<&Identifier>, report: &mut PassReport) {
        for item in doc.query_all(doc.root(), &selectors::typeahead_item()) {
            // Plain query suggestions carry no avatar.
            if doc.query(item, &selectors::image()).is_none() {
                continue;
            }
            Self::guarded(doc, item, report, |doc, report| {
                if self.attach_typeahead(doc, item, viewer)? {
                    report.typeahead += 1;
                }
                Ok(())
            });
        }
    }

    fn attach_typeahead(&self, doc: &mut Document, item: NodeId, viewer: Option<&Identifier>) -> Result<bool> {
        let Some(subject) = extract::screen_name(doc, item).filter(|s| Some(s) != viewer) else {
            return Ok(false);
        };

        // item > div > row: [avatar] [text area > row: [name] [dismiss]]
        let row = doc
            .first_element_child(item)
            .and_then(|wrapper| doc.first_element_child(wrapper))
            .and_then(|container| doc.element_children(container).get(1).copied())
            .and_then(|text_area| doc.first_element_child(text_area));
        let Some(row) = row else {
            return Ok(false);
        };
        if doc.query(row, &selectors::cluster()).is_some() {
            return Ok(false);
        }

        let dismiss = doc
            .query(row, &selectors::button())
            .and_then(|button| extract::child_containing(doc, row, button));
        let Some(cluster) = self.factory.create_cluster(doc, &subject, None)? else {
            return Ok(false);
        };
        doc.add_class(cluster, "xblock-typeahead")?;
        match dismiss {
            Some(reference) => doc.insert_before(row, cluster, reference)?,
            None => doc.append_child(row, cluster)?,
        }
        Ok(true)
    }
}

#[cfg(test)]
#[path = "annotator_tests.rs"]
mod tests;
