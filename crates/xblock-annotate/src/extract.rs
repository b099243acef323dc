//! Structural extractors.
//!
//! Pure functions over the host tree: they read, never mutate, and report a
//! miss as `None`.

use std::sync::LazyLock;

use regex::Regex;
use xblock_dom::{Document, NodeId};
use xblock_protocols::Identifier;

use crate::selectors;

static HANDLE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([A-Za-z0-9_]{1,15})$").expect("valid regex"));
static HANDLE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z0-9_]{1,15})$").expect("valid regex"));
static STATUS_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([A-Za-z0-9_]{1,15})/status/").expect("valid regex"));

/// Top-level paths that look like profiles but are site sections.
const RESERVED_PATHS: &[&str] = &[
    "home",
    "explore",
    "search",
    "notifications",
    "messages",
    "settings",
    "i",
    "compose",
    "login",
    "logout",
    "signup",
    "tos",
    "privacy",
    "about",
    "help",
    "jobs",
    "download",
];

fn capture(re: &Regex, haystack: &str) -> Option<Identifier> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .and_then(|m| Identifier::parse(m.as_str()))
}

/// Identifier named by a `/<id>` path.
pub fn handle_from_path(path: &str) -> Option<Identifier> {
    capture(&HANDLE_PATH, path)
}

/// The subject identifier inside `scope`.
///
/// Tried in order: a role link to `/<id>`, a span reading `@<id>`, then any
/// link to `/<id>/status/...`.
pub fn screen_name(doc: &Document, scope: NodeId) -> Option<Identifier> {
    doc.query_all(scope, &selectors::role_link())
        .into_iter()
        .find_map(|link| doc.attr(link, "href").and_then(handle_from_path))
        .or_else(|| {
            doc.query_all(scope, &selectors::span())
                .into_iter()
                .find_map(|span| capture(&HANDLE_TEXT, &doc.text_content(span)))
        })
        .or_else(|| {
            doc.query_all(scope, &selectors::link_with_href())
                .into_iter()
                .find_map(|link| doc.attr(link, "href").and_then(|h| capture(&STATUS_PATH, h)))
        })
}

/// Identifier of the profile page being viewed, if the location is one.
pub fn profile_screen_name(doc: &Document) -> Option<Identifier> {
    let id = handle_from_path(&doc.pathname())?;
    let lowered = id.as_str().to_ascii_lowercase();
    (!RESERVED_PATHS.contains(&lowered.as_str())).then_some(id)
}

/// The signed-in viewer, read from the navigation's profile link.
pub fn viewer_screen_name(doc: &Document) -> Option<Identifier> {
    let link = doc.query(doc.root(), &selectors::profile_link())?;
    let href = doc.attr(link, "href")?;
    Identifier::parse(&href.replacen('/', "", 1))
}

/// The "reposted by" affordance of a primary item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepostInfo {
    pub reposter: Identifier,
    /// Direct parent of the reposter link, where the reposter's controls go.
    pub link_parent: NodeId,
}

/// Finds who reposted `item`. `None` means the item is a plain post.
pub fn repost_info(doc: &Document, item: NodeId) -> Option<RepostInfo> {
    let context = doc.query(item, &selectors::social_context())?;
    let link = doc.closest(context, &selectors::link_with_href())?;
    let reposter = doc.attr(link, "href").and_then(handle_from_path)?;
    let link_parent = doc.parent_element(link)?;
    Some(RepostInfo {
        reposter,
        link_parent,
    })
}

/// Author of the underlying post.
///
/// On a repost the search is confined to the identity block so the
/// reposter's link is never mistaken for the author.
pub fn author_screen_name(doc: &Document, item: NodeId, reposted: bool) -> Option<Identifier> {
    if reposted {
        let identity = doc.query(item, &selectors::user_name())?;
        screen_name(doc, identity)
    } else {
        screen_name(doc, item)
    }
}

pub fn is_flex_row(doc: &Document, node: NodeId) -> bool {
    doc.computed_style(node).is_some_and(|cs| cs.is_flex_row())
}

/// First flex row among `start` and up to `levels - 1` of its ancestors,
/// never climbing to `stop`.
pub fn find_flex_row(
    doc: &Document,
    start: Option<NodeId>,
    levels: usize,
    stop: Option<NodeId>,
) -> Option<NodeId> {
    std::iter::successors(start, |n| doc.parent_element(*n))
        .take(levels)
        .take_while(|n| Some(*n) != stop)
        .find(|n| is_flex_row(doc, *n))
}

/// Direct child of `parent` that is or contains `node`.
pub fn child_containing(doc: &Document, parent: NodeId, node: NodeId) -> Option<NodeId> {
    doc.element_children(parent)
        .into_iter()
        .find(|child| doc.contains(*child, node))
}

/// The action bar of a primary item and its anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRow {
    pub row: NodeId,
    pub grok: Option<NodeId>,
    pub caret: NodeId,
}

/// Minimum width separating the item-wide action bar from the narrow
/// wrapper right around the overflow affordance.
const ACTION_ROW_MIN_WIDTH: f64 = 200.0;
const ACTION_ROW_LEVELS: usize = 8;

/// Locates the row holding the overflow affordance.
///
/// A flex row containing an assistant button wins. Otherwise the first
/// flex row wider than the narrow caret wrapper is used.
pub fn find_action_row(doc: &Document, item: NodeId) -> Option<ActionRow> {
    let caret = doc.query(item, &selectors::caret())?;
    let climb = std::iter::successors(doc.parent_element(caret), |n| doc.parent_element(*n))
        .take(ACTION_ROW_LEVELS)
        .take_while(|n| *n != item);

    for node in climb {
        let Some(style) = doc.computed_style(node) else {
            continue;
        };
        if !style.is_flex_row() {
            continue;
        }
        if let Some(grok) = doc.query(node, &selectors::grok()) {
            return Some(ActionRow {
                row: node,
                grok: Some(grok),
                caret,
            });
        }
        if doc.contains(node, caret) && style.width > ACTION_ROW_MIN_WIDTH {
            return Some(ActionRow {
                row: node,
                grok: None,
                caret,
            });
        }
    }
    None
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
