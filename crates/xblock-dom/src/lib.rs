//! # xblock DOM
//!
//! An arena model of the host page: element and text nodes, attributes,
//! inline style plus the layout the host computed for each element, child-list
//! mutation records, host click handlers, the cookie string and the location.
//!
//! The annotator never owns this tree. It reads it, marks anchors on it and
//! attaches its own nodes, while the host keeps mutating it underneath.

mod document;
mod error;
mod mutation;
mod node;
mod selector;
mod spec;
mod style;

use std::sync::Arc;

use parking_lot::RwLock;

pub use document::{ClickHandler, Document};
pub use error::DomError;
pub use mutation::{MutationOrigin, MutationRecord};
pub use node::{Element, NodeId, NodeKind};
pub use selector::Selector;
pub use spec::{ElementSpec, NodeSpec, PageSpec};
pub use style::{ComputedStyle, Display, FlexDirection, InlineStyle, Layout};

/// The page tree as shared between the host simulation and the annotator.
pub type SharedDocument = Arc<RwLock<Document>>;

pub fn shared(document: Document) -> SharedDocument {
    Arc::new(RwLock::new(document))
}
