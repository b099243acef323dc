//! The arena document.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::DomError;
use crate::mutation::{MutationOrigin, MutationRecord};
use crate::node::{Element, Node, NodeId, NodeKind};
use crate::selector::Selector;
use crate::spec::{NodeSpec, PageSpec};
use crate::style::{ComputedStyle, Display, InlineStyle, Layout};

/// Host behavior attached to a node, run when the node or a descendant is clicked.
pub type ClickHandler = Arc<dyn Fn(&mut Document, NodeId) + Send + Sync>;

pub type Result<T> = std::result::Result<T, DomError>;

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    location: String,
    cookie: String,
    origin: MutationOrigin,
    observers: Vec<mpsc::UnboundedSender<MutationRecord>>,
    click_handlers: HashMap<NodeId, Vec<ClickHandler>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("location", &self.location)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Document {
    pub fn new(location: impl Into<String>) -> Self {
        let mut doc = Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
            body: NodeId(0),
            location: location.into(),
            cookie: String::new(),
            origin: MutationOrigin::Host,
            observers: Vec::new(),
            click_handlers: HashMap::new(),
        };
        let body = doc.alloc(NodeKind::Element(Element::new("body")));
        doc.nodes[body.0].parent = Some(doc.root);
        doc.nodes[doc.root.0].children.push(body);
        doc.body = body;
        doc
    }

    /// Builds a document from a snapshot.
    pub fn from_page(page: &PageSpec) -> Result<Self> {
        let mut doc = Self::new(page.url.clone());
        doc.cookie = page.cookie.clone();
        let body = doc.body;
        for child in &page.body {
            doc.build(body, child)?;
        }
        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // ---- location and cookies ----

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Client-side navigation. Does not produce a mutation record.
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    /// Path component of the location, `/` when it cannot be parsed.
    pub fn pathname(&self) -> String {
        url::Url::parse(&self.location)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn set_cookie(&mut self, cookie: impl Into<String>) {
        self.cookie = cookie.into();
    }

    // ---- observation ----

    /// Subscribes to every child-list mutation from now on.
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn origin(&self) -> MutationOrigin {
        self.origin
    }

    /// Runs `f` with every mutation it makes tagged as `origin`.
    pub fn with_origin<R>(&mut self, origin: MutationOrigin, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.origin, origin);
        let result = f(self);
        self.origin = previous;
        result
    }

    fn notify(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        let record = MutationRecord {
            target,
            added,
            removed,
            origin: self.origin,
        };
        self.observers.retain(|tx| tx.send(record.clone()).is_ok());
    }

    // ---- node creation ----

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element::new(tag)))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// Instantiates `spec` and appends it to `parent`.
    pub fn build(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId> {
        let id = self.instantiate(spec);
        self.append_child(parent, id)?;
        Ok(id)
    }

    fn instantiate(&mut self, spec: &NodeSpec) -> NodeId {
        match spec {
            NodeSpec::Text(text) => self.create_text(text),
            NodeSpec::Element(el) => {
                let mut element = Element::new(&el.tag);
                element.attrs = el.attrs.clone();
                element.layout = el.layout;
                element.style = el.style.iter().collect::<InlineStyle>();
                element.disabled = el.attrs.contains_key("disabled");
                let id = self.alloc(NodeKind::Element(element));
                for child in &el.children {
                    let child_id = self.instantiate(child);
                    self.nodes[child_id.0].parent = Some(id);
                    self.nodes[id.0].children.push(child_id);
                }
                id
            }
        }
    }

    // ---- structure ----

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Ok(el),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Parent when it is an element, mirroring `parentElement`.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|c| self.is_element(*c))
    }

    /// Whether `node` is `ancestor` or inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors_inclusive(node).any(|n| n == ancestor)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id).filter(|id| id.0 < self.nodes.len()), |n| {
            self.parent(*n)
        })
    }

    fn can_have_children(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Document | NodeKind::Element(_)))
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if !self.can_have_children(parent) {
            return Err(DomError::NotAContainer(parent));
        }
        if child == self.root {
            return Err(DomError::RootImmutable);
        }
        if self.contains(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.nodes[child.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
            self.notify(old_parent, Vec::new(), vec![child]);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insert(parent, child)?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.notify(parent, vec![child], Vec::new());
        Ok(())
    }

    /// Inserts `child` before `reference`, a direct child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        self.check_insert(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(DomError::NotAChild {
                parent,
                child: reference,
            });
        }
        if child == reference {
            return Ok(());
        }
        self.detach(child);
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == reference)
            .ok_or(DomError::NotAChild {
                parent,
                child: reference,
            })?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        self.notify(parent, vec![child], Vec::new());
        Ok(())
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        match self.children(parent).first().copied() {
            Some(first) => self.insert_before(parent, child, first),
            None => self.append_child(parent, child),
        }
    }

    /// Detaches `id` from its parent. Detached nodes stay addressable.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        if id == self.root {
            return Err(DomError::RootImmutable);
        }
        self.detach(id);
        Ok(())
    }

    // ---- attributes ----

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.element_mut(id)?
            .attrs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.element_mut(id)?.attrs.remove(name);
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        let el = self.element_mut(id)?;
        if !el.has_class(class) {
            let mut classes: Vec<&str> = el.classes().collect();
            classes.push(class);
            let joined = classes.join(" ");
            el.attrs.insert("class".to_string(), joined);
        }
        Ok(())
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        let el = self.element_mut(id)?;
        let remaining: Vec<&str> = el.classes().filter(|c| *c != class).collect();
        let joined = remaining.join(" ");
        el.attrs.insert("class".to_string(), joined);
        Ok(())
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.disabled)
    }

    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) -> Result<()> {
        self.element_mut(id)?.disabled = disabled;
        Ok(())
    }

    // ---- style ----

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.style.get(property))
    }

    /// Sets an inline style property. An empty value clears it.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        self.element_mut(id)?.style.set(property, value);
        Ok(())
    }

    pub fn set_layout(&mut self, id: NodeId, layout: Layout) -> Result<()> {
        self.element_mut(id)?.layout = layout;
        Ok(())
    }

    /// Layout with the inline `display` override applied.
    pub fn computed_style(&self, id: NodeId) -> Option<ComputedStyle> {
        self.element(id).map(|el| ComputedStyle {
            display: el.style.display().unwrap_or(el.layout.display),
            flex_direction: el.layout.flex_direction,
            width: el.layout.width,
        })
    }

    pub fn is_displayed(&self, id: NodeId) -> bool {
        self.computed_style(id)
            .is_some_and(|cs| cs.display != Display::None)
    }

    // ---- content ----

    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .children(id)
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
            None => String::new(),
        }
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.clear_children(id)?;
        self.element_mut(id)?.markup = None;
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    pub fn markup(&self, id: NodeId) -> Option<&str> {
        self.element(id).and_then(|el| el.markup.as_deref())
    }

    /// Replaces all children with opaque inner markup.
    pub fn set_markup(&mut self, id: NodeId, markup: &str) -> Result<()> {
        self.clear_children(id)?;
        self.element_mut(id)?.markup = Some(markup.to_string());
        Ok(())
    }

    fn clear_children(&mut self, id: NodeId) -> Result<()> {
        self.element_mut(id)?;
        for child in self.nodes[id.0].children.clone() {
            self.detach(child);
        }
        Ok(())
    }

    // ---- queries ----

    /// Descendants of `scope` in document order, `scope` excluded.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.element(id).is_some_and(|el| selector.matches(el))
    }

    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.matches(*n, selector))
            .collect()
    }

    pub fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|n| self.matches(*n, selector))
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        self.ancestors_inclusive(id)
            .find(|n| self.matches(*n, selector))
    }

    pub fn element_by_id(&self, id_attr: &str) -> Option<NodeId> {
        self.query(self.root, &Selector::any().attr_eq("id", id_attr))
    }

    // ---- events ----

    pub fn on_click(&mut self, id: NodeId, handler: ClickHandler) {
        self.click_handlers.entry(id).or_default().push(handler);
    }

    /// Dispatches a click on `id`, bubbling through its ancestors.
    pub fn click(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        let handlers: Vec<ClickHandler> = self
            .ancestors_inclusive(id)
            .filter_map(|n| self.click_handlers.get(&n))
            .flatten()
            .cloned()
            .collect();
        for handler in handlers {
            handler(self, id);
        }
        Ok(())
    }

    // ---- serialization ----

    /// Serializes `id` and its subtree as markup.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
            Some(NodeKind::Document) => {
                for child in self.children(id) {
                    self.dump_into(*child, out);
                }
            }
            Some(NodeKind::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push_str(&format!(" {name}=\"{}\"", escape_text(value).replace('"', "&quot;")));
                }
                if !el.style.is_empty() {
                    out.push_str(&format!(" style=\"{}\"", el.style));
                }
                if el.disabled && !el.attrs.contains_key("disabled") {
                    out.push_str(" disabled");
                }
                out.push('>');
                if let Some(markup) = &el.markup {
                    out.push_str(markup);
                }
                for child in self.children(id) {
                    self.dump_into(*child, out);
                }
                out.push_str(&format!("</{}>", el.tag));
            }
            None => {}
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
