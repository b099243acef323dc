//! Serializable page snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::style::Layout;

/// A node in a snapshot. Bare strings are text nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element(ElementSpec),
}

impl NodeSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl From<ElementSpec> for NodeSpec {
    fn from(spec: ElementSpec) -> Self {
        Self::Element(spec)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn test_id(self, value: &str) -> Self {
        self.attr("data-testid", value)
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn child(mut self, child: impl Into<NodeSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.child(NodeSpec::text(text))
    }
}

/// A whole page: location, cookie jar and the body's children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub url: String,
    #[serde(default)]
    pub cookie: String,
    #[serde(default)]
    pub body: Vec<NodeSpec>,
}
