//! Structural selectors.
//!
//! Only compound selectors (a tag plus attribute and class conditions) and
//! unions of them are supported. Descendant relationships are expressed by
//! scoping the query instead.

use crate::node::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Has(String),
    Missing(String),
    Equals(String, String),
    Prefix(String, String),
    Suffix(String, String),
    Class(String),
}

impl Condition {
    fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Has(name) => element.attrs.contains_key(name),
            Self::Missing(name) => !element.attrs.contains_key(name),
            Self::Equals(name, value) => element.attr(name) == Some(value.as_str()),
            Self::Prefix(name, value) => element
                .attr(name)
                .is_some_and(|v| v.starts_with(value.as_str())),
            Self::Suffix(name, value) => element
                .attr(name)
                .is_some_and(|v| v.ends_with(value.as_str())),
            Self::Class(class) => element.has_class(class),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        self.tag.as_ref().is_none_or(|tag| element.tag == *tag)
            && self.conditions.iter().all(|c| c.matches(element))
    }
}

/// A union of compound selectors, built fluently.
///
/// Condition methods apply to the most recently started alternative.
///
/// ```
/// use xblock_dom::Selector;
///
/// let tweets = Selector::tag("article").attr_eq("data-testid", "tweet");
/// let rows = Selector::any()
///     .attr_suffix("data-testid", "-follow")
///     .or(Selector::any().attr_suffix("data-testid", "-unfollow"));
/// # let _ = (tweets, rows);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    /// Matches every element.
    pub fn any() -> Self {
        Self {
            alternatives: vec![Compound::default()],
        }
    }

    pub fn tag(tag: &str) -> Self {
        Self {
            alternatives: vec![Compound {
                tag: Some(tag.to_ascii_lowercase()),
                conditions: Vec::new(),
            }],
        }
    }

    /// `[data-testid="<value>"]`, the host's own test hooks.
    pub fn test_id(value: &str) -> Self {
        Self::any().attr_eq("data-testid", value)
    }

    fn push(mut self, condition: Condition) -> Self {
        if let Some(last) = self.alternatives.last_mut() {
            last.conditions.push(condition);
        }
        self
    }

    pub fn attr(self, name: &str) -> Self {
        self.push(Condition::Has(name.to_string()))
    }

    pub fn without_attr(self, name: &str) -> Self {
        self.push(Condition::Missing(name.to_string()))
    }

    pub fn attr_eq(self, name: &str, value: &str) -> Self {
        self.push(Condition::Equals(name.to_string(), value.to_string()))
    }

    pub fn attr_prefix(self, name: &str, value: &str) -> Self {
        self.push(Condition::Prefix(name.to_string(), value.to_string()))
    }

    pub fn attr_suffix(self, name: &str, value: &str) -> Self {
        self.push(Condition::Suffix(name.to_string(), value.to_string()))
    }

    pub fn class(self, class: &str) -> Self {
        self.push(Condition::Class(class.to_string()))
    }

    pub fn or(mut self, other: Selector) -> Self {
        self.alternatives.extend(other.alternatives);
        self
    }

    pub fn matches(&self, element: &Element) -> bool {
        self.alternatives.iter().any(|c| c.matches(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attrs: &[(&str, &str)]) -> Element {
        let mut el = Element::new(tag);
        for (k, v) in attrs {
            el.attrs.insert(k.to_string(), v.to_string());
        }
        el
    }

    #[test]
    fn test_tag_and_attr() {
        let sel = Selector::tag("article").attr_eq("data-testid", "tweet");
        assert!(sel.matches(&element("article", &[("data-testid", "tweet")])));
        assert!(!sel.matches(&element("div", &[("data-testid", "tweet")])));
        assert!(!sel.matches(&element("article", &[])));
    }

    #[test]
    fn test_suffix_union() {
        let sel = Selector::any()
            .attr_suffix("data-testid", "-follow")
            .or(Selector::any().attr_suffix("data-testid", "-unfollow"));
        assert!(sel.matches(&element("button", &[("data-testid", "123-follow")])));
        assert!(sel.matches(&element("button", &[("data-testid", "123-unfollow")])));
        assert!(!sel.matches(&element("button", &[("data-testid", "follow-me")])));
    }

    #[test]
    fn test_without_attr_and_class() {
        let sel = Selector::any().class("xblock-btn").without_attr("disabled");
        assert!(sel.matches(&element("button", &[("class", "xblock-btn xblock-mute")])));
        assert!(!sel.matches(&element("button", &[("class", "xblock-btn"), ("disabled", "")])));
        assert!(!sel.matches(&element("button", &[("class", "xblock-btn-container")])));
    }

    #[test]
    fn test_prefix() {
        let sel = Selector::any().attr_prefix("aria-label", "Grok");
        assert!(sel.matches(&element("button", &[("aria-label", "Grok actions")])));
        assert!(!sel.matches(&element("button", &[("aria-label", "More")])));
    }
}
