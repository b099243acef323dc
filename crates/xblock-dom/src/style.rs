//! Inline style and computed layout.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    #[default]
    Block,
    Inline,
    Flex,
    None,
}

impl FromStr for Display {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "block" => Ok(Self::Block),
            "inline" => Ok(Self::Inline),
            "flex" => Ok(Self::Flex),
            "none" => Ok(Self::None),
            other => Err(format!("unsupported display: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

/// Layout resolved by the host for one element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    pub display: Display,
    pub flex_direction: FlexDirection,
    /// Rendered width in CSS pixels.
    pub width: f64,
}

impl Layout {
    pub fn flex_row(width: f64) -> Self {
        Self {
            display: Display::Flex,
            flex_direction: FlexDirection::Row,
            width,
        }
    }

    pub fn flex_column(width: f64) -> Self {
        Self {
            display: Display::Flex,
            flex_direction: FlexDirection::Column,
            width,
        }
    }
}

/// Effective style: layout with inline overrides applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub width: f64,
}

impl ComputedStyle {
    pub fn is_flex_row(&self) -> bool {
        self.display == Display::Flex && self.flex_direction == FlexDirection::Row
    }
}

/// Inline `style` properties keyed by CSS property name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InlineStyle(BTreeMap<String, String>);

impl InlineStyle {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    /// Sets a property. An empty value clears it.
    pub fn set(&mut self, property: &str, value: &str) {
        if value.is_empty() {
            self.0.remove(property);
        } else {
            self.0.insert(property.to_string(), value.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn display(&self) -> Option<Display> {
        self.get("display").and_then(|d| d.parse().ok())
    }

    pub fn is_display_none(&self) -> bool {
        self.display() == Some(Display::None)
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (property, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{property}: {value};")?;
            first = false;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InlineStyle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
