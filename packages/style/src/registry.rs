//! Compile-time registry of layer styles.
//!
//! Styles are defined in `styles/layers.toml` and embedded via
//! `include_str!`. Adding a layer means adding a `[[layer]]` table there
//! and bumping the expected count below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::color::darken_hex;

/// Number of registered layer styles. Enforced by a test.
#[cfg(test)]
const EXPECTED_STYLE_COUNT: usize = 33;

/// Border darkening applied to fills without an explicit stroke.
const STROKE_DARKEN_FACTOR: f64 = 0.6;

/// Fallback fill for categories without a registered style.
const FALLBACK_COLOR: &str = "#808080";

const LAYERS_TOML: &str = include_str!("../styles/layers.toml");

/// How a layer is drawn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayerKind {
    /// Filled outlines.
    Polygon,
    /// Icon markers at points.
    Marker,
    /// Fixed-radius circles at points.
    Circle,
}

/// Presentation attributes for one layer category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    /// Category key the renderer looks styles up by.
    pub category: String,
    /// Human-readable layer name.
    pub label: String,
    /// How the layer is drawn.
    pub kind: LayerKind,
    /// Fill color. Choropleth layers leave it to the color scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    /// Border color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    /// Border width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Fill opacity, 0 to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    /// Icon name for markers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Circle radius in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl StyleDescriptor {
    /// A plain gray polygon style for an unknown category.
    #[must_use]
    pub fn fallback(category: &str) -> Self {
        Self {
            category: category.to_string(),
            label: category.to_string(),
            kind: LayerKind::Polygon,
            fill_color: Some(FALLBACK_COLOR.to_string()),
            stroke_color: None,
            weight: None,
            fill_opacity: None,
            icon: None,
            radius: None,
        }
    }

    /// Border color: the explicit stroke, else the fill darkened.
    #[must_use]
    pub fn stroke(&self) -> Option<String> {
        if let Some(stroke) = &self.stroke_color {
            return Some(stroke.clone());
        }
        let fill = self.fill_color.as_deref()?;
        darken_hex(fill, STROKE_DARKEN_FACTOR)
            .inspect_err(|e| log::warn!("Style {}: {e}", self.category))
            .ok()
    }

    /// Copy with the border color resolved.
    #[must_use]
    pub fn resolved(&self) -> Self {
        Self {
            stroke_color: self.stroke(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct LayerFile {
    layer: Vec<StyleDescriptor>,
}

/// Category of the `label` member of a layer `family`: the label is
/// lowercased and every run of non-alphanumeric characters becomes one
/// `_`, so `("parques", "Menor a 300 m2")` gives `parques_menor_a_300_m2`.
#[must_use]
pub fn category_key(family: &str, label: &str) -> String {
    let mut key = String::with_capacity(family.len() + label.len() + 1);
    key.push_str(family);

    let mut separate = true;
    for c in label.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if separate {
                key.push('_');
                separate = false;
            }
            key.push(c);
        } else {
            separate = true;
        }
    }
    key
}

/// Returns all registered layer styles, in file order.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse. Since it is a compile-time
/// constant, a parse failure is a development error caught by tests.
#[must_use]
pub fn all_styles() -> Vec<StyleDescriptor> {
    toml::de::from_str::<LayerFile>(LAYERS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded layer styles: {e}"))
        .layer
}

/// Category → style lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRegistry {
    styles: BTreeMap<String, StyleDescriptor>,
}

impl StyleRegistry {
    /// Registry of the embedded styles.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_styles(all_styles())
    }

    /// Registry of `styles`; a repeated category keeps the last entry.
    #[must_use]
    pub fn from_styles(styles: impl IntoIterator<Item = StyleDescriptor>) -> Self {
        Self {
            styles: styles
                .into_iter()
                .map(|s| (s.category.clone(), s))
                .collect(),
        }
    }

    /// Style for `category`, if registered.
    #[must_use]
    pub fn get(&self, category: &str) -> Option<&StyleDescriptor> {
        self.styles.get(category)
    }

    /// Style for `category`, else the style of its family: the longest
    /// registered prefix ending before a `_`.
    #[must_use]
    pub fn lookup(&self, category: &str) -> Option<&StyleDescriptor> {
        let mut key = category;
        loop {
            if let Some(style) = self.styles.get(key) {
                return Some(style);
            }
            key = &key[..key.rfind('_')?];
        }
    }

    /// Style for `category` (or its family) with its border resolved, or
    /// the fallback. The result always carries `category`.
    #[must_use]
    pub fn resolve(&self, category: &str) -> StyleDescriptor {
        self.lookup(category).map_or_else(
            || {
                log::debug!("No style registered for {category}, using fallback");
                StyleDescriptor::fallback(category)
            },
            |style| StyleDescriptor {
                category: category.to_string(),
                ..style.resolved()
            },
        )
    }

    /// Resolved styles for `categories`, keyed by category.
    #[must_use]
    pub fn subset<'a>(
        &self,
        categories: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<String, StyleDescriptor> {
        categories
            .into_iter()
            .map(|c| (c.to_string(), self.resolve(c)))
            .collect()
    }

    /// Number of registered categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
