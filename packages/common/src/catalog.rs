//! Component sizing/defaults lookup.
//!
//! `block_type` is an opaque key here: the catalog only knows how large a
//! freshly created block should be and what content it starts with.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Size used when a block type is unknown to the catalog
pub const FALLBACK_WIDTH: u32 = 2;
pub const FALLBACK_HEIGHT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefaults {
    pub width: u32,
    pub height: u32,

    /// Default content for a new block of this type
    #[serde(default)]
    pub options: Value,
}

impl ComponentDefaults {
    pub fn new(width: u32, height: u32, options: Value) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            options,
        }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_WIDTH, FALLBACK_HEIGHT, Value::Object(Default::default()))
    }
}

pub trait ComponentCatalog: Send + Sync {
    fn defaults(&self, block_type: &str) -> Option<ComponentDefaults>;

    /// Defaults for `block_type`, or the fallback size with empty content
    fn defaults_or_fallback(&self, block_type: &str) -> ComponentDefaults {
        self.defaults(block_type)
            .unwrap_or_else(ComponentDefaults::fallback)
    }
}

/// Table-backed catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, ComponentDefaults>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with the stock block types
    pub fn with_builtin_types() -> Self {
        Self::new()
            .with("Text", ComponentDefaults::new(2, 1, json!({"text": ""})))
            .with("Heading", ComponentDefaults::new(4, 1, json!({"text": "", "level": 2})))
            .with("Image", ComponentDefaults::new(4, 2, json!({"src": "", "alt": ""})))
            .with("Video", ComponentDefaults::new(6, 3, json!({"src": ""})))
            .with("Button", ComponentDefaults::new(2, 1, json!({"label": "Button", "href": ""})))
            .with("Gallery", ComponentDefaults::new(6, 3, json!({"images": []})))
            .with("Form", ComponentDefaults::new(4, 4, json!({"fields": []})))
            .with("Container", ComponentDefaults::new(6, 2, json!({})))
            .with("Divider", ComponentDefaults::new(12, 1, json!({})))
            .with("Spacer", ComponentDefaults::new(12, 1, json!({})))
    }

    pub fn with(mut self, block_type: impl Into<String>, defaults: ComponentDefaults) -> Self {
        self.insert(block_type, defaults);
        self
    }

    pub fn insert(&mut self, block_type: impl Into<String>, defaults: ComponentDefaults) {
        self.entries.insert(block_type.into(), defaults);
    }
}

impl ComponentCatalog for StaticCatalog {
    fn defaults(&self, block_type: &str) -> Option<ComponentDefaults> {
        self.entries.get(block_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sizes() {
        let catalog = StaticCatalog::with_builtin_types();
        let text = catalog.defaults("Text").unwrap();
        assert_eq!((text.width, text.height), (2, 1));

        let image = catalog.defaults("Image").unwrap();
        assert_eq!((image.width, image.height), (4, 2));
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let catalog = StaticCatalog::new();
        assert!(catalog.defaults("Carousel").is_none());

        let defaults = catalog.defaults_or_fallback("Carousel");
        assert_eq!((defaults.width, defaults.height), (FALLBACK_WIDTH, FALLBACK_HEIGHT));
        assert!(defaults.options.is_object());
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let defaults = ComponentDefaults::new(0, 0, Value::Null);
        assert_eq!((defaults.width, defaults.height), (1, 1));
    }
}
