//! Style maps, declaration parsing, the property allow-list and the resolver

pub mod declarations;
pub mod properties;
pub mod resolver;

use std::collections::BTreeMap;

pub use declarations::{is_gradient, is_sentinel, parse_declaration_block, ParsedDeclaration};
pub use properties::{AllowList, PropertyFamily, StyleProfile, ALLOW_LIST_VERSION};
pub use resolver::{Resolved, StyleResolver};

/// Declaration priority (`!important` or not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Priority {
    #[default]
    Normal,
    Important,
}

impl Priority {
    pub fn from_important(important: bool) -> Self {
        if important {
            Priority::Important
        } else {
            Priority::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleValue {
    pub value: String,
    pub priority: Priority,
}

/// Property name → value map with `!important`-aware overwrite rules.
///
/// A later write of a key replaces the earlier one unless the earlier write
/// was `Important` and the later one is `Normal`. Keys are kept sorted so the
/// serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: BTreeMap<String, StyleValue>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse CSS declaration text (e.g. a `style` attribute)
    pub fn parse(css: &str) -> Self {
        let mut map = Self::new();
        for decl in parse_declaration_block(css) {
            map.set(decl.name, decl.value, Priority::from_important(decl.important));
        }
        map
    }

    /// Write a declaration; returns whether the write took effect
    pub fn set(
        &mut self,
        property: impl Into<String>,
        value: impl Into<String>,
        priority: Priority,
    ) -> bool {
        let property = property.into();
        if let Some(existing) = self.entries.get(&property) {
            if existing.priority == Priority::Important && priority == Priority::Normal {
                return false;
            }
        }
        self.entries.insert(
            property,
            StyleValue {
                value: value.into(),
                priority,
            },
        );
        true
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries.get(property).map(|v| v.value.as_str())
    }

    pub fn priority(&self, property: &str) -> Option<Priority> {
        self.entries.get(property).map(|v| v.priority)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.entries.contains_key(property)
    }

    pub fn remove(&mut self, property: &str) -> Option<StyleValue> {
        self.entries.remove(property)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &StyleValue) -> bool,
    {
        self.entries.retain(|k, v| keep(k, v));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize as `prop: value; prop2: value2 !important`
    pub fn to_css_text(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| match v.priority {
                Priority::Important => format!("{}: {} !important;", k, v.value),
                Priority::Normal => format!("{}: {};", k, v.value),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_write_wins() {
        let mut map = StyleMap::new();
        assert!(map.set("color", "red", Priority::Normal));
        assert!(map.set("color", "blue", Priority::Normal));
        assert_eq!(map.get("color"), Some("blue"));
    }

    #[test]
    fn important_survives_normal_overwrite() {
        let mut map = StyleMap::new();
        map.set("color", "red", Priority::Important);
        assert!(!map.set("color", "blue", Priority::Normal));
        assert_eq!(map.get("color"), Some("red"));
        assert!(map.set("color", "green", Priority::Important));
        assert_eq!(map.get("color"), Some("green"));
    }

    #[test]
    fn css_text_round_trips() {
        let map = StyleMap::parse("width: 10px; color: red !important");
        assert_eq!(map.to_css_text(), "color: red !important; width: 10px;");
        assert_eq!(StyleMap::parse(&map.to_css_text()), map);
    }
}
