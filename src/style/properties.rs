//! Versioned allow-list of style properties copied into snapshots.
//!
//! Only properties listed here are taken from the renderer's computed style.
//! Anything else the renderer reports is dropped to keep snapshots bounded
//! and their contents enumerable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bumped whenever a property is added to or removed from a family table
pub const ALLOW_LIST_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyFamily {
    Layout,
    Positioning,
    Background,
    Text,
    Effects,
    Animation,
    Interaction,
}

/// Which subset of the table a snapshot copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleProfile {
    /// Every family
    #[default]
    Full,
    /// The essentials needed for a readable static copy: colors, box model,
    /// font basics, flex alignment and position
    Compact,
}

const LAYOUT: &[&str] = &[
    "display",
    "box-sizing",
    "width",
    "height",
    "min-width",
    "min-height",
    "max-width",
    "max-height",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "border-top-style",
    "border-right-style",
    "border-bottom-style",
    "border-left-style",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "border-top-left-radius",
    "border-top-right-radius",
    "border-bottom-right-radius",
    "border-bottom-left-radius",
    "border-collapse",
    "border-spacing",
    "overflow-x",
    "overflow-y",
    "flex-direction",
    "flex-wrap",
    "flex-grow",
    "flex-shrink",
    "flex-basis",
    "justify-content",
    "align-items",
    "align-content",
    "align-self",
    "order",
    "row-gap",
    "column-gap",
    "grid-template-columns",
    "grid-template-rows",
    "grid-column-start",
    "grid-column-end",
    "grid-row-start",
    "grid-row-end",
    "float",
    "clear",
    "vertical-align",
    "table-layout",
    "list-style-type",
    "list-style-position",
];

const POSITIONING: &[&str] = &[
    "position",
    "top",
    "right",
    "bottom",
    "left",
    "z-index",
    "transform",
    "transform-origin",
];

const BACKGROUND: &[&str] = &[
    "background",
    "background-color",
    "background-image",
    "background-position",
    "background-size",
    "background-repeat",
    "background-origin",
    "background-clip",
    "background-attachment",
];

const TEXT: &[&str] = &[
    "color",
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "font-variant",
    "line-height",
    "letter-spacing",
    "word-spacing",
    "text-align",
    "text-indent",
    "text-transform",
    "text-decoration-line",
    "text-decoration-style",
    "text-decoration-color",
    "text-shadow",
    "text-overflow",
    "white-space",
    "word-break",
    "overflow-wrap",
    "direction",
    "writing-mode",
];

const EFFECTS: &[&str] = &[
    "opacity",
    "visibility",
    "box-shadow",
    "filter",
    "backdrop-filter",
    "mix-blend-mode",
    "clip-path",
    "outline-width",
    "outline-style",
    "outline-color",
    "outline-offset",
];

const ANIMATION: &[&str] = &[
    "transition-property",
    "transition-duration",
    "transition-timing-function",
    "transition-delay",
    "animation-name",
    "animation-duration",
    "animation-timing-function",
    "animation-delay",
    "animation-iteration-count",
    "animation-direction",
    "animation-fill-mode",
    "animation-play-state",
];

const INTERACTION: &[&str] = &[
    "cursor",
    "pointer-events",
    "user-select",
    "touch-action",
    "resize",
    "scroll-behavior",
];

const FAMILIES: &[(PropertyFamily, &[&str])] = &[
    (PropertyFamily::Layout, LAYOUT),
    (PropertyFamily::Positioning, POSITIONING),
    (PropertyFamily::Background, BACKGROUND),
    (PropertyFamily::Text, TEXT),
    (PropertyFamily::Effects, EFFECTS),
    (PropertyFamily::Animation, ANIMATION),
    (PropertyFamily::Interaction, INTERACTION),
];

const COMPACT: &[&str] = &[
    "color",
    "background-color",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "border-top-style",
    "border-right-style",
    "border-bottom-style",
    "border-left-style",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "width",
    "height",
    "font-size",
    "font-family",
    "font-weight",
    "text-align",
    "display",
    "flex-direction",
    "justify-content",
    "align-items",
    "row-gap",
    "column-gap",
    "position",
];

/// The set of properties a snapshot copies from computed style
#[derive(Debug, Clone)]
pub struct AllowList {
    profile: StyleProfile,
    entries: BTreeMap<&'static str, PropertyFamily>,
}

impl AllowList {
    pub fn for_profile(profile: StyleProfile) -> Self {
        let mut entries = BTreeMap::new();
        for (family, props) in FAMILIES {
            for prop in props.iter() {
                if profile == StyleProfile::Full || COMPACT.contains(prop) {
                    entries.insert(*prop, *family);
                }
            }
        }
        Self { profile, entries }
    }

    pub fn full() -> Self {
        Self::for_profile(StyleProfile::Full)
    }

    pub fn compact() -> Self {
        Self::for_profile(StyleProfile::Compact)
    }

    pub fn profile(&self) -> StyleProfile {
        self.profile
    }

    pub fn version(&self) -> u32 {
        ALLOW_LIST_VERSION
    }

    pub fn contains(&self, property: &str) -> bool {
        self.entries.contains_key(property)
    }

    pub fn family_of(&self, property: &str) -> Option<PropertyFamily> {
        self.entries.get(property).copied()
    }

    /// All allow-listed properties, sorted by name
    pub fn properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn family(&self, family: PropertyFamily) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(move |(_, f)| **f == family)
            .map(|(p, _)| *p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::full()
    }
}

/// Longhands written by the `background` shorthand
pub const BACKGROUND_LONGHANDS: &[&str] = &[
    "background-color",
    "background-image",
    "background-position",
    "background-size",
    "background-repeat",
    "background-origin",
    "background-clip",
    "background-attachment",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_profile_covers_every_family() {
        let list = AllowList::full();
        for (family, props) in FAMILIES {
            assert_eq!(list.family(*family).count(), props.len(), "{:?}", family);
        }
        assert_eq!(list.family_of("opacity"), Some(PropertyFamily::Effects));
        assert!(!list.contains("content"));
    }

    #[test]
    fn compact_profile_is_a_subset() {
        let full = AllowList::full();
        let compact = AllowList::compact();
        assert_eq!(compact.len(), COMPACT.len());
        assert!(compact.properties().all(|p| full.contains(p)));
        assert!(!compact.contains("box-shadow"));
    }

    #[test]
    fn family_tables_do_not_overlap() {
        let total: usize = FAMILIES.iter().map(|(_, p)| p.len()).sum();
        assert_eq!(AllowList::full().len(), total);
    }
}
