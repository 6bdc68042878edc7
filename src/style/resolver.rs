//! Resolves the style a snapshot element carries.
//!
//! Computed values for allow-listed properties are copied first. The
//! element's own `style` attribute only fills allow-listed properties the
//! computed set lacks; where the computed set has the property, an inline
//! `!important` marks the computed value important. Generated content
//! (`::before`/`::after`) is materialized as synthetic spans.

use log::debug;

use crate::dom::NodeId;
use crate::error::Warning;
use crate::host::RenderHost;
use crate::node::{Element, Node, PseudoPosition};
use crate::style::declarations::parse_content;
use crate::style::properties::BACKGROUND_LONGHANDS;
use crate::style::{
    is_gradient, is_sentinel, parse_declaration_block, AllowList, Priority, StyleMap,
};

/// Resolved style and generated content of one element
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub style: StyleMap,
    pub before: Option<Node>,
    pub after: Option<Node>,
}

pub struct StyleResolver<'a> {
    allow_list: &'a AllowList,
}

impl<'a> StyleResolver<'a> {
    pub fn new(allow_list: &'a AllowList) -> Self {
        Self { allow_list }
    }

    pub fn allow_list(&self) -> &AllowList {
        self.allow_list
    }

    /// Resolve `element`; rejected declarations are recorded in `warnings`
    pub fn resolve<H: RenderHost + ?Sized>(
        &self,
        host: &H,
        element: NodeId,
        warnings: &mut Vec<Warning>,
    ) -> Resolved {
        let style = self.resolve_style(host, element, None, warnings);
        let before = self.generated_content(host, element, PseudoPosition::Before, warnings);
        let after = self.generated_content(host, element, PseudoPosition::After, warnings);
        Resolved {
            style,
            before,
            after,
        }
    }

    fn resolve_style<H: RenderHost + ?Sized>(
        &self,
        host: &H,
        element: NodeId,
        pseudo: Option<PseudoPosition>,
        warnings: &mut Vec<Warning>,
    ) -> StyleMap {
        let computed = host.computed_style(element, pseudo);
        let mut style = StyleMap::new();

        let copies_background = self.allow_list.contains("background-color")
            || self.allow_list.contains("background");
        let gradient = ["background", "background-image"]
            .iter()
            .filter_map(|p| computed.get(*p))
            .find(|v| is_gradient(v))
            .filter(|_| copies_background)
            .cloned();

        // A gradient is kept as the authored shorthand; longhands would
        // only lose it
        if let Some(value) = &gradient {
            self.write(host, &mut style, "background", value, Priority::Normal, warnings);
        }

        for (property, value) in &computed {
            if property == "background" || !self.allow_list.contains(property) || is_sentinel(value)
            {
                continue;
            }
            if gradient.is_some() && BACKGROUND_LONGHANDS.contains(&property.as_str()) {
                continue;
            }
            self.write(host, &mut style, property, value, Priority::Normal, warnings);
        }

        if pseudo.is_none() {
            if let Some(inline) = host.document().attr(element, "style") {
                for decl in parse_declaration_block(inline) {
                    if is_sentinel(&decl.value) || !self.allow_list.contains(&decl.name) {
                        continue;
                    }
                    if !host.accepts(&decl.name, &decl.value) {
                        reject(&decl.name, &decl.value, warnings);
                        continue;
                    }
                    // The computed value already reflects the inline one
                    // unless an important rule beat it
                    if computed.contains_key(&decl.name) || style.contains(&decl.name) {
                        if decl.important {
                            if let Some(value) = style.get(&decl.name).map(str::to_string) {
                                style.set(decl.name.as_str(), value, Priority::Important);
                            }
                        }
                        continue;
                    }
                    let priority = Priority::from_important(decl.important);
                    style.set(decl.name.as_str(), decl.value.as_str(), priority);
                }
            }
        }
        style
    }

    fn write<H: RenderHost + ?Sized>(
        &self,
        host: &H,
        style: &mut StyleMap,
        property: &str,
        value: &str,
        priority: Priority,
        warnings: &mut Vec<Warning>,
    ) {
        if host.accepts(property, value) {
            style.set(property, value, priority);
        } else {
            reject(property, value, warnings);
        }
    }

    fn generated_content<H: RenderHost + ?Sized>(
        &self,
        host: &H,
        element: NodeId,
        position: PseudoPosition,
        warnings: &mut Vec<Warning>,
    ) -> Option<Node> {
        let doc = host.document();
        // Synthetic spans have no generated content of their own, and an
        // element that already carries one for this position is not
        // given a second
        if doc.pseudo_position(element).is_some()
            || doc
                .children(element)
                .iter()
                .any(|c| doc.pseudo_position(*c) == Some(position))
        {
            return None;
        }
        let computed = host.computed_style(element, Some(position));
        let content = computed.get("content")?;
        if is_sentinel(content) {
            return None;
        }
        let text = parse_content(content, |name| doc.attr(element, name).map(str::to_string))?;
        let style = self.resolve_style(host, element, Some(position), warnings);
        Some(Node::Element(Element::synthetic(position, style, &text)))
    }
}

fn reject(property: &str, value: &str, warnings: &mut Vec<Warning>) {
    debug!("Skipping rejected declaration {}: {}", property, value);
    warnings.push(Warning::StylePropertyRejected {
        property: property.to_string(),
        value: value.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LiveDocument;
    use crate::error::Result;
    use crate::host::{PropertyMap, Rect};
    use crate::raster::PixelBuffer;
    use std::collections::HashMap;

    /// Host answering computed style from a fixed table
    struct TableHost {
        doc: LiveDocument,
        styles: HashMap<(NodeId, Option<PseudoPosition>), PropertyMap>,
        reject: Option<(&'static str, &'static str)>,
    }

    impl TableHost {
        fn new(markup: &str) -> Self {
            Self {
                doc: LiveDocument::parse_fragment(markup),
                styles: HashMap::new(),
                reject: None,
            }
        }

        fn first(&self) -> NodeId {
            self.doc.children(self.doc.preview_root())[0]
        }

        fn set(&mut self, id: NodeId, pseudo: Option<PseudoPosition>, pairs: &[(&str, &str)]) {
            self.styles.insert(
                (id, pseudo),
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
        }
    }

    impl RenderHost for TableHost {
        fn document(&self) -> &LiveDocument {
            &self.doc
        }
        fn document_mut(&mut self) -> &mut LiveDocument {
            &mut self.doc
        }
        fn computed_style(&self, node: NodeId, pseudo: Option<PseudoPosition>) -> PropertyMap {
            self.styles.get(&(node, pseudo)).cloned().unwrap_or_default()
        }
        fn accepts(&self, property: &str, value: &str) -> bool {
            self.reject != Some((property, value))
        }
        fn geometry(&self, _node: NodeId) -> Option<Rect> {
            None
        }
        fn rasterize(&self, _node: NodeId, width_px: u32) -> Result<PixelBuffer> {
            Ok(PixelBuffer::new(width_px, 1, crate::raster::WHITE))
        }
    }

    #[test]
    fn copies_only_allow_listed_non_sentinel_values() {
        let mut host = TableHost::new("<div>x</div>");
        let id = host.first();
        host.set(
            id,
            None,
            &[("color", "red"), ("width", "initial"), ("-webkit-thing", "1")],
        );
        let list = AllowList::full();
        let mut warnings = Vec::new();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut warnings);
        assert_eq!(resolved.style.get("color"), Some("red"));
        assert!(!resolved.style.contains("width"));
        assert!(!resolved.style.contains("-webkit-thing"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn inline_important_keeps_computed_value_and_gains_priority() {
        let mut host = TableHost::new("<div style=\"color: blue !important; margin-top: 4px\">x</div>");
        let id = host.first();
        host.set(id, None, &[("color", "blue"), ("margin-top", "0px")]);
        let list = AllowList::full();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut Vec::new());
        assert_eq!(resolved.style.get("color"), Some("blue"));
        assert_eq!(resolved.style.priority("color"), Some(Priority::Important));
        // an important author rule won over the inline value
        assert_eq!(resolved.style.get("margin-top"), Some("0px"));
        assert_eq!(resolved.style.priority("margin-top"), Some(Priority::Normal));
    }

    #[test]
    fn inline_fills_only_properties_missing_from_computed_set() {
        let mut host =
            TableHost::new("<div style=\"color: red; margin-top: 4px !important; margin: 1px; -x-private: 1\">x</div>");
        let id = host.first();
        host.set(id, None, &[("color", "rgb(0, 0, 255)")]);
        let list = AllowList::full();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut Vec::new());
        assert_eq!(resolved.style.get("color"), Some("rgb(0, 0, 255)"));
        assert_eq!(resolved.style.get("margin-top"), Some("4px"));
        assert_eq!(resolved.style.priority("margin-top"), Some(Priority::Important));
        // shorthands and unknown properties are not allow-listed
        assert!(!resolved.style.contains("margin"));
        assert!(!resolved.style.contains("-x-private"));
    }

    #[test]
    fn rejected_inline_declaration_is_reported() {
        let mut host = TableHost::new("<div style=\"color: nope\">x</div>");
        let id = host.first();
        host.set(id, None, &[("color", "rgb(0, 0, 0)")]);
        host.reject = Some(("color", "nope"));
        let list = AllowList::full();
        let mut warnings = Vec::new();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut warnings);
        assert_eq!(resolved.style.get("color"), Some("rgb(0, 0, 0)"));
        assert_eq!(
            warnings,
            vec![Warning::StylePropertyRejected {
                property: "color".into(),
                value: "nope".into()
            }]
        );
    }

    #[test]
    fn gradient_background_is_kept_verbatim() {
        let gradient = "linear-gradient(90deg, rgb(255, 0, 0), rgb(0, 0, 255))";
        let mut host = TableHost::new("<div>x</div>");
        let id = host.first();
        host.set(
            id,
            None,
            &[
                ("background-image", gradient),
                ("background-color", "rgba(0, 0, 0, 0)"),
                ("background-repeat", "repeat"),
            ],
        );
        let list = AllowList::full();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut Vec::new());
        assert_eq!(resolved.style.get("background"), Some(gradient));
        assert!(!resolved.style.contains("background-color"));
        assert!(!resolved.style.contains("background-repeat"));
    }

    #[test]
    fn rejected_property_is_skipped_with_warning() {
        let mut host = TableHost::new("<div>x</div>");
        let id = host.first();
        host.set(id, None, &[("color", "red"), ("filter", "blur(2px)")]);
        host.reject = Some(("filter", "blur(2px)"));
        let list = AllowList::full();
        let mut warnings = Vec::new();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut warnings);
        assert_eq!(resolved.style.get("color"), Some("red"));
        assert!(!resolved.style.contains("filter"));
        assert_eq!(
            warnings,
            vec![Warning::StylePropertyRejected {
                property: "filter".into(),
                value: "blur(2px)".into()
            }]
        );
    }

    #[test]
    fn generated_content_becomes_synthetic_span() {
        let mut host = TableHost::new("<p data-n=\"3\">x</p>");
        let id = host.first();
        host.set(
            id,
            Some(PseudoPosition::Before),
            &[("content", "\"#\" attr(data-n)"), ("color", "green")],
        );
        host.set(id, Some(PseudoPosition::After), &[("content", "none")]);
        let list = AllowList::full();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut Vec::new());
        let before = resolved.before.expect("before");
        let span = before.as_element().unwrap();
        assert_eq!(span.pseudo_position(), Some(PseudoPosition::Before));
        assert_eq!(span.style.get("color"), Some("green"));
        assert_eq!(before.text_content(), "#3");
        assert!(resolved.after.is_none());
    }

    #[test]
    fn existing_synthetic_child_is_not_duplicated() {
        let mut host = TableHost::new("<p><span data-pagesnap-pseudo=\"before\">#</span>x</p>");
        let id = host.first();
        host.set(id, Some(PseudoPosition::Before), &[("content", "\"#\"")]);
        let list = AllowList::full();
        let resolved = StyleResolver::new(&list).resolve(&host, id, &mut Vec::new());
        assert!(resolved.before.is_none());
    }
}
