//! Snapshot tree: detached elements carrying resolved styles.

use std::collections::BTreeMap;

use crate::style::StyleMap;

/// Attribute marking an element that stands in for `::before`/`::after`
pub const PSEUDO_ATTR: &str = "data-pagesnap-pseudo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoPosition {
    Before,
    After,
}

impl PseudoPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            PseudoPosition::Before => "before",
            PseudoPosition::After => "after",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            v if v.eq_ignore_ascii_case("before") => Some(PseudoPosition::Before),
            v if v.eq_ignore_ascii_case("after") => Some(PseudoPosition::After),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    /// Source attributes, `style` excluded
    pub attributes: BTreeMap<String, String>,
    pub style: StyleMap,
    pub children: Vec<Node>,
    pub pseudo_before: Option<Box<Node>>,
    pub pseudo_after: Option<Box<Node>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// A `span` holding generated content for `position`
    pub fn synthetic(position: PseudoPosition, style: StyleMap, text: &str) -> Self {
        let mut el = Element::new("span");
        el.attributes
            .insert(PSEUDO_ATTR.to_string(), position.as_str().to_string());
        el.style = style;
        if !text.is_empty() {
            el.children.push(Node::Text(text.to_string()));
        }
        el
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn pseudo_position(&self) -> Option<PseudoPosition> {
        self.attr(PSEUDO_ATTR).and_then(PseudoPosition::parse)
    }

    pub fn has_class(&self, token: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|t| t == token))
    }

    /// Generated content first, then children, then trailing generated content
    pub fn rendered_children(&self) -> impl Iterator<Item = &Node> {
        self.pseudo_before
            .iter()
            .map(|b| b.as_ref())
            .chain(self.children.iter())
            .chain(self.pseudo_after.iter().map(|a| a.as_ref()))
    }

    pub fn pseudo_slot_mut(&mut self, position: PseudoPosition) -> &mut Option<Box<Node>> {
        match position {
            PseudoPosition::Before => &mut self.pseudo_before,
            PseudoPosition::After => &mut self.pseudo_after,
        }
    }
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element(Element::new(tag))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Rendered text, generated content included
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => {
                for child in el.rendered_children() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Elements in the tree (generated content included), pre-order
    pub fn elements(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Node::Element(el) = node {
                out.push(el);
                let children: Vec<&Node> = el.rendered_children().collect();
                stack.extend(children.into_iter().rev());
            }
        }
        out
    }
}
