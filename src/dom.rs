//! Live document: the element tree the renderer styles and lays out.
//!
//! Markup is parsed with `scraper` and copied into an arena so nodes can be
//! attached, detached and mounted while an export runs. The arena root is a
//! `body` element holding the preview container; scratch containers are
//! attached next to the preview and removed when released.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};

use crate::node::{Node, PseudoPosition, PSEUDO_ATTR};

/// Class on the container that holds the parsed markup
pub const PREVIEW_CLASS: &str = "pagesnap-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl LiveElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, token: &str) -> bool {
        self.class_tokens().any(|c| c == token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveData {
    Element(LiveElement),
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: LiveData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    removed: bool,
}

#[derive(Debug, Clone)]
pub struct LiveDocument {
    slots: Vec<Slot>,
    body: NodeId,
    preview: NodeId,
    generation: u64,
}

impl Default for LiveDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDocument {
    /// An empty document: `body` with an empty preview container
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            body: NodeId(0),
            preview: NodeId(0),
            generation: 0,
        };
        doc.body = doc.create_element("body", Vec::new());
        doc.preview = doc.create_element("div", vec![("class".into(), PREVIEW_CLASS.into())]);
        doc.append_child(doc.body, doc.preview);
        doc
    }

    /// Parse a markup fragment into the preview container
    pub fn parse_fragment(markup: &str) -> Self {
        let mut doc = Self::new();
        let html = Html::parse_fragment(markup);
        let preview = doc.preview;
        doc.import_children(preview, html.root_element());
        doc
    }

    fn import_children(&mut self, parent: NodeId, source: ElementRef<'_>) {
        for child in source.children() {
            if let Some(element) = ElementRef::wrap(child) {
                let value = element.value();
                let attrs = value
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                let id = self.create_element(value.name(), attrs);
                self.append_child(parent, id);
                self.import_children(id, element);
            } else if let Some(text) = child.value().as_text() {
                let content: &str = text;
                let id = self.create_text(content);
                self.append_child(parent, id);
            }
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn preview_root(&self) -> NodeId {
        self.preview
    }

    /// Bumped on every structural or attribute mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.0).filter(|s| !s.removed)
    }

    /// Whether `id` names a node that has not been removed
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn data(&self, id: NodeId) -> Option<&LiveData> {
        self.slot(id).map(|s| &s.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&LiveElement> {
        match self.data(id)? {
            LiveData::Element(el) => Some(el),
            LiveData::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            LiveData::Text(t) => Some(t.as_str()),
            LiveData::Element(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(|c| self.is_element(*c))
    }

    /// Ancestors from the parent up to the arena root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Whether the node is connected to the document body
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        id == self.body || self.ancestors(id).any(|a| a == self.body)
    }

    /// Pre-order traversal of `root` and everything below it
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.contains(id) {
                continue;
            }
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Which generated-content position a synthetic element stands for
    pub fn pseudo_position(&self, id: NodeId) -> Option<PseudoPosition> {
        self.attr(id, PSEUDO_ATTR).and_then(PseudoPosition::parse)
    }

    /// Text of every attached `<style>` element, in document order
    pub fn style_sheets(&self) -> Vec<String> {
        self.descendants(self.body)
            .into_iter()
            .filter(|id| self.tag(*id).is_some_and(|t| t.eq_ignore_ascii_case("style")))
            .map(|id| self.text_content(id))
            .collect()
    }

    pub fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(LiveData::Element(LiveElement {
            tag: tag.to_ascii_lowercase(),
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(LiveData::Text(text.to_string()))
    }

    fn push(&mut self, data: LiveData) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            data,
            parent: None,
            children: Vec::new(),
            removed: false,
        });
        self.generation += 1;
        id
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(slot) = self.slots.get_mut(id.0).filter(|s| !s.removed) else {
            return;
        };
        if let LiveData::Element(el) = &mut slot.data {
            match el.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
            self.generation += 1;
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        self.detach(child);
        self.slots[child.0].parent = Some(parent);
        self.slots[parent.0].children.push(child);
        self.generation += 1;
    }

    /// Remove `id` from its parent; the subtree stays alive
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.slots[parent.0].children.retain(|c| *c != id);
        self.slots[id.0].parent = None;
        self.generation += 1;
    }

    /// Detach `id` and free its whole subtree
    pub fn remove_subtree(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        self.detach(id);
        for node in self.descendants(id) {
            self.slots[node.0].removed = true;
        }
        self.generation += 1;
    }

    /// Materialize a snapshot tree as a detached live subtree.
    ///
    /// Each element's style map becomes its `style` attribute; generated
    /// content becomes first/last synthetic children.
    pub fn mount(&mut self, node: &Node) -> NodeId {
        match node {
            Node::Text(t) => self.create_text(t),
            Node::Element(el) => {
                let mut attrs: Vec<(String, String)> = el
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if !el.style.is_empty() {
                    attrs.push(("style".into(), el.style.to_css_text()));
                }
                let id = self.create_element(&el.tag, attrs);
                for child in el.rendered_children() {
                    let child_id = self.mount(child);
                    self.append_child(id, child_id);
                }
                id
            }
        }
    }

    /// Elements below `root` (excluding it) carrying every token, in
    /// document order
    pub fn elements_with_classes(&self, root: NodeId, tokens: &[&str]) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .skip(1)
            .filter(|id| {
                self.element(*id)
                    .is_some_and(|el| tokens.iter().all(|t| el.has_class(t)))
            })
            .collect()
    }

    /// Attributes of an element as an ordered map (without `style`)
    pub fn attribute_map(&self, id: NodeId) -> BTreeMap<String, String> {
        self.element(id)
            .map(|el| {
                el.attrs
                    .iter()
                    .filter(|(k, _)| !k.eq_ignore_ascii_case("style"))
                    .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
