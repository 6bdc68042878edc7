//! Standalone HTML serialization of snapshot trees

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};

use crate::node::{Element, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlOptions {
    /// Spaces per nesting level; `None` writes everything on one line
    pub indent: Option<usize>,
    /// Self-close void elements (`<br />`)
    pub xhtml: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            xhtml: false,
        }
    }
}

/// Serialize a tree, generated content included
pub fn serialize(node: &Node, options: &HtmlOptions) -> String {
    let mut out = String::new();
    write_node(&mut out, node, options, 0);
    if options.indent.is_some() {
        while out.ends_with('\n') {
            out.pop();
        }
    }
    out
}

fn write_node(out: &mut String, node: &Node, options: &HtmlOptions, depth: usize) {
    match node {
        Node::Text(text) => match options.indent {
            Some(width) => {
                let trimmed = collapse_whitespace(text);
                if !trimmed.is_empty() {
                    pad(out, width, depth);
                    out.push_str(&encode_text(&trimmed));
                    out.push('\n');
                }
            }
            None => out.push_str(&encode_text(text)),
        },
        Node::Element(el) => write_element(out, el, options, depth),
    }
}

fn write_element(out: &mut String, el: &Element, options: &HtmlOptions, depth: usize) {
    let tag = el.tag.as_str();
    if let Some(width) = options.indent {
        pad(out, width, depth);
    }
    open_tag(out, el);
    if VOID_ELEMENTS.contains(&tag) {
        out.push_str(if options.xhtml { " />" } else { ">" });
        if options.indent.is_some() {
            out.push('\n');
        }
        return;
    }
    out.push('>');

    let children: Vec<&Node> = el.rendered_children().collect();
    let verbatim = RAW_TEXT_ELEMENTS.contains(&tag) || PREFORMATTED_ELEMENTS.contains(&tag);
    let text_only = children.iter().all(|c| matches!(c, Node::Text(_)));

    if verbatim {
        let raw = RAW_TEXT_ELEMENTS.contains(&tag);
        for child in &children {
            match child {
                Node::Text(t) if raw => out.push_str(t),
                Node::Text(t) => out.push_str(&encode_text(t)),
                Node::Element(_) => write_node(out, child, &HtmlOptions { indent: None, ..options.clone() }, 0),
            }
        }
    } else if options.indent.is_none() || text_only {
        for child in &children {
            match child {
                Node::Text(t) if options.indent.is_some() => {
                    out.push_str(&encode_text(&collapse_whitespace(t)))
                }
                _ => write_node(out, child, options, depth + 1),
            }
        }
    } else {
        out.push('\n');
        for child in &children {
            write_node(out, child, options, depth + 1);
        }
        if let Some(width) = options.indent {
            pad(out, width, depth);
        }
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
    if options.indent.is_some() {
        out.push('\n');
    }
}

fn open_tag(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    if !el.style.is_empty() {
        out.push_str(" style=\"");
        out.push_str(&encode_double_quoted_attribute(&el.style.to_css_text()));
        out.push('"');
    }
}

fn pad(out: &mut String, width: usize, depth: usize) {
    out.extend(std::iter::repeat(' ').take(width * depth));
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
