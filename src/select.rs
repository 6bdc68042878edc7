//! Picks the elements an export starts from.

use log::warn;

use crate::dom::{LiveDocument, NodeId};
use crate::error::Warning;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootOrigin {
    /// No marker given, or nothing matched it
    WholeDocument,
    /// Matched the marker class token(s)
    Marker(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRoot {
    pub element: NodeId,
    pub origin: RootOrigin,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub roots: Vec<ExportRoot>,
    pub warnings: Vec<Warning>,
}

impl Selection {
    pub fn is_fallback(&self) -> bool {
        self.roots
            .iter()
            .all(|r| r.origin == RootOrigin::WholeDocument)
    }
}

/// Select export roots under the preview container.
///
/// `marker` is one or more whitespace-separated class tokens; an element
/// matches when it carries all of them. Every match is returned in document
/// order, nested ones included. With no match the preview container is
/// returned as a [`RootOrigin::WholeDocument`] root and a
/// [`Warning::NoMatch`] is recorded; exporters take its children, not the
/// container.
pub fn select_roots(doc: &LiveDocument, marker: &str) -> Selection {
    let preview = doc.preview_root();
    let tokens: Vec<&str> = marker.split_whitespace().collect();
    if tokens.is_empty() {
        return Selection {
            roots: vec![ExportRoot {
                element: preview,
                origin: RootOrigin::WholeDocument,
            }],
            warnings: Vec::new(),
        };
    }

    let matches = doc.elements_with_classes(preview, &tokens);
    if matches.is_empty() {
        warn!("No element matches '{}', exporting the whole document", marker);
        return Selection {
            roots: vec![ExportRoot {
                element: preview,
                origin: RootOrigin::WholeDocument,
            }],
            warnings: vec![Warning::NoMatch {
                marker: marker.to_string(),
            }],
        };
    }

    let origin = RootOrigin::Marker(tokens.join(" "));
    Selection {
        roots: matches
            .into_iter()
            .map(|element| ExportRoot {
                element,
                origin: origin.clone(),
            })
            .collect(),
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<div class="export-this"><h1>Keep</h1></div><div class="dont-export"><p>Skip</p></div>"#;

    #[test]
    fn marker_selects_matching_elements() {
        let doc = LiveDocument::parse_fragment(SAMPLE);
        let sel = select_roots(&doc, "export-this");
        assert_eq!(sel.roots.len(), 1);
        assert_eq!(doc.text_content(sel.roots[0].element), "Keep");
        assert!(sel.warnings.is_empty());
        assert!(!sel.is_fallback());
    }

    #[test]
    fn no_match_falls_back_with_warning() {
        let doc = LiveDocument::parse_fragment(SAMPLE);
        let sel = select_roots(&doc, "missing");
        assert_eq!(sel.roots[0].element, doc.preview_root());
        assert_eq!(
            sel.warnings,
            vec![Warning::NoMatch {
                marker: "missing".into()
            }]
        );
    }

    #[test]
    fn blank_marker_exports_everything_silently() {
        let doc = LiveDocument::parse_fragment(SAMPLE);
        let sel = select_roots(&doc, "   ");
        assert!(sel.is_fallback());
        assert!(sel.warnings.is_empty());
    }

    #[test]
    fn multiple_tokens_must_all_match() {
        let doc = LiveDocument::parse_fragment(
            r#"<div class="a"></div><div class="a b" id="hit"></div><div class="b"></div>"#,
        );
        let sel = select_roots(&doc, "a  b");
        assert_eq!(sel.roots.len(), 1);
        assert_eq!(doc.attr(sel.roots[0].element, "id"), Some("hit"));
        assert_eq!(sel.roots[0].origin, RootOrigin::Marker("a b".into()));
    }

    #[test]
    fn nested_matches_are_all_returned() {
        let doc = LiveDocument::parse_fragment(
            r#"<div class="x"><span class="x">inner</span></div>"#,
        );
        assert_eq!(select_roots(&doc, "x").roots.len(), 2);
    }
}
