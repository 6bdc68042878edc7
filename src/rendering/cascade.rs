//! Style cascade for the reference renderer.
//!
//! Sheets come from a small user-agent sheet, every `<style>` element and
//! every linked stylesheet whose bytes were registered. Selectors cover
//! type, universal, id, class and attribute tests joined by descendant or
//! child combinators, plus `:first-child`, `:last-child` and the
//! `::before`/`::after` pseudo-elements. Rules using anything else are
//! dropped whole.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cssparser::{
    AtRuleParser, CowRcStr, ParseError, Parser, ParserInput, ParserState, QualifiedRuleParser,
    StyleSheetParser, Token,
};
use log::trace;

use super::values::{
    format_color, format_px, length_px, parse_color, parse_length, split_commas,
    split_components, Length, LengthContext,
};
use crate::dom::{LiveDocument, NodeId};
use crate::host::PropertyMap;
use crate::node::{PseudoPosition, PSEUDO_ATTR};
use crate::raster::Rgba;
use crate::style::declarations::{
    is_sentinel, is_well_formed, parse_declaration_block, parse_declarations_from,
};
use crate::style::ParsedDeclaration;
use crate::Viewport;

const ROOT_FONT_SIZE: f32 = 16.0;
const BLACK: Rgba = [0, 0, 0, 255];

const USER_AGENT_SHEET: &str = r#"
html, body, div, section, article, aside, header, footer, nav, main, figure,
figcaption, p, h1, h2, h3, h4, h5, h6, ul, ol, dl, dt, dd, blockquote, pre,
form, fieldset, hr, address, details, summary, center { display: block; }
li { display: list-item; }
table { display: table; border-spacing: 2px; }
tr { display: table-row; }
td, th { display: table-cell; padding: 1px; }
th { font-weight: bold; text-align: center; }
thead { display: table-header-group; }
tbody { display: table-row-group; }
tfoot { display: table-footer-group; }
head, style, script, template, title, meta, link, noscript { display: none; }
img, button, input, select, textarea { display: inline-block; }
body { margin: 8px; }
h1 { font-size: 2em; margin: 0.67em 0; font-weight: bold; }
h2 { font-size: 1.5em; margin: 0.83em 0; font-weight: bold; }
h3 { font-size: 1.17em; margin: 1em 0; font-weight: bold; }
h4 { margin: 1.33em 0; font-weight: bold; }
h5 { font-size: 0.83em; margin: 1.67em 0; font-weight: bold; }
h6 { font-size: 0.67em; margin: 2.33em 0; font-weight: bold; }
p, dl, figure { margin: 1em 0; }
blockquote { margin: 1em 40px; }
ul, ol { margin: 1em 0; padding-left: 40px; }
ol { list-style-type: decimal; }
dd { margin-left: 40px; }
b, strong { font-weight: bold; }
i, em, cite, var, address { font-style: italic; }
pre, code, kbd, samp, tt { font-family: monospace; }
pre { white-space: pre; margin: 1em 0; }
a { color: #0000ee; text-decoration: underline; }
u, ins { text-decoration: underline; }
s, strike, del { text-decoration: line-through; }
hr { border: 1px inset gray; margin: 0.5em auto; }
small { font-size: smaller; }
big { font-size: larger; }
center { text-align: center; }
"#;

/// Name, initial value and whether the property inherits
const PROPERTIES: &[(&str, &str, bool)] = &[
    ("display", "inline", false),
    ("box-sizing", "content-box", false),
    ("width", "auto", false),
    ("height", "auto", false),
    ("min-width", "auto", false),
    ("min-height", "auto", false),
    ("max-width", "none", false),
    ("max-height", "none", false),
    ("margin-top", "0px", false),
    ("margin-right", "0px", false),
    ("margin-bottom", "0px", false),
    ("margin-left", "0px", false),
    ("padding-top", "0px", false),
    ("padding-right", "0px", false),
    ("padding-bottom", "0px", false),
    ("padding-left", "0px", false),
    ("border-top-width", "medium", false),
    ("border-right-width", "medium", false),
    ("border-bottom-width", "medium", false),
    ("border-left-width", "medium", false),
    ("border-top-style", "none", false),
    ("border-right-style", "none", false),
    ("border-bottom-style", "none", false),
    ("border-left-style", "none", false),
    ("border-top-color", "currentcolor", false),
    ("border-right-color", "currentcolor", false),
    ("border-bottom-color", "currentcolor", false),
    ("border-left-color", "currentcolor", false),
    ("border-top-left-radius", "0px", false),
    ("border-top-right-radius", "0px", false),
    ("border-bottom-right-radius", "0px", false),
    ("border-bottom-left-radius", "0px", false),
    ("border-collapse", "separate", true),
    ("border-spacing", "0px", true),
    ("overflow-x", "visible", false),
    ("overflow-y", "visible", false),
    ("flex-direction", "row", false),
    ("flex-wrap", "nowrap", false),
    ("flex-grow", "0", false),
    ("flex-shrink", "1", false),
    ("flex-basis", "auto", false),
    ("justify-content", "normal", false),
    ("align-items", "normal", false),
    ("align-content", "normal", false),
    ("align-self", "auto", false),
    ("order", "0", false),
    ("row-gap", "normal", false),
    ("column-gap", "normal", false),
    ("grid-template-columns", "none", false),
    ("grid-template-rows", "none", false),
    ("grid-column-start", "auto", false),
    ("grid-column-end", "auto", false),
    ("grid-row-start", "auto", false),
    ("grid-row-end", "auto", false),
    ("float", "none", false),
    ("clear", "none", false),
    ("vertical-align", "baseline", false),
    ("table-layout", "auto", false),
    ("list-style-type", "disc", true),
    ("list-style-position", "outside", true),
    ("position", "static", false),
    ("top", "auto", false),
    ("right", "auto", false),
    ("bottom", "auto", false),
    ("left", "auto", false),
    ("z-index", "auto", false),
    ("transform", "none", false),
    ("transform-origin", "50% 50%", false),
    ("background-color", "transparent", false),
    ("background-image", "none", false),
    ("background-position", "0% 0%", false),
    ("background-size", "auto", false),
    ("background-repeat", "repeat", false),
    ("background-origin", "padding-box", false),
    ("background-clip", "border-box", false),
    ("background-attachment", "scroll", false),
    ("color", "black", true),
    ("font-family", "serif", true),
    ("font-size", "medium", true),
    ("font-weight", "normal", true),
    ("font-style", "normal", true),
    ("font-variant", "normal", true),
    ("line-height", "normal", true),
    ("letter-spacing", "normal", true),
    ("word-spacing", "0px", true),
    ("text-align", "start", true),
    ("text-indent", "0px", true),
    ("text-transform", "none", true),
    ("text-decoration-line", "none", false),
    ("text-decoration-style", "solid", false),
    ("text-decoration-color", "currentcolor", false),
    ("text-shadow", "none", true),
    ("text-overflow", "clip", false),
    ("white-space", "normal", true),
    ("word-break", "normal", true),
    ("overflow-wrap", "normal", true),
    ("direction", "ltr", true),
    ("writing-mode", "horizontal-tb", true),
    ("opacity", "1", false),
    ("visibility", "visible", true),
    ("box-shadow", "none", false),
    ("filter", "none", false),
    ("backdrop-filter", "none", false),
    ("mix-blend-mode", "normal", false),
    ("clip-path", "none", false),
    ("outline-width", "medium", false),
    ("outline-style", "none", false),
    ("outline-color", "currentcolor", false),
    ("outline-offset", "0px", false),
    ("transition-property", "all", false),
    ("transition-duration", "0s", false),
    ("transition-timing-function", "ease", false),
    ("transition-delay", "0s", false),
    ("animation-name", "none", false),
    ("animation-duration", "0s", false),
    ("animation-timing-function", "ease", false),
    ("animation-delay", "0s", false),
    ("animation-iteration-count", "1", false),
    ("animation-direction", "normal", false),
    ("animation-fill-mode", "none", false),
    ("animation-play-state", "running", false),
    ("cursor", "auto", true),
    ("pointer-events", "auto", true),
    ("user-select", "auto", false),
    ("touch-action", "auto", false),
    ("resize", "none", false),
    ("scroll-behavior", "auto", false),
    ("content", "normal", false),
];

const SHORTHANDS: &[&str] = &[
    "margin",
    "padding",
    "border",
    "border-top",
    "border-right",
    "border-bottom",
    "border-left",
    "border-width",
    "border-style",
    "border-color",
    "border-radius",
    "background",
    "gap",
    "overflow",
    "flex",
    "flex-flow",
    "inset",
    "font",
    "text-decoration",
    "list-style",
    "outline",
];

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

const COLOR_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "text-decoration-color",
    "outline-color",
];

const LENGTH_PROPERTIES: &[&str] = &[
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
    "border-top-left-radius",
    "border-top-right-radius",
    "border-bottom-right-radius",
    "border-bottom-left-radius",
    "top",
    "right",
    "bottom",
    "left",
    "letter-spacing",
    "word-spacing",
    "text-indent",
    "row-gap",
    "column-gap",
    "flex-basis",
    "outline-width",
    "outline-offset",
];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

const DISPLAYS: &[&str] = &[
    "none",
    "block",
    "inline",
    "inline-block",
    "flex",
    "inline-flex",
    "grid",
    "inline-grid",
    "list-item",
    "table",
    "inline-table",
    "table-row",
    "table-cell",
    "table-row-group",
    "table-header-group",
    "table-footer-group",
    "table-column",
    "table-column-group",
    "table-caption",
    "contents",
    "flow-root",
];

fn property_entry(name: &str) -> Option<&'static (&'static str, &'static str, bool)> {
    PROPERTIES.iter().find(|(n, _, _)| *n == name)
}

/// Whether the renderer knows `name`, as a longhand, a shorthand or a
/// custom property
pub fn is_known_property(name: &str) -> bool {
    name.starts_with("--") || property_entry(name).is_some() || SHORTHANDS.contains(&name)
}

/// Whether assigning `value` to `property` would take effect
pub fn accepts(property: &str, value: &str) -> bool {
    if !is_known_property(property) || !is_well_formed(value) {
        return false;
    }
    if property.starts_with("--") || is_sentinel(value) {
        return true;
    }
    match expand(property, value) {
        Some(longhands) => longhands.iter().all(|(n, v)| valid_longhand(n, v)),
        None => false,
    }
}

fn valid_longhand(name: &str, value: &str) -> bool {
    let value = value.trim();
    if is_sentinel(value) {
        return true;
    }
    if COLOR_PROPERTIES.contains(&name) {
        return parse_color(value, BLACK).is_some();
    }
    if name == "display" {
        return DISPLAYS.contains(&value.to_ascii_lowercase().as_str());
    }
    if name.starts_with("padding-") || (name.starts_with("border-") && name.ends_with("-width")) {
        let ctx = LengthContext {
            font_size: ROOT_FONT_SIZE,
            root_font_size: ROOT_FONT_SIZE,
            viewport_width: 0.0,
            viewport_height: 0.0,
        };
        return match parse_length(value, &ctx) {
            Some(Length::Px(px)) => px >= 0.0,
            Some(Length::Percent(p)) => p >= 0.0,
            None => matches!(value, "thin" | "medium" | "thick") || value.contains('('),
        };
    }
    if name.ends_with("-style") && name.starts_with("border-") {
        return BORDER_STYLES.contains(&value.to_ascii_lowercase().as_str());
    }
    true
}

// ---------------------------------------------------------------------------
// Selectors

#[derive(Debug, Clone, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

#[derive(Debug, Clone, PartialEq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    universal: bool,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    first_child: bool,
    last_child: bool,
}

impl Compound {
    fn is_empty(&self) -> bool {
        *self == Compound::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// (ids, classes and attributes, types)
pub type Specificity = (u32, u32, u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
    pseudo: Option<PseudoPosition>,
    specificity: Specificity,
}

impl Selector {
    pub fn parse(text: &str) -> Option<Selector> {
        let mut input = ParserInput::new(text.trim());
        let mut parser = Parser::new(&mut input);
        let mut compounds = vec![Compound::default()];
        let mut combinators = Vec::new();
        let mut pending: Option<Combinator> = None;
        let mut pseudo = None;

        loop {
            let token = match parser.next_including_whitespace() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };
            if pseudo.is_some() && !matches!(token, Token::WhiteSpace(_)) {
                return None;
            }
            let current_empty = compounds.last().is_some_and(Compound::is_empty);
            match token {
                Token::WhiteSpace(_) => {
                    if !current_empty && pending.is_none() {
                        pending = Some(Combinator::Descendant);
                    }
                    continue;
                }
                Token::Delim('>') => {
                    if current_empty {
                        return None;
                    }
                    pending = Some(Combinator::Child);
                    continue;
                }
                _ => {}
            }
            if let Some(combinator) = pending.take() {
                combinators.push(combinator);
                compounds.push(Compound::default());
            }
            let current = compounds.last_mut()?;
            match token {
                Token::Ident(name) => {
                    if !current.is_empty() {
                        return None;
                    }
                    current.tag = Some(name.to_ascii_lowercase());
                }
                Token::Delim('*') => {
                    if !current.is_empty() {
                        return None;
                    }
                    current.universal = true;
                }
                Token::IDHash(id) => current.id = Some(id.to_string()),
                Token::Delim('.') => match parser.next_including_whitespace() {
                    Ok(Token::Ident(class)) => current.classes.push(class.to_string()),
                    _ => return None,
                },
                Token::SquareBracketBlock => {
                    let attr = parser.parse_nested_block(attribute_selector).ok()?;
                    current.attrs.push(attr);
                }
                Token::Colon => {
                    let next = parser.next_including_whitespace().ok()?.clone();
                    match next {
                        Token::Colon => match parser.next_including_whitespace() {
                            Ok(Token::Ident(name)) => pseudo = Some(pseudo_element(name)?),
                            _ => return None,
                        },
                        Token::Ident(name) => match name.to_ascii_lowercase().as_str() {
                            "first-child" => current.first_child = true,
                            "last-child" => current.last_child = true,
                            "only-child" => {
                                current.first_child = true;
                                current.last_child = true;
                            }
                            "before" | "after" => pseudo = Some(pseudo_element(&name)?),
                            _ => return None,
                        },
                        _ => return None,
                    }
                }
                _ => return None,
            }
        }

        if pending == Some(Combinator::Child) {
            return None;
        }
        if compounds.last().is_some_and(Compound::is_empty) {
            if pseudo.is_none() {
                return None;
            }
            if let Some(last) = compounds.last_mut() {
                last.universal = true;
            }
        }

        let mut specificity = (0, 0, 0);
        for compound in &compounds {
            specificity.0 += compound.id.is_some() as u32;
            specificity.1 += (compound.classes.len()
                + compound.attrs.len()
                + compound.first_child as usize
                + compound.last_child as usize) as u32;
            specificity.2 += compound.tag.is_some() as u32;
        }
        specificity.2 += pseudo.is_some() as u32;

        Some(Selector {
            compounds,
            combinators,
            pseudo,
            specificity,
        })
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    pub fn pseudo(&self) -> Option<PseudoPosition> {
        self.pseudo
    }

    /// Match right to left against the live document
    pub fn matches(&self, doc: &LiveDocument, element: NodeId) -> bool {
        self.matches_from(doc, self.compounds.len() - 1, element)
    }

    fn matches_from(&self, doc: &LiveDocument, index: usize, element: NodeId) -> bool {
        if !compound_matches(doc, &self.compounds[index], element) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent(element)
                .filter(|p| doc.is_element(*p))
                .is_some_and(|p| self.matches_from(doc, index - 1, p)),
            Combinator::Descendant => doc
                .ancestors(element)
                .filter(|a| doc.is_element(*a))
                .any(|a| self.matches_from(doc, index - 1, a)),
        }
    }
}

fn pseudo_element(name: &str) -> Option<PseudoPosition> {
    match name.to_ascii_lowercase().as_str() {
        "before" => Some(PseudoPosition::Before),
        "after" => Some(PseudoPosition::After),
        _ => None,
    }
}

fn attribute_selector<'i>(input: &mut Parser<'i, '_>) -> Result<AttrSelector, ParseError<'i, ()>> {
    let name = input.expect_ident()?.to_ascii_lowercase();
    if input.is_exhausted() {
        return Ok(AttrSelector {
            name,
            op: AttrOp::Exists,
        });
    }
    let location = input.current_source_location();
    let op = input.next()?.clone();
    let value = input.expect_ident_or_string()?.to_string();
    let op = match op {
        Token::Delim('=') => AttrOp::Equals(value),
        Token::IncludeMatch => AttrOp::Includes(value),
        Token::PrefixMatch => AttrOp::Prefix(value),
        Token::SuffixMatch => AttrOp::Suffix(value),
        Token::SubstringMatch => AttrOp::Substring(value),
        _ => return Err(location.new_custom_error(())),
    };
    Ok(AttrSelector { name, op })
}

/// Element siblings, generated-content stand-ins excluded
fn structural_siblings(doc: &LiveDocument, element: NodeId) -> Vec<NodeId> {
    match doc.parent(element) {
        Some(parent) => doc
            .element_children(parent)
            .filter(|c| doc.attr(*c, PSEUDO_ATTR).is_none())
            .collect(),
        None => vec![element],
    }
}

fn compound_matches(doc: &LiveDocument, compound: &Compound, element: NodeId) -> bool {
    let Some(live) = doc.element(element) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if !live.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if live.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|c| live.has_class(c)) {
        return false;
    }
    for attr in &compound.attrs {
        let Some(value) = live.attr(&attr.name) else {
            return false;
        };
        let ok = match &attr.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => value == v,
            AttrOp::Includes(v) => value.split_whitespace().any(|t| t == v),
            AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
            AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
            AttrOp::Substring(v) => !v.is_empty() && value.contains(v.as_str()),
        };
        if !ok {
            return false;
        }
    }
    if compound.first_child || compound.last_child {
        let siblings = structural_siblings(doc, element);
        if compound.first_child && siblings.first() != Some(&element) {
            return false;
        }
        if compound.last_child && siblings.last() != Some(&element) {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Stylesheets

#[derive(Debug, Clone)]
struct StyleRule {
    selectors: Vec<Selector>,
    declarations: Vec<ParsedDeclaration>,
}

#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
}

impl StyleSheet {
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();
        let mut rule_parser = TopLevelRuleParser { rules: &mut rules };
        for result in StyleSheetParser::new(&mut parser, &mut rule_parser) {
            // Lenient: an invalid rule only drops itself
            let _ = result;
        }
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

struct TopLevelRuleParser<'a> {
    rules: &'a mut Vec<StyleRule>,
}

enum AtPrelude {
    /// `@media` or `@supports` whose rules apply on screen
    Group,
}

impl<'i> AtRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = AtPrelude;
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        if name.eq_ignore_ascii_case("supports") {
            while input.next().is_ok() {}
            return Ok(AtPrelude::Group);
        }
        if !name.eq_ignore_ascii_case("media") {
            return Err(input.new_custom_error(()));
        }
        let start = input.position();
        while input.next().is_ok() {}
        let query = input.slice_from(start).to_ascii_lowercase();
        let print_only = query.contains("print") && !query.contains("screen") && !query.contains("all");
        if print_only {
            Err(input.new_custom_error(()))
        } else {
            Ok(AtPrelude::Group)
        }
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        for result in StyleSheetParser::new(input, self) {
            let _ = result;
        }
        Ok(())
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = Vec<Selector>;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next().is_ok() {}
        let text = input.slice_from(start);
        // One unsupported selector invalidates the list
        split_commas(text)
            .iter()
            .map(|s| Selector::parse(s))
            .collect::<Option<Vec<_>>>()
            .filter(|list| !list.is_empty())
            .ok_or_else(|| input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        self.rules.push(StyleRule {
            selectors: prelude,
            declarations: parse_declarations_from(input),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shorthands

fn four_sides(value: &str) -> Option<[String; 4]> {
    let parts = split_components(value);
    let [t, r, b, l] = match parts.as_slice() {
        [a] => [a, a, a, a],
        [a, b] => [a, b, a, b],
        [a, b, c] => [a, b, c, b],
        [a, b, c, d] => [a, b, c, d],
        _ => return None,
    };
    Some([t.clone(), r.clone(), b.clone(), l.clone()])
}

fn is_border_width(token: &str) -> bool {
    matches!(token, "thin" | "medium" | "thick")
        || parse_length(
            token,
            &LengthContext {
                font_size: ROOT_FONT_SIZE,
                root_font_size: ROOT_FONT_SIZE,
                viewport_width: 0.0,
                viewport_height: 0.0,
            },
        )
        .is_some()
}

/// `<width> || <style> || <color>`
fn border_parts(value: &str) -> Option<(String, String, String)> {
    let mut width = None;
    let mut style = None;
    let mut color = None;
    for part in split_components(value) {
        let lower = part.to_ascii_lowercase();
        if width.is_none() && is_border_width(&lower) {
            width = Some(part);
        } else if style.is_none() && BORDER_STYLES.contains(&lower.as_str()) {
            style = Some(lower);
        } else if color.is_none() && parse_color(&part, BLACK).is_some() {
            color = Some(part);
        } else {
            return None;
        }
    }
    Some((
        width.unwrap_or_else(|| "medium".into()),
        style.unwrap_or_else(|| "none".into()),
        color.unwrap_or_else(|| "currentcolor".into()),
    ))
}

fn is_repeat_keyword(token: &str) -> bool {
    matches!(
        token,
        "repeat" | "repeat-x" | "repeat-y" | "no-repeat" | "space" | "round"
    )
}

fn background_longhands(value: &str) -> Vec<(String, String)> {
    let layers = split_commas(value);
    let mut images = Vec::new();
    let mut color = None;
    let mut repeat = None;
    for layer in &layers {
        let mut image = None;
        for part in split_components(layer) {
            let lower = part.to_ascii_lowercase();
            if lower.contains("gradient(") || lower.starts_with("url(") || lower == "none" {
                image = Some(part);
            } else if is_repeat_keyword(&lower) {
                repeat.get_or_insert(lower);
            } else if let Some(c) = parse_color(&part, BLACK).map(|_| part.clone()) {
                color = Some(c);
            }
        }
        images.push(image.unwrap_or_else(|| "none".into()));
    }
    let image = if images.iter().all(|i| i == "none") {
        "none".to_string()
    } else {
        images.join(", ")
    };
    vec![
        ("background-color".into(), color.unwrap_or_else(|| "transparent".into())),
        ("background-image".into(), image),
        ("background-repeat".into(), repeat.unwrap_or_else(|| "repeat".into())),
        ("background-position".into(), "0% 0%".into()),
        ("background-size".into(), "auto".into()),
    ]
}

fn flex_longhands(value: &str) -> Option<Vec<(String, String)>> {
    let parts = split_components(value);
    let is_number = |s: &str| s.parse::<f32>().is_ok();
    let (grow, shrink, basis) = match parts.as_slice() {
        [one] if one == "none" => ("0".into(), "0".into(), "auto".into()),
        [one] if one == "auto" => ("1".into(), "1".into(), "auto".into()),
        [one] if is_number(one) => (one.clone(), "1".into(), "0%".into()),
        [one] => ("1".into(), "1".into(), one.clone()),
        [a, b] if is_number(b) => (a.clone(), b.clone(), "0%".into()),
        [a, b] => (a.clone(), "1".into(), b.clone()),
        [a, b, c] => (a.clone(), b.clone(), c.clone()),
        _ => return None,
    };
    Some(vec![
        ("flex-grow".into(), grow),
        ("flex-shrink".into(), shrink),
        ("flex-basis".into(), basis),
    ])
}

const FONT_SIZE_KEYWORDS: &[(&str, f32)] = &[
    ("xx-small", 9.0),
    ("x-small", 10.0),
    ("small", 13.0),
    ("medium", 16.0),
    ("large", 18.0),
    ("x-large", 24.0),
    ("xx-large", 32.0),
    ("xxx-large", 48.0),
];

fn font_longhands(value: &str) -> Option<Vec<(String, String)>> {
    let parts = split_components(value);
    let mut style = "normal".to_string();
    let mut weight = "normal".to_string();
    let mut variant = "normal".to_string();
    let mut index = 0;
    while let Some(part) = parts.get(index) {
        let lower = part.to_ascii_lowercase();
        match lower.as_str() {
            "normal" => {}
            "italic" | "oblique" => style = lower,
            "small-caps" => variant = lower,
            "bold" | "bolder" | "lighter" => weight = lower,
            w if w.len() == 3 && w.parse::<u16>().is_ok() => weight = lower,
            _ => break,
        }
        index += 1;
    }
    let size_part = parts.get(index)?;
    let (size, line_height) = match size_part.split_once('/') {
        Some((s, lh)) => (s.to_string(), Some(lh.to_string())),
        None => (size_part.clone(), None),
    };
    let family = parts[index + 1..].join(" ");
    if family.is_empty() {
        return None;
    }
    Some(vec![
        ("font-style".into(), style),
        ("font-variant".into(), variant),
        ("font-weight".into(), weight),
        ("font-size".into(), size),
        ("line-height".into(), line_height.unwrap_or_else(|| "normal".into())),
        ("font-family".into(), family),
    ])
}

fn decoration_longhands(value: &str) -> Option<Vec<(String, String)>> {
    let mut lines = Vec::new();
    let mut style = "solid".to_string();
    let mut color = "currentcolor".to_string();
    for part in split_components(value) {
        let lower = part.to_ascii_lowercase();
        match lower.as_str() {
            "none" => {}
            "underline" | "overline" | "line-through" | "blink" => lines.push(lower),
            "solid" | "double" | "dotted" | "dashed" | "wavy" => style = lower,
            _ if parse_color(&part, BLACK).is_some() => color = part,
            _ => return None,
        }
    }
    let line = if lines.is_empty() {
        "none".to_string()
    } else {
        lines.join(" ")
    };
    Some(vec![
        ("text-decoration-line".into(), line),
        ("text-decoration-style".into(), style),
        ("text-decoration-color".into(), color),
    ])
}

/// Expand a declaration into longhands. `None` when a shorthand value
/// cannot be split.
pub fn expand(name: &str, value: &str) -> Option<Vec<(String, String)>> {
    let value = value.trim();
    if !SHORTHANDS.contains(&name) {
        return Some(vec![(name.to_string(), value.to_string())]);
    }
    if is_sentinel(value) {
        let mut longhands = Vec::new();
        for longhand in shorthand_members(name) {
            longhands.push((longhand, value.to_string()));
        }
        return Some(longhands);
    }
    let sided = |prefix: &str, suffix: &str, values: [String; 4]| {
        SIDES
            .iter()
            .zip(values)
            .map(|(side, v)| (format!("{}{}{}", prefix, side, suffix), v))
            .collect::<Vec<_>>()
    };
    let longhands = match name {
        "margin" | "padding" => sided(&format!("{}-", name), "", four_sides(value)?),
        "inset" => sided("", "", four_sides(value)?),
        "border-width" => sided("border-", "-width", four_sides(value)?),
        "border-style" => sided("border-", "-style", four_sides(value)?),
        "border-color" => sided("border-", "-color", four_sides(value)?),
        "border" | "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let (w, s, c) = border_parts(value)?;
            let sides: Vec<&str> = match name.strip_prefix("border-") {
                Some(side) => vec![side],
                None => SIDES.to_vec(),
            };
            let mut out = Vec::new();
            for side in sides {
                out.push((format!("border-{}-width", side), w.clone()));
                out.push((format!("border-{}-style", side), s.clone()));
                out.push((format!("border-{}-color", side), c.clone()));
            }
            out
        }
        "outline" => {
            let (w, s, c) = border_parts(value)?;
            vec![
                ("outline-width".into(), w),
                ("outline-style".into(), s),
                ("outline-color".into(), c),
            ]
        }
        "border-radius" => {
            let horizontal = value.split('/').next().unwrap_or(value);
            let [a, b, c, d] = four_sides(horizontal)?;
            vec![
                ("border-top-left-radius".into(), a),
                ("border-top-right-radius".into(), b),
                ("border-bottom-right-radius".into(), c),
                ("border-bottom-left-radius".into(), d),
            ]
        }
        "background" => background_longhands(value),
        "gap" => {
            let parts = split_components(value);
            let (row, column) = match parts.as_slice() {
                [one] => (one.clone(), one.clone()),
                [r, c] => (r.clone(), c.clone()),
                _ => return None,
            };
            vec![("row-gap".into(), row), ("column-gap".into(), column)]
        }
        "overflow" => {
            let parts = split_components(value);
            let (x, y) = match parts.as_slice() {
                [one] => (one.clone(), one.clone()),
                [x, y] => (x.clone(), y.clone()),
                _ => return None,
            };
            vec![("overflow-x".into(), x), ("overflow-y".into(), y)]
        }
        "flex" => flex_longhands(value)?,
        "flex-flow" => {
            let mut direction = "row".to_string();
            let mut wrap = "nowrap".to_string();
            for part in split_components(value) {
                if part.starts_with("wrap") || part == "nowrap" {
                    wrap = part;
                } else {
                    direction = part;
                }
            }
            vec![("flex-direction".into(), direction), ("flex-wrap".into(), wrap)]
        }
        "font" => font_longhands(value)?,
        "text-decoration" => decoration_longhands(value)?,
        "list-style" => {
            let mut kind = "disc".to_string();
            let mut position = "outside".to_string();
            for part in split_components(value) {
                if part == "inside" || part == "outside" {
                    position = part;
                } else if !part.starts_with("url(") {
                    kind = part;
                }
            }
            vec![
                ("list-style-type".into(), kind),
                ("list-style-position".into(), position),
            ]
        }
        _ => return None,
    };
    Some(longhands)
}

fn shorthand_members(name: &str) -> Vec<String> {
    let sample = match name {
        "font" => "bold 1px x",
        "background" => "none",
        "text-decoration" => "none",
        "list-style" => "disc",
        "flex" => "none",
        "flex-flow" => "row",
        "border" | "border-top" | "border-right" | "border-bottom" | "border-left" | "outline" => {
            "medium"
        }
        _ => "0",
    };
    expand(name, sample)
        .unwrap_or_default()
        .into_iter()
        .map(|(n, _)| n)
        .collect()
}

// ---------------------------------------------------------------------------
// Computed values

/// The computed style of one element or pseudo-element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputedStyle {
    values: BTreeMap<&'static str, String>,
}

impl ComputedStyle {
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn is(&self, name: &str, value: &str) -> bool {
        self.get(name).eq_ignore_ascii_case(value)
    }

    pub fn font_size(&self) -> f32 {
        length_px(self.get("font-size"), 0.0).unwrap_or(ROOT_FONT_SIZE)
    }

    /// Resolved length, percentages against `basis`
    pub fn px(&self, name: &str, basis: f32) -> Option<f32> {
        length_px(self.get(name), basis)
    }

    /// Like [`ComputedStyle::px`] with `auto` and friends taken as zero
    pub fn px_or_zero(&self, name: &str, basis: f32) -> f32 {
        self.px(name, basis).unwrap_or(0.0)
    }

    pub fn color(&self, name: &str) -> Rgba {
        parse_color(self.get(name), BLACK).unwrap_or([0, 0, 0, 0])
    }

    pub fn line_height(&self) -> f32 {
        let font_size = self.font_size();
        let value = self.get("line-height");
        if let Ok(factor) = value.parse::<f32>() {
            return factor * font_size;
        }
        length_px(value, font_size).unwrap_or(font_size * 1.2)
    }

    pub fn to_property_map(&self) -> PropertyMap {
        self.values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    UserAgent,
    Author,
    Inline,
}

type CascadeKey = (bool, Origin, Specificity, usize);

/// Parsed sheets of one document
#[derive(Debug, Clone)]
pub struct Cascade {
    sheets: Vec<(Origin, StyleSheet)>,
    viewport: Viewport,
}

impl Cascade {
    /// Gather every sheet the document references. Linked sheets are used
    /// when their bytes are in `assets`.
    pub fn for_document(
        doc: &LiveDocument,
        assets: &BTreeMap<String, Vec<u8>>,
        viewport: Viewport,
    ) -> Self {
        let mut sheets = vec![(Origin::UserAgent, StyleSheet::parse(USER_AGENT_SHEET))];
        for id in doc.descendants(doc.body()) {
            let Some(tag) = doc.tag(id) else { continue };
            if tag.eq_ignore_ascii_case("style") {
                sheets.push((Origin::Author, StyleSheet::parse(&doc.text_content(id))));
            } else if tag.eq_ignore_ascii_case("link") {
                let is_sheet = doc
                    .attr(id, "rel")
                    .is_some_and(|r| r.split_whitespace().any(|t| t.eq_ignore_ascii_case("stylesheet")));
                let bytes = doc.attr(id, "href").and_then(|href| assets.get(href));
                if let (true, Some(bytes)) = (is_sheet, bytes) {
                    sheets.push((Origin::Author, StyleSheet::parse(&String::from_utf8_lossy(bytes))));
                }
            }
        }
        trace!("Cascade built from {} sheet(s)", sheets.len());
        Self { sheets, viewport }
    }

    /// Computed styles of every element attached to the document
    pub fn compute_all(&self, doc: &LiveDocument) -> HashMap<NodeId, Arc<ComputedStyle>> {
        let mut styles = HashMap::new();
        self.compute_subtree(doc, doc.body(), None, &mut styles);
        styles
    }

    fn compute_subtree(
        &self,
        doc: &LiveDocument,
        id: NodeId,
        parent: Option<&ComputedStyle>,
        styles: &mut HashMap<NodeId, Arc<ComputedStyle>>,
    ) {
        if !doc.is_element(id) {
            return;
        }
        let style = Arc::new(self.compute(doc, id, None, parent));
        for child in doc.children(id) {
            self.compute_subtree(doc, *child, Some(&style), styles);
        }
        styles.insert(id, style);
    }

    /// Computed style of an element, or of its pseudo-element when `pseudo`
    /// is set (then `parent` is the element's own style)
    pub fn compute(
        &self,
        doc: &LiveDocument,
        element: NodeId,
        pseudo: Option<PseudoPosition>,
        parent: Option<&ComputedStyle>,
    ) -> ComputedStyle {
        let mut candidates: Vec<(CascadeKey, &ParsedDeclaration)> = Vec::new();
        let mut order = 0usize;
        for (origin, sheet) in &self.sheets {
            for rule in &sheet.rules {
                order += 1;
                let best = rule
                    .selectors
                    .iter()
                    .filter(|s| s.pseudo == pseudo && s.matches(doc, element))
                    .map(|s| s.specificity)
                    .max();
                if let Some(specificity) = best {
                    for decl in &rule.declarations {
                        candidates.push(((decl.important, *origin, specificity, order), decl));
                    }
                }
            }
        }
        let inline = match pseudo {
            None => doc
                .attr(element, "style")
                .map(parse_declaration_block)
                .unwrap_or_default(),
            Some(_) => Vec::new(),
        };
        order += 1;
        for decl in &inline {
            candidates.push(((decl.important, Origin::Inline, (0, 0, 0), order), decl));
        }
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut specified: BTreeMap<String, String> = BTreeMap::new();
        for (_, decl) in candidates {
            if !accepts(&decl.name, &decl.value) || decl.name.starts_with("--") {
                continue;
            }
            if let Some(longhands) = expand(&decl.name, &decl.value) {
                specified.extend(longhands);
            }
        }
        self.compute_values(&specified, parent, pseudo.is_some())
    }

    fn compute_values(
        &self,
        specified: &BTreeMap<String, String>,
        parent: Option<&ComputedStyle>,
        is_pseudo: bool,
    ) -> ComputedStyle {
        let initial = ComputedStyle::default();
        let parent_style = parent.unwrap_or(&initial);
        // Raw value after sentinel handling; `None` means "take the parent's"
        let cascaded = |name: &str, initial: &str, inherited: bool| -> Option<String> {
            let value = specified.get(name).map(|v| v.trim().to_ascii_lowercase());
            let keyword = value.as_deref().unwrap_or(if inherited { "inherit" } else { "initial" });
            match keyword {
                "inherit" => None,
                "initial" => Some(initial.to_string()),
                "unset" | "revert" | "revert-layer" => {
                    if inherited {
                        None
                    } else {
                        Some(initial.to_string())
                    }
                }
                _ => specified.get(name).map(|v| v.trim().to_string()),
            }
        };
        let mut values: BTreeMap<&'static str, String> = BTreeMap::new();

        let parent_font = parent.map(ComputedStyle::font_size).unwrap_or(ROOT_FONT_SIZE);
        let font_size = match cascaded("font-size", "medium", true) {
            Some(v) => self.font_size(&v, parent_font),
            None => parent_font,
        };
        values.insert("font-size", format_px(font_size));

        let parent_color = parent.map(|p| p.color("color")).unwrap_or(BLACK);
        let color = match cascaded("color", "black", true) {
            Some(v) => parse_color(&v, parent_color).unwrap_or(parent_color),
            None => parent_color,
        };
        values.insert("color", format_color(color));

        let ctx = LengthContext {
            font_size,
            root_font_size: ROOT_FONT_SIZE,
            viewport_width: self.viewport.width as f32,
            viewport_height: self.viewport.height as f32,
        };

        for &(name, initial_value, inherited) in PROPERTIES {
            if name == "font-size" || name == "color" {
                continue;
            }
            let raw = match (cascaded(name, initial_value, inherited), parent) {
                (Some(v), _) => v,
                (None, Some(p)) if !p.get(name).is_empty() => {
                    values.insert(name, p.get(name).to_string());
                    continue;
                }
                (None, _) => initial_value.to_string(),
            };
            let computed = if COLOR_PROPERTIES.contains(&name) {
                parse_color(&raw, color)
                    .map(format_color)
                    .unwrap_or_else(|| format_color(color))
            } else if LENGTH_PROPERTIES.contains(&name) {
                compute_length(&raw, &ctx)
            } else {
                match name {
                    "font-weight" => compute_weight(&raw, parent_style.get("font-weight")),
                    "line-height" => match parse_length(&raw, &ctx) {
                        Some(Length::Px(px)) => format_px(px),
                        Some(Length::Percent(p)) => format_px(p * font_size / 100.0),
                        None => raw,
                    },
                    "display" | "position" | "float" | "visibility" | "text-align"
                    | "white-space" | "box-sizing" | "flex-direction" | "font-style" => {
                        raw.to_ascii_lowercase()
                    }
                    _ => raw,
                }
            };
            values.insert(name, computed);
        }

        for side in SIDES {
            let style_key = border_key(side, "style");
            if matches!(values.get(style_key).map(String::as_str), Some("none" | "hidden")) {
                values.insert(border_key(side, "width"), "0px".into());
            }
        }
        if values.get("outline-style").map(String::as_str) == Some("none") {
            values.insert("outline-width", "0px".into());
        }

        let blockified = values
            .get("position")
            .is_some_and(|p| p == "absolute" || p == "fixed")
            || values.get("float").is_some_and(|f| f != "none");
        if blockified {
            if let Some(display) = values.get_mut("display") {
                match display.as_str() {
                    "inline" | "inline-block" => *display = "block".into(),
                    "inline-flex" => *display = "flex".into(),
                    _ => {}
                }
            }
        }

        if is_pseudo {
            if let Some(content) = values.get_mut("content") {
                if content == "normal" {
                    *content = "none".into();
                }
            }
        } else {
            values.remove("content");
        }

        ComputedStyle { values }
    }

    fn font_size(&self, value: &str, parent: f32) -> f32 {
        let lower = value.to_ascii_lowercase();
        if let Some((_, px)) = FONT_SIZE_KEYWORDS.iter().find(|(k, _)| *k == lower) {
            return *px;
        }
        match lower.as_str() {
            "smaller" => return parent / 1.2,
            "larger" => return parent * 1.2,
            _ => {}
        }
        let ctx = LengthContext {
            font_size: parent,
            root_font_size: ROOT_FONT_SIZE,
            viewport_width: self.viewport.width as f32,
            viewport_height: self.viewport.height as f32,
        };
        match parse_length(value, &ctx) {
            Some(Length::Px(px)) => px.max(0.0),
            Some(Length::Percent(p)) => parent * p / 100.0,
            None => parent,
        }
    }
}

fn border_key(side: &str, suffix: &str) -> &'static str {
    match (side, suffix) {
        ("top", "style") => "border-top-style",
        ("right", "style") => "border-right-style",
        ("bottom", "style") => "border-bottom-style",
        ("left", "style") => "border-left-style",
        ("top", _) => "border-top-width",
        ("right", _) => "border-right-width",
        ("bottom", _) => "border-bottom-width",
        _ => "border-left-width",
    }
}

fn compute_length(raw: &str, ctx: &LengthContext) -> String {
    match raw.to_ascii_lowercase().as_str() {
        "thin" => return "1px".into(),
        "medium" => return "3px".into(),
        "thick" => return "5px".into(),
        _ => {}
    }
    match parse_length(raw, ctx) {
        Some(Length::Px(px)) => format_px(px),
        Some(Length::Percent(p)) => format!("{}%", trim_number(p)),
        None => raw.to_string(),
    }
}

fn trim_number(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let mut s = format!("{:.2}", rounded);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

fn compute_weight(raw: &str, parent: &str) -> String {
    let parent: u32 = parent.parse().unwrap_or(400);
    match raw.to_ascii_lowercase().as_str() {
        "normal" => "400".into(),
        "bold" => "700".into(),
        "bolder" => (if parent < 600 { "700" } else { "900" }).to_string(),
        "lighter" => (if parent > 500 { "400" } else { "100" }).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cascade_for(markup: &str) -> (LiveDocument, Cascade) {
        let doc = LiveDocument::parse_fragment(markup);
        let cascade = Cascade::for_document(&doc, &BTreeMap::new(), Viewport::default());
        (doc, cascade)
    }

    fn find(doc: &LiveDocument, class: &str) -> NodeId {
        doc.elements_with_classes(doc.body(), &[class])[0]
    }

    #[test]
    fn parses_supported_selectors() {
        let sel = Selector::parse("div.card > p:first-child").unwrap();
        assert_eq!(sel.specificity(), (0, 2, 2));
        let sel = Selector::parse("#main .note::before").unwrap();
        assert_eq!(sel.pseudo(), Some(PseudoPosition::Before));
        assert_eq!(sel.specificity(), (1, 1, 1));
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("p + p").is_none());
        assert!(Selector::parse("div >").is_none());
        assert!(Selector::parse("[data-kind=\"x\"]").is_some());
    }

    #[test]
    fn later_and_more_specific_rules_win() {
        let (doc, cascade) = cascade_for(
            r#"<style>
                 .box { color: red; padding: 4px }
                 div.box { color: blue }
                 .box { padding: 1em 2px }
                 @media print { .box { color: green } }
               </style>
               <div class="box">x</div>"#,
        );
        let styles = cascade.compute_all(&doc);
        let style = &styles[&find(&doc, "box")];
        assert_eq!(style.get("color"), "rgb(0, 0, 255)");
        assert_eq!(style.get("padding-top"), "16px");
        assert_eq!(style.get("padding-left"), "2px");
        assert_eq!(style.get("display"), "block");
    }

    #[test]
    fn inline_style_and_important_order() {
        let (doc, cascade) = cascade_for(
            r#"<style>.a { margin-top: 3px !important }</style>
               <div class="a" style="margin-top: 9px; color: #010203">x</div>"#,
        );
        let styles = cascade.compute_all(&doc);
        let style = &styles[&find(&doc, "a")];
        assert_eq!(style.get("margin-top"), "3px");
        assert_eq!(style.get("color"), "rgb(1, 2, 3)");
    }

    #[test]
    fn inherits_text_properties_and_resolves_em() {
        let (doc, cascade) = cascade_for(
            r#"<div class="outer" style="font-size: 20px; color: red">
                 <h1 class="inner">t</h1>
               </div>"#,
        );
        let styles = cascade.compute_all(&doc);
        let inner = &styles[&find(&doc, "inner")];
        assert_eq!(inner.get("font-size"), "40px");
        assert_eq!(inner.get("margin-top"), "26.8px");
        assert_eq!(inner.get("color"), "rgb(255, 0, 0)");
        assert_eq!(inner.get("font-weight"), "700");
        assert_eq!(inner.get("border-top-color"), "rgb(255, 0, 0)");
        assert_eq!(inner.get("border-top-width"), "0px");
        assert!(inner.get("background").is_empty());
    }

    #[test]
    fn background_shorthand_keeps_gradient_in_image() {
        let (doc, cascade) = cascade_for(
            r#"<div class="g" style="background: linear-gradient(to right, red, blue)">x</div>"#,
        );
        let styles = cascade.compute_all(&doc);
        let style = &styles[&find(&doc, "g")];
        assert_eq!(style.get("background-image"), "linear-gradient(to right, red, blue)");
        assert_eq!(style.get("background-color"), "rgba(0, 0, 0, 0)");
    }

    #[test]
    fn pseudo_elements_carry_content() {
        let (doc, cascade) = cascade_for(
            r#"<style>.q::before { content: "\201C"; color: gray }</style><p class="q">x</p>"#,
        );
        let styles = cascade.compute_all(&doc);
        let q = find(&doc, "q");
        let before = cascade.compute(&doc, q, Some(PseudoPosition::Before), Some(&styles[&q]));
        assert_eq!(before.get("content"), "\"\\201C\"");
        assert_eq!(before.get("color"), "rgb(128, 128, 128)");
        let after = cascade.compute(&doc, q, Some(PseudoPosition::After), Some(&styles[&q]));
        assert_eq!(after.get("content"), "none");
    }

    #[test]
    fn accepts_rejects_malformed_values() {
        assert!(accepts("color", "rgb(1, 2, 3)"));
        assert!(accepts("border", "1px solid red"));
        assert!(accepts("background", "linear-gradient(red, blue)"));
        assert!(!accepts("color", "notacolor"));
        assert!(!accepts("padding-top", "-4px"));
        assert!(!accepts("no-such-property", "1px"));
        assert!(!accepts("width", "calc(1px"));
    }

    #[test]
    fn computing_twice_is_stable() {
        let (doc, cascade) = cascade_for(
            r#"<div class="s" style="font: italic bold 12pt/1.5 Georgia, serif; border: thin dashed">x</div>"#,
        );
        let styles = cascade.compute_all(&doc);
        let first = styles[&find(&doc, "s")].clone();
        let inline: String = first
            .values
            .iter()
            .map(|(k, v)| format!("{}: {}; ", k, v))
            .collect();
        let (doc2, cascade2) = cascade_for(&format!(r#"<div class="s" style="{}">x</div>"#, inline));
        let styles2 = cascade2.compute_all(&doc2);
        assert_eq!(first.as_ref(), styles2[&find(&doc2, "s")].as_ref());
        assert_eq!(first.get("font-size"), "16px");
        assert_eq!(first.get("line-height"), "1.5");
        assert_eq!(first.get("border-top-width"), "1px");
    }
}
