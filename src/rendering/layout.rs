//! Box layout for the reference renderer.
//!
//! Block flow with sibling margin collapsing, line boxes with greedy word
//! wrapping, single-line flex rows, table rows as equal-width cells and
//! absolutely positioned boxes against their parent's padding box. Glyphs
//! have fixed advances: half the font size for Latin text, the full size for
//! wide (CJK) characters.

use std::collections::HashMap;
use std::sync::Arc;

use super::cascade::ComputedStyle;
use crate::dom::{LiveDocument, NodeId};
use crate::host::Rect;
use crate::raster::Rgba;

pub type StyleTable = HashMap<NodeId, Arc<ComputedStyle>>;

const REPLACED: &[&str] = &["img", "svg", "canvas", "video", "iframe"];

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1FAFF
        | 0x20000..=0x3FFFD)
}

/// Horizontal advance of one glyph
pub fn char_advance(c: char, font_size: f32, monospace: bool) -> f32 {
    if monospace {
        font_size * 0.6
    } else if c == ' ' {
        font_size * 0.3
    } else if is_wide(c) {
        font_size
    } else {
        font_size * 0.5
    }
}

pub fn text_width(text: &str, font_size: f32, monospace: bool) -> f32 {
    text.chars().map(|c| char_advance(c, font_size, monospace)).sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    fn from_style(style: &ComputedStyle, prefix: &str, suffix: &str, basis: f32) -> Self {
        let side = |s: &str| style.px_or_zero(&format!("{}{}{}", prefix, s, suffix), basis);
        Self {
            top: side("top"),
            right: side("right"),
            bottom: side("bottom"),
            left: side("left"),
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Font and paint attributes shared by a run of text
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub line_height: f32,
    pub color: Rgba,
    pub bold: bool,
    pub monospace: bool,
    pub underline: bool,
    pub line_through: bool,
    pub visible: bool,
}

impl TextStyle {
    fn from_style(style: &ComputedStyle, decoration: Decoration) -> Self {
        let weight: u32 = style.get("font-weight").parse().unwrap_or(400);
        Self {
            size: style.font_size(),
            line_height: style.line_height(),
            color: style.color("color"),
            bold: weight >= 600,
            monospace: style.get("font-family").to_ascii_lowercase().contains("monospace"),
            underline: decoration.underline,
            line_through: decoration.line_through,
            visible: style.is("visibility", "visible"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Decoration {
    underline: bool,
    line_through: bool,
}

impl Decoration {
    fn with(self, style: &ComputedStyle) -> Self {
        let line = style.get("text-decoration-line");
        Self {
            underline: self.underline || line.contains("underline"),
            line_through: self.line_through || line.contains("line-through"),
        }
    }
}

/// A laid-out piece of text; `y` is the top of the glyph box
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn width(&self) -> f32 {
        text_width(&self.text, self.style.size, self.style.monospace)
    }
}

#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// `None` for anonymous boxes
    pub node: Option<NodeId>,
    pub style: Option<Arc<ComputedStyle>>,
    /// Border box
    pub rect: Rect,
    pub margin: Edges,
    pub border: Edges,
    pub children: Vec<LayoutBox>,
    pub text: Vec<TextRun>,
}

impl LayoutBox {
    fn anonymous(rect: Rect) -> Self {
        Self {
            node: None,
            style: None,
            rect,
            margin: Edges::default(),
            border: Edges::default(),
            children: Vec::new(),
            text: Vec::new(),
        }
    }

    pub fn margin_width(&self) -> f32 {
        self.rect.width + self.margin.horizontal()
    }

    pub fn margin_height(&self) -> f32 {
        self.rect.height + self.margin.vertical()
    }

    /// Bottom edge of the margin box
    pub fn margin_bottom_edge(&self) -> f32 {
        self.rect.bottom() + self.margin.bottom
    }

    pub fn padding_box(&self) -> Rect {
        Rect::new(
            self.rect.x + self.border.left,
            self.rect.y + self.border.top,
            (self.rect.width - self.border.horizontal()).max(0.0),
            (self.rect.height - self.border.vertical()).max(0.0),
        )
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.rect.x += dx;
        self.rect.y += dy;
        for run in &mut self.text {
            run.x += dx;
            run.y += dy;
        }
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    pub fn find(&self, id: NodeId) -> Option<&LayoutBox> {
        if self.node == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Lowest painted edge of the subtree
    pub fn extent_bottom(&self) -> f32 {
        let text = self
            .text
            .iter()
            .map(|r| r.y + r.style.line_height.max(r.style.size))
            .fold(0.0f32, f32::max);
        self.children
            .iter()
            .map(LayoutBox::extent_bottom)
            .fold(self.margin_bottom_edge().max(text), f32::max)
    }
}

enum InlineItem {
    Word(String, TextStyle),
    Space(TextStyle),
    Break(f32),
    Atomic(LayoutBox),
}

enum Placed {
    Text(String, TextStyle),
    Atomic(LayoutBox),
}

struct Line {
    items: Vec<(f32, Placed)>,
    width: f32,
    height: f32,
}

impl Line {
    fn new(indent: f32) -> Self {
        Self {
            items: Vec::new(),
            width: indent,
            height: 0.0,
        }
    }
}

pub struct LayoutEngine<'a> {
    doc: &'a LiveDocument,
    styles: &'a StyleTable,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(doc: &'a LiveDocument, styles: &'a StyleTable) -> Self {
        Self { doc, styles }
    }

    /// Lay out `root` with its margin box at the origin of a containing
    /// block `width` wide. The root's own offsets are ignored.
    pub fn layout_root(&self, root: NodeId, width: f32) -> Option<LayoutBox> {
        let style = self.styles.get(&root)?;
        if style.is("display", "none") {
            return None;
        }
        Some(self.layout_block(root, 0.0, 0.0, width, None))
    }

    fn style(&self, id: NodeId) -> Arc<ComputedStyle> {
        self.styles.get(&id).cloned().unwrap_or_default()
    }

    fn displayed(&self, id: NodeId) -> Option<Arc<ComputedStyle>> {
        let style = self.styles.get(&id)?;
        (!style.is("display", "none")).then(|| Arc::clone(style))
    }

    fn is_out_of_flow(style: &ComputedStyle) -> bool {
        style.is("position", "absolute") || style.is("position", "fixed")
    }

    fn is_block_level(style: &ComputedStyle) -> bool {
        matches!(
            style.get("display"),
            "block"
                | "list-item"
                | "flex"
                | "grid"
                | "table"
                | "table-row-group"
                | "table-header-group"
                | "table-footer-group"
                | "table-row"
                | "table-cell"
                | "table-caption"
                | "flow-root"
                | "contents"
        ) || !style.is("float", "none")
    }

    fn is_replaced(&self, id: NodeId) -> bool {
        self.doc
            .tag(id)
            .is_some_and(|t| REPLACED.iter().any(|r| t.eq_ignore_ascii_case(r)))
    }

    /// Lay out a block-level box whose margin box starts at (`x`, `y`).
    /// `forced_width` fixes the border-box width.
    fn layout_block(
        &self,
        id: NodeId,
        x: f32,
        y: f32,
        containing_width: f32,
        forced_width: Option<f32>,
    ) -> LayoutBox {
        let style = self.style(id);
        let cw = containing_width;
        let mut margin = Edges::from_style(&style, "margin-", "", cw);
        let border = Edges::from_style(&style, "border-", "-width", cw);
        let padding = Edges::from_style(&style, "padding-", "", cw);
        let extras = border.horizontal() + padding.horizontal();
        let border_box = style.is("box-sizing", "border-box");
        let to_border = |w: f32| if border_box { w } else { w + extras };

        let specified = forced_width.or_else(|| style.px("width", cw).map(to_border));
        let mut width = match specified {
            Some(w) => w,
            None if self.is_replaced(id) => to_border(self.replaced_size(id, &style).0),
            None => cw - margin.horizontal(),
        };
        if forced_width.is_none() {
            if let Some(max) = style.px("max-width", cw).map(to_border) {
                width = width.min(max);
            }
            if let Some(min) = style.px("min-width", cw).map(to_border) {
                width = width.max(min);
            }
        }
        width = width.max(extras);

        if forced_width.is_none() && (specified.is_some() || width < cw - margin.horizontal()) {
            let auto_left = style.is("margin-left", "auto");
            let auto_right = style.is("margin-right", "auto");
            let free = (cw - width - margin.horizontal()).max(0.0);
            match (auto_left, auto_right) {
                (true, true) => {
                    margin.left = free / 2.0;
                    margin.right = free / 2.0;
                }
                (true, false) => margin.left = free,
                (false, true) => margin.right = free,
                (false, false) => {}
            }
        }

        let mut lb = LayoutBox {
            node: Some(id),
            style: Some(Arc::clone(&style)),
            rect: Rect::new(x + margin.left, y + margin.top, width, 0.0),
            margin,
            border,
            children: Vec::new(),
            text: Vec::new(),
        };
        let content = Rect::new(
            lb.rect.x + border.left + padding.left,
            lb.rect.y + border.top + padding.top,
            width - extras,
            0.0,
        );

        let auto_height = if self.is_replaced(id) {
            self.replaced_size(id, &style).1
        } else {
            self.layout_contents(&mut lb, id, &style, content)
        };
        let vextras = border.vertical() + padding.vertical();
        let definite = |name: &str| {
            let value = style.get(name);
            if value.ends_with('%') {
                None
            } else {
                style.px(name, 0.0)
                    .map(|h| if border_box { h - vextras } else { h })
            }
        };
        let mut height = definite("height").unwrap_or(auto_height);
        if let Some(max) = definite("max-height") {
            height = height.min(max);
        }
        if let Some(min) = definite("min-height") {
            height = height.max(min);
        }
        lb.rect.height = height.max(0.0) + vextras;

        self.layout_positioned(&mut lb, id);
        lb
    }

    /// Intrinsic size of a replaced element from its style or attributes
    fn replaced_size(&self, id: NodeId, style: &ComputedStyle) -> (f32, f32) {
        let attr = |name: &str| {
            self.doc
                .attr(id, name)
                .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
        };
        let default = if self.doc.tag(id).is_some_and(|t| t.eq_ignore_ascii_case("img")) {
            (0.0, 0.0)
        } else {
            (300.0, 150.0)
        };
        let width = style.px("width", 0.0).or_else(|| attr("width")).unwrap_or(default.0);
        let height = style.px("height", 0.0).or_else(|| attr("height")).unwrap_or(default.1);
        (width, height)
    }

    fn layout_contents(
        &self,
        lb: &mut LayoutBox,
        id: NodeId,
        style: &Arc<ComputedStyle>,
        content: Rect,
    ) -> f32 {
        match style.get("display") {
            "flex" | "inline-flex" => {
                let direction = style.get("flex-direction");
                if direction.starts_with("column") {
                    let gap = style.px("row-gap", content.width).unwrap_or(0.0);
                    self.layout_flow(lb, id, style, content, Some(gap))
                } else {
                    self.layout_row(lb, id, style, content, false)
                }
            }
            "table-row" => self.layout_row(lb, id, style, content, true),
            _ => self.layout_flow(lb, id, style, content, None),
        }
    }

    /// Block flow. With `gap` set (flex columns) margins do not collapse and
    /// `gap` separates items.
    fn layout_flow(
        &self,
        lb: &mut LayoutBox,
        id: NodeId,
        style: &Arc<ComputedStyle>,
        content: Rect,
        gap: Option<f32>,
    ) -> f32 {
        let mut cursor = content.y;
        let mut pending_margin = 0.0f32;
        let mut placed_any = false;
        let mut inline: Vec<InlineItem> = Vec::new();

        for &child in self.doc.children(id) {
            if !self.doc.is_element(child) {
                self.collect_inline(child, style, Decoration::default().with(style), content.width, &mut inline);
                continue;
            }
            let Some(child_style) = self.displayed(child) else {
                continue;
            };
            if Self::is_out_of_flow(&child_style) {
                continue;
            }
            if !Self::is_block_level(&child_style) {
                self.collect_inline(child, style, Decoration::default().with(style), content.width, &mut inline);
                continue;
            }

            let top = cursor + pending_margin;
            let height = self.flush_inline(lb, &mut inline, style, content.x, top, content.width);
            if height > 0.0 {
                cursor = top + height;
                pending_margin = 0.0;
                placed_any = true;
            }

            let margin_top = child_style.px_or_zero("margin-top", content.width);
            let y = match gap {
                Some(g) => cursor + pending_margin + if placed_any { g } else { 0.0 },
                None => cursor + pending_margin.max(margin_top) - margin_top,
            };
            let mut child_box = self.layout_block(child, content.x, y, content.width, None);
            cursor = child_box.rect.bottom();
            pending_margin = child_box.margin.bottom;
            placed_any = true;
            if child_style.is("position", "relative") {
                let (dx, dy) = relative_offset(&child_style, content.width);
                child_box.translate(dx, dy);
            }
            lb.children.push(child_box);
        }

        let top = cursor + pending_margin;
        let height = self.flush_inline(lb, &mut inline, style, content.x, top, content.width);
        if height > 0.0 {
            cursor = top + height;
            pending_margin = 0.0;
        }
        cursor + pending_margin - content.y
    }

    /// A single flex line, or a table row (`equal`: cells share the width)
    fn layout_row(
        &self,
        lb: &mut LayoutBox,
        id: NodeId,
        style: &Arc<ComputedStyle>,
        content: Rect,
        equal: bool,
    ) -> f32 {
        enum Item {
            Element(NodeId, Arc<ComputedStyle>),
            Text(NodeId),
        }
        let items: Vec<Item> = self
            .doc
            .children(id)
            .iter()
            .filter_map(|&child| {
                if self.doc.is_element(child) {
                    let s = self.displayed(child)?;
                    (!Self::is_out_of_flow(&s)).then_some(Item::Element(child, s))
                } else {
                    let text = self.doc.text(child)?;
                    (!text.trim().is_empty()).then_some(Item::Text(child))
                }
            })
            .collect();
        if items.is_empty() {
            return 0.0;
        }

        let gap = if equal {
            0.0
        } else {
            style.px("column-gap", content.width).unwrap_or(0.0)
        };
        let count = items.len() as f32;
        let available = (content.width - gap * (count - 1.0)).max(0.0);

        let mut sizes: Vec<f32> = items
            .iter()
            .map(|item| match item {
                _ if equal => available / count,
                Item::Element(child, s) => self.flex_base(*child, s, available),
                Item::Text(child) => {
                    let text = collapse_whitespace(self.doc.text(*child).unwrap_or_default());
                    text_width(text.trim(), style.font_size(), false)
                }
            })
            .collect();

        let free = available - sizes.iter().sum::<f32>();
        let mut leading = 0.0;
        let mut spacing = gap;
        if free > 0.0 {
            let grow: Vec<f32> = items
                .iter()
                .map(|item| match item {
                    Item::Element(_, s) => s.get("flex-grow").parse().unwrap_or(0.0),
                    Item::Text(_) => 0.0,
                })
                .collect();
            let total_grow: f32 = grow.iter().sum();
            if total_grow > 0.0 {
                for (size, g) in sizes.iter_mut().zip(&grow) {
                    *size += free * g / total_grow;
                }
            } else {
                match style.get("justify-content") {
                    "center" => leading = free / 2.0,
                    "flex-end" | "end" | "right" => leading = free,
                    "space-between" if count > 1.0 => spacing += free / (count - 1.0),
                    "space-around" => {
                        leading = free / count / 2.0;
                        spacing += free / count;
                    }
                    "space-evenly" => {
                        leading = free / (count + 1.0);
                        spacing += free / (count + 1.0);
                    }
                    _ => {}
                }
            }
        } else if free < 0.0 {
            let weights: Vec<f32> = items
                .iter()
                .zip(&sizes)
                .map(|(item, size)| match item {
                    Item::Element(_, s) => s.get("flex-shrink").parse::<f32>().unwrap_or(1.0) * size,
                    Item::Text(_) => *size,
                })
                .collect();
            let total: f32 = weights.iter().sum();
            if total > 0.0 {
                for (size, w) in sizes.iter_mut().zip(&weights) {
                    *size = (*size + free * w / total).max(0.0);
                }
            }
        }

        let mut x = content.x + leading;
        let mut boxes = Vec::with_capacity(items.len());
        for (item, size) in items.iter().zip(&sizes) {
            let b = match item {
                Item::Element(child, s) => {
                    let margins = s.px_or_zero("margin-left", content.width)
                        + s.px_or_zero("margin-right", content.width);
                    self.layout_block(*child, x, content.y, content.width, Some((size - margins).max(0.0)))
                }
                Item::Text(child) => {
                    let mut anon = LayoutBox::anonymous(Rect::new(x, content.y, *size, 0.0));
                    let mut inline = Vec::new();
                    self.collect_inline(*child, style, Decoration::default().with(style), *size, &mut inline);
                    anon.rect.height = self.flush_inline(&mut anon, &mut inline, style, x, content.y, *size);
                    anon
                }
            };
            x += size + spacing;
            boxes.push(b);
        }

        let line_height = boxes.iter().map(LayoutBox::margin_height).fold(0.0f32, f32::max);
        let align = style.get("align-items");
        for (b, item) in boxes.iter_mut().zip(&items) {
            let self_align = match item {
                Item::Element(_, s) if !s.is("align-self", "auto") => s.get("align-self").to_string(),
                _ => align.to_string(),
            };
            let slack = line_height - b.margin_height();
            match self_align.as_str() {
                "center" => b.translate(0.0, slack / 2.0),
                "flex-end" | "end" => b.translate(0.0, slack),
                "flex-start" | "start" | "baseline" => {}
                _ => {
                    let auto = b.style.as_ref().map_or(true, |s| s.is("height", "auto"));
                    if auto {
                        b.rect.height += slack;
                    }
                }
            }
        }
        if style.get("flex-direction") == "row-reverse" {
            let right = content.x + content.width;
            for b in &mut boxes {
                let mirrored = right - (b.rect.x - b.margin.left - content.x) - b.margin_width();
                let dx = mirrored - (b.rect.x - b.margin.left);
                b.translate(dx, 0.0);
            }
        }
        for (b, item) in boxes.iter_mut().zip(&items) {
            if let Item::Element(_, s) = item {
                if s.is("position", "relative") {
                    let (dx, dy) = relative_offset(s, content.width);
                    b.translate(dx, dy);
                }
            }
        }
        lb.children.extend(boxes);
        line_height
    }

    /// Margin-box main size of a flex item before growing or shrinking
    fn flex_base(&self, id: NodeId, style: &ComputedStyle, available: f32) -> f32 {
        let margins =
            style.px_or_zero("margin-left", available) + style.px_or_zero("margin-right", available);
        let extras = Edges::from_style(style, "padding-", "", available).horizontal()
            + Edges::from_style(style, "border-", "-width", available).horizontal();
        let border_box = style.is("box-sizing", "border-box");
        let explicit = style
            .px("flex-basis", available)
            .or_else(|| style.px("width", available));
        match explicit {
            Some(w) if border_box => w.max(extras) + margins,
            Some(w) => w + extras + margins,
            None => self.max_content(id).min(available),
        }
    }

    /// Width of the content laid out without wrapping, margins included
    fn max_content(&self, id: NodeId) -> f32 {
        let Some(style) = self.displayed(id) else {
            return 0.0;
        };
        let margins = style.px_or_zero("margin-left", 0.0) + style.px_or_zero("margin-right", 0.0);
        let extras = Edges::from_style(&style, "padding-", "", 0.0).horizontal()
            + Edges::from_style(&style, "border-", "-width", 0.0).horizontal();
        if let Some(w) = style.px("width", 0.0).filter(|_| !style.get("width").ends_with('%')) {
            let w = if style.is("box-sizing", "border-box") { w } else { w + extras };
            return w + margins;
        }
        if self.is_replaced(id) {
            return self.replaced_size(id, &style).0 + extras + margins;
        }
        let mut line = 0.0f32;
        let mut widest = 0.0f32;
        let row = style.is("display", "flex") && !style.get("flex-direction").starts_with("column");
        for &child in self.doc.children(id) {
            if let Some(text) = self.doc.text(child) {
                let text = collapse_whitespace(text);
                line += text_width(&text, style.font_size(), TextStyle::from_style(&style, Decoration::default()).monospace);
                continue;
            }
            let Some(child_style) = self.displayed(child) else {
                continue;
            };
            if Self::is_out_of_flow(&child_style) {
                continue;
            }
            if Self::is_block_level(&child_style) && !row {
                widest = widest.max(line);
                line = 0.0;
                widest = widest.max(self.max_content(child));
            } else {
                line += self.max_content(child);
            }
        }
        widest.max(line) + extras + margins
    }

    fn collect_inline(
        &self,
        id: NodeId,
        parent_style: &Arc<ComputedStyle>,
        decoration: Decoration,
        available: f32,
        items: &mut Vec<InlineItem>,
    ) {
        if let Some(text) = self.doc.text(id) {
            let font = TextStyle::from_style(parent_style, decoration);
            let text = transform_text(text, parent_style.get("text-transform"));
            match parent_style.get("white-space") {
                "pre" | "pre-wrap" | "break-spaces" => {
                    for (i, line) in text.split('\n').enumerate() {
                        if i > 0 {
                            items.push(InlineItem::Break(font.line_height));
                        }
                        if !line.is_empty() {
                            items.push(InlineItem::Word(line.replace('\t', "    "), font.clone()));
                        }
                    }
                }
                ws => {
                    let keep_newlines = ws == "pre-line";
                    for (i, line) in text.split('\n').enumerate() {
                        if i > 0 {
                            if keep_newlines {
                                items.push(InlineItem::Break(font.line_height));
                            } else {
                                push_space(items, &font);
                            }
                        }
                        if line.starts_with(char::is_whitespace) {
                            push_space(items, &font);
                        }
                        let mut words = line.split_whitespace().peekable();
                        while let Some(word) = words.next() {
                            items.push(InlineItem::Word(word.to_string(), font.clone()));
                            if words.peek().is_some() {
                                push_space(items, &font);
                            }
                        }
                        if line.ends_with(char::is_whitespace) && !line.trim().is_empty() {
                            push_space(items, &font);
                        }
                    }
                }
            }
            return;
        }

        let Some(style) = self.displayed(id) else {
            return;
        };
        if Self::is_out_of_flow(&style) {
            return;
        }
        if self.doc.tag(id).is_some_and(|t| t.eq_ignore_ascii_case("br")) {
            items.push(InlineItem::Break(style.line_height()));
            return;
        }
        if style.is("display", "inline") && !self.is_replaced(id) {
            let decoration = decoration.with(&style);
            for &child in self.doc.children(id) {
                self.collect_inline(child, &style, decoration, available, items);
            }
            return;
        }
        // Atomic inline: inline-block, inline-flex, replaced elements
        let forced = if self.is_replaced(id) || style.px("width", available).is_some() {
            None
        } else {
            let margins = style.px_or_zero("margin-left", available)
                + style.px_or_zero("margin-right", available);
            Some((self.max_content(id).min(available) - margins).max(0.0))
        };
        let atomic = self.layout_block(id, 0.0, 0.0, available, forced);
        items.push(InlineItem::Atomic(atomic));
    }

    /// Turn pending inline items into line boxes at `y`; returns their
    /// total height
    fn flush_inline(
        &self,
        lb: &mut LayoutBox,
        items: &mut Vec<InlineItem>,
        style: &ComputedStyle,
        x: f32,
        y: f32,
        width: f32,
    ) -> f32 {
        let pending = std::mem::take(items);
        let has_content = pending
            .iter()
            .any(|i| !matches!(i, InlineItem::Space(_)));
        if !has_content {
            return 0.0;
        }
        let wrap = !matches!(style.get("white-space"), "nowrap" | "pre");
        let indent = style.px_or_zero("text-indent", width);

        let mut lines: Vec<Line> = Vec::new();
        let mut current = Line::new(indent);
        let mut space: Option<f32> = None;

        let push = |current: &mut Line, lines: &mut Vec<Line>, placed: Placed, w: f32, h: f32, space: Option<f32>| {
            let mut gap = space.unwrap_or(0.0);
            if wrap && !current.items.is_empty() && current.width + gap + w > width {
                lines.push(std::mem::replace(current, Line::new(0.0)));
                gap = 0.0;
            }
            if current.items.is_empty() {
                gap = 0.0;
            }
            // Merge words of the same style into one run
            if let (Placed::Text(text, font), Some((_, Placed::Text(prev, prev_font)))) =
                (&placed, current.items.last_mut())
            {
                if font == prev_font {
                    if gap > 0.0 {
                        prev.push(' ');
                    }
                    prev.push_str(text);
                    current.width += gap + w;
                    current.height = current.height.max(h);
                    return;
                }
            }
            current.items.push((current.width + gap, placed));
            current.width += gap + w;
            current.height = current.height.max(h);
        };

        for item in pending {
            match item {
                InlineItem::Break(h) => {
                    if current.items.is_empty() {
                        current.height = current.height.max(h);
                    }
                    lines.push(std::mem::replace(&mut current, Line::new(0.0)));
                    space = None;
                }
                InlineItem::Space(font) => {
                    if !current.items.is_empty() {
                        space = Some(char_advance(' ', font.size, font.monospace));
                    }
                }
                InlineItem::Word(text, font) => {
                    let w = text_width(&text, font.size, font.monospace);
                    let h = font.line_height;
                    push(&mut current, &mut lines, Placed::Text(text, font), w, h, space.take());
                }
                InlineItem::Atomic(b) => {
                    let (w, h) = (b.margin_width(), b.margin_height());
                    push(&mut current, &mut lines, Placed::Atomic(b), w, h, space.take());
                }
            }
        }
        if !current.items.is_empty() {
            lines.push(current);
        }

        let align = style.get("text-align");
        let mut top = y;
        for line in lines {
            let offset = match align {
                "center" | "-webkit-center" => ((width - line.width) / 2.0).max(0.0),
                "right" | "end" | "-webkit-right" => (width - line.width).max(0.0),
                _ => 0.0,
            };
            for (dx, placed) in line.items {
                match placed {
                    Placed::Text(text, font) => {
                        let run_y = top + (line.height - font.size) / 2.0;
                        lb.text.push(TextRun {
                            x: x + offset + dx,
                            y: run_y,
                            text,
                            style: font,
                        });
                    }
                    Placed::Atomic(mut b) => {
                        let dy = top + line.height - b.margin_height();
                        b.translate(x + offset + dx, dy);
                        lb.children.push(b);
                    }
                }
            }
            top += line.height;
        }
        top - y
    }

    /// Absolutely positioned children, placed against the padding box
    fn layout_positioned(&self, lb: &mut LayoutBox, id: NodeId) {
        let pb = lb.padding_box();
        for child in self.doc.element_children(id).collect::<Vec<_>>() {
            let Some(style) = self.displayed(child) else {
                continue;
            };
            if !Self::is_out_of_flow(&style) {
                continue;
            }
            let left = offset(&style, "left", pb.width);
            let right = offset(&style, "right", pb.width);
            let top = offset(&style, "top", pb.height);
            let bottom = offset(&style, "bottom", pb.height);
            let margins =
                style.px_or_zero("margin-left", pb.width) + style.px_or_zero("margin-right", pb.width);

            let forced = if style.px("width", pb.width).is_some() || self.is_replaced(child) {
                None
            } else if let (Some(l), Some(r)) = (left, right) {
                Some((pb.width - l - r - margins).max(0.0))
            } else {
                let room = pb.width - left.unwrap_or(0.0);
                Some((self.max_content(child).min(room) - margins).max(0.0))
            };
            let mut b = self.layout_block(child, 0.0, 0.0, pb.width, forced);
            let x = match (left, right) {
                (Some(l), _) => pb.x + l,
                (None, Some(r)) => pb.right() - r - b.margin_width(),
                (None, None) => pb.x,
            };
            let y = match (top, bottom) {
                (Some(t), _) => pb.y + t,
                (None, Some(bt)) => pb.bottom() - bt - b.margin_height(),
                (None, None) => pb.y,
            };
            b.translate(x, y);
            lb.children.push(b);
        }
    }
}

fn offset(style: &ComputedStyle, name: &str, basis: f32) -> Option<f32> {
    style.px(name, basis)
}

fn relative_offset(style: &ComputedStyle, basis: f32) -> (f32, f32) {
    let dx = offset(style, "left", basis)
        .or_else(|| offset(style, "right", basis).map(|r| -r))
        .unwrap_or(0.0);
    let dy = offset(style, "top", 0.0)
        .or_else(|| offset(style, "bottom", 0.0).map(|b| -b))
        .unwrap_or(0.0);
    (dx, dy)
}

fn push_space(items: &mut Vec<InlineItem>, font: &TextStyle) {
    if !matches!(items.last(), Some(InlineItem::Space(_)) | None) {
        items.push(InlineItem::Space(font.clone()));
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn transform_text(text: &str, transform: &str) -> String {
    match transform {
        "uppercase" => text.to_uppercase(),
        "lowercase" => text.to_lowercase(),
        "capitalize" => {
            let mut out = String::with_capacity(text.len());
            let mut start = true;
            for c in text.chars() {
                if start && c.is_alphabetic() {
                    out.extend(c.to_uppercase());
                    start = false;
                } else {
                    if c.is_whitespace() {
                        start = true;
                    }
                    out.push(c);
                }
            }
            out
        }
        _ => text.to_string(),
    }
}
