//! CSS value helpers: colors, lengths and top-level value splitting

use cssparser::{Parser, ParserInput, Token};

use crate::raster::Rgba;

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

const NAMED_COLORS: &[(&str, Rgba)] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("orange", [255, 165, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("silver", [192, 192, 192, 255]),
    ("maroon", [128, 0, 0, 255]),
    ("navy", [0, 0, 128, 255]),
    ("teal", [0, 128, 128, 255]),
    ("olive", [128, 128, 0, 255]),
    ("aqua", [0, 255, 255, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("fuchsia", [255, 0, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("pink", [255, 192, 203, 255]),
    ("brown", [165, 42, 42, 255]),
    ("gold", [255, 215, 0, 255]),
    ("indigo", [75, 0, 130, 255]),
    ("violet", [238, 130, 238, 255]),
    ("crimson", [220, 20, 60, 255]),
    ("coral", [255, 127, 80, 255]),
    ("salmon", [250, 128, 114, 255]),
    ("tomato", [255, 99, 71, 255]),
    ("khaki", [240, 230, 140, 255]),
    ("beige", [245, 245, 220, 255]),
    ("ivory", [255, 255, 240, 255]),
    ("lavender", [230, 230, 250, 255]),
    ("skyblue", [135, 206, 235, 255]),
    ("steelblue", [70, 130, 180, 255]),
    ("slategray", [112, 128, 144, 255]),
    ("darkgray", [169, 169, 169, 255]),
    ("darkgrey", [169, 169, 169, 255]),
    ("lightgray", [211, 211, 211, 255]),
    ("lightgrey", [211, 211, 211, 255]),
    ("gainsboro", [220, 220, 220, 255]),
    ("whitesmoke", [245, 245, 245, 255]),
    ("darkblue", [0, 0, 139, 255]),
    ("darkgreen", [0, 100, 0, 255]),
    ("darkred", [139, 0, 0, 255]),
    ("lightblue", [173, 216, 230, 255]),
    ("lightgreen", [144, 238, 144, 255]),
    ("transparent", TRANSPARENT),
];

/// Parse a color; `currentcolor` resolves to `current`
pub fn parse_color(value: &str, current: Rgba) -> Option<Rgba> {
    let mut input = ParserInput::new(value.trim());
    let mut parser = Parser::new(&mut input);
    let color = color_from_parser(&mut parser, current)?;
    parser.is_exhausted().then_some(color)
}

fn color_from_parser(parser: &mut Parser<'_, '_>, current: Rgba) -> Option<Rgba> {
    let token = parser.next().ok()?.clone();
    match token {
        Token::Hash(ref h) | Token::IDHash(ref h) => parse_hex(h),
        Token::Ident(ref name) => {
            if name.eq_ignore_ascii_case("currentcolor") {
                return Some(current);
            }
            NAMED_COLORS
                .iter()
                .find(|(n, _)| name.eq_ignore_ascii_case(n))
                .map(|(_, c)| *c)
        }
        Token::Function(ref name)
            if name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba") =>
        {
            parser
                .parse_nested_block(|nested| rgb_arguments(nested))
                .ok()
        }
        Token::Function(ref name)
            if name.eq_ignore_ascii_case("hsl") || name.eq_ignore_ascii_case("hsla") =>
        {
            parser
                .parse_nested_block(|nested| hsl_arguments(nested))
                .ok()
        }
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<Vec<_>>>()?;
    let expand = |d: u8| d * 17;
    match digits.len() {
        3 => Some([expand(digits[0]), expand(digits[1]), expand(digits[2]), 255]),
        4 => Some([
            expand(digits[0]),
            expand(digits[1]),
            expand(digits[2]),
            expand(digits[3]),
        ]),
        6 => Some([
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
            255,
        ]),
        8 => Some([
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
            digits[6] * 16 + digits[7],
        ]),
        _ => None,
    }
}

/// Numeric arguments of a color function, commas and `/` skipped
fn numeric_arguments<'i>(
    input: &mut Parser<'i, '_>,
) -> Result<Vec<(f32, bool)>, cssparser::ParseError<'i, ()>> {
    let mut args = Vec::new();
    while !input.is_exhausted() {
        let location = input.current_source_location();
        match input.next()?.clone() {
            Token::Number { value, .. } => args.push((value, false)),
            Token::Percentage { unit_value, .. } => args.push((unit_value, true)),
            Token::Dimension { value, ref unit, .. } if unit.eq_ignore_ascii_case("deg") => {
                args.push((value, false))
            }
            Token::Comma | Token::Delim('/') => {}
            _ => return Err(location.new_custom_error(())),
        }
    }
    Ok(args)
}

fn alpha_byte(arg: Option<&(f32, bool)>) -> u8 {
    match arg {
        Some((v, _)) => (v.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    }
}

fn rgb_arguments<'i>(input: &mut Parser<'i, '_>) -> Result<Rgba, cssparser::ParseError<'i, ()>> {
    let location = input.current_source_location();
    let args = numeric_arguments(input)?;
    if args.len() < 3 || args.len() > 4 {
        return Err(location.new_custom_error(()));
    }
    let channel = |(v, pct): (f32, bool)| {
        let v = if pct { v * 255.0 } else { v };
        v.clamp(0.0, 255.0).round() as u8
    };
    Ok([
        channel(args[0]),
        channel(args[1]),
        channel(args[2]),
        alpha_byte(args.get(3)),
    ])
}

fn hsl_arguments<'i>(input: &mut Parser<'i, '_>) -> Result<Rgba, cssparser::ParseError<'i, ()>> {
    let location = input.current_source_location();
    let args = numeric_arguments(input)?;
    if args.len() < 3 || args.len() > 4 {
        return Err(location.new_custom_error(()));
    }
    let h = args[0].0.rem_euclid(360.0) / 360.0;
    let s = args[1].0.clamp(0.0, 1.0);
    let l = args[2].0.clamp(0.0, 1.0);
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    let byte = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    Ok([
        byte(hue(h + 1.0 / 3.0)),
        byte(hue(h)),
        byte(hue(h - 1.0 / 3.0)),
        alpha_byte(args.get(3)),
    ])
}

/// Serialize the way computed colors are reported
pub fn format_color(color: Rgba) -> String {
    if color[3] == 255 {
        format!("rgb({}, {}, {})", color[0], color[1], color[2])
    } else {
        let alpha = (color[3] as f32 / 255.0 * 100.0).round() / 100.0;
        format!("rgba({}, {}, {}, {})", color[0], color[1], color[2], alpha)
    }
}

/// Two decimals at most, trailing zeros dropped
pub fn format_px(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0px".to_string();
    }
    let mut s = format!("{:.2}", rounded);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    format!("{}px", s)
}

/// Context absolute lengths are resolved against
#[derive(Debug, Clone, Copy)]
pub struct LengthContext {
    pub font_size: f32,
    pub root_font_size: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f32),
    Percent(f32),
}

/// Parse a single length or percentage token
pub fn parse_length(value: &str, ctx: &LengthContext) -> Option<Length> {
    let mut input = ParserInput::new(value.trim());
    let mut parser = Parser::new(&mut input);
    let token = parser.next().ok()?.clone();
    if !parser.is_exhausted() {
        return None;
    }
    match token {
        Token::Number { value, .. } if value == 0.0 => Some(Length::Px(0.0)),
        Token::Percentage { unit_value, .. } => Some(Length::Percent(unit_value * 100.0)),
        Token::Dimension { value, ref unit, .. } => {
            let factor = match unit.to_ascii_lowercase().as_str() {
                "px" => 1.0,
                "em" => ctx.font_size,
                "rem" => ctx.root_font_size,
                "ex" | "ch" => ctx.font_size / 2.0,
                "pt" => 4.0 / 3.0,
                "pc" => 16.0,
                "in" => 96.0,
                "cm" => 96.0 / 2.54,
                "mm" => 96.0 / 25.4,
                "q" => 96.0 / 101.6,
                "vw" => ctx.viewport_width / 100.0,
                "vh" => ctx.viewport_height / 100.0,
                _ => return None,
            };
            Some(Length::Px(value * factor))
        }
        _ => None,
    }
}

/// Resolve a computed length against a percentage basis
pub fn length_px(value: &str, basis: f32) -> Option<f32> {
    let trimmed = value.trim();
    if let Some(pct) = trimmed.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| p * basis / 100.0);
    }
    if trimmed == "0" {
        return Some(0.0);
    }
    trimmed.strip_suffix("px")?.trim().parse::<f32>().ok()
}

/// Split on top-level whitespace, keeping parenthesized groups and quoted
/// strings intact
pub fn split_components(value: &str) -> Vec<String> {
    split_top_level(value, |c| c.is_whitespace())
}

/// Split on top-level commas
pub fn split_commas(value: &str) -> Vec<String> {
    split_top_level(value, |c| c == ',')
}

fn split_top_level(value: &str, is_separator: impl Fn(char) -> bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in value.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
                continue;
            }
            None => {}
        }
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if depth == 0 && is_separator(c) => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: LengthContext = LengthContext {
        font_size: 20.0,
        root_font_size: 16.0,
        viewport_width: 1000.0,
        viewport_height: 500.0,
    };

    #[test]
    fn parses_color_syntaxes() {
        let black = [0, 0, 0, 255];
        assert_eq!(parse_color("#f00", black), Some([255, 0, 0, 255]));
        assert_eq!(parse_color("#00ff0080", black), Some([0, 255, 0, 128]));
        assert_eq!(parse_color("rgb(1, 2, 3)", black), Some([1, 2, 3, 255]));
        assert_eq!(parse_color("rgba(0, 0, 0, 0)", black), Some(TRANSPARENT));
        assert_eq!(parse_color("rgb(100% 0% 0% / 0.5)", black), Some([255, 0, 0, 128]));
        assert_eq!(parse_color("hsl(120, 100%, 50%)", black), Some([0, 255, 0, 255]));
        assert_eq!(parse_color("CurrentColor", [9, 9, 9, 255]), Some([9, 9, 9, 255]));
        assert_eq!(parse_color("White", black), Some([255, 255, 255, 255]));
        assert_eq!(parse_color("notacolor", black), None);
        assert_eq!(parse_color("red blue", black), None);
    }

    #[test]
    fn formats_colors_like_computed_values() {
        assert_eq!(format_color([255, 0, 0, 255]), "rgb(255, 0, 0)");
        assert_eq!(format_color(TRANSPARENT), "rgba(0, 0, 0, 0)");
        let round_trip = parse_color(&format_color([10, 20, 30, 128]), [0, 0, 0, 255]).unwrap();
        assert_eq!(format_color(round_trip), format_color([10, 20, 30, 128]));
    }

    #[test]
    fn resolves_lengths() {
        assert_eq!(parse_length("2em", &CTX), Some(Length::Px(40.0)));
        assert_eq!(parse_length("1rem", &CTX), Some(Length::Px(16.0)));
        assert_eq!(parse_length("12pt", &CTX), Some(Length::Px(16.0)));
        assert_eq!(parse_length("50%", &CTX), Some(Length::Percent(50.0)));
        assert_eq!(parse_length("0", &CTX), Some(Length::Px(0.0)));
        assert_eq!(parse_length("auto", &CTX), None);
        assert_eq!(length_px("25%", 200.0), Some(50.0));
        assert_eq!(length_px("3.5px", 0.0), Some(3.5));
        assert_eq!(length_px("auto", 0.0), None);
    }

    #[test]
    fn splits_top_level_components() {
        assert_eq!(
            split_components("1px solid rgb(1, 2, 3)"),
            vec!["1px", "solid", "rgb(1, 2, 3)"]
        );
        assert_eq!(
            split_commas("\"Open Sans\", Arial, sans-serif"),
            vec!["\"Open Sans\"", "Arial", "sans-serif"]
        );
        assert_eq!(format_px(12.0), "12px");
        assert_eq!(format_px(-0.001), "0px");
    }
}
