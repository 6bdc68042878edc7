//! Declaration-level CSS parsing built on `cssparser`.
//!
//! Values are kept as their source text: the snapshot copies what the
//! renderer reported, it never re-serializes a parsed value.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, Token,
};

/// One `name: value [!important]` entry of a declaration block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDeclaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// Values that defer to the cascade instead of naming a concrete value
const SENTINELS: &[&str] = &["initial", "inherit", "unset", "revert", "revert-layer"];

pub fn is_sentinel(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || SENTINELS.iter().any(|s| v.eq_ignore_ascii_case(s))
}

/// True when the value contains a `linear-`, `radial-` or `conic-` gradient
/// (including the `repeating-` variants)
pub fn is_gradient(value: &str) -> bool {
    value.to_ascii_lowercase().contains("gradient(")
}

/// Property names are ASCII case-insensitive, custom properties are not
pub fn normalize_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Parse the body of a `style` attribute or a rule block.
///
/// Invalid entries are skipped; the result preserves source order.
pub fn parse_declaration_block(css: &str) -> Vec<ParsedDeclaration> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    parse_declarations_from(&mut parser)
}

pub(crate) fn parse_declarations_from(parser: &mut Parser<'_, '_>) -> Vec<ParsedDeclaration> {
    let mut declarations = Vec::new();
    let mut decl_parser = DeclarationCollector {
        declarations: &mut declarations,
    };
    for result in RuleBodyParser::new(parser, &mut decl_parser) {
        // Lenient: a malformed declaration only drops itself
        let _ = result;
    }
    declarations
}

/// Consume the remaining tokens of a declaration value, returning its source
/// text and whether it ended in `!important`.
pub(crate) fn capture_value<'i>(input: &mut Parser<'i, '_>) -> (String, bool) {
    let start = input.position();
    let mut end = start;
    let mut important = false;
    loop {
        let here = input.position();
        if input.try_parse(cssparser::parse_important).is_ok() {
            important = true;
            end = here;
            while input.next().is_ok() {}
            break;
        }
        let opens_block = match input.next() {
            Ok(token) => matches!(
                token,
                Token::Function(_)
                    | Token::ParenthesisBlock
                    | Token::SquareBracketBlock
                    | Token::CurlyBracketBlock
            ),
            Err(_) => break,
        };
        if opens_block {
            let _ = input.parse_nested_block(|nested| skip_all(nested));
        }
        end = input.position();
    }
    (input.slice(start..end).trim().to_string(), important)
}

fn skip_all<'i>(input: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, ()>> {
    while input.next().is_ok() {}
    Ok(())
}

struct DeclarationCollector<'a> {
    declarations: &'a mut Vec<ParsedDeclaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationCollector<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationCollector<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> DeclarationParser<'i> for DeclarationCollector<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let (value, important) = capture_value(input);
        if !value.is_empty() {
            self.declarations.push(ParsedDeclaration {
                name: normalize_name(&name),
                value,
                important,
            });
        }
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationCollector<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Resolve a computed `content` value into the text of a generated box.
///
/// Quoted strings are concatenated and `attr(name)` is looked up through
/// `attr`. Returns `None` for `none`/`normal` or when nothing generates text.
pub fn parse_content<F>(value: &str, attr: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut text = String::new();
    let mut generates = false;
    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::QuotedString(s) => {
                text.push_str(&s);
                generates = true;
            }
            Token::Ident(ref ident)
                if ident.eq_ignore_ascii_case("none") || ident.eq_ignore_ascii_case("normal") =>
            {
                return None;
            }
            Token::Function(ref name) if name.eq_ignore_ascii_case("attr") => {
                if let Ok(attr_name) = parser.parse_nested_block(|nested| nested_ident(nested)) {
                    if let Some(v) = attr(&attr_name) {
                        text.push_str(&v);
                    }
                }
                generates = true;
            }
            // counters, quotes and images are not generated
            _ => {}
        }
    }
    generates.then_some(text)
}

fn nested_ident<'i>(input: &mut Parser<'i, '_>) -> Result<String, ParseError<'i, ()>> {
    Ok(input.expect_ident()?.to_string())
}

/// True when the value tokenizes cleanly: no bad strings/urls and no stray
/// closing brackets or semicolons.
pub fn is_well_formed(value: &str) -> bool {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    well_formed_tokens(&mut parser)
}

fn well_formed_tokens(parser: &mut Parser<'_, '_>) -> bool {
    loop {
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return true,
        };
        match token {
            Token::BadString(_)
            | Token::BadUrl(_)
            | Token::CloseParenthesis
            | Token::CloseSquareBracket
            | Token::CloseCurlyBracket
            | Token::Semicolon
            | Token::CurlyBracketBlock => return false,
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => {
                let nested = parser.parse_nested_block(|inner| {
                    if well_formed_tokens(inner) {
                        Ok(())
                    } else {
                        Err(inner.new_custom_error::<(), ()>(()))
                    }
                });
                if nested.is_err() {
                    return false;
                }
            }
            _ => {}
        }
    }
}
