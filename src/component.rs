//! Component dialect: a `<template>` with `{{ path }}` bindings plus a
//! `<script>` holding a JSON data descriptor.
//!
//! ```text
//! <template><h1>{{ title }}</h1><p>{{ greeting }}</p></template>
//! <script>{ "data": { "title": "Hi", "user": { "name": "Ada" } },
//!           "computed": { "greeting": "Hello {{ user.name }}" } }</script>
//! ```
//!
//! Nothing in the script is executed; it must be a JSON object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Plain,
    Component,
}

impl Dialect {
    pub fn detect(markup: &str) -> Self {
        if markup.to_ascii_lowercase().contains("<template") {
            Dialect::Component
        } else {
            Dialect::Plain
        }
    }
}

/// How incoming markup is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectPolicy {
    #[default]
    Auto,
    Plain,
    Component,
}

impl DialectPolicy {
    pub fn dialect_for(self, markup: &str) -> Dialect {
        match self {
            DialectPolicy::Auto => Dialect::detect(markup),
            DialectPolicy::Plain => Dialect::Plain,
            DialectPolicy::Component => Dialect::Component,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSource {
    pub template: String,
    pub script: String,
}

/// Data a template binds against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Named binding templates evaluated over `data`
    #[serde(default)]
    pub computed: BTreeMap<String, String>,
}

impl ComponentDescriptor {
    pub fn parse(script: &str) -> Result<Self> {
        let trimmed = script.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(trimmed)
            .map_err(|e| Error::ComponentEvaluation(format!("invalid component descriptor: {}", e)))
    }

    /// Look up a dotted path in `data`
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Turns a template and its descriptor into plain markup
pub trait ComponentEvaluator: Send + Sync {
    fn evaluate(&self, template: &str, descriptor: &ComponentDescriptor) -> Result<String>;
}

/// `{{ path }}` interpolation; values are HTML-escaped
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingEvaluator;

impl ComponentEvaluator for BindingEvaluator {
    fn evaluate(&self, template: &str, descriptor: &ComponentDescriptor) -> Result<String> {
        interpolate(template, true, |path| {
            if let Some(binding) = descriptor.computed.get(path) {
                // escaped once, by the outer interpolation
                return interpolate(binding, false, |inner| {
                    descriptor.lookup(inner).map(value_text).ok_or_else(|| unknown(inner))
                })
                .map(Some);
            }
            Ok(descriptor.lookup(path).map(value_text))
        })
    }
}

fn unknown(path: &str) -> Error {
    Error::ComponentEvaluation(format!("unknown binding '{}'", path))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn interpolate<F, T>(template: &str, escape: bool, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Result<T>,
    T: Into<Option<String>>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| Error::ComponentEvaluation("unterminated '{{' binding".into()))?;
        let path = after[..close].trim();
        if path.is_empty()
            || !path
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'))
        {
            return Err(Error::ComponentEvaluation(format!(
                "unsupported binding expression '{}'",
                path
            )));
        }
        let value: Option<String> = resolve(path)?.into();
        let value = value.ok_or_else(|| unknown(path))?;
        if escape {
            out.push_str(&html_escape::encode_text(&value));
        } else {
            out.push_str(&value);
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Split component markup into its template and script sections
pub fn split_component(markup: &str) -> Result<ComponentSource> {
    let template = section(markup, "template")?
        .ok_or_else(|| Error::ComponentEvaluation("missing <template> section".into()))?;
    let script = section(markup, "script")?
        .ok_or_else(|| Error::ComponentEvaluation("missing <script> section".into()))?;
    Ok(ComponentSource {
        template: template.to_string(),
        script: script.to_string(),
    })
}

/// Inner text of the first `<tag …>` up to the last `</tag>`
fn section<'a>(markup: &'a str, tag: &str) -> Result<Option<&'a str>> {
    // ASCII lowercasing keeps byte offsets stable
    let lower = markup.to_ascii_lowercase();
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let Some(start) = lower.find(&open) else {
        return Ok(None);
    };
    let body_start = lower[start..]
        .find('>')
        .map(|i| start + i + 1)
        .ok_or_else(|| Error::ComponentEvaluation(format!("unclosed <{}> tag", tag)))?;
    let end = lower
        .rfind(&close)
        .filter(|end| *end >= body_start)
        .ok_or_else(|| Error::ComponentEvaluation(format!("missing </{}>", tag)))?;
    Ok(Some(&markup[body_start..end]))
}

/// Render component markup to plain markup
pub fn render_component(markup: &str, evaluator: &dyn ComponentEvaluator) -> Result<String> {
    let source = split_component(markup)?;
    let descriptor = ComponentDescriptor::parse(&source.script)?;
    evaluator.evaluate(&source.template, &descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT: &str = r#"
<template>
  <div class="export-this"><h1>{{ title }}</h1><p>{{ greeting }}</p><i>{{ tags.1 }}</i></div>
</template>
<script>
{ "data": { "title": "Q3 <Report>", "user": { "name": "Ada" }, "tags": ["a", "b"] },
  "computed": { "greeting": "Hello {{ user.name }}" } }
</script>"#;

    #[test]
    fn renders_bindings() {
        let html = render_component(COMPONENT, &BindingEvaluator).unwrap();
        assert!(html.contains("<h1>Q3 &lt;Report&gt;</h1>"));
        assert!(html.contains("<p>Hello Ada</p>"));
        assert!(html.contains("<i>b</i>"));
        assert!(!html.contains("<template"));
    }

    #[test]
    fn detects_dialect() {
        assert_eq!(Dialect::detect(COMPONENT), Dialect::Component);
        assert_eq!(Dialect::detect("<div></div>"), Dialect::Plain);
        assert_eq!(DialectPolicy::Plain.dialect_for(COMPONENT), Dialect::Plain);
    }

    #[test]
    fn missing_script_is_an_error() {
        let err = render_component("<template><p>x</p></template>", &BindingEvaluator).unwrap_err();
        assert!(matches!(err, Error::ComponentEvaluation(ref m) if m.contains("<script>")));
    }

    #[test]
    fn bad_json_is_an_error() {
        let markup = "<template><p>x</p></template><script>export default { data() {} }</script>";
        assert!(matches!(
            render_component(markup, &BindingEvaluator),
            Err(Error::ComponentEvaluation(_))
        ));
    }

    #[test]
    fn unknown_binding_is_an_error() {
        let markup = "<template><p>{{ nope }}</p></template><script>{}</script>";
        let err = render_component(markup, &BindingEvaluator).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn unterminated_binding_is_an_error() {
        let markup = "<template><p>{{ title</p></template><script>{\"data\":{\"title\":1}}</script>";
        assert!(render_component(markup, &BindingEvaluator).is_err());
    }
}
