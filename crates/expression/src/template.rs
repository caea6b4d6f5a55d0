//! Template parsing and rendering.
//!
//! Supports two interchangeable placeholder syntaxes, `${path}` and
//! `{{path}}`, both resolving dotted paths against a [`PathResolver`].
//! Parsing happens once (via [`Template::parse`]); rendering happens per
//! execution against a fresh resolver.

use serde_json::Value;

use crate::error::ExpressionError;
use crate::resolver::PathResolver;

/// Hard cap on placeholders per template, matching the reference
/// implementation's guard against pathological inputs.
pub const MAX_TEMPLATE_EXPRESSIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Static(String),
    Expression(String),
}

/// A parsed template, ready to be rendered against any [`PathResolver`].
#[derive(Debug, Clone)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    /// Parse `source`, recognizing both `${...}` and `{{...}}`
    /// placeholders. Does not touch any resolver — parsing is pure.
    ///
    /// # Errors
    /// Returns [`ExpressionError::UnclosedPlaceholder`] if a placeholder is
    /// opened but never closed, or [`ExpressionError::TooManyExpressions`]
    /// if the template exceeds [`MAX_TEMPLATE_EXPRESSIONS`].
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let bytes = source.as_bytes();
        let mut parts = Vec::new();
        let mut static_start = 0usize;
        let mut i = 0usize;
        let mut expr_count = 0usize;

        while i < bytes.len() {
            if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
                let close = find_close(source, i + 2, "}")
                    .ok_or(ExpressionError::UnclosedPlaceholder { offset: i })?;
                push_static(&mut parts, &source[static_start..i]);
                parts.push(Part::Expression(source[i + 2..close].trim().to_string()));
                expr_count += 1;
                i = close + 1;
                static_start = i;
            } else if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
                let close = find_close(source, i + 2, "}}")
                    .ok_or(ExpressionError::UnclosedPlaceholder { offset: i })?;
                push_static(&mut parts, &source[static_start..i]);
                parts.push(Part::Expression(source[i + 2..close].trim().to_string()));
                expr_count += 1;
                i = close + 2;
                static_start = i;
            } else {
                i += 1;
            }

            if expr_count > MAX_TEMPLATE_EXPRESSIONS {
                return Err(ExpressionError::TooManyExpressions {
                    count: expr_count,
                    limit: MAX_TEMPLATE_EXPRESSIONS,
                });
            }
        }
        push_static(&mut parts, &source[static_start..]);

        Ok(Self { parts })
    }

    /// Whether this template contains at least one placeholder.
    #[must_use]
    pub fn has_expressions(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Expression(_)))
    }

    /// Render this template against `resolver`, producing a JSON value.
    ///
    /// If the *entire* template is exactly one placeholder (no
    /// surrounding static text), the placeholder's resolved value is
    /// returned whole — numbers, arrays and objects survive intact. If
    /// the template mixes static text with one or more placeholders,
    /// every resolved value is stringified and the result is a single
    /// JSON string.
    ///
    /// Unresolved placeholders render as an empty string unless
    /// `strict_vars` is set, in which case the first unresolved path
    /// fails the render.
    pub fn render(
        &self,
        resolver: &dyn PathResolver,
        strict_vars: bool,
    ) -> Result<Value, ExpressionError> {
        if let [Part::Expression(path)] = self.parts.as_slice() {
            return match resolver.resolve(path) {
                Some(value) => Ok(value),
                None if strict_vars => Err(ExpressionError::UnresolvedVariable { path: path.clone() }),
                None => Ok(Value::String(String::new())),
            };
        }

        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Static(s) => out.push_str(s),
                Part::Expression(path) => match resolver.resolve(path) {
                    Some(value) => out.push_str(&stringify(&value)),
                    None if strict_vars => {
                        return Err(ExpressionError::UnresolvedVariable { path: path.clone() })
                    }
                    None => {}
                },
            }
        }
        Ok(Value::String(out))
    }
}

fn push_static(parts: &mut Vec<Part>, text: &str) {
    if !text.is_empty() {
        parts.push(Part::Static(text.to_string()));
    }
}

fn find_close(source: &str, from: usize, closer: &str) -> Option<usize> {
    source[from..].find(closer).map(|pos| from + pos)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convenience one-shot: parse and render `source` in a single call.
///
/// # Errors
/// Propagates parse and render errors.
pub fn interpolate(
    source: &str,
    resolver: &dyn PathResolver,
    strict_vars: bool,
) -> Result<Value, ExpressionError> {
    Template::parse(source)?.render(resolver, strict_vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct MapResolver(std::collections::HashMap<&'static str, Value>);
    impl PathResolver for MapResolver {
        fn resolve(&self, path: &str) -> Option<Value> {
            self.0.get(path).cloned()
        }
    }

    fn resolver() -> MapResolver {
        MapResolver(
            [
                ("llm-1.text", json!("hello world")),
                ("input.userQuestion", json!("what is rust?")),
                ("parse.parsed", json!([{"id": 1}, {"id": 2}])),
                ("count", json!(42)),
                ("nested", json!({"a": 1})),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn whole_value_substitution_preserves_type() {
        let tmpl = Template::parse("${count}").unwrap();
        assert_eq!(tmpl.render(&resolver(), false).unwrap(), json!(42));

        let tmpl = Template::parse("{{nested}}").unwrap();
        assert_eq!(tmpl.render(&resolver(), false).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn mixed_template_stringifies() {
        let tmpl = Template::parse("Q: ${input.userQuestion}!").unwrap();
        assert_eq!(
            tmpl.render(&resolver(), false).unwrap(),
            json!("Q: what is rust?!")
        );
    }

    #[test]
    fn both_syntaxes_are_supported() {
        let dollar = Template::parse("${llm-1.text}").unwrap();
        let mustache = Template::parse("{{llm-1.text}}").unwrap();
        assert_eq!(
            dollar.render(&resolver(), false).unwrap(),
            json!("hello world")
        );
        assert_eq!(
            mustache.render(&resolver(), false).unwrap(),
            json!("hello world")
        );
    }

    #[test]
    fn unresolved_placeholder_becomes_empty_string_by_default() {
        let tmpl = Template::parse("${missing.path}").unwrap();
        assert_eq!(tmpl.render(&resolver(), false).unwrap(), json!(""));
    }

    #[test]
    fn unresolved_placeholder_fails_in_strict_mode() {
        let tmpl = Template::parse("${missing.path}").unwrap();
        let err = tmpl.render(&resolver(), true).unwrap_err();
        assert!(matches!(err, ExpressionError::UnresolvedVariable { .. }));
    }

    #[test]
    fn unclosed_placeholder_is_an_error() {
        assert!(Template::parse("${unterminated").is_err());
        assert!(Template::parse("{{unterminated").is_err());
    }

    #[test]
    fn plain_text_with_no_placeholders_renders_unchanged() {
        let tmpl = Template::parse("no placeholders here").unwrap();
        assert!(!tmpl.has_expressions());
        assert_eq!(
            tmpl.render(&resolver(), false).unwrap(),
            json!("no placeholders here")
        );
    }

    #[test]
    fn empty_template_renders_empty_string() {
        let tmpl = Template::parse("").unwrap();
        assert_eq!(tmpl.render(&resolver(), false).unwrap(), json!(""));
    }

    #[test]
    fn rendering_is_single_pass_not_recursive() {
        // A resolved value that itself looks like a placeholder must not
        // be re-expanded.
        let mut map = std::collections::HashMap::new();
        map.insert("trick", json!("${count}"));
        struct R(std::collections::HashMap<&'static str, Value>);
        impl PathResolver for R {
            fn resolve(&self, path: &str) -> Option<Value> {
                self.0.get(path).cloned()
            }
        }
        let tmpl = Template::parse("${trick}").unwrap();
        assert_eq!(tmpl.render(&R(map), false).unwrap(), json!("${count}"));
    }

    #[test]
    fn too_many_expressions_is_rejected() {
        let source: String = (0..MAX_TEMPLATE_EXPRESSIONS + 1)
            .map(|i| format!("${{field{i}}}"))
            .collect();
        let err = Template::parse(&source).unwrap_err();
        assert!(matches!(err, ExpressionError::TooManyExpressions { .. }));
    }
}
