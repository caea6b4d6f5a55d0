//! The `transform` node's declared operations (§4.E): `map`, `filter`,
//! `reduce`, `sort`, `merge`, `extract`, `parseJSON`, `parseXML`,
//! `custom`. All are pure functions over `serde_json::Value` — no I/O,
//! no handler registry involved.

use loomwork_core::NodeId;
use loomwork_expression::{PathResolver, Template};
use serde_json::{Map, Value};

use crate::error::EngineError;

/// A resolver scoped to a single array item, used while evaluating
/// `map`/`filter` expressions: `item` and `index` are the only paths it
/// answers.
struct ItemResolver<'a> {
    item: &'a Value,
    index: usize,
}

impl PathResolver for ItemResolver<'_> {
    fn resolve(&self, path: &str) -> Option<Value> {
        match path {
            "item" => Some(self.item.clone()),
            "index" => Some(Value::from(self.index)),
            other => other
                .strip_prefix("item.")
                .and_then(|rest| loomwork_core::lookup_path(self.item, rest))
                .cloned(),
        }
    }
}

fn config_str<'a>(config: &'a Value, field: &str) -> Option<&'a str> {
    config.get(field).and_then(Value::as_str)
}

fn invalid(node_id: &NodeId, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidTransformConfig { node_id: node_id.clone(), reason: reason.into() }
}

fn require_array<'a>(node_id: &NodeId, input: &'a Value) -> Result<&'a Vec<Value>, EngineError> {
    input.as_array().ok_or_else(|| invalid(node_id, "operation requires an array input"))
}

fn eval_per_item(node_id: &NodeId, expr: &str, item: &Value, index: usize) -> Result<Value, EngineError> {
    let template = Template::parse(expr).map_err(|err| invalid(node_id, err.to_string()))?;
    template
        .render(&ItemResolver { item, index }, false)
        .map_err(|err| invalid(node_id, err.to_string()))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn op_map(node_id: &NodeId, config: &Value, input: &Value) -> Result<Value, EngineError> {
    let expr = config_str(config, "expression").ok_or_else(|| invalid(node_id, "map requires `expression`"))?;
    let items = require_array(node_id, input)?;
    let mapped: Result<Vec<Value>, EngineError> = items
        .iter()
        .enumerate()
        .map(|(index, item)| eval_per_item(node_id, expr, item, index))
        .collect();
    Ok(Value::Array(mapped?))
}

fn op_filter(node_id: &NodeId, config: &Value, input: &Value) -> Result<Value, EngineError> {
    let expr = config_str(config, "expression").ok_or_else(|| invalid(node_id, "filter requires `expression`"))?;
    let items = require_array(node_id, input)?;
    let mut kept = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if truthy(&eval_per_item(node_id, expr, item, index)?) {
            kept.push(item.clone());
        }
    }
    Ok(Value::Array(kept))
}

fn op_reduce(node_id: &NodeId, config: &Value, input: &Value) -> Result<Value, EngineError> {
    let expr = config_str(config, "expression").ok_or_else(|| invalid(node_id, "reduce requires `expression`"))?;
    let items = require_array(node_id, input)?;
    let mut acc = config.get("initial").cloned().unwrap_or(Value::Null);
    let template = Template::parse(expr).map_err(|err| invalid(node_id, err.to_string()))?;
    for (index, item) in items.iter().enumerate() {
        struct AccResolver<'a> {
            acc: &'a Value,
            item: &'a Value,
            index: usize,
        }
        impl PathResolver for AccResolver<'_> {
            fn resolve(&self, path: &str) -> Option<Value> {
                match path {
                    "acc" => Some(self.acc.clone()),
                    "item" => Some(self.item.clone()),
                    "index" => Some(Value::from(self.index)),
                    other => other
                        .strip_prefix("item.")
                        .and_then(|rest| loomwork_core::lookup_path(self.item, rest))
                        .cloned(),
                }
            }
        }
        acc = template
            .render(&AccResolver { acc: &acc, item, index }, false)
            .map_err(|err| invalid(node_id, err.to_string()))?;
    }
    Ok(acc)
}

fn op_sort(node_id: &NodeId, config: &Value, input: &Value) -> Result<Value, EngineError> {
    let items = require_array(node_id, input)?;
    let key = config_str(config, "key");
    let descending = config.get("descending").and_then(Value::as_bool).unwrap_or(false);
    let mut sorted = items.clone();
    sorted.sort_by(|a, b| {
        let (va, vb) = match key {
            Some(k) => (
                loomwork_core::lookup_path(a, k).cloned().unwrap_or(Value::Null),
                loomwork_core::lookup_path(b, k).cloned().unwrap_or(Value::Null),
            ),
            None => (a.clone(), b.clone()),
        };
        compare_json(&va, &vb)
    });
    if descending {
        sorted.reverse();
    }
    Ok(Value::Array(sorted))
}

fn compare_json(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn op_merge(node_id: &NodeId, config: &Value, input: &Value) -> Result<Value, EngineError> {
    let with = config.get("with").cloned().ok_or_else(|| invalid(node_id, "merge requires `with`"))?;
    let (Value::Object(base), Value::Object(extra)) = (input.clone(), with) else {
        return Err(invalid(node_id, "merge requires both input and `with` to be objects"));
    };
    let mut merged = base;
    for (key, value) in extra {
        merged.insert(key, value);
    }
    Ok(Value::Object(merged))
}

fn op_extract(node_id: &NodeId, config: &Value, input: &Value) -> Result<Value, EngineError> {
    let path = config_str(config, "path").ok_or_else(|| invalid(node_id, "extract requires `path`"))?;
    Ok(loomwork_core::lookup_path(input, path).cloned().unwrap_or(Value::Null))
}

fn op_parse_json(node_id: &NodeId, input: &Value) -> Result<Value, EngineError> {
    let text = input.as_str().ok_or_else(|| invalid(node_id, "parseJSON requires a string input"))?;
    serde_json::from_str(text).map_err(|err| invalid(node_id, format!("invalid JSON: {err}")))
}

/// A deliberately minimal XML reader: flattens `<tag>text</tag>` leaves
/// into a JSON object keyed by tag name. No attributes, namespaces or
/// nested-repeated-tag-as-array support — good enough for the simple
/// payloads the `transform` node is documented to handle, not a general
/// XML parser.
fn op_parse_xml(node_id: &NodeId, input: &Value) -> Result<Value, EngineError> {
    let text = input.as_str().ok_or_else(|| invalid(node_id, "parseXML requires a string input"))?;
    let re = regex::Regex::new(r"(?s)<([A-Za-z_][\w:-]*)>(.*?)</\1>").expect("static pattern");
    let mut out = Map::new();
    for caps in re.captures_iter(text) {
        let tag = caps[1].to_string();
        let body = caps[2].trim();
        let value = if body.contains('<') {
            op_parse_xml(node_id, &Value::String(body.to_string()))?
        } else {
            Value::String(body.to_string())
        };
        out.insert(tag, value);
    }
    if out.is_empty() {
        return Err(invalid(node_id, "no recognizable XML elements found"));
    }
    Ok(Value::Object(out))
}

/// `custom`: renders a template expression against the node's resolved
/// input treated as the only visible scope. This is a deliberately
/// restricted subset of the "JSONata-like expression" the spec
/// describes, not a full JSONata implementation — whole-document path
/// lookups and string interpolation, no functions.
fn op_custom(node_id: &NodeId, config: &Value, input: &Value) -> Result<Value, EngineError> {
    let expr = config_str(config, "expression").ok_or_else(|| invalid(node_id, "custom requires `expression`"))?;
    struct InputResolver<'a>(&'a Value);
    impl PathResolver for InputResolver<'_> {
        fn resolve(&self, path: &str) -> Option<Value> {
            if path == "input" {
                return Some(self.0.clone());
            }
            loomwork_core::lookup_path(self.0, path).cloned()
        }
    }
    let template = Template::parse(expr).map_err(|err| invalid(node_id, err.to_string()))?;
    template.render(&InputResolver(input), false).map_err(|err| invalid(node_id, err.to_string()))
}

/// Dispatches one `transform` node's configured operation.
///
/// # Errors
/// Returns [`EngineError::InvalidTransformConfig`] if `config.operation`
/// is missing, unrecognized, or the operation's required fields are
/// absent or mistyped for the given input.
pub fn execute_transform(node_id: &NodeId, config: &Value, input: Value) -> Result<Value, EngineError> {
    let operation = config_str(config, "operation").ok_or_else(|| invalid(node_id, "missing `operation`"))?;
    match operation {
        "map" => op_map(node_id, config, &input),
        "filter" => op_filter(node_id, config, &input),
        "reduce" => op_reduce(node_id, config, &input),
        "sort" => op_sort(node_id, config, &input),
        "merge" => op_merge(node_id, config, &input),
        "extract" => op_extract(node_id, config, &input),
        "parseJSON" => op_parse_json(node_id, &input),
        "parseXML" => op_parse_xml(node_id, &input),
        "custom" => op_custom(node_id, config, &input),
        other => Err(invalid(node_id, format!("unrecognized operation `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn id() -> NodeId {
        NodeId::new("transform-1")
    }

    #[test]
    fn map_applies_expression_per_item() {
        let config = json!({"operation": "map", "expression": "${item}"});
        let out = execute_transform(&id(), &config, json!([1, 2, 3])).unwrap();
        assert_eq!(out, json!([1, 2, 3]));
    }

    #[test]
    fn filter_keeps_truthy_items() {
        let config = json!({"operation": "filter", "expression": "${item.active}"});
        let input = json!([{"active": true}, {"active": false}, {"active": true}]);
        let out = execute_transform(&id(), &config, input).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 2);
    }

    #[test]
    fn sort_by_key_ascending() {
        let config = json!({"operation": "sort", "key": "n"});
        let input = json!([{"n": 3}, {"n": 1}, {"n": 2}]);
        let out = execute_transform(&id(), &config, input).unwrap();
        assert_eq!(out, json!([{"n": 1}, {"n": 2}, {"n": 3}]));
    }

    #[test]
    fn merge_overlays_with_onto_input() {
        let config = json!({"operation": "merge", "with": {"b": 2}});
        let out = execute_transform(&id(), &config, json!({"a": 1})).unwrap();
        assert_eq!(out, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn extract_reads_a_nested_path() {
        let config = json!({"operation": "extract", "path": "user.name"});
        let out = execute_transform(&id(), &config, json!({"user": {"name": "Ada"}})).unwrap();
        assert_eq!(out, json!("Ada"));
    }

    #[test]
    fn parse_json_decodes_a_string() {
        let config = json!({"operation": "parseJSON"});
        let out = execute_transform(&id(), &config, json!(r#"{"a":1}"#)).unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn parse_xml_flattens_simple_tags() {
        let config = json!({"operation": "parseXML"});
        let out = execute_transform(&id(), &config, json!("<name>Ada</name>")).unwrap();
        assert_eq!(out, json!({"name": "Ada"}));
    }

    #[test]
    fn unrecognized_operation_is_rejected() {
        let config = json!({"operation": "nonsense"});
        assert!(execute_transform(&id(), &config, json!(null)).is_err());
    }
}
