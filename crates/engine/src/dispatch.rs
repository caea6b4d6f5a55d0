//! The node dispatcher (§4.E): resolve inputs, run the safety pipeline,
//! execute by type, run the safety pipeline again, return.

use std::sync::Arc;

use loomwork_action::{NodeContext, NodeError, NodeOutcome, Signals};
use loomwork_core::{ExecutionId, NodeId, WorkflowId};
use loomwork_execution::{ContextSnapshot, QueueState};
use loomwork_expression::{PathResolver, Template};
use loomwork_safety::{Direction, SafetyPipeline};
use loomwork_workflow::{BuiltWorkflow, ExecutableNode, HandleType, NodeType};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::registry::HandlerRegistry;
use crate::transform::execute_transform;

/// Everything a single node dispatch needs, bundled so
/// [`dispatch`]'s signature stays manageable.
pub struct DispatchCx<'a> {
    pub built: &'a BuiltWorkflow,
    pub queue: &'a QueueState,
    pub registry: &'a HandlerRegistry,
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub cancellation: CancellationToken,
}

/// Resolve every string leaf of `config` against `context`, recursively.
/// Non-string leaves (numbers, bools, null) pass through unchanged;
/// arrays and objects are resolved element-wise.
pub fn resolve_config(config: &Value, resolver: &dyn PathResolver) -> Result<Value, NodeError> {
    match config {
        Value::String(s) => {
            let template = Template::parse(s).map_err(|err| NodeError::validation(err.to_string()))?;
            template.render(resolver, false).map_err(|err| NodeError::validation(err.to_string()))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_config(item, resolver)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), resolve_config(value, resolver)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn glob_matches(pattern: &str, text: &str) -> bool {
    // `*` = greedy any-run, `?` = exactly one char. Anchored both ends.
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();
    fn go(p: &[char], t: &[char]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some('*') => go(&p[1..], t) || (!t.is_empty() && go(p, &t[1..])),
            Some('?') => !t.is_empty() && go(&p[1..], &t[1..]),
            Some(c) => t.first() == Some(c) && go(&p[1..], &t[1..]),
        }
    }
    go(&pattern_chars, &text_chars)
}

fn dispatch_input(node: &ExecutableNode, trigger_input: &Value) -> Value {
    let input_name = node.config.get("inputName").and_then(Value::as_str);
    let value = match input_name {
        Some(name) => trigger_input.get(name).cloned().unwrap_or_else(|| trigger_input.clone()),
        None => trigger_input.clone(),
    };
    serde_json::json!({ "value": value })
}

fn dispatch_output(resolved_input: Value) -> Value {
    serde_json::json!({ "value": resolved_input })
}

fn dispatch_conditional(resolved_input: &Value) -> (Value, Signals) {
    let result = resolved_input.get("expression").map(truthy).unwrap_or_else(|| truthy(resolved_input));
    (serde_json::json!({ "result": result }), Signals::none().with_selected_branch(result))
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Evaluates a `switch` node's `cases` against its resolved expression.
/// `cases` is an array of `{ "value": pattern }` objects, matched in
/// declaration order against the stringified expression, supporting `*`
/// (greedy) and `?` (single char) wildcards. First match wins; absent a
/// match the `default` handle is selected.
fn dispatch_switch(node: &ExecutableNode, resolved_input: &Value) -> (Value, Signals) {
    let evaluated = resolved_input
        .get("expression")
        .cloned()
        .unwrap_or_else(|| resolved_input.clone());
    let evaluated_str = match &evaluated {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let cases = node.config.get("cases").and_then(Value::as_array).cloned().unwrap_or_default();
    let matched = cases.iter().find_map(|case| {
        let pattern = case.get("value").and_then(Value::as_str)?;
        glob_matches(pattern, &evaluated_str).then(|| pattern.to_string())
    });

    let (matched_case, route) = match matched {
        Some(pattern) => (Value::String(pattern.clone()), pattern),
        None => (Value::Null, "default".to_string()),
    };

    let output = serde_json::json!({
        "matchedCase": matched_case,
        "matchedValue": evaluated,
        "evaluatedExpression": evaluated_str,
    });
    (output, Signals::none().with_selected_route(route))
}

/// Combines the outputs of `node`'s completed dependencies per its
/// declared merge strategy. Failed/skipped dependencies contribute
/// nothing — their output was never stored.
fn dispatch_merge(node: &ExecutableNode, context: &ContextSnapshot) -> Value {
    let strategy = node.config.get("strategy").and_then(Value::as_str).unwrap_or("array");
    let completed_outputs: Vec<Value> =
        node.dependencies.iter().filter_map(|dep| context.node_output(dep).cloned()).collect();

    match strategy {
        "object" => {
            let keys: Vec<String> = node
                .config
                .get("branchKeys")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(ToString::to_string)).collect())
                .unwrap_or_else(|| node.dependencies.iter().map(NodeId::to_string).collect());
            let mut out = Map::new();
            for (key, value) in keys.into_iter().zip(node.dependencies.iter()) {
                if let Some(output) = context.node_output(value) {
                    out.insert(key, output.clone());
                }
            }
            Value::Object(out)
        }
        "first" => completed_outputs.first().cloned().unwrap_or(Value::Null),
        "last" => completed_outputs.last().cloned().unwrap_or(Value::Null),
        // "array" and "custom" (no declared custom reducer to run) both
        // fall back to the plain ordered list of completed outputs.
        _ => Value::Array(completed_outputs),
    }
}

/// Dispatch one node per §4.E, without the safety pre/post checks —
/// callers wrap this with [`run_safety_checks`] when a pipeline is
/// configured.
///
/// Loop nodes are handled entirely by [`crate::loop_exec`]; this
/// function is never called for `NodeType::Loop`.
pub async fn dispatch(node: &ExecutableNode, resolved_input: Value, cx: &DispatchCx<'_>, context: &ContextSnapshot) -> Result<NodeOutcome, NodeError> {
    match node.node_type {
        NodeType::Input | NodeType::Trigger => Ok(NodeOutcome::new(dispatch_input(node, context.trigger_input()))),
        NodeType::Output => Ok(NodeOutcome::new(dispatch_output(resolved_input))),
        NodeType::Transform => {
            let output = execute_transform(&node.id, &node.config, resolved_input)
                .map_err(|err| NodeError::validation(err.to_string()))?;
            Ok(NodeOutcome::new(output))
        }
        NodeType::Conditional => {
            let (output, signals) = dispatch_conditional(&resolved_input);
            Ok(NodeOutcome::new(output).with_signals(signals))
        }
        NodeType::Switch => {
            let (output, signals) = dispatch_switch(node, &resolved_input);
            Ok(NodeOutcome::new(output).with_signals(signals))
        }
        NodeType::Merge => Ok(NodeOutcome::new(dispatch_merge(node, context))),
        NodeType::Loop => unreachable!("loop nodes are dispatched by crate::loop_exec"),
        NodeType::Llm
        | NodeType::Vision
        | NodeType::ImageGeneration
        | NodeType::Http
        | NodeType::Database
        | NodeType::Code
        | NodeType::Agent
        | NodeType::Integration
        | NodeType::Echo => {
            let handler = cx
                .registry
                .get(node.node_type)
                .map_err(|_| NodeError::not_found(format!("no handler registered for {}", node.node_type)))?;
            let ctx = NodeContext::new(
                node.id.clone(),
                node.name.clone(),
                cx.execution_id,
                cx.workflow_id,
                cx.cancellation.clone(),
                Arc::new(context.clone()) as Arc<dyn PathResolver + Send + Sync>,
            );
            handler.execute(resolved_input, ctx).await
        }
    }
}

/// Runs `text` through the safety pipeline in `direction`, returning the
/// (possibly redacted) text, or `Err` if the pipeline blocks it.
pub fn run_safety_check(safety: Option<&SafetyPipeline>, text: &str, direction: Direction) -> Result<String, NodeError> {
    match safety {
        Some(pipeline) => pipeline.check(text, direction).map(|outcome| outcome.text),
        None => Ok(text.to_string()),
    }
}

/// Whether `handle` is one of the routed handle types the queue uses to
/// cascade-skip non-selected branches (`True`/`False`/`Case`), as
/// opposed to a plain structural edge.
#[must_use]
pub fn is_routed_handle(handle: &HandleType) -> bool {
    matches!(handle, HandleType::True | HandleType::False | HandleType::Case(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn glob_matches_wildcard_and_single_char() {
        assert!(glob_matches("a*c", "abbbc"));
        assert!(glob_matches("a?c", "abc"));
        assert!(!glob_matches("a?c", "abbc"));
        assert!(glob_matches("*", "anything"));
    }

    #[test]
    fn conditional_emits_selected_branch_signal() {
        let (output, signals) = dispatch_conditional(&serde_json::json!({"expression": true}));
        assert_eq!(output, serde_json::json!({"result": true}));
        assert_eq!(signals.selected_branch(), Some(true));
    }
}
