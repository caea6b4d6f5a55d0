//! The `loop` node (§4.E): expands its collection (`forEach`) or
//! iterates up to `maxIterations` times (`while`), re-driving the body
//! subgraph once per iteration and aggregating each run's result.
//!
//! A `loop` node is both the entry and the join of its body: the
//! scheduler's queue never schedules body nodes directly (they're
//! excluded via [`crate::scheduler::loop_body_owned_ids`]), so iteration
//! happens entirely inside this one node's dispatch, matching the
//! "loop nodes expand to linear iteration" non-goal — the body is driven
//! as its own small [`BuiltWorkflow`], once per item, not scheduled
//! alongside the outer graph.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use loomwork_action::{NodeError, Signals};
use loomwork_core::NodeId;
use loomwork_execution::ContextSnapshot;
use loomwork_workflow::{BuiltWorkflow, Edge, ExecutableNode, LoopContext};
use serde_json::Value;

use crate::dispatch::{resolve_config, truthy};
use crate::error::EngineError;
use crate::scheduler::{drive, DriveCx};

fn engine_error_to_node_error(err: EngineError) -> NodeError {
    match err {
        EngineError::Cancelled => NodeError::Cancelled,
        EngineError::NodeFailed { error, .. } => error,
        other => NodeError::unknown(other.to_string()),
    }
}

/// Build a standalone [`BuiltWorkflow`] scoped to one loop's body:
/// dependencies/dependents are re-filtered to the body's own node set so
/// [`crate::scheduler::drive`] can run it exactly like a top-level
/// workflow, with `body_entry` as its sole zero-dependency node.
fn build_body_workflow(built: &BuiltWorkflow, loop_ctx: &LoopContext) -> BuiltWorkflow {
    let body_set: HashSet<NodeId> = loop_ctx.body_node_ids.iter().cloned().collect();

    let mut nodes: IndexMap<NodeId, ExecutableNode> = IndexMap::new();
    for id in &loop_ctx.body_node_ids {
        let Some(original) = built.node(id) else { continue };
        let dependencies: Vec<NodeId> =
            original.dependencies.iter().filter(|d| body_set.contains(*d)).cloned().collect();
        let dependents: Vec<NodeId> =
            original.dependents.iter().filter(|d| body_set.contains(*d)).cloned().collect();
        nodes.insert(
            id.clone(),
            ExecutableNode {
                id: id.clone(),
                node_type: original.node_type,
                name: original.name.clone(),
                config: original.config.clone(),
                depth: 0,
                dependencies,
                dependents,
            },
        );
    }

    let mut depths: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
    for id in &loop_ctx.body_node_ids {
        let Some(node) = nodes.get(id) else { continue };
        let depth =
            node.dependencies.iter().map(|d| depths.get(d).copied().unwrap_or(0)).max().map_or(0, |m| m + 1);
        depths.insert(id.clone(), depth);
    }
    for (id, node) in &mut nodes {
        node.depth = depths.get(id).copied().unwrap_or(0);
    }

    let mut execution_levels: Vec<Vec<NodeId>> = Vec::new();
    for id in &loop_ctx.body_node_ids {
        let depth = depths.get(id).copied().unwrap_or(0);
        if execution_levels.len() <= depth {
            execution_levels.resize_with(depth + 1, Vec::new);
        }
        execution_levels[depth].push(id.clone());
    }

    let edges: IndexMap<String, Edge> = built
        .edges
        .values()
        .filter(|e| body_set.contains(&e.source) && body_set.contains(&e.target))
        .map(|e| (e.id.clone(), e.clone()))
        .collect();

    BuiltWorkflow {
        nodes,
        edges,
        execution_levels,
        trigger_node_id: loop_ctx.body_entry.clone(),
        output_node_ids: vec![loop_ctx.back_edge_source.clone()],
        loop_contexts: HashMap::new(),
        max_concurrent_nodes: built.max_concurrent_nodes,
        created_at: built.created_at,
    }
}

/// Run one `loop` node to completion: resolve its iteration source
/// (`forEach` collection or `while` condition), drive the body workflow
/// once per iteration, and aggregate `{ iterations, results[] }`.
pub async fn run_loop_node<'a>(
    node: &'a ExecutableNode,
    built: &'a BuiltWorkflow,
    context: &'a ContextSnapshot,
    cx: &'a DriveCx<'a>,
) -> Result<(Value, Signals), NodeError> {
    let loop_ctx = built
        .loop_contexts
        .get(&node.id)
        .ok_or_else(|| NodeError::validation(format!("loop node '{}' has no resolved loop context", node.id)))?;

    let body_workflow = build_body_workflow(built, loop_ctx);
    let empty_owned: HashSet<NodeId> = HashSet::new();
    let body_cx = DriveCx {
        registry: cx.registry,
        safety: cx.safety,
        options: cx.options,
        execution_id: cx.execution_id,
        workflow_id: cx.workflow_id,
        loop_body_owned: &empty_owned,
        hooks: cx.hooks,
    };

    let mode = node.config.get("mode").and_then(Value::as_str).unwrap_or("forEach");
    let max_iterations = node.config.get("maxIterations").and_then(Value::as_u64).unwrap_or(1000) as usize;
    let item_var = node.config.get("itemVar").and_then(Value::as_str).unwrap_or("item");

    let mut results: Vec<Value> = Vec::new();
    let mut running_context = context.clone();

    match mode {
        "forEach" => {
            let collection_template = node.config.get("collection").cloned().unwrap_or(Value::Null);
            let collection = resolve_config(&collection_template, &running_context)?;
            let items = collection.as_array().cloned().unwrap_or_default();

            for (index, item) in items.into_iter().enumerate().take(max_iterations) {
                if cx.options.cancel_token.is_cancelled() {
                    return Err(NodeError::Cancelled);
                }
                let scoped = running_context
                    .store_signal(item_var, item)
                    .store_signal("index", Value::from(index));
                let (final_context, _queue, _order) =
                    drive(&body_workflow, scoped, &body_cx).await.map_err(engine_error_to_node_error)?;
                let result = final_context.node_output(&loop_ctx.back_edge_source).cloned().unwrap_or(Value::Null);
                running_context = running_context.store_signal("previousResult", result.clone());
                results.push(result);
            }
        }
        "while" => {
            let condition_expr =
                node.config.get("condition").cloned().unwrap_or_else(|| Value::String("false".to_string()));
            let mut index = 0usize;
            loop {
                if index >= max_iterations {
                    break;
                }
                if cx.options.cancel_token.is_cancelled() {
                    return Err(NodeError::Cancelled);
                }
                let probe = running_context.store_signal("index", Value::from(index));
                let condition_value = resolve_config(&condition_expr, &probe)?;
                if !truthy(&condition_value) {
                    break;
                }

                let (final_context, _queue, _order) =
                    drive(&body_workflow, probe, &body_cx).await.map_err(engine_error_to_node_error)?;
                let result = final_context.node_output(&loop_ctx.back_edge_source).cloned().unwrap_or(Value::Null);
                running_context = running_context.store_signal("previousResult", result.clone());
                results.push(result);
                index += 1;
            }
        }
        other => return Err(NodeError::validation(format!("unknown loop mode `{other}`"))),
    }

    let output = serde_json::json!({ "iterations": results.len(), "results": results });
    Ok((output, Signals::none()))
}
