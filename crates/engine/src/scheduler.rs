//! The scheduler tick loop (§4.D): a dynamic, `QueueState`-driven
//! dispatch cycle, bounded by `maxConcurrentNodes` and able to re-drive
//! itself for a `loop` node's body subgraph.
//!
//! Grounded on the teacher's `WorkflowEngine::execute_workflow` for the
//! concurrency shape (bounded fan-out, await-all-before-the-next-round)
//! but, unlike the teacher's static `parallel_groups`, re-evaluates
//! readiness after every completion via [`QueueState`] — required here
//! because conditional/switch/merge gating depends on runtime signals,
//! not just a node's static depth.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use futures::future::join_all;
use loomwork_action::{NodeError, Signals};
use loomwork_core::{ExecutionId, NodeId, WorkflowId};
use loomwork_eventbus::{EventContext, Hooks, SpanStatus};
use loomwork_execution::{ContextSnapshot, QueueState};
use loomwork_resilience::should_retry;
use loomwork_safety::{Direction, SafetyPipeline};
use loomwork_workflow::{BuiltWorkflow, ExecutableNode, NodeType};
use serde_json::Value;

use crate::dispatch::{dispatch, resolve_config, run_safety_check, DispatchCx};
use crate::error::EngineError;
use crate::loop_exec::run_loop_node;
use crate::options::ExecutionOptions;
use crate::registry::HandlerRegistry;

/// Everything a [`drive`] call needs that doesn't change tick to tick.
pub struct DriveCx<'a> {
    pub registry: &'a HandlerRegistry,
    pub safety: Option<&'a SafetyPipeline>,
    pub options: &'a ExecutionOptions,
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    /// Node ids owned by some loop's body: readied generically but
    /// never dispatched directly, since the loop node that owns them
    /// already ran them inline. Empty for a loop-body's own nested
    /// drive (nested loops are not supported).
    pub loop_body_owned: &'a HashSet<NodeId>,
    /// Observability/events/credits, called around every node dispatch
    /// (§6). Each trait inside defaults to a no-op, so an embedder that
    /// doesn't care wires nothing up.
    pub hooks: &'a Hooks,
}

fn resolved_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Drive `built` to completion against `context`, returning the final
/// context, the terminal queue state, and the order nodes were
/// dispatched in (stable, per §4.D's `(depth, id)` tie-break).
///
/// Boxed explicitly so it can call into [`run_loop_node`], which in turn
/// calls back into `drive` for the loop body — without this indirection
/// the mutually recursive `async fn`s would have an infinitely-sized
/// future type.
pub fn drive<'a>(
    built: &'a BuiltWorkflow,
    mut context: ContextSnapshot,
    cx: &'a DriveCx<'a>,
) -> Pin<Box<dyn Future<Output = Result<(ContextSnapshot, QueueState, Vec<NodeId>), EngineError>> + Send + 'a>> {
    Box::pin(async move {
        let mut queue = QueueState::initialize(built);
        let budget = cx.options.max_concurrent_nodes.unwrap_or(built.max_concurrent_nodes).max(1);
        let mut execution_order: Vec<NodeId> = Vec::new();

        loop {
            if cx.options.cancel_token.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if queue.is_execution_complete() {
                break;
            }

            let ready = queue.get_ready_nodes(budget);
            if ready.is_empty() {
                // Nothing ready and not complete: every remaining node is
                // owned by a loop we haven't finished draining yet, or
                // the builder produced an inconsistent graph. Either way
                // there is nothing left for this tick to do.
                break;
            }

            let (owned, to_dispatch): (Vec<_>, Vec<_>) =
                ready.into_iter().partition(|id| cx.loop_body_owned.contains(id));
            for id in owned {
                queue.mark_skipped(&id)?;
            }
            if to_dispatch.is_empty() {
                continue;
            }

            for id in &to_dispatch {
                queue.mark_executing(id)?;
                execution_order.push(id.clone());
            }

            let snapshot = context.clone();
            let outcomes = join_all(to_dispatch.iter().map(|id| {
                let node = built.node(id).expect("ready node must exist in built workflow");
                run_one(node, built, &snapshot, &queue, cx)
            }))
            .await;

            for (id, outcome) in to_dispatch.into_iter().zip(outcomes) {
                match outcome {
                    Ok((output, signals)) => {
                        context = context.store_node_output(id.clone(), output.clone());
                        if let Some(branch) = signals.selected_branch() {
                            context = context.store_signal("selectedBranch", Value::Bool(branch));
                        }
                        if let Some(route) = signals.selected_route() {
                            context = context.store_signal("selectedRoute", Value::String(route.to_string()));
                        }
                        queue.mark_completed(&id, output, &signals)?;
                    }
                    Err(error) => {
                        let attempts_made = queue.runtime_state(&id).map(|r| r.retry_count).unwrap_or(0) + 1;
                        let policy = cx.options.retry_policy_for(&id);
                        let retry = should_retry(&error, attempts_made, policy);
                        queue.mark_failed(&id, error)?;
                        if retry {
                            let delay = policy.delay_for(attempts_made);
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            queue.mark_retry(&id)?;
                        }
                    }
                }
            }
        }

        Ok((context, queue, execution_order))
    })
}

/// Run exactly one node: loop nodes recurse into their body via
/// [`run_loop_node`]; every other type goes through
/// [`crate::dispatch::dispatch`] wrapped in the safety pre/post checks.
async fn run_one<'a>(
    node: &'a ExecutableNode,
    built: &'a BuiltWorkflow,
    context: &'a ContextSnapshot,
    queue: &'a QueueState,
    cx: &'a DriveCx<'a>,
) -> Result<(Value, Signals), NodeError> {
    if node.node_type == NodeType::Loop {
        return run_loop_node(node, built, context, cx).await;
    }

    let event_cx = EventContext::for_node(cx.execution_id, node.id.clone());
    cx.hooks.events.on_node_started(event_cx.clone()).await;
    let span = cx.hooks.observability.create_span(&node.name, None);

    let result = run_one_inner(node, built, context, queue, cx).await;

    match &result {
        Ok(_) => {
            cx.hooks.observability.end_span(span, SpanStatus::Ok);
            cx.hooks.events.on_node_completed(event_cx).await;
        }
        Err(_) => {
            cx.hooks.observability.end_span(span, SpanStatus::Error);
            cx.hooks.events.on_node_failed(event_cx).await;
        }
    }

    result
}

async fn run_one_inner<'a>(
    node: &'a ExecutableNode,
    built: &'a BuiltWorkflow,
    context: &'a ContextSnapshot,
    queue: &'a QueueState,
    cx: &'a DriveCx<'a>,
) -> Result<(Value, Signals), NodeError> {
    let resolved = resolve_config(&node.config, context)?;

    // The safety pipeline only blocks or redacts text; structured
    // (object/array/number) resolved inputs are checked by their
    // stringified form but never rewritten, since reparsing a redacted
    // string back into JSON could silently change a field's type.
    if let Some(safety) = cx.safety {
        match &resolved {
            Value::String(text) => {
                let checked = run_safety_check(Some(safety), text, Direction::Inbound)?;
                return run_dispatch(node, built, queue, cx, context, Value::String(checked)).await;
            }
            other => {
                run_safety_check(Some(safety), &resolved_text(other), Direction::Inbound)?;
            }
        }
    }

    run_dispatch(node, built, queue, cx, context, resolved).await
}

async fn run_dispatch<'a>(
    node: &'a ExecutableNode,
    built: &'a BuiltWorkflow,
    queue: &'a QueueState,
    cx: &'a DriveCx<'a>,
    context: &'a ContextSnapshot,
    resolved: Value,
) -> Result<(Value, Signals), NodeError> {
    let dispatch_cx = DispatchCx {
        built,
        queue,
        registry: cx.registry,
        execution_id: cx.execution_id,
        workflow_id: cx.workflow_id,
        cancellation: cx.options.cancel_token.clone(),
    };
    let outcome = dispatch(node, resolved, &dispatch_cx, context).await?;

    let output = if let Some(safety) = cx.safety {
        let redacted = run_safety_check(Some(safety), &resolved_text(&outcome.output), Direction::Outbound)?;
        match outcome.output {
            Value::String(_) => Value::String(redacted),
            other => other,
        }
    } else {
        outcome.output
    };

    Ok((output, outcome.signals))
}

/// Union of every node id owned by some loop's body, across all loop
/// contexts in `built`.
#[must_use]
pub fn loop_body_owned_ids(built: &BuiltWorkflow) -> HashSet<NodeId> {
    built
        .loop_contexts
        .values()
        .flat_map(|ctx| ctx.body_node_ids.iter().cloned())
        .collect::<HashSet<_>>()
        .into_iter()
        .chain(built.loop_contexts.values().map(|ctx| ctx.back_edge_source.clone()))
        .collect()
}
