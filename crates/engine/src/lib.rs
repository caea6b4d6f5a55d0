//! The top-level engine API (§6): build a workflow definition into a
//! dependency graph, then drive it to completion against a trigger
//! input, producing an [`ExecutionResult`].
//!
//! Everything below this module is plumbing `execute` assembles:
//! [`scheduler::drive`] ticks the [`loomwork_execution::QueueState`],
//! [`dispatch::dispatch`] runs one node, [`loop_exec`] expands `loop`
//! nodes into repeated sub-drives, and [`registry::HandlerRegistry`] is
//! how an embedder plugs in the side-effecting node types.

mod dispatch;
mod error;
mod loop_exec;
mod options;
mod registry;
mod result;
mod scheduler;
mod transform;

pub use error::EngineError;
pub use options::ExecutionOptions;
pub use registry::HandlerRegistry;
pub use result::{ExecutionResult, NodeRecord};

use loomwork_eventbus::{EventContext, Hooks};
use loomwork_execution::{ContextSnapshot, NodeState};
use loomwork_safety::SafetyPipeline;
use loomwork_workflow::{build as build_workflow, BuiltWorkflow, WorkflowDefinition};
use scheduler::{drive, loop_body_owned_ids, DriveCx};
use serde_json::Value;

/// Compile a [`WorkflowDefinition`] into its executable form: dependency
/// resolution, cycle/reference validation, depth and execution-level
/// computation, and loop-context resolution.
///
/// # Errors
/// Returns [`EngineError::Build`] with every validation failure found,
/// not just the first.
pub fn build(definition: &WorkflowDefinition) -> Result<BuiltWorkflow, EngineError> {
    build_workflow(definition).map_err(EngineError::from)
}

/// Run `built` against `trigger_input` to completion.
///
/// Drives the scheduler (§4.D), then assembles the result: `success` is
/// true once at least one declared output node (or, absent any, every
/// sink node) reached `Completed` — a partially failed fan-out with a
/// surviving branch still counts as success, matching how `merge`
/// degrades gracefully.
///
/// Credits are gated and reconciled once per execution, not per node:
/// [`Hooks::credits::should_allow_execution`] is checked before driving
/// anything, and the reservation is finalized or released once the
/// whole execution reaches a terminal state.
///
/// # Errors
/// Returns an [`EngineError`] if the scheduler itself fails (a queue
/// transition or template-expression bug, not an individual node's
/// failure, which is instead recorded in [`ExecutionResult::node_outputs`]).
pub async fn execute(
    built: &BuiltWorkflow,
    trigger_input: Value,
    variables: serde_json::Map<String, Value>,
    registry: &HandlerRegistry,
    options: &ExecutionOptions,
    hooks: &Hooks,
) -> Result<ExecutionResult, EngineError> {
    let execution_id = options.execution_id;
    let workflow_id = loomwork_core::WorkflowId::v4();

    let execution_cx = EventContext::for_execution(execution_id);

    if !hooks.credits.should_allow_execution(&execution_id).await {
        hooks.events.on_execution_failed(execution_cx).await;
        return Err(EngineError::Cancelled);
    }
    let reservation = hooks.credits.reserve_credits(&execution_id, built.len() as u64).await;

    hooks.events.on_execution_started(execution_cx.clone()).await;

    let safety = options.safety_config.clone().filter(|c| c.any_enabled()).map(SafetyPipeline::new);
    let loop_body_owned = loop_body_owned_ids(built);
    let cx = DriveCx {
        registry,
        safety: safety.as_ref(),
        options,
        execution_id,
        workflow_id,
        loop_body_owned: &loop_body_owned,
        hooks,
    };

    let context = ContextSnapshot::new(trigger_input, variables);
    let drive_result = drive(built, context, &cx).await;

    match drive_result {
        Ok((final_context, queue, execution_order)) => {
            let success = queue.any_output_completed(&built.output_node_ids);
            let summary = queue.get_execution_summary();

            hooks.credits.finalize_credits(&reservation, execution_order.len() as u64).await;
            if success {
                hooks.events.on_execution_completed(execution_cx).await;
            } else {
                hooks.events.on_execution_failed(execution_cx).await;
            }

            let node_outputs = built
                .nodes
                .keys()
                .filter_map(|id| {
                    let status = queue.status_of(id)?;
                    let record = match status {
                        NodeState::Completed => NodeRecord {
                            status,
                            output: final_context.node_output(id).cloned(),
                            error: None,
                        },
                        NodeState::Failed => NodeRecord {
                            status,
                            output: None,
                            error: queue.runtime_state(id).and_then(|r| r.error.as_ref()).map(ToString::to_string),
                        },
                        _ => NodeRecord { status, output: None, error: None },
                    };
                    Some((id.clone(), record))
                })
                .collect();

            Ok(ExecutionResult {
                success,
                error: (!success).then(|| "no declared output node completed".to_string()),
                final_outputs: final_context.build_final_outputs(&built.output_node_ids),
                node_outputs,
                execution_order,
                summary,
            })
        }
        Err(error) => {
            hooks.credits.release_credits(&reservation).await;
            hooks.events.on_execution_failed(execution_cx).await;
            Err(error)
        }
    }
}

/// Owns a [`HandlerRegistry`] and a set of [`Hooks`] so a caller
/// configures handlers and observability once, then drives many
/// executions through [`Self::execute`].
///
/// The free functions [`build`] and [`execute`] stay available for a
/// caller that doesn't need to hold either across calls.
pub struct WorkflowEngine {
    registry: HandlerRegistry,
    hooks: Hooks,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(registry: HandlerRegistry, hooks: Hooks) -> Self {
        Self { registry, hooks }
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Run `built` against `trigger_input`, using this engine's
    /// registered handlers and hooks.
    ///
    /// # Errors
    /// See [`execute`].
    pub async fn execute(
        &self,
        built: &BuiltWorkflow,
        trigger_input: Value,
        variables: serde_json::Map<String, Value>,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, EngineError> {
        execute(built, trigger_input, variables, &self.registry, options, &self.hooks).await
    }
}
