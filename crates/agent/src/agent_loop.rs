//! The bounded agent tool loop (§4.F): call the model, execute any
//! tools it asks for, append results, repeat until a terminal message
//! or the iteration cap.
//!
//! Expressed as a flat `while` loop with a bounded counter rather than
//! recursion, per `SPEC_FULL.md` §9's design note — tool calls are
//! dispatched through the same kind of registered adapter the node
//! dispatcher uses for every other side-effecting node type.

use loomwork_action::NodeError;
use loomwork_resilience::should_retry;
use loomwork_safety::{Direction, SafetyPipeline};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::{AgentConfig, ToolErrorStrategy};
use crate::dispatcher::ToolExecutor;
use crate::error::AgentError;
use crate::hooks::{AgentHooks, AgentToolEvent, NoopAgentHooks};
use crate::llm::LlmAdapter;
use crate::message::{Message, ToolCall};
use crate::tool::validate_and_coerce;

/// Record of one executed tool call, kept for the final output shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub attempts: u32,
    pub result: Result<Value, String>,
}

/// Why the loop stopped without a terminal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    IterationLimit,
}

/// The loop's final report, matching §4.F's `{ success, finalMessage,
/// iterations, toolCalls[] }` output shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutcome {
    pub success: bool,
    pub final_message: Option<String>,
    pub iterations: u32,
    pub tool_calls: Vec<ToolCallRecord>,
    pub reason: Option<StopReason>,
}

fn agent_error_to_node_error(err: AgentError) -> NodeError {
    match err {
        AgentError::Adapter(message) => NodeError::server_error(message),
        AgentError::UnknownTool(name) => NodeError::validation(format!("unknown tool \"{name}\"")),
        AgentError::Tool(node_error) => node_error,
        AgentError::SafetyBlocked(message) => NodeError::safety_block(message),
    }
}

/// Run one agent invocation to completion (or the iteration cap).
///
/// # Errors
/// Returns a [`NodeError`] if the model adapter fails on a turn, or if
/// the safety pipeline blocks the inbound user message or a final
/// outbound message.
#[instrument(skip(config, adapter, executor, hooks, safety), fields(max_iterations = config.max_iterations))]
pub async fn run_agent(
    config: &AgentConfig,
    adapter: &dyn LlmAdapter,
    executor: &dyn ToolExecutor,
    hooks: Option<&dyn AgentHooks>,
    safety: Option<&SafetyPipeline>,
    user_input: &str,
) -> Result<AgentOutcome, NodeError> {
    let noop_hooks = NoopAgentHooks;
    let hooks: &dyn AgentHooks = hooks.unwrap_or(&noop_hooks);

    let inbound_text = if let Some(pipeline) = safety {
        pipeline.check(user_input, Direction::Inbound)?.text
    } else {
        user_input.to_string()
    };

    let mut messages = Vec::new();
    if let Some(system_prompt) = &config.system_prompt {
        messages.push(Message::system(system_prompt.clone()));
    }
    messages.push(Message::user(inbound_text));

    let mut tool_call_records = Vec::new();

    for iteration in 1..=config.max_iterations {
        let response = adapter
            .complete(&config.model, &messages, &config.tools)
            .await
            .map_err(agent_error_to_node_error)?;

        if response.is_terminal_assistant() {
            let content = match response {
                Message::Assistant { content, .. } => content,
                _ => unreachable!("is_terminal_assistant only true for Assistant"),
            };
            let outbound_text = if let Some(pipeline) = safety {
                pipeline.check(&content, Direction::Outbound)?.text
            } else {
                content
            };
            info!(iterations = iteration, "agent reached terminal message");
            return Ok(AgentOutcome {
                success: true,
                final_message: Some(outbound_text),
                iterations: iteration,
                tool_calls: tool_call_records,
                reason: None,
            });
        }

        let calls = response.tool_calls().to_vec();
        messages.push(response);

        for call in &calls {
            let record = execute_one_tool_call(config, executor, hooks, safety, call).await;
            messages.push(Message::tool_result(
                call.id.clone(),
                match &record.result {
                    Ok(value) => value.to_string(),
                    Err(message) => format!("error: {message}"),
                },
            ));
            tool_call_records.push(record);
        }

        if calls.is_empty() {
            // An assistant turn that claims tool calls but lists none
            // shouldn't spin forever without making progress.
            warn!("assistant turn had no tool calls but was not terminal; treating as terminal");
            return Ok(AgentOutcome {
                success: true,
                final_message: None,
                iterations: iteration,
                tool_calls: tool_call_records,
                reason: None,
            });
        }
    }

    Ok(AgentOutcome {
        success: false,
        final_message: None,
        iterations: config.max_iterations,
        tool_calls: tool_call_records,
        reason: Some(StopReason::IterationLimit),
    })
}

async fn execute_one_tool_call(
    config: &AgentConfig,
    executor: &dyn ToolExecutor,
    hooks: &dyn AgentHooks,
    safety: Option<&SafetyPipeline>,
    call: &ToolCall,
) -> ToolCallRecord {
    hooks.on_tool_event(AgentToolEvent::Started { call });

    let Some(tool) = config.find_tool(&call.name) else {
        let message = format!("unknown tool \"{}\"", call.name);
        hooks.on_tool_event(AgentToolEvent::Failed { call, error: &message });
        return ToolCallRecord {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            attempts: 0,
            result: Err(message),
        };
    };

    let arguments = match validate_and_coerce(&tool.parameters, &call.arguments) {
        Ok(value) => value,
        Err(validation_error) => {
            let message = validation_error.to_string();
            hooks.on_tool_event(AgentToolEvent::Failed { call, error: &message });
            return ToolCallRecord {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                arguments: call.arguments.clone(),
                attempts: 0,
                result: Err(message),
            };
        }
    };

    if let Some(pipeline) = safety {
        if let Err(err) = pipeline.check(&arguments.to_string(), Direction::Outbound) {
            let message = err.to_string();
            hooks.on_tool_event(AgentToolEvent::Failed { call, error: &message });
            return ToolCallRecord {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                arguments,
                attempts: 0,
                result: Err(message),
            };
        }
    }

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match executor.invoke(&call.name, arguments.clone()).await {
            Ok(value) => {
                let outbound = match safety {
                    Some(pipeline) => match pipeline.check(&value.to_string(), Direction::Outbound) {
                        Ok(outcome) => serde_json::from_str(&outcome.text).unwrap_or(Value::String(outcome.text)),
                        Err(err) => {
                            let message = err.to_string();
                            hooks.on_tool_event(AgentToolEvent::Failed { call, error: &message });
                            return ToolCallRecord {
                                tool_call_id: call.id.clone(),
                                tool_name: call.name.clone(),
                                arguments,
                                attempts,
                                result: Err(message),
                            };
                        }
                    },
                    None => value,
                };
                hooks.on_tool_event(AgentToolEvent::Completed { call, result: &outbound });
                return ToolCallRecord {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    arguments,
                    attempts,
                    result: Ok(outbound),
                };
            }
            Err(err) => {
                let retryable = should_retry(&err, attempts, &config.retry_policy);
                if retryable && config.tool_error_strategy == ToolErrorStrategy::RetryWithBackoff {
                    tokio::time::sleep(config.retry_policy.delay_for(attempts)).await;
                    continue;
                }
                let message = err.to_string();
                hooks.on_tool_event(AgentToolEvent::Failed { call, error: &message });
                return ToolCallRecord {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    arguments,
                    attempts,
                    result: Err(message),
                };
            }
        }
    }
}
