//! Per-iteration observability events (§4.F): consumed by the
//! observability collaborator only, never by the loop's own control
//! flow — mirrors `loomwork-eventbus`'s no-op-by-default hook traits,
//! kept local to this crate so `loomwork-agent` doesn't have to depend
//! on the eventbus crate just to emit three events.

use crate::message::ToolCall;

/// One of the three lifecycle notifications emitted around a tool call.
#[derive(Debug, Clone)]
pub enum AgentToolEvent<'a> {
    Started { call: &'a ToolCall },
    Completed { call: &'a ToolCall, result: &'a serde_json::Value },
    Failed { call: &'a ToolCall, error: &'a str },
}

/// Observability sink for the agent loop. Defaults to doing nothing, so
/// an embedder that doesn't care about per-tool-call events wires up
/// nothing at all.
pub trait AgentHooks: Send + Sync {
    fn on_tool_event(&self, _event: AgentToolEvent<'_>) {}
}

/// An [`AgentHooks`] that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAgentHooks;

impl AgentHooks for NoopAgentHooks {}
