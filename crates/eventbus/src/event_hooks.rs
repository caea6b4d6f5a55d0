//! Execution and node lifecycle event callbacks: the second of the
//! three Hooks traits.

use async_trait::async_trait;
use loomwork_core::{ExecutionId, NodeId};
use serde_json::Value;

/// Shared payload for every lifecycle callback: which execution, which
/// node (if any), a trace id to correlate with observability spans, and
/// whatever metrics the caller wants attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub execution_id: ExecutionId,
    pub node_id: Option<NodeId>,
    pub trace_id: Option<String>,
    pub metrics: Option<Value>,
}

impl EventContext {
    #[must_use]
    pub fn for_execution(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            node_id: None,
            trace_id: None,
            metrics: None,
        }
    }

    #[must_use]
    pub fn for_node(execution_id: ExecutionId, node_id: NodeId) -> Self {
        Self {
            execution_id,
            node_id: Some(node_id),
            trace_id: None,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Value) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Execution and node lifecycle notifications.
///
/// Every method defaults to doing nothing, so an implementor overrides
/// only the events it cares about — a caller interested only in
/// failures can implement just [`Self::on_execution_failed`].
#[async_trait]
pub trait EventHooks: Send + Sync {
    async fn on_execution_started(&self, _ctx: EventContext) {}
    async fn on_execution_progress(&self, _ctx: EventContext) {}
    async fn on_execution_completed(&self, _ctx: EventContext) {}
    async fn on_execution_failed(&self, _ctx: EventContext) {}
    async fn on_execution_paused(&self, _ctx: EventContext) {}
    async fn on_node_started(&self, _ctx: EventContext) {}
    async fn on_node_completed(&self, _ctx: EventContext) {}
    async fn on_node_failed(&self, _ctx: EventContext) {}
}

/// An [`EventHooks`] that does nothing at all — the default when an
/// embedder doesn't configure one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventHooks;

impl EventHooks for NoopEventHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use loomwork_core::ExecutionId;

    #[tokio::test]
    async fn noop_hooks_accept_every_callback() {
        let hooks = NoopEventHooks;
        let ctx = EventContext::for_execution(ExecutionId::v4());
        hooks.on_execution_started(ctx.clone()).await;
        hooks.on_execution_completed(ctx).await;
    }
}
