//! Maps the side-effecting [`NodeType`] variants to the handler an
//! embedder registered for them.
//!
//! The deterministic control-flow types (`input`, `output`, `transform`,
//! `conditional`, `switch`, `merge`, `loop`, `trigger`) are dispatched
//! directly by [`crate::dispatch`] and never appear here — this registry
//! only exists for the types a workflow author's deployment must supply
//! a concrete implementation for (an LLM call, an HTTP client, …).

use dashmap::DashMap;
use loomwork_action::NodeHandler;
use loomwork_workflow::NodeType;
use std::sync::Arc;

use crate::error::EngineError;

/// A lookup table from [`NodeType`] to the handler that executes it.
///
/// Grounded on the teacher's `ActionRegistry` (a `DashMap`-backed
/// string-keyed registry), keyed here by the closed `NodeType` enum
/// instead of an open string namespace since side-effecting node types
/// are a fixed, known-in-advance set.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<NodeType, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { handlers: DashMap::new() }
    }

    /// Register (or replace) the handler for `node_type`.
    pub fn register(&self, node_type: NodeType, handler: Arc<dyn NodeHandler>) {
        tracing::info!(?node_type, "registering node handler");
        self.handlers.insert(node_type, handler);
    }

    pub(crate) fn get(&self, node_type: NodeType) -> Result<Arc<dyn NodeHandler>, EngineError> {
        self.handlers
            .get(&node_type)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::HandlerNotFound {
                node_id: loomwork_core::NodeId::new(""),
                node_type: node_type.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, node_type: NodeType) -> bool {
        self.handlers.contains_key(&node_type)
    }

    pub fn remove(&self, node_type: NodeType) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.remove(&node_type).map(|(_, handler)| handler)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loomwork_action::{NodeContext, NodeError, NodeOutcome};
    use serde_json::Value;

    struct EchoHandler;

    #[async_trait]
    impl NodeHandler for EchoHandler {
        async fn execute(&self, input: Value, _ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
            Ok(NodeOutcome::new(input))
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = HandlerRegistry::new();
        registry.register(NodeType::Echo, Arc::new(EchoHandler));
        assert!(registry.contains(NodeType::Echo));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_missing_returns_error() {
        let registry = HandlerRegistry::new();
        assert!(registry.get(NodeType::Llm).is_err());
    }

    #[test]
    fn register_replaces_existing() {
        let registry = HandlerRegistry::new();
        registry.register(NodeType::Echo, Arc::new(EchoHandler));
        registry.register(NodeType::Echo, Arc::new(EchoHandler));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_handler() {
        let registry = HandlerRegistry::new();
        registry.register(NodeType::Echo, Arc::new(EchoHandler));
        assert!(registry.remove(NodeType::Echo).is_some());
        assert!(registry.is_empty());
    }
}
