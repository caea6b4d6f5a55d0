//! The shape returned from [`crate::execute`] (§6).

use loomwork_core::NodeId;
use loomwork_execution::{ExecutionSummary, NodeState};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// A single node's final record in [`ExecutionResult::node_outputs`].
///
/// Failed and skipped nodes carry no `output`, but a completed node
/// always does — callers distinguish the three cases on `status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub status: NodeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The outcome of one [`crate::execute`] call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub final_outputs: HashMap<NodeId, Value>,
    pub node_outputs: HashMap<NodeId, NodeRecord>,
    pub execution_order: Vec<NodeId>,
    pub summary: ExecutionSummary,
}

impl ExecutionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn node_output(&self, node_id: &NodeId) -> Option<&Value> {
        self.node_outputs.get(node_id).and_then(|record| record.output.as_ref())
    }
}
