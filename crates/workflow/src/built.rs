//! The validated, compiled form of a workflow, ready to be driven by a
//! scheduler.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use loomwork_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::{Edge, NodeType};

/// A node as it appears in a [`BuiltWorkflow`]: the author's definition
/// plus the structural facts the builder computed about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutableNode {
    /// This node's id.
    pub id: NodeId,
    /// Its node type.
    pub node_type: NodeType,
    /// Display name.
    pub name: String,
    /// Resolved (but not yet templated) configuration.
    pub config: Value,
    /// Longest path from any zero-dependency node to this one.
    pub depth: usize,
    /// Direct upstream node ids (excludes loop-back edges).
    pub dependencies: Vec<NodeId>,
    /// Direct downstream node ids (excludes loop-back edges).
    pub dependents: Vec<NodeId>,
}

/// The body subgraph and back-edge target for one `loop` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopContext {
    /// The loop node itself.
    pub loop_node_id: NodeId,
    /// The first node of the loop body, reached via the `loop-body` edge.
    pub body_entry: NodeId,
    /// All nodes reachable from `body_entry` without leaving the loop,
    /// in declaration order.
    pub body_node_ids: Vec<NodeId>,
    /// The node whose outgoing `loop-back` edge returns control to the
    /// loop node for the next iteration.
    pub back_edge_source: NodeId,
    /// The node reached via the loop's `loop-complete` edge once
    /// iteration finishes, if declared.
    pub complete_target: Option<NodeId>,
}

/// The validated, compiled workflow: the only form the scheduler ever
/// operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltWorkflow {
    /// All nodes, keyed by id, insertion-ordered by declaration.
    pub nodes: IndexMap<NodeId, ExecutableNode>,
    /// All edges, keyed by edge id.
    pub edges: IndexMap<String, Edge>,
    /// Nodes grouped by depth; `execution_levels[d]` holds every node at
    /// depth `d`, in declaration order.
    pub execution_levels: Vec<Vec<NodeId>>,
    /// The workflow's single entry point.
    pub trigger_node_id: NodeId,
    /// Every node considered an output: explicitly typed `output`, or a
    /// sink (no dependents) otherwise.
    pub output_node_ids: Vec<NodeId>,
    /// Loop body/back-edge metadata, one entry per `loop` node.
    pub loop_contexts: HashMap<NodeId, LoopContext>,
    /// Upper bound on concurrently executing nodes.
    pub max_concurrent_nodes: usize,
    /// When this workflow was compiled.
    pub created_at: DateTime<Utc>,
}

impl BuiltWorkflow {
    /// Look up a node's compiled form by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&ExecutableNode> {
        self.nodes.get(id)
    }

    /// Total number of nodes in the workflow.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the workflow has no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
