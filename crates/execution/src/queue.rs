//! The scheduler's pure state machine: six disjoint sets of node ids plus
//! the per-node detail needed to report progress and replay history.
//!
//! Every transition is a plain method on [`QueueState`] — no callbacks,
//! no hidden I/O. Cascade-skip, the trickiest part of the whole engine,
//! falls out of one rule applied uniformly after every node reaches a
//! terminal state: a pending node becomes ready once all of its
//! dependencies are terminal and at least one of them completed, or
//! skipped once all of them are terminal and none did. That single rule
//! handles merge nodes (several dependencies) and ordinary nodes (one)
//! alike, so there is no special-cased "merge path".

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use loomwork_action::{NodeError, Signals};
use loomwork_core::NodeId;
use loomwork_workflow::{BuiltWorkflow, HandleType, NodeType};
use serde_json::Value;

use crate::error::QueueError;
use crate::state::{NodeRuntimeState, NodeState};
use crate::summary::ExecutionSummary;

fn is_terminal(state: NodeState) -> bool {
    matches!(state, NodeState::Completed | NodeState::Failed | NodeState::Skipped)
}

/// The queue's view of one node's compiled, static facts — fixed for the
/// lifetime of an execution, computed once at [`QueueState::initialize`].
struct NodeFacts {
    node_type: NodeType,
    dependencies: Vec<NodeId>,
    dependents: Vec<NodeId>,
    depth: usize,
    declaration_index: usize,
    /// `(handle_type, target)` for this node's outgoing conditional or
    /// switch edges, in declaration order.
    routed_edges: Vec<(HandleType, NodeId)>,
}

/// The live, mutable scheduling state for one execution.
pub struct QueueState {
    pending: HashSet<NodeId>,
    ready: HashSet<NodeId>,
    executing: HashSet<NodeId>,
    completed: HashSet<NodeId>,
    failed: HashSet<NodeId>,
    skipped: HashSet<NodeId>,
    runtime: HashMap<NodeId, NodeRuntimeState>,
    facts: HashMap<NodeId, NodeFacts>,
}

impl QueueState {
    /// Build the initial queue for a compiled workflow: every
    /// zero-dependency node starts `Ready`, everything else `Pending`.
    #[must_use]
    pub fn initialize(built: &BuiltWorkflow) -> Self {
        let mut routed_by_source: HashMap<NodeId, Vec<(HandleType, NodeId)>> = HashMap::new();
        for edge in built.edges.values() {
            if matches!(
                edge.handle_type,
                HandleType::True | HandleType::False | HandleType::Case(_) | HandleType::Default
            ) {
                routed_by_source
                    .entry(edge.source.clone())
                    .or_default()
                    .push((edge.handle_type.clone(), edge.target.clone()));
            }
        }

        let mut pending = HashSet::new();
        let mut ready = HashSet::new();
        let mut runtime = HashMap::new();
        let mut facts = HashMap::new();

        for (index, (node_id, node)) in built.nodes.iter().enumerate() {
            let initial_state = if node.dependencies.is_empty() {
                ready.insert(node_id.clone());
                NodeState::Ready
            } else {
                pending.insert(node_id.clone());
                NodeState::Pending
            };
            runtime.insert(node_id.clone(), NodeRuntimeState::new(initial_state));
            facts.insert(
                node_id.clone(),
                NodeFacts {
                    node_type: node.node_type,
                    dependencies: node.dependencies.clone(),
                    dependents: node.dependents.clone(),
                    depth: node.depth,
                    declaration_index: index,
                    routed_edges: routed_by_source.remove(node_id).unwrap_or_default(),
                },
            );
        }

        Self {
            pending,
            ready,
            executing: HashSet::new(),
            completed: HashSet::new(),
            failed: HashSet::new(),
            skipped: HashSet::new(),
            runtime,
            facts,
        }
    }

    /// This node's current state, or `None` if it isn't part of the
    /// workflow.
    #[must_use]
    pub fn status_of(&self, node_id: &NodeId) -> Option<NodeState> {
        self.runtime.get(node_id).map(|r| r.status)
    }

    /// Full runtime detail for one node.
    #[must_use]
    pub fn runtime_state(&self, node_id: &NodeId) -> Option<&NodeRuntimeState> {
        self.runtime.get(node_id)
    }

    /// Up to `limit` ready node ids, ordered by (depth, declaration
    /// order) — stable and independent of the order nodes actually
    /// became ready in.
    #[must_use]
    pub fn get_ready_nodes(&self, limit: usize) -> Vec<NodeId> {
        let mut candidates: Vec<&NodeId> = self.ready.iter().collect();
        candidates.sort_by_key(|id| {
            let f = &self.facts[*id];
            (f.depth, f.declaration_index)
        });
        candidates.into_iter().take(limit).cloned().collect()
    }

    /// Move a node from `ready` to `executing`.
    ///
    /// # Errors
    /// Returns [`QueueError::InvalidTransition`] if the node isn't ready,
    /// or [`QueueError::UnknownNode`] if it isn't part of the workflow.
    pub fn mark_executing(&mut self, node_id: &NodeId) -> Result<(), QueueError> {
        self.require_status(node_id, NodeState::Ready, NodeState::Executing)?;
        self.ready.remove(node_id);
        self.executing.insert(node_id.clone());
        let runtime = self.runtime.get_mut(node_id).expect("checked above");
        runtime.status = NodeState::Executing;
        runtime.started_at = Some(Utc::now());
        Ok(())
    }

    /// Move a node from `executing` to `completed`, store its output,
    /// apply conditional/switch branch gating, then re-evaluate every
    /// pending dependent.
    ///
    /// # Errors
    /// Returns [`QueueError::InvalidTransition`] if the node isn't
    /// currently executing.
    pub fn mark_completed(
        &mut self,
        node_id: &NodeId,
        output: Value,
        signals: &Signals,
    ) -> Result<(), QueueError> {
        self.require_status(node_id, NodeState::Executing, NodeState::Completed)?;
        self.executing.remove(node_id);
        self.completed.insert(node_id.clone());
        let runtime = self.runtime.get_mut(node_id).expect("checked above");
        runtime.status = NodeState::Completed;
        runtime.completed_at = Some(Utc::now());
        runtime.output = Some(output);

        self.apply_branch_gating(node_id, signals);
        self.reevaluate_dependents(node_id);
        Ok(())
    }

    /// Skip a node outright — used for nodes never reached because a
    /// conditional or switch chose a different branch, and reusable by
    /// callers that need to skip a node directly (e.g. a disabled
    /// trigger). Then re-evaluate its dependents.
    ///
    /// # Errors
    /// Returns [`QueueError::InvalidTransition`] if the node has already
    /// started executing or reached a terminal state.
    pub fn mark_skipped(&mut self, node_id: &NodeId) -> Result<(), QueueError> {
        let status = self.status_of(node_id).ok_or_else(|| QueueError::UnknownNode(node_id.clone()))?;
        if !matches!(status, NodeState::Pending | NodeState::Ready) {
            return Err(QueueError::InvalidTransition {
                node_id: node_id.clone(),
                actual: status,
                expected: NodeState::Pending,
                attempted: NodeState::Skipped,
            });
        }
        self.pending.remove(node_id);
        self.ready.remove(node_id);
        self.skipped.insert(node_id.clone());
        let runtime = self.runtime.get_mut(node_id).expect("checked above");
        runtime.status = NodeState::Skipped;
        runtime.completed_at = Some(Utc::now());

        self.reevaluate_dependents(node_id);
        Ok(())
    }

    /// Move a node from `executing` to `failed`, record the error, then
    /// cascade-skip whatever downstream work can no longer run.
    ///
    /// # Errors
    /// Returns [`QueueError::InvalidTransition`] if the node isn't
    /// currently executing.
    pub fn mark_failed(&mut self, node_id: &NodeId, error: NodeError) -> Result<(), QueueError> {
        self.require_status(node_id, NodeState::Executing, NodeState::Failed)?;
        self.executing.remove(node_id);
        self.failed.insert(node_id.clone());
        let runtime = self.runtime.get_mut(node_id).expect("checked above");
        runtime.status = NodeState::Failed;
        runtime.completed_at = Some(Utc::now());
        runtime.error = Some(error);

        self.reevaluate_dependents(node_id);
        Ok(())
    }

    /// Re-queue a failed node for another attempt: `Failed` straight
    /// back to `Ready`, bumping its retry count.
    ///
    /// Deliberately does not re-evaluate dependents — any dependent
    /// already cascade-skipped because of this node's earlier failure
    /// stays skipped. A retry only gets to try again itself; it doesn't
    /// retroactively un-skip work that already gave up on it.
    ///
    /// # Errors
    /// Returns [`QueueError::InvalidTransition`] if the node isn't
    /// currently failed.
    pub fn mark_retry(&mut self, node_id: &NodeId) -> Result<(), QueueError> {
        self.require_status(node_id, NodeState::Failed, NodeState::Ready)?;
        self.failed.remove(node_id);
        self.ready.insert(node_id.clone());
        let runtime = self.runtime.get_mut(node_id).expect("checked above");
        runtime.status = NodeState::Ready;
        runtime.retry_count += 1;
        runtime.error = None;
        runtime.started_at = None;
        runtime.completed_at = None;
        Ok(())
    }

    /// Whether the execution has nothing left to schedule: no node is
    /// pending, ready, or executing.
    #[must_use]
    pub fn is_execution_complete(&self) -> bool {
        self.pending.is_empty() && self.ready.is_empty() && self.executing.is_empty()
    }

    /// A tally of every node's current state.
    #[must_use]
    pub fn get_execution_summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            pending: self.pending.len(),
            ready: self.ready.len(),
            executing: self.executing.len(),
            completed: self.completed.len(),
            failed: self.failed.len(),
            skipped: self.skipped.len(),
            total: self.runtime.len(),
        }
    }

    /// Whether at least one of `output_node_ids` reached `Completed`.
    ///
    /// The scheduler's success/failure verdict for a finished execution:
    /// `true` means at least one declared (or, absent any, sink) output
    /// node produced a value.
    #[must_use]
    pub fn any_output_completed(&self, output_node_ids: &[NodeId]) -> bool {
        output_node_ids
            .iter()
            .any(|id| self.status_of(id) == Some(NodeState::Completed))
    }

    fn require_status(
        &self,
        node_id: &NodeId,
        expected: NodeState,
        attempted: NodeState,
    ) -> Result<(), QueueError> {
        let actual = self.status_of(node_id).ok_or_else(|| QueueError::UnknownNode(node_id.clone()))?;
        if actual == expected {
            Ok(())
        } else {
            Err(QueueError::InvalidTransition {
                node_id: node_id.clone(),
                actual,
                expected,
                attempted,
            })
        }
    }

    /// For a just-completed conditional or switch node, skip whichever
    /// direct targets its signals didn't select — before the generic
    /// dependents pass runs, so those targets never get a chance to look
    /// ready off the conditional's own (always-successful) completion.
    fn apply_branch_gating(&mut self, node_id: &NodeId, signals: &Signals) {
        let Some(facts) = self.facts.get(node_id) else { return };
        if facts.routed_edges.is_empty() {
            return;
        }

        match facts.node_type {
            NodeType::Conditional => {
                let Some(selected) = signals.selected_branch() else { return };
                let skip_targets: Vec<NodeId> = facts
                    .routed_edges
                    .iter()
                    .filter_map(|(handle, target)| match handle {
                        HandleType::True if !selected => Some(target.clone()),
                        HandleType::False if selected => Some(target.clone()),
                        _ => None,
                    })
                    .collect();
                for target in skip_targets {
                    self.skip_if_pending(&target);
                }
            }
            NodeType::Switch => {
                let Some(selected_route) = signals.selected_route() else { return };
                let skip_targets: Vec<NodeId> = facts
                    .routed_edges
                    .iter()
                    .filter_map(|(handle, target)| {
                        let is_selected = match handle {
                            HandleType::Case(label) => label == selected_route,
                            HandleType::Default => selected_route == "default",
                            _ => false,
                        };
                        if is_selected {
                            None
                        } else {
                            Some(target.clone())
                        }
                    })
                    .collect();
                for target in skip_targets {
                    self.skip_if_pending(&target);
                }
            }
            _ => {}
        }
    }

    /// Skip `node_id` directly (not via the generic cascade rule) if it
    /// hasn't started yet, then cascade from there.
    fn skip_if_pending(&mut self, node_id: &NodeId) {
        if self.status_of(node_id) != Some(NodeState::Pending) {
            return;
        }
        self.pending.remove(node_id);
        self.skipped.insert(node_id.clone());
        if let Some(runtime) = self.runtime.get_mut(node_id) {
            runtime.status = NodeState::Skipped;
            runtime.completed_at = Some(Utc::now());
        }
        self.reevaluate_dependents(node_id);
    }

    /// After `node_id` reaches a terminal state, re-evaluate every
    /// pending dependent: ready once all of its dependencies are
    /// terminal and at least one completed, skipped once all are
    /// terminal and none did, otherwise left pending to wait on the rest.
    fn reevaluate_dependents(&mut self, node_id: &NodeId) {
        let Some(dependents) = self.facts.get(node_id).map(|f| f.dependents.clone()) else {
            return;
        };

        for dependent in dependents {
            if self.status_of(&dependent) != Some(NodeState::Pending) {
                continue;
            }
            let Some(deps) = self.facts.get(&dependent).map(|f| f.dependencies.clone()) else {
                continue;
            };

            let all_terminal = deps.iter().all(|d| {
                self.status_of(d).map(is_terminal).unwrap_or(false)
            });
            if !all_terminal {
                continue;
            }
            let any_completed = deps.iter().any(|d| self.status_of(d) == Some(NodeState::Completed));

            if any_completed {
                self.pending.remove(&dependent);
                self.ready.insert(dependent.clone());
                if let Some(runtime) = self.runtime.get_mut(&dependent) {
                    runtime.status = NodeState::Ready;
                }
            } else {
                self.pending.remove(&dependent);
                self.skipped.insert(dependent.clone());
                if let Some(runtime) = self.runtime.get_mut(&dependent) {
                    runtime.status = NodeState::Skipped;
                    runtime.completed_at = Some(Utc::now());
                }
                self.reevaluate_dependents(&dependent);
            }
        }
    }
}
