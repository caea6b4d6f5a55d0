//! Dependency graph over a workflow's nodes.
//!
//! Declared loop-back edges are excluded from dependency computation and
//! cycle detection entirely — a loop's body is allowed to point back at
//! the loop node without that being treated as a cycle.

use std::collections::HashMap;

use loomwork_core::NodeId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::definition::{Edge, WorkflowDefinition};
use crate::error::BuildError;

/// A directed graph over node ids, built from a workflow's non-loop-back
/// edges.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<NodeId, ()>,
    index_of: HashMap<NodeId, NodeIndex>,
    /// Direct dependencies of each node, in edge-declaration order —
    /// kept separately from `graph` because `petgraph`'s
    /// `neighbors_directed` yields incoming edges in reverse insertion
    /// order, which would silently scramble declaration-order-sensitive
    /// consumers (e.g. a `merge` node's `branchKeys` zip).
    dependencies_of: HashMap<NodeId, Vec<NodeId>>,
    /// Direct dependents of each node, in edge-declaration order.
    dependents_of: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyGraph {
    /// Build the dependency graph for a workflow definition.
    ///
    /// Every node in `definition.nodes` is added, even if it has no edges.
    /// Only edges whose `handle_type` is not `loop-back` contribute a
    /// dependency relationship.
    pub fn from_definition(definition: &WorkflowDefinition) -> Result<Self, Vec<BuildError>> {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::with_capacity(definition.nodes.len());
        for node_id in definition.nodes.keys() {
            let index = graph.add_node(node_id.clone());
            index_of.insert(node_id.clone(), index);
        }

        let mut dependencies_of: HashMap<NodeId, Vec<NodeId>> =
            definition.nodes.keys().map(|id| (id.clone(), Vec::new())).collect();
        let mut dependents_of: HashMap<NodeId, Vec<NodeId>> =
            definition.nodes.keys().map(|id| (id.clone(), Vec::new())).collect();

        let mut errors = Vec::new();
        for edge in &definition.edges {
            let Some(&source_idx) = index_of.get(&edge.source) else {
                errors.push(BuildError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: edge.source.clone(),
                });
                continue;
            };
            let Some(&target_idx) = index_of.get(&edge.target) else {
                errors.push(BuildError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: edge.target.clone(),
                });
                continue;
            };
            if edge.handle_type.is_loop_back() {
                continue;
            }
            graph.add_edge(source_idx, target_idx, ());
            dependencies_of.get_mut(&edge.target).expect("target node exists").push(edge.source.clone());
            dependents_of.get_mut(&edge.source).expect("source node exists").push(edge.target.clone());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self { graph, index_of, dependencies_of, dependents_of })
    }

    /// Direct (one-hop) dependencies of a node: nodes it has an incoming
    /// edge from, in the order those edges were declared.
    #[must_use]
    pub fn dependencies(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.dependencies_of.get(node_id).cloned().unwrap_or_default()
    }

    /// Direct (one-hop) dependents of a node: nodes it has an outgoing
    /// edge to, in the order those edges were declared.
    #[must_use]
    pub fn dependents(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.dependents_of.get(node_id).cloned().unwrap_or_default()
    }

    /// Find a cycle among the graph's edges, if one exists.
    ///
    /// Returns the cycle as a sequence of node ids, the first repeated
    /// when you walk it in order.
    #[must_use]
    pub fn detect_cycle(&self) -> Option<Vec<NodeId>> {
        if toposort(&self.graph, None).is_ok() {
            return None;
        }
        // toposort failing means a cycle exists; find one via DFS so the
        // error message can point at concrete nodes.
        let mut visited = std::collections::HashSet::new();
        for start in self.graph.node_indices() {
            if visited.contains(&start) {
                continue;
            }
            let mut stack = Vec::new();
            let mut on_stack = std::collections::HashSet::new();
            if let Some(cycle) = self.dfs_find_cycle(start, &mut visited, &mut on_stack, &mut stack)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_find_cycle(
        &self,
        node: NodeIndex,
        visited: &mut std::collections::HashSet<NodeIndex>,
        on_stack: &mut std::collections::HashSet<NodeIndex>,
        stack: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeId>> {
        visited.insert(node);
        on_stack.insert(node);
        stack.push(node);

        for neighbor in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if on_stack.contains(&neighbor) {
                let start = stack.iter().position(|&n| n == neighbor).unwrap();
                let mut cycle: Vec<NodeId> = stack[start..].iter().map(|&i| self.graph[i].clone()).collect();
                cycle.push(self.graph[neighbor].clone());
                return Some(cycle);
            }
            if !visited.contains(&neighbor) {
                if let Some(cycle) = self.dfs_find_cycle(neighbor, visited, on_stack, stack) {
                    return Some(cycle);
                }
            }
        }

        on_stack.remove(&node);
        stack.pop();
        None
    }

    /// Compute a valid topological order, tie-broken by node insertion
    /// order (the order `index_of` was populated in, i.e. declaration
    /// order in the definition).
    ///
    /// # Errors
    /// Returns an error containing the offending cycle if one exists.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, Vec<BuildError>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .map_err(|_| {
                let cycle = self.detect_cycle().unwrap_or_default();
                vec![BuildError::CycleDetected { path: cycle }]
            })
    }

    /// All node ids known to the graph.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.index_of.keys()
    }
}

/// Find outgoing edges from `node_id` matching a predicate, in the order
/// they appear in the definition (declaration order matters for
/// first-match-wins switch semantics).
pub fn outgoing_edges<'a>(
    definition: &'a WorkflowDefinition,
    node_id: &NodeId,
) -> impl Iterator<Item = &'a Edge> {
    definition.edges.iter().filter(move |e| &e.source == node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{HandleType, NodeDefinition, NodeType};
    use pretty_assertions::assert_eq;

    fn linear_definition() -> WorkflowDefinition {
        let mut def = WorkflowDefinition::new("linear");
        def = def.with_node("a", NodeDefinition::new(NodeType::Input, "a"));
        def = def.with_node("b", NodeDefinition::new(NodeType::Transform, "b"));
        def = def.with_node("c", NodeDefinition::new(NodeType::Output, "c"));
        def = def.with_edge(Edge::new("e1", "a".into(), "b".into()));
        def = def.with_edge(Edge::new("e2", "b".into(), "c".into()));
        def
    }

    #[test]
    fn dependencies_and_dependents_are_one_hop() {
        let def = linear_definition();
        let graph = DependencyGraph::from_definition(&def).unwrap();
        assert_eq!(graph.dependencies(&"b".into()), vec![NodeId::from("a")]);
        assert_eq!(graph.dependents(&"b".into()), vec![NodeId::from("c")]);
        assert!(graph.dependencies(&"a".into()).is_empty());
        assert!(graph.dependents(&"c".into()).is_empty());
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let def = linear_definition();
        let graph = DependencyGraph::from_definition(&def).unwrap();
        let order = graph.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|n| n.as_str() == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn cycle_is_detected() {
        let mut def = linear_definition();
        def = def.with_edge(Edge::new("back", "c".into(), "a".into()));
        let graph = DependencyGraph::from_definition(&def).unwrap();
        assert!(graph.detect_cycle().is_some());
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn loop_back_edge_does_not_create_a_cycle() {
        let mut def = linear_definition();
        def = def.with_edge(
            Edge::new("back", "c".into(), "a".into()).with_handle_type(HandleType::LoopBack),
        );
        let graph = DependencyGraph::from_definition(&def).unwrap();
        assert!(graph.detect_cycle().is_none());
        // The loop-back edge contributes no dependency relationship.
        assert!(graph.dependencies(&"a".into()).is_empty());
    }

    #[test]
    fn dangling_edge_is_reported() {
        let mut def = linear_definition();
        def.edges.push(Edge::new("bad", "a".into(), "ghost".into()));
        let err = DependencyGraph::from_definition(&def).unwrap_err();
        assert!(matches!(err[0], BuildError::DanglingEdge { .. }));
    }
}
