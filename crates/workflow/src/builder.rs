//! The Workflow Builder (component A): validates a [`WorkflowDefinition`],
//! computes dependencies/depths, and produces a [`BuiltWorkflow`] or the
//! full list of structural problems found.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use loomwork_core::NodeId;
use tracing::instrument;

use crate::built::{BuiltWorkflow, ExecutableNode, LoopContext};
use crate::definition::{HandleType, NodeType, WorkflowDefinition};
use crate::error::BuildError;
use crate::graph::{outgoing_edges, DependencyGraph};

/// Validate and compile a workflow definition.
///
/// Collects every structural violation found rather than stopping at the
/// first one. On success, returns a [`BuiltWorkflow`] ready to be handed
/// to a scheduler.
#[instrument(skip_all, fields(workflow_id = %definition.id, node_count = definition.nodes.len()))]
pub fn build(definition: &WorkflowDefinition) -> Result<BuiltWorkflow, Vec<BuildError>> {
    let graph = DependencyGraph::from_definition(definition)?;

    let mut errors = Vec::new();

    let topo_order = match graph.topological_order() {
        Ok(order) => order,
        Err(cycle_errors) => return Err(cycle_errors),
    };

    let mut depths: HashMap<NodeId, usize> = HashMap::with_capacity(definition.nodes.len());
    for node_id in &topo_order {
        let deps = graph.dependencies(node_id);
        let depth = deps
            .iter()
            .map(|dep| depths.get(dep).copied().unwrap_or(0))
            .max()
            .map_or(0, |max_dep_depth| max_dep_depth + 1);
        depths.insert(node_id.clone(), depth);
    }

    let dependents: HashMap<NodeId, Vec<NodeId>> = definition
        .nodes
        .keys()
        .map(|id| (id.clone(), graph.dependents(id)))
        .collect();
    let dependencies: HashMap<NodeId, Vec<NodeId>> = definition
        .nodes
        .keys()
        .map(|id| (id.clone(), graph.dependencies(id)))
        .collect();

    validate_entry_point(definition, &dependencies, &mut errors);
    validate_conditionals(definition, &mut errors);
    validate_switches(definition, &mut errors);
    validate_merges(definition, &dependencies, &mut errors);

    let loop_contexts = build_loop_contexts(definition, &graph, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut execution_levels: Vec<Vec<NodeId>> = Vec::new();
    for node_id in definition.nodes.keys() {
        let depth = depths[node_id];
        if execution_levels.len() <= depth {
            execution_levels.resize_with(depth + 1, Vec::new);
        }
        execution_levels[depth].push(node_id.clone());
    }

    let nodes: IndexMap<NodeId, ExecutableNode> = definition
        .nodes
        .iter()
        .map(|(id, def)| {
            (
                id.clone(),
                ExecutableNode {
                    id: id.clone(),
                    node_type: def.node_type,
                    name: def.name.clone(),
                    config: def.config.clone(),
                    depth: depths[id],
                    dependencies: dependencies[id].clone(),
                    dependents: dependents[id].clone(),
                },
            )
        })
        .collect();

    let trigger_node_id = resolve_entry_point(definition, &dependencies)
        .expect("validated above; entry point resolution cannot fail here");

    let output_node_ids = definition
        .nodes
        .iter()
        .filter(|(id, def)| def.node_type == NodeType::Output || dependents[*id].is_empty())
        .map(|(id, _)| id.clone())
        .collect();

    let edges = definition
        .edges
        .iter()
        .map(|e| (e.id.clone(), e.clone()))
        .collect();

    Ok(BuiltWorkflow {
        nodes,
        edges,
        execution_levels,
        trigger_node_id,
        output_node_ids,
        loop_contexts,
        max_concurrent_nodes: definition.config.max_concurrent_nodes,
        created_at: chrono::Utc::now(),
    })
}

fn resolve_entry_point(
    definition: &WorkflowDefinition,
    dependencies: &HashMap<NodeId, Vec<NodeId>>,
) -> Option<NodeId> {
    if let Some(explicit) = &definition.entry_point {
        return Some(explicit.clone());
    }
    let zero_dep: Vec<&NodeId> = definition
        .nodes
        .keys()
        .filter(|id| dependencies.get(*id).map(Vec::len).unwrap_or(0) == 0)
        .collect();
    if zero_dep.len() == 1 {
        Some(zero_dep[0].clone())
    } else {
        None
    }
}

fn validate_entry_point(
    definition: &WorkflowDefinition,
    dependencies: &HashMap<NodeId, Vec<NodeId>>,
    errors: &mut Vec<BuildError>,
) {
    if let Some(explicit) = &definition.entry_point {
        match definition.nodes.get(explicit) {
            None => errors.push(BuildError::EntryPointNotFound {
                node_id: explicit.clone(),
            }),
            Some(def) if !def.node_type.is_valid_entry_point() => {
                errors.push(BuildError::EntryPointWrongType {
                    node_id: explicit.clone(),
                    found_type: def.node_type.to_string(),
                });
            }
            Some(_) => {}
        }
        return;
    }

    let zero_dep: Vec<&NodeId> = definition
        .nodes
        .keys()
        .filter(|id| dependencies.get(*id).map(Vec::len).unwrap_or(0) == 0)
        .collect();

    match zero_dep.as_slice() {
        [only] => {
            let def = &definition.nodes[*only];
            if !def.node_type.is_valid_entry_point() {
                errors.push(BuildError::EntryPointWrongType {
                    node_id: (*only).clone(),
                    found_type: def.node_type.to_string(),
                });
            }
        }
        other => errors.push(BuildError::NoEntryPoint { found: other.len() }),
    }
}

fn validate_conditionals(definition: &WorkflowDefinition, errors: &mut Vec<BuildError>) {
    for (node_id, def) in &definition.nodes {
        if def.node_type != NodeType::Conditional {
            continue;
        }
        let true_count = outgoing_edges(definition, node_id)
            .filter(|e| e.handle_type == HandleType::True)
            .count();
        let false_count = outgoing_edges(definition, node_id)
            .filter(|e| e.handle_type == HandleType::False)
            .count();
        if true_count > 1 {
            errors.push(BuildError::ConditionalTooManyBranches {
                node_id: node_id.clone(),
                branch: "true",
                count: true_count,
            });
        }
        if false_count > 1 {
            errors.push(BuildError::ConditionalTooManyBranches {
                node_id: node_id.clone(),
                branch: "false",
                count: false_count,
            });
        }
    }
}

fn validate_switches(definition: &WorkflowDefinition, errors: &mut Vec<BuildError>) {
    for (node_id, def) in &definition.nodes {
        if def.node_type != NodeType::Switch {
            continue;
        }
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut default_count = 0usize;
        for edge in outgoing_edges(definition, node_id) {
            match &edge.handle_type {
                HandleType::Case(value) => *counts.entry(value.clone()).or_insert(0) += 1,
                HandleType::Default => default_count += 1,
                _ => {}
            }
        }
        for (case, count) in counts {
            if count > 1 {
                errors.push(BuildError::SwitchDuplicateCase {
                    node_id: node_id.clone(),
                    case,
                    count,
                });
            }
        }
        if default_count > 1 {
            errors.push(BuildError::SwitchDuplicateCase {
                node_id: node_id.clone(),
                case: "default".to_string(),
                count: default_count,
            });
        }
    }
}

fn validate_merges(
    definition: &WorkflowDefinition,
    dependencies: &HashMap<NodeId, Vec<NodeId>>,
    errors: &mut Vec<BuildError>,
) {
    for (node_id, def) in &definition.nodes {
        if def.node_type != NodeType::Merge {
            continue;
        }
        let count = dependencies.get(node_id).map(Vec::len).unwrap_or(0);
        if count < 2 {
            errors.push(BuildError::MergeTooFewInbound {
                node_id: node_id.clone(),
                count,
            });
        }
    }
}

fn build_loop_contexts(
    definition: &WorkflowDefinition,
    graph: &DependencyGraph,
    errors: &mut Vec<BuildError>,
) -> HashMap<NodeId, LoopContext> {
    let mut contexts = HashMap::new();
    for (node_id, def) in &definition.nodes {
        if def.node_type != NodeType::Loop {
            continue;
        }

        let body_entry = outgoing_edges(definition, node_id)
            .find(|e| e.handle_type == HandleType::LoopBody)
            .map(|e| e.target.clone());
        let Some(body_entry) = body_entry else {
            errors.push(BuildError::LoopContextIncomplete {
                node_id: node_id.clone(),
                missing: "loop-body",
            });
            continue;
        };

        let back_edge_source = definition
            .edges
            .iter()
            .find(|e| e.target == *node_id && e.handle_type == HandleType::LoopBack)
            .map(|e| e.source.clone());
        let Some(back_edge_source) = back_edge_source else {
            errors.push(BuildError::LoopContextIncomplete {
                node_id: node_id.clone(),
                missing: "loop-back",
            });
            continue;
        };

        let complete_target = outgoing_edges(definition, node_id)
            .find(|e| e.handle_type == HandleType::LoopComplete)
            .map(|e| e.target.clone());

        let body_node_ids = collect_reachable(graph, &body_entry);

        contexts.insert(
            node_id.clone(),
            LoopContext {
                loop_node_id: node_id.clone(),
                body_entry,
                body_node_ids,
                back_edge_source,
                complete_target,
            },
        );
    }
    contexts
}

/// Breadth-first collection of every node reachable forward from `start`.
fn collect_reachable(graph: &DependencyGraph, start: &NodeId) -> Vec<NodeId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start.clone());
    visited.insert(start.clone());
    while let Some(node) = queue.pop_front() {
        order.push(node.clone());
        for next in graph.dependents(&node) {
            if visited.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    order
}
