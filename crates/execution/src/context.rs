//! The execution context: every node's output, the trigger input, the
//! workflow's variables, and any signals raised along the way.
//!
//! [`ContextSnapshot`] is immutable. Storing a new node's output doesn't
//! mutate the snapshot a dispatched node was handed — it produces a new
//! one, so a node running concurrently with another can't observe a
//! write that happened after it started.

use std::collections::HashMap;
use std::sync::Arc;

use loomwork_core::NodeId;
use loomwork_expression::PathResolver;
use serde_json::{Map, Value};

/// A point-in-time, read-only view of one execution's accumulated state.
///
/// Cloning is cheap: the three maps are reference-counted and only the
/// map actually being extended is copied, via [`Self::store_node_output`]
/// or [`Self::store_signal`].
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    trigger_input: Arc<Value>,
    variables: Arc<Map<String, Value>>,
    node_outputs: Arc<HashMap<NodeId, Value>>,
    signals: Arc<HashMap<String, Value>>,
}

impl ContextSnapshot {
    /// Build the initial snapshot for a new execution: no node has run
    /// yet, only the trigger input and the workflow's declared variables
    /// are available.
    #[must_use]
    pub fn new(trigger_input: Value, variables: Map<String, Value>) -> Self {
        Self {
            trigger_input: Arc::new(trigger_input),
            variables: Arc::new(variables),
            node_outputs: Arc::new(HashMap::new()),
            signals: Arc::new(HashMap::new()),
        }
    }

    /// The raw trigger input this execution started with.
    #[must_use]
    pub fn trigger_input(&self) -> &Value {
        &self.trigger_input
    }

    /// A previously stored node's output, if any.
    #[must_use]
    pub fn node_output(&self, node_id: &NodeId) -> Option<&Value> {
        self.node_outputs.get(node_id)
    }

    /// Return a new snapshot with `node_id`'s output recorded, leaving
    /// `self` untouched.
    #[must_use]
    pub fn store_node_output(&self, node_id: NodeId, output: Value) -> Self {
        let mut outputs = (*self.node_outputs).clone();
        outputs.insert(node_id, output);
        Self {
            trigger_input: Arc::clone(&self.trigger_input),
            variables: Arc::clone(&self.variables),
            node_outputs: Arc::new(outputs),
            signals: Arc::clone(&self.signals),
        }
    }

    /// Return a new snapshot with a named signal recorded (e.g. the
    /// selected branch of a conditional), leaving `self` untouched.
    #[must_use]
    pub fn store_signal(&self, name: impl Into<String>, value: Value) -> Self {
        let mut signals = (*self.signals).clone();
        signals.insert(name.into(), value);
        Self {
            trigger_input: Arc::clone(&self.trigger_input),
            variables: Arc::clone(&self.variables),
            node_outputs: Arc::clone(&self.node_outputs),
            signals: Arc::new(signals),
        }
    }

    /// Collect the recorded outputs of `output_node_ids`, keyed by node
    /// id, in the order given. Nodes that were skipped or never ran
    /// (and so have no recorded output) are omitted.
    #[must_use]
    pub fn build_final_outputs(&self, output_node_ids: &[NodeId]) -> HashMap<NodeId, Value> {
        output_node_ids
            .iter()
            .filter_map(|id| self.node_outputs.get(id).map(|v| (id.clone(), v.clone())))
            .collect()
    }
}

impl PathResolver for ContextSnapshot {
    /// Resolve a dotted template path against this snapshot.
    ///
    /// The first segment selects the namespace: `input` for the trigger
    /// payload, `variables` for the workflow's declared variables,
    /// `signals` for recorded signals, and anything else is treated as a
    /// node id whose recorded output is then walked by the remaining
    /// segments.
    fn resolve(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (path, None),
        };

        let root = match head {
            "input" => &*self.trigger_input,
            "variables" => {
                // `variables` as a whole is looked up like a JSON object,
                // so route straight through `loomwork_core::lookup_path`
                // on a owned Value view.
                return match rest {
                    Some(rest) => {
                        loomwork_core::lookup_path(&Value::Object((*self.variables).clone()), rest).cloned()
                    }
                    None => Some(Value::Object((*self.variables).clone())),
                };
            }
            "signals" => {
                return match rest {
                    Some(rest) => loomwork_core::lookup_path(
                        &Value::Object(self.signals.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
                        rest,
                    )
                    .cloned(),
                    None => Some(Value::Object(
                        self.signals.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    )),
                };
            }
            node_id => {
                let node_id = NodeId::new(node_id);
                let output = self.node_outputs.get(&node_id)?;
                return match rest {
                    Some(rest) => loomwork_core::lookup_path(output, rest).cloned(),
                    None => Some(output.clone()),
                };
            }
        };

        match rest {
            Some(rest) => loomwork_core::lookup_path(root, rest).cloned(),
            None => Some(root.clone()),
        }
    }
}
