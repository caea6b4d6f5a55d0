//! The successful half of a node handler's result: output, signals and
//! metrics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Out-of-band routing information a node handler can attach to its
/// output. The scheduler reads these to decide which sibling branches to
/// skip; they are never interpreted by the handler that produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signals(Map<String, Value>);

impl Signals {
    /// An empty signal set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the `selectedBranch` signal emitted by conditional nodes.
    #[must_use]
    pub fn with_selected_branch(mut self, branch: bool) -> Self {
        self.0.insert("selectedBranch".to_string(), Value::Bool(branch));
        self
    }

    /// Set the `selectedRoute` signal emitted by switch nodes.
    #[must_use]
    pub fn with_selected_route(mut self, route: impl Into<String>) -> Self {
        self.0
            .insert("selectedRoute".to_string(), Value::String(route.into()));
        self
    }

    /// Read back the `selectedBranch` signal, if set.
    #[must_use]
    pub fn selected_branch(&self) -> Option<bool> {
        self.0.get("selectedBranch").and_then(Value::as_bool)
    }

    /// Read back the `selectedRoute` signal, if set.
    #[must_use]
    pub fn selected_route(&self) -> Option<&str> {
        self.0.get("selectedRoute").and_then(Value::as_str)
    }

    /// Set an arbitrary named signal.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Read an arbitrary named signal.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// Execution metrics a node handler may report about its own run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Wall-clock duration of the handler call, in milliseconds.
    pub duration_ms: Option<u64>,
    /// Token usage, for LLM/vision/agent nodes.
    pub tokens: Option<u64>,
}

/// The successful result of a node handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutcome {
    /// The node's JSON output, stored against its id in the execution
    /// context for downstream nodes to read.
    pub output: Value,
    /// Routing signals for the scheduler.
    #[serde(default)]
    pub signals: Signals,
    /// Optional self-reported metrics.
    #[serde(default)]
    pub metrics: Option<NodeMetrics>,
}

impl NodeOutcome {
    /// An outcome with just an output and no signals or metrics.
    pub fn new(output: Value) -> Self {
        Self {
            output,
            signals: Signals::none(),
            metrics: None,
        }
    }

    /// Attach signals to this outcome.
    #[must_use]
    pub fn with_signals(mut self, signals: Signals) -> Self {
        self.signals = signals;
        self
    }

    /// Attach metrics to this outcome.
    #[must_use]
    pub fn with_metrics(mut self, metrics: NodeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
