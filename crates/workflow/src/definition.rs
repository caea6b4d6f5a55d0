//! The author-facing workflow definition: nodes, edges and metadata as
//! written (or generated) before the builder validates and compiles it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use loomwork_core::{NodeId, WorkflowId};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The closed set of node types a workflow definition may use.
///
/// An unrecognized type name fails the build rather than deserializing to
/// some fallback variant — callers get a build-time error naming the
/// offending node, not a silently-degraded workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Input,
    Output,
    Llm,
    Vision,
    ImageGeneration,
    Http,
    Database,
    Transform,
    Conditional,
    Switch,
    Loop,
    Merge,
    Code,
    Agent,
    Integration,
    Trigger,
    Echo,
}

impl NodeType {
    /// Whether this node type is one of the two valid entry-point types.
    #[must_use]
    pub fn is_valid_entry_point(self) -> bool {
        matches!(self, Self::Input | Self::Trigger)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Llm => "llm",
            Self::Vision => "vision",
            Self::ImageGeneration => "imageGeneration",
            Self::Http => "http",
            Self::Database => "database",
            Self::Transform => "transform",
            Self::Conditional => "conditional",
            Self::Switch => "switch",
            Self::Loop => "loop",
            Self::Merge => "merge",
            Self::Code => "code",
            Self::Agent => "agent",
            Self::Integration => "integration",
            Self::Trigger => "trigger",
            Self::Echo => "echo",
        };
        f.write_str(name)
    }
}

/// A single node as authored in a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Which of the closed node types this node is.
    pub node_type: NodeType,
    /// Human-readable display name.
    pub name: String,
    /// Node-type-specific configuration, resolved against templates at
    /// dispatch time.
    #[serde(default)]
    pub config: Value,
    /// Optional editor canvas position; carried through untouched.
    #[serde(default)]
    pub position: Option<(f64, f64)>,
}

impl NodeDefinition {
    /// Construct a node definition with empty config and no position.
    pub fn new(node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            node_type,
            name: name.into(),
            config: Value::Object(Map::new()),
            position: None,
        }
    }

    /// Attach configuration to this node definition.
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

/// The role an edge plays in routing — which branch, case, or loop phase it
/// belongs to. Exactly mirrors the closed `handleType` vocabulary from the
/// specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandleType {
    Default,
    True,
    False,
    LoopBody,
    LoopBack,
    LoopComplete,
    /// A literal or wildcard (`*`, `?`) switch-case value.
    Case(String),
}

impl HandleType {
    /// Whether this edge is a declared loop-back edge, excluded from
    /// ordinary dependency computation and cycle detection.
    #[must_use]
    pub fn is_loop_back(&self) -> bool {
        matches!(self, Self::LoopBack)
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique id for this edge within the definition.
    pub id: String,
    /// Upstream node id.
    pub source: NodeId,
    /// Downstream node id.
    pub target: NodeId,
    /// Optional named port on the source node.
    #[serde(default)]
    pub source_handle: Option<String>,
    /// Optional named port on the target node.
    #[serde(default)]
    pub target_handle: Option<String>,
    /// Which routing role this edge plays.
    #[serde(default = "default_handle_type")]
    pub handle_type: HandleType,
}

fn default_handle_type() -> HandleType {
    HandleType::Default
}

impl Edge {
    /// Construct a plain default-routed edge.
    pub fn new(id: impl Into<String>, source: NodeId, target: NodeId) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            source_handle: None,
            target_handle: None,
            handle_type: HandleType::Default,
        }
    }

    /// Attach a specific routing role to this edge.
    #[must_use]
    pub fn with_handle_type(mut self, handle_type: HandleType) -> Self {
        self.handle_type = handle_type;
        self
    }
}

/// Per-workflow execution tuning, separate from node-level config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on concurrently executing nodes. Defaults to 10.
    #[serde(default = "default_max_concurrent_nodes")]
    pub max_concurrent_nodes: usize,
}

fn default_max_concurrent_nodes() -> usize {
    10
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: default_max_concurrent_nodes(),
        }
    }
}

/// The complete, author-facing description of a workflow, before
/// validation and compilation by [`crate::builder::build`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Stable identifier for this workflow (distinct from any execution).
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Semantic version of this workflow definition.
    pub version: Version,
    /// Explicit entry point node id. If absent, the builder requires
    /// exactly one zero-dependency node of type `input` or `trigger`.
    #[serde(default)]
    pub entry_point: Option<NodeId>,
    /// All nodes, keyed by author-assigned id. Insertion order is
    /// preserved and used as the stable tie-break for same-depth nodes.
    pub nodes: IndexMap<NodeId, NodeDefinition>,
    /// All edges, in declaration order (significant for switch/conditional
    /// first-match semantics).
    pub edges: Vec<Edge>,
    /// Free-form variables available to templates as `${variables.x}`.
    #[serde(default)]
    pub variables: Map<String, Value>,
    /// Execution tuning for this workflow.
    #[serde(default)]
    pub config: WorkflowConfig,
    /// Free-form labels, carried through untouched.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Start building a new, empty workflow definition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::v4(),
            name: name.into(),
            description: None,
            version: Version::new(0, 1, 0),
            entry_point: None,
            nodes: IndexMap::new(),
            edges: Vec::new(),
            variables: Map::new(),
            config: WorkflowConfig::default(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a node to the definition, returning `self` for chaining.
    #[must_use]
    pub fn with_node(mut self, id: impl Into<NodeId>, node: NodeDefinition) -> Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Add an edge to the definition, returning `self` for chaining.
    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }
}
