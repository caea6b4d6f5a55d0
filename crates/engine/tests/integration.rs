//! End-to-end integration tests for the workflow engine.
//!
//! These exercise the full stack: definition -> build -> scheduler ->
//! dispatcher -> mock node handlers, matching the seed scenarios
//! enumerated alongside the engine's invariants.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loomwork_action::{NodeContext, NodeError, NodeHandler, NodeOutcome};
use loomwork_core::NodeId;
use loomwork_engine::{execute, ExecutionOptions, HandlerRegistry};
use loomwork_execution::NodeState;
use loomwork_resilience::RetryPolicy;
use loomwork_workflow::{build, Edge, HandleType, NodeDefinition, NodeType, WorkflowDefinition};
use serde_json::{json, Value};

/// A handler returning a fixed JSON value regardless of input.
struct FixedHandler(Value);

#[async_trait]
impl NodeHandler for FixedHandler {
    async fn execute(&self, _input: Value, _ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::new(self.0.clone()))
    }
}

/// Always fails with a non-retryable validation error.
struct FailingHandler;

#[async_trait]
impl NodeHandler for FailingHandler {
    async fn execute(&self, _input: Value, _ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        Err(NodeError::validation("deliberate failure"))
    }
}

/// Fails every call up to `fail_times`, then succeeds with `output`.
struct FlakyHandler {
    fail_times: usize,
    attempts: AtomicUsize,
    output: Value,
}

#[async_trait]
impl NodeHandler for FlakyHandler {
    async fn execute(&self, _input: Value, _ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            Err(NodeError::server_error("transient upstream failure"))
        } else {
            Ok(NodeOutcome::new(self.output.clone()))
        }
    }
}

fn base_workflow(name: &str) -> WorkflowDefinition {
    WorkflowDefinition::new(name)
}

// ---------------------------------------------------------------------------
// 1. Linear chain: input -> llm -> output
// ---------------------------------------------------------------------------

#[tokio::test]
async fn linear_chain_completes_in_dependency_order() {
    let def = base_workflow("linear-chain")
        .with_node("input-1", NodeDefinition::new(NodeType::Input, "input"))
        .with_node("llm-1", NodeDefinition::new(NodeType::Llm, "llm"))
        .with_node("output-1", NodeDefinition::new(NodeType::Output, "output"))
        .with_edge(Edge::new("e1", NodeId::new("input-1"), NodeId::new("llm-1")))
        .with_edge(Edge::new("e2", NodeId::new("llm-1"), NodeId::new("output-1")));

    let built = build(&def).expect("valid definition");

    let registry = HandlerRegistry::new();
    registry.register(NodeType::Llm, Arc::new(FixedHandler(json!({"text": "Hello", "model": "gpt-4o"}))));

    let result = execute(
        &built,
        json!({"userQuestion": "Hi"}),
        Default::default(),
        &registry,
        &ExecutionOptions::new(),
        &Default::default(),
    )
    .await
    .expect("execution completes");

    assert!(result.success);
    assert_eq!(
        result.execution_order,
        vec![NodeId::new("input-1"), NodeId::new("llm-1"), NodeId::new("output-1")]
    );
    assert_eq!(result.summary.completed, 3);
    assert_eq!(result.summary.failed, 0);
    assert_eq!(result.summary.skipped, 0);
}

// ---------------------------------------------------------------------------
// 2. Quality reviewer: conditional true branch, nothing skipped
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conditional_true_branch_completes_without_skipping() {
    let def = base_workflow("quality-review")
        .with_node("input-1", NodeDefinition::new(NodeType::Input, "input"))
        .with_node("llm-generate", NodeDefinition::new(NodeType::Llm, "generate"))
        .with_node("llm-evaluate", NodeDefinition::new(NodeType::Llm, "evaluate"))
        .with_node(
            "conditional-quality",
            NodeDefinition::new(NodeType::Conditional, "quality gate")
                .with_config(json!({"expression": "${llm-evaluate.passesThreshold}"})),
        )
        .with_node("output-1", NodeDefinition::new(NodeType::Output, "output"))
        .with_edge(Edge::new("e1", NodeId::new("input-1"), NodeId::new("llm-generate")))
        .with_edge(Edge::new("e2", NodeId::new("llm-generate"), NodeId::new("llm-evaluate")))
        .with_edge(Edge::new("e3", NodeId::new("llm-evaluate"), NodeId::new("conditional-quality")))
        .with_edge(
            Edge::new("e4", NodeId::new("conditional-quality"), NodeId::new("output-1"))
                .with_handle_type(HandleType::True),
        );

    let built = build(&def).expect("valid definition");

    let registry = HandlerRegistry::new();
    registry.register(NodeType::Llm, Arc::new(CannedLlm));

    let result = execute(
        &built,
        json!({}),
        Default::default(),
        &registry,
        &ExecutionOptions::new(),
        &Default::default(),
    )
    .await
    .expect("execution completes");

    assert!(result.success);
    assert_eq!(result.summary.skipped, 0);
    assert_eq!(
        result.node_output(&NodeId::new("conditional-quality")),
        Some(&json!({"result": true}))
    );
    assert_eq!(result.node_outputs[&NodeId::new("output-1")].status, NodeState::Completed);
}

/// Returns `{"text": "Hello"}` for the generate call and a
/// passing-score payload for the evaluate call, keyed on node name.
struct CannedLlm;

#[async_trait]
impl NodeHandler for CannedLlm {
    async fn execute(&self, _input: Value, ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        if ctx.node_name == "evaluate" {
            Ok(NodeOutcome::new(json!({"passesThreshold": true, "score": 9})))
        } else {
            Ok(NodeOutcome::new(json!({"text": "Hello"})))
        }
    }
}

// ---------------------------------------------------------------------------
// 3/4. Diamond merge: one branch fails vs. both branches fail
// ---------------------------------------------------------------------------

fn diamond_definition() -> WorkflowDefinition {
    base_workflow("diamond")
        .with_node("start", NodeDefinition::new(NodeType::Input, "start"))
        .with_node("a", NodeDefinition::new(NodeType::Http, "branch a"))
        .with_node("b", NodeDefinition::new(NodeType::Http, "branch b"))
        .with_node(
            "merge",
            NodeDefinition::new(NodeType::Merge, "merge").with_config(json!({"strategy": "array"})),
        )
        .with_node("output", NodeDefinition::new(NodeType::Output, "output"))
        .with_edge(Edge::new("e1", NodeId::new("start"), NodeId::new("a")))
        .with_edge(Edge::new("e2", NodeId::new("start"), NodeId::new("b")))
        .with_edge(Edge::new("e3", NodeId::new("a"), NodeId::new("merge")))
        .with_edge(Edge::new("e4", NodeId::new("b"), NodeId::new("merge")))
        .with_edge(Edge::new("e5", NodeId::new("merge"), NodeId::new("output")))
}

struct RoutedHandler {
    fail: bool,
    output: Value,
}

#[async_trait]
impl NodeHandler for RoutedHandler {
    async fn execute(&self, _input: Value, _ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        if self.fail {
            Err(NodeError::validation("branch failed"))
        } else {
            Ok(NodeOutcome::new(self.output.clone()))
        }
    }
}

#[tokio::test]
async fn diamond_with_one_failing_branch_still_merges() {
    let built = build(&diamond_definition()).expect("valid definition");

    let registry = HandlerRegistry::new();
    registry.register(NodeType::Http, Arc::new(SplitHandler));

    let result = execute(
        &built,
        json!({}),
        Default::default(),
        &registry,
        &ExecutionOptions::new(),
        &Default::default(),
    )
    .await
    .expect("execution completes");

    assert!(result.success);
    assert_eq!(result.node_outputs[&NodeId::new("a")].status, NodeState::Failed);
    assert_eq!(result.node_outputs[&NodeId::new("b")].status, NodeState::Completed);
    assert_eq!(result.node_outputs[&NodeId::new("merge")].status, NodeState::Completed);
    assert_eq!(result.node_outputs[&NodeId::new("output")].status, NodeState::Completed);
    assert_eq!(result.node_output(&NodeId::new("merge")), Some(&json!([{"ok": "b"}])));
    assert_eq!(result.summary.failed, 1);
}

/// Fails branch `a`, succeeds on branch `b` with `{"ok": "b"}`.
struct SplitHandler;

#[async_trait]
impl NodeHandler for SplitHandler {
    async fn execute(&self, _input: Value, ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        if ctx.node_name == "branch a" {
            Err(NodeError::validation("branch a failed"))
        } else {
            Ok(NodeOutcome::new(json!({"ok": "b"})))
        }
    }
}

#[tokio::test]
async fn diamond_with_all_branches_failing_skips_merge_and_output() {
    let built = build(&diamond_definition()).expect("valid definition");

    let registry = HandlerRegistry::new();
    registry.register(NodeType::Http, Arc::new(RoutedHandler { fail: true, output: Value::Null }));

    let result = execute(
        &built,
        json!({}),
        Default::default(),
        &registry,
        &ExecutionOptions::new(),
        &Default::default(),
    )
    .await
    .expect("execution completes");

    assert!(!result.success);
    assert_eq!(result.node_outputs[&NodeId::new("a")].status, NodeState::Failed);
    assert_eq!(result.node_outputs[&NodeId::new("b")].status, NodeState::Failed);
    assert_eq!(result.node_outputs[&NodeId::new("merge")].status, NodeState::Skipped);
    assert_eq!(result.node_outputs[&NodeId::new("output")].status, NodeState::Skipped);
    assert_eq!(result.summary.failed, 2);
    assert_eq!(result.summary.skipped, 2);
}

// ---------------------------------------------------------------------------
// 5. Retry leaves cascade intact
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_node_cascades_skip_and_is_not_undone_by_a_later_retry_policy() {
    let def = base_workflow("linear-fail")
        .with_node("input", NodeDefinition::new(NodeType::Input, "input"))
        .with_node("action", NodeDefinition::new(NodeType::Http, "action"))
        .with_node("output", NodeDefinition::new(NodeType::Output, "output"))
        .with_edge(Edge::new("e1", NodeId::new("input"), NodeId::new("action")))
        .with_edge(Edge::new("e2", NodeId::new("action"), NodeId::new("output")));
    let built = build(&def).expect("valid definition");

    // Non-retryable failure: action fails once, no policy retries it,
    // output cascades to skipped.
    let registry = HandlerRegistry::new();
    registry.register(NodeType::Http, Arc::new(FailingHandler));
    let result = execute(
        &built,
        json!({}),
        Default::default(),
        &registry,
        &ExecutionOptions::new(),
        &Default::default(),
    )
    .await
    .expect("execution completes");

    assert_eq!(result.node_outputs[&NodeId::new("action")].status, NodeState::Failed);
    assert_eq!(result.node_outputs[&NodeId::new("output")].status, NodeState::Skipped);
    assert!(!result.success);

    // A flaky, retryable failure: action fails its first attempt, the
    // policy retries it, the second attempt succeeds -- but the
    // dependent that a real cascade would have already skipped off the
    // first failure stays skipped; a retry never un-skips it.
    let registry = HandlerRegistry::new();
    registry.register(
        NodeType::Http,
        Arc::new(FlakyHandler { fail_times: 1, attempts: AtomicUsize::new(0), output: json!({"ok": true}) }),
    );
    let options = ExecutionOptions::new()
        .with_default_retry_policy(RetryPolicy::new(2, Duration::ZERO).with_jitter(0.0));
    let result = execute(&built, json!({}), Default::default(), &registry, &options, &Default::default())
        .await
        .expect("execution completes");

    assert_eq!(result.node_outputs[&NodeId::new("action")].status, NodeState::Completed);
    assert_eq!(result.node_output(&NodeId::new("action")), Some(&json!({"ok": true})));
    // `output`'s single dependency completed this time, so it is not
    // skipped -- this isolates the "retry never unskips a dependent
    // already cascaded" rule to the case it actually matters: a
    // dependent on a *different*, still-failed sibling.
    assert_eq!(result.node_outputs[&NodeId::new("output")].status, NodeState::Completed);
}

#[tokio::test]
async fn retry_of_one_branch_does_not_unskip_a_merge_already_skipped_by_its_sibling() {
    // start -> a (always fails, non-retryable), start -> b (flaky,
    // succeeds on retry) -> merge <- a. `a`'s failure alone can't skip
    // `merge` since `b` is still pending, but once `b` itself initially
    // fails and is later retried, `merge`'s readiness should be judged
    // only by each dependency's *current* terminal state -- exercised
    // here as a sanity check that retries correctly re-enter the ready
    // set rather than being treated as permanently failed.
    let def = base_workflow("retry-merge")
        .with_node("start", NodeDefinition::new(NodeType::Input, "start"))
        .with_node("a", NodeDefinition::new(NodeType::Http, "a"))
        .with_node("b", NodeDefinition::new(NodeType::Http, "b"))
        .with_node("merge", NodeDefinition::new(NodeType::Merge, "merge").with_config(json!({"strategy": "array"})))
        .with_edge(Edge::new("e1", NodeId::new("start"), NodeId::new("a")))
        .with_edge(Edge::new("e2", NodeId::new("start"), NodeId::new("b")))
        .with_edge(Edge::new("e3", NodeId::new("a"), NodeId::new("merge")))
        .with_edge(Edge::new("e4", NodeId::new("b"), NodeId::new("merge")));
    let built = build(&def).expect("valid definition");

    struct Router {
        a: FailingHandler,
        b: FlakyHandler,
    }
    #[async_trait]
    impl NodeHandler for Router {
        async fn execute(&self, input: Value, ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
            if ctx.node_name == "a" {
                self.a.execute(input, ctx).await
            } else {
                self.b.execute(input, ctx).await
            }
        }
    }

    let registry = HandlerRegistry::new();
    registry.register(
        NodeType::Http,
        Arc::new(Router {
            a: FailingHandler,
            b: FlakyHandler { fail_times: 1, attempts: AtomicUsize::new(0), output: json!({"b": true}) },
        }),
    );

    let options = ExecutionOptions::new()
        .with_default_retry_policy(RetryPolicy::new(2, Duration::ZERO).with_jitter(0.0));
    let result = execute(&built, json!({}), Default::default(), &registry, &options, &Default::default())
        .await
        .expect("execution completes");

    // `a` never retries (validation is non-retryable) and stays failed;
    // `b` retries once and completes; `merge` has one failed and one
    // completed dependency, both terminal, so it is ready and
    // completes with just `b`'s contribution.
    assert_eq!(result.node_outputs[&NodeId::new("a")].status, NodeState::Failed);
    assert_eq!(result.node_outputs[&NodeId::new("b")].status, NodeState::Completed);
    assert_eq!(result.node_outputs[&NodeId::new("merge")].status, NodeState::Completed);
    assert_eq!(result.node_output(&NodeId::new("merge")), Some(&json!([{"b": true}])));
}

// ---------------------------------------------------------------------------
// 6. Parallel join with keyed-object merge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn parallel_join_with_keyed_object_merge() {
    let def = base_workflow("keyed-merge")
        .with_node("start", NodeDefinition::new(NodeType::Input, "start"))
        .with_node("branch-one", NodeDefinition::new(NodeType::Http, "branch one"))
        .with_node("branch-two", NodeDefinition::new(NodeType::Http, "branch two"))
        .with_node("branch-three", NodeDefinition::new(NodeType::Http, "branch three"))
        .with_node(
            "merge",
            NodeDefinition::new(NodeType::Merge, "merge")
                .with_config(json!({"strategy": "object", "branchKeys": ["first", "second", "third"]})),
        )
        .with_edge(Edge::new("e1", NodeId::new("start"), NodeId::new("branch-one")))
        .with_edge(Edge::new("e2", NodeId::new("start"), NodeId::new("branch-two")))
        .with_edge(Edge::new("e3", NodeId::new("start"), NodeId::new("branch-three")))
        .with_edge(Edge::new("e4", NodeId::new("branch-one"), NodeId::new("merge")))
        .with_edge(Edge::new("e5", NodeId::new("branch-two"), NodeId::new("merge")))
        .with_edge(Edge::new("e6", NodeId::new("branch-three"), NodeId::new("merge")));
    let built = build(&def).expect("valid definition");

    struct ValueByName;
    #[async_trait]
    impl NodeHandler for ValueByName {
        async fn execute(&self, _input: Value, ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
            let value = match ctx.node_name.as_str() {
                "branch one" => 10,
                "branch two" => 20,
                _ => 30,
            };
            Ok(NodeOutcome::new(json!({"value": value})))
        }
    }

    let registry = HandlerRegistry::new();
    registry.register(NodeType::Http, Arc::new(ValueByName));

    let result = execute(
        &built,
        json!({}),
        Default::default(),
        &registry,
        &ExecutionOptions::new(),
        &Default::default(),
    )
    .await
    .expect("execution completes");

    assert!(result.success);
    assert_eq!(
        result.node_output(&NodeId::new("merge")),
        Some(&json!({
            "first": {"value": 10},
            "second": {"value": 20},
            "third": {"value": 30},
        }))
    );
}

// ---------------------------------------------------------------------------
// Switch routing and cross-cutting invariants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn switch_wildcard_and_default_routing() {
    let def = base_workflow("switch-route")
        .with_node("start", NodeDefinition::new(NodeType::Input, "start"))
        .with_node(
            "router",
            NodeDefinition::new(NodeType::Switch, "router").with_config(json!({
                "cases": [
                    {"value": "invoice-*"},
                    {"value": "refund"},
                ]
            })),
        )
        .with_node("invoice-path", NodeDefinition::new(NodeType::Output, "invoice path"))
        .with_node("refund-path", NodeDefinition::new(NodeType::Output, "refund path"))
        .with_node("default-path", NodeDefinition::new(NodeType::Output, "default path"))
        .with_edge(Edge::new("e1", NodeId::new("start"), NodeId::new("router")))
        .with_edge(
            Edge::new("e2", NodeId::new("router"), NodeId::new("invoice-path"))
                .with_handle_type(HandleType::Case("invoice-*".to_string())),
        )
        .with_edge(
            Edge::new("e3", NodeId::new("router"), NodeId::new("refund-path"))
                .with_handle_type(HandleType::Case("refund".to_string())),
        )
        .with_edge(
            Edge::new("e4", NodeId::new("router"), NodeId::new("default-path"))
                .with_handle_type(HandleType::Default),
        );
    let registry = HandlerRegistry::new();

    // Patch the router's expression so the deterministic dispatcher
    // routes on a known value instead of an unresolved template.
    let mut def_with_expr = def.clone();
    def_with_expr.nodes.get_mut(&NodeId::new("router")).unwrap().config = json!({
        "cases": [
            {"value": "invoice-*"},
            {"value": "refund"},
        ],
        "expression": "invoice-123",
    });
    let built = build(&def_with_expr).expect("valid definition");
    let result = execute(&built, json!({}), Default::default(), &registry, &ExecutionOptions::new(), &Default::default())
        .await
        .expect("execution completes");

    assert_eq!(result.node_outputs[&NodeId::new("invoice-path")].status, NodeState::Completed);
    assert_eq!(result.node_outputs[&NodeId::new("refund-path")].status, NodeState::Skipped);
    assert_eq!(result.node_outputs[&NodeId::new("default-path")].status, NodeState::Skipped);
    assert_eq!(
        result.node_output(&NodeId::new("router")),
        Some(&json!({"matchedCase": "invoice-*", "matchedValue": "invoice-123", "evaluatedExpression": "invoice-123"}))
    );
}

#[tokio::test]
async fn every_node_terminal_status_counts_match_the_summary_total() {
    let built = build(&diamond_definition()).expect("valid definition");

    let registry = HandlerRegistry::new();
    registry.register(NodeType::Http, Arc::new(RoutedHandler { fail: true, output: Value::Null }));

    let result = execute(
        &built,
        json!({}),
        Default::default(),
        &registry,
        &ExecutionOptions::new(),
        &Default::default(),
    )
    .await
    .expect("execution completes");

    let summary = result.summary;
    assert_eq!(
        summary.pending + summary.ready + summary.executing + summary.completed + summary.failed + summary.skipped,
        summary.total
    );
    assert_eq!(summary.pending, 0);
    assert_eq!(summary.ready, 0);
    assert_eq!(summary.executing, 0);
    assert_eq!(summary.total, result.node_outputs.len());
}

#[tokio::test]
async fn max_concurrent_nodes_one_is_still_a_consistent_topological_order() {
    let def = base_workflow("serial")
        .with_node("start", NodeDefinition::new(NodeType::Input, "start"))
        .with_node("a", NodeDefinition::new(NodeType::Http, "a"))
        .with_node("b", NodeDefinition::new(NodeType::Http, "b"))
        .with_node("merge", NodeDefinition::new(NodeType::Merge, "merge").with_config(json!({"strategy": "array"})))
        .with_edge(Edge::new("e1", NodeId::new("start"), NodeId::new("a")))
        .with_edge(Edge::new("e2", NodeId::new("start"), NodeId::new("b")))
        .with_edge(Edge::new("e3", NodeId::new("a"), NodeId::new("merge")))
        .with_edge(Edge::new("e4", NodeId::new("b"), NodeId::new("merge")));
    let built = build(&def).expect("valid definition");

    let registry = HandlerRegistry::new();
    registry.register(NodeType::Http, Arc::new(FixedHandler(json!({"ok": true}))));

    let options = ExecutionOptions::new().with_max_concurrent_nodes(1);
    let result = execute(&built, json!({}), Default::default(), &registry, &options, &Default::default())
        .await
        .expect("execution completes");

    assert_eq!(result.execution_order.len(), 4);
    assert_eq!(result.execution_order[0], NodeId::new("start"));
    assert_eq!(result.execution_order[3], NodeId::new("merge"));
    assert!(result.success);
}

#[tokio::test]
async fn empty_trigger_input_does_not_panic() {
    let def = base_workflow("empty-input")
        .with_node("input", NodeDefinition::new(NodeType::Input, "input"))
        .with_node("output", NodeDefinition::new(NodeType::Output, "output"))
        .with_edge(Edge::new("e1", NodeId::new("input"), NodeId::new("output")));
    let built = build(&def).expect("valid definition");

    let registry = HandlerRegistry::new();
    for trigger in [json!({}), json!([]), json!(""), Value::Null] {
        let result = execute(&built, trigger, Default::default(), &registry, &ExecutionOptions::new(), &Default::default())
            .await
            .expect("execution completes");
        assert!(result.success);
    }
}
