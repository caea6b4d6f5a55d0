//! The trait a context (trigger inputs + node outputs + signals) must
//! implement to be used as the source of values for template resolution.

use serde_json::Value;

/// Resolves a dotted path (e.g. `"llm-1.text"`, `"input.userQuestion"`)
/// against whatever backs an execution — node outputs, trigger inputs,
/// signals, workflow variables. Implemented by
/// `loomwork_execution::ContextSnapshot`; kept as a trait here so the
/// template engine has no dependency on execution-state types.
pub trait PathResolver {
    /// Resolve `path`, returning `None` if any segment of it is missing.
    fn resolve(&self, path: &str) -> Option<Value>;
}

/// A resolver that always resolves to nothing; useful in tests and for
/// rendering static templates with no runtime context.
pub struct EmptyResolver;

impl PathResolver for EmptyResolver {
    fn resolve(&self, _path: &str) -> Option<Value> {
        None
    }
}
