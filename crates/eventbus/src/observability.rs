//! The observability half of the Hooks interface: span creation around
//! node dispatch, with no opinion on where spans actually go.

use uuid::Uuid;

/// A handle to an open span, opaque to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanRef(Uuid);

impl SpanRef {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpanRef {
    fn default() -> Self {
        Self::new()
    }
}

/// How a span ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error,
}

/// Tracing span lifecycle, called around every node dispatch and around
/// the execution as a whole.
///
/// A no-op default is provided via [`NoopObservabilityHooks`] so an
/// embedder that doesn't care about tracing wires nothing up at all.
pub trait ObservabilityHooks: Send + Sync {
    /// Open a new span, optionally nested under `parent`.
    fn create_span(&self, name: &str, parent: Option<SpanRef>) -> SpanRef;

    /// Close a span previously returned by [`Self::create_span`].
    fn end_span(&self, span: SpanRef, status: SpanStatus);
}

/// An [`ObservabilityHooks`] that mints span handles but records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObservabilityHooks;

impl ObservabilityHooks for NoopObservabilityHooks {
    fn create_span(&self, _name: &str, _parent: Option<SpanRef>) -> SpanRef {
        SpanRef::new()
    }

    fn end_span(&self, _span: SpanRef, _status: SpanStatus) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_hooks_mint_distinct_spans() {
        let hooks = NoopObservabilityHooks;
        let a = hooks.create_span("dispatch", None);
        let b = hooks.create_span("dispatch", Some(a));
        assert_ne!(a, b);
        hooks.end_span(b, SpanStatus::Ok);
    }
}
