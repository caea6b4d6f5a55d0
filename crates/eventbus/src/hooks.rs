//! [`Hooks`] bundles the three independently optional Hooks traits into
//! the one thing the scheduler is actually constructed with.

use std::sync::Arc;

use crate::credit::{CreditHooks, NoopCreditHooks};
use crate::event_hooks::{EventHooks, NoopEventHooks};
use crate::observability::{NoopObservabilityHooks, ObservabilityHooks};

/// The complete outbound interface the scheduler calls into around
/// every node dispatch and around the execution as a whole.
///
/// Each field defaults to a no-op implementation (see [`Self::default`]),
/// so an embedder overrides only what it needs via [`Self::with_observability`],
/// [`Self::with_events`] and [`Self::with_credits`].
#[derive(Clone)]
pub struct Hooks {
    pub observability: Arc<dyn ObservabilityHooks>,
    pub events: Arc<dyn EventHooks>,
    pub credits: Arc<dyn CreditHooks>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            observability: Arc::new(NoopObservabilityHooks),
            events: Arc::new(NoopEventHooks),
            credits: Arc::new(NoopCreditHooks),
        }
    }
}

impl Hooks {
    #[must_use]
    pub fn with_observability(mut self, hooks: Arc<dyn ObservabilityHooks>) -> Self {
        self.observability = hooks;
        self
    }

    #[must_use]
    pub fn with_events(mut self, hooks: Arc<dyn EventHooks>) -> Self {
        self.events = hooks;
        self
    }

    #[must_use]
    pub fn with_credits(mut self, hooks: Arc<dyn CreditHooks>) -> Self {
        self.credits = hooks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomwork_core::ExecutionId;

    #[tokio::test]
    async fn default_hooks_allow_execution_and_accept_callbacks() {
        let hooks = Hooks::default();
        assert!(hooks.credits.should_allow_execution(&ExecutionId::v4()).await);
        let span = hooks.observability.create_span("dispatch", None);
        hooks
            .observability
            .end_span(span, crate::observability::SpanStatus::Ok);
    }
}
