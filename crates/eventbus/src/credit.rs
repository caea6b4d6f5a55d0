//! Credit accounting: the third Hooks trait. Lets an embedder gate
//! execution on a balance check and reconcile an estimate against
//! actual usage once a node (or the whole execution) finishes.

use async_trait::async_trait;
use loomwork_core::ExecutionId;
use uuid::Uuid;

/// A handle to a credit reservation, opaque to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CreditReservationId(Uuid);

impl CreditReservationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CreditReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CreditReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gate and reconcile credit spend around an execution.
///
/// Defaults to an open-gate, no-op ledger: [`Self::should_allow_execution`]
/// always returns `true`, and reservations are minted but never tracked.
/// An embedder that actually meters usage overrides all four methods
/// together — there's no meaningful "allow but never reserve" half-state.
#[async_trait]
pub trait CreditHooks: Send + Sync {
    /// Whether this execution is allowed to start at all (e.g. a
    /// tenant's balance is non-negative).
    async fn should_allow_execution(&self, _execution_id: &ExecutionId) -> bool {
        true
    }

    /// Reserve `estimate` credits ahead of running, returning a handle
    /// to reconcile later.
    async fn reserve_credits(&self, _execution_id: &ExecutionId, _estimate: u64) -> CreditReservationId {
        CreditReservationId::new()
    }

    /// Settle a reservation against the `actual` amount spent.
    async fn finalize_credits(&self, _reservation: &CreditReservationId, _actual: u64) {}

    /// Release a reservation without spending it (e.g. the execution
    /// never started).
    async fn release_credits(&self, _reservation: &CreditReservationId) {}
}

/// A [`CreditHooks`] that always allows execution and tracks nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCreditHooks;

impl CreditHooks for NoopCreditHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_hooks_always_allow_execution() {
        let hooks = NoopCreditHooks;
        let execution_id = ExecutionId::v4();
        assert!(hooks.should_allow_execution(&execution_id).await);
        let reservation = hooks.reserve_credits(&execution_id, 100).await;
        hooks.finalize_credits(&reservation, 80).await;
    }
}
