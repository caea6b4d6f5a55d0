//! The outbound Hooks interface (§6): observability spans, lifecycle
//! events, and credit accounting — three small traits, each
//! independently optional, plus a broadcast [`EventBus`] that
//! implements [`EventHooks`] by fanning callbacks out to subscribers.

mod bus;
mod credit;
mod event_hooks;
mod hooks;
mod observability;

pub use bus::{Event, EventBus, EventSubscriber};
pub use credit::{CreditHooks, CreditReservationId, NoopCreditHooks};
pub use event_hooks::{EventContext, EventHooks, NoopEventHooks};
pub use hooks::Hooks;
pub use observability::{NoopObservabilityHooks, ObservabilityHooks, SpanRef, SpanStatus};
