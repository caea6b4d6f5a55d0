//! Retry policies and backoff computation (component of §4.E/§4.F),
//! shared by the scheduler's node-retry path and the agent tool loop.

mod decision;
mod policy;

pub use decision::should_retry;
pub use policy::{BackoffKind, RetryPolicy};
