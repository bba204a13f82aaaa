//! Application layer driving a payment from submission to a terminal outcome.
//!
//! `PaymentPoller` spawns one tokio task per payment. Each task owns its timers
//! and races status checks against a deadline and an owner cancellation
//! signal; a `ResolutionGuard` makes sure exactly one terminal path applies.

pub mod guard;
pub mod poller;
