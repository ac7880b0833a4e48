//! Spam detection and escalation.
//!
//! Three pieces, leaf-first: [`tracker::RateTracker`] turns a message
//! stream into decisions, [`escalation::EscalationController`] turns
//! decisions into sink actions (including the deferred unmute), and
//! [`coordinator::ModerationCoordinator`] is the single task that owns the
//! state and serializes everything.

pub mod coordinator;
pub mod escalation;
pub mod tracker;

pub use coordinator::{CoordinatorHandle, ModerationCoordinator, ModerationEvent};
pub use escalation::EscalationController;
pub use tracker::{Decision, RateTracker};
