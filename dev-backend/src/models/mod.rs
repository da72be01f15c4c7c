//! Fixture data models

pub mod analytics;
pub mod fault;
pub mod traffic;

pub use fault::{Fault, FaultPlan, QueueFault, MAX_QUEUED_FAULTS};
pub use traffic::{country_of, TrafficGenerator};
