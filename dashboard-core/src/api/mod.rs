//! API Module
//!
//! What a dashboard session exposes to its consumers.

pub mod snapshot;

pub use snapshot::{DashboardSnapshot, DashboardSummary};
