//! Logic Module - Polling & Reconciliation Engine
//!
//! ## Layout
//! - `sync/` - Transport, resilient fetcher, endpoint throttle, API client
//! - `reconcile` - Merge of incremental log batches
//! - `scheduler` - Per-feed poll state machine
//! - `store/` - Dashboard session: feed tasks and reconciled state
//! - `types` - Backend record types, normalized at the boundary

pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod timestamp_serde;
pub mod types;
