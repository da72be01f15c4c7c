//! WAF Dashboard Core
//!
//! Polls a WAF backend for request logs and threat aggregates, reconciles
//! incremental log batches into a bounded newest-first window, and exposes
//! the result as read-only snapshots.
//!
//! ```text
//! DashboardStore ──▶ feed task (x5) ──▶ PollScheduler
//!                         │
//!                         ▼
//!                    ApiClient ──▶ EndpointThrottle
//!                         │
//!                         ▼
//!                 ResilientFetcher ──▶ Transport (reqwest)
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod logic;

pub use api::{DashboardSnapshot, DashboardSummary};
pub use config::DashboardConfig;
pub use error::{ConfigError, DashboardError, FetchError};
pub use logic::reconcile::{DedupKey, LogReconciler, Reconciled};
pub use logic::scheduler::{PollPhase, PollScheduler, SchedulerPolicy};
pub use logic::store::{DashboardStore, FeedKind, FeedStatus};
pub use logic::sync::{
    decode_body, ApiClient, ApiRequest, EndpointThrottle, HttpMethod, HttpTransport, RawResponse,
    ResilientFetcher, RetryPolicy, Transport, TransportError,
};
pub use logic::telemetry::{AttemptEvent, AttemptOutcome, AttemptSink, MemorySink, TracingSink};
pub use logic::types::{
    AnalysisResult, AnomalousIp, AttackOriginEntry, AttackTimelinePoint, AttackType, LogRecord,
    OriginStats, PreventionMode, ThreatBand,
};
pub use logic::timestamp_serde::{format_timestamp, parse_timestamp};
