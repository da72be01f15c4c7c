//! Store state
//!
//! Everything a dashboard session holds between polls. Mutated only by
//! `StoreInner::complete`; consumers get cloned snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::logic::scheduler::{PollPhase, PollScheduler};
use crate::logic::types::{AnomalousIp, AttackOriginEntry, AttackTimelinePoint, LogRecord};

/// One independently polled backend resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Logs,
    AnomalousIps,
    AttackTimeline,
    AttackOrigins,
    PreventionMode,
}

impl FeedKind {
    pub const ALL: [FeedKind; 5] = [
        FeedKind::Logs,
        FeedKind::AnomalousIps,
        FeedKind::AttackTimeline,
        FeedKind::AttackOrigins,
        FeedKind::PreventionMode,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::AnomalousIps => "anomalous-ips",
            Self::AttackTimeline => "attack-timeline",
            Self::AttackOrigins => "attack-origins",
            Self::PreventionMode => "prevention-mode",
        }
    }

    /// The primary feed polls on the fast cadence
    pub fn is_primary(&self) -> bool {
        *self == Self::Logs
    }
}

/// Poll health of one feed, as shown to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    pub phase: PollPhase,
    pub loading: bool,
    pub error: Option<String>,
    pub consecutive_failures: u32,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self {
            phase: PollPhase::Idle,
            loading: true,
            error: None,
            consecutive_failures: 0,
            last_update: None,
        }
    }
}

/// Status plus the sequence numbers that order responses
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedSlot {
    pub status: FeedStatus,
    /// Last sequence number handed to a request
    pub issued_seq: u64,
    /// Sequence number of the newest response applied
    pub applied_seq: u64,
}

impl FeedSlot {
    pub fn sync_schedule(&mut self, scheduler: &PollScheduler) {
        self.status.phase = scheduler.phase();
        self.status.consecutive_failures = scheduler.consecutive_failures();
    }
}

/// Successful result of one feed poll
#[derive(Debug, Clone)]
pub(crate) enum FeedPayload {
    Logs {
        batch: Vec<LogRecord>,
        /// Cursor the request was made with (`None` = full reload)
        cursor: Option<DateTime<Utc>>,
    },
    AnomalousIps(Vec<AnomalousIp>),
    AttackTimeline(Vec<AttackTimelinePoint>),
    AttackOrigins(Vec<AttackOriginEntry>),
    PreventionMode(bool),
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Newest first, capacity-bounded
    pub retained_logs: Vec<LogRecord>,
    /// Incremental "since" cursor
    pub last_seen_timestamp: Option<DateTime<Utc>>,
    /// Last successful log reconciliation
    pub last_update: Option<DateTime<Utc>>,
    pub anomalous_ips: Vec<AnomalousIp>,
    pub attack_timeline: Vec<AttackTimelinePoint>,
    pub attack_origins: Vec<AttackOriginEntry>,
    pub prevention_enabled: Option<bool>,
    pub(crate) feeds: BTreeMap<FeedKind, FeedSlot>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            retained_logs: Vec::new(),
            last_seen_timestamp: None,
            last_update: None,
            anomalous_ips: Vec::new(),
            attack_timeline: Vec::new(),
            attack_origins: Vec::new(),
            prevention_enabled: None,
            feeds: FeedKind::ALL.iter().map(|k| (*k, FeedSlot::default())).collect(),
        }
    }
}

impl DashboardState {
    pub(crate) fn slot_mut(&mut self, feed: FeedKind) -> &mut FeedSlot {
        self.feeds.entry(feed).or_default()
    }

    pub fn feed_status(&self, feed: FeedKind) -> FeedStatus {
        self.feeds
            .get(&feed)
            .map(|slot| slot.status.clone())
            .unwrap_or_default()
    }

    pub fn feed_statuses(&self) -> BTreeMap<FeedKind, FeedStatus> {
        self.feeds
            .iter()
            .map(|(kind, slot)| (*kind, slot.status.clone()))
            .collect()
    }
}
