//! Read-only dashboard view handed to consumers

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::logic::scheduler::PollPhase;
use crate::logic::store::{DashboardState, FeedKind, FeedStatus};
use crate::logic::types::{
    AnomalousIp, AttackOriginEntry, AttackTimelinePoint, LogRecord, ThreatBand,
};

/// Point-in-time copy of a dashboard session.
///
/// Top-level `loading`, `error`, `polling_paused` and `consecutive_failures`
/// describe the primary log feed; every feed's own status is in `feeds`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub session_id: Uuid,
    pub revision: u64,

    pub logs: Vec<LogRecord>,
    pub last_seen_timestamp: Option<DateTime<Utc>>,
    pub loading: bool,
    pub error: Option<String>,
    pub polling_paused: bool,
    pub consecutive_failures: u32,
    pub last_update: Option<DateTime<Utc>>,

    pub anomalous_ips: Vec<AnomalousIp>,
    pub attack_timeline: Vec<AttackTimelinePoint>,
    pub attack_origins: Vec<AttackOriginEntry>,
    pub prevention_enabled: Option<bool>,

    pub feeds: BTreeMap<FeedKind, FeedStatus>,
    pub summary: DashboardSummary,
}

/// Values derived from the held data for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_logs: usize,
    /// Retained logs flagged by the detector
    pub attack_logs: usize,
    pub timeline_attacks: u64,
    pub peak_attacks: u64,
    pub peak_requests: u64,
    /// Anomalous IPs per threat band
    pub threat_bands: BTreeMap<ThreatBand, usize>,
}

impl DashboardSummary {
    pub fn derive(
        logs: &[LogRecord],
        anomalous_ips: &[AnomalousIp],
        timeline: &[AttackTimelinePoint],
    ) -> Self {
        let mut threat_bands = BTreeMap::new();
        for ip in anomalous_ips {
            *threat_bands.entry(ip.threat_band()).or_insert(0) += 1;
        }

        Self {
            total_logs: logs.len(),
            attack_logs: logs.iter().filter(|log| log.is_attack()).count(),
            timeline_attacks: timeline.iter().map(|p| p.attacks).fold(0, u64::saturating_add),
            peak_attacks: timeline.iter().map(|p| p.attacks).max().unwrap_or(0),
            peak_requests: timeline.iter().map(|p| p.total_requests).max().unwrap_or(0),
            threat_bands,
        }
    }
}

impl DashboardSnapshot {
    pub(crate) fn from_state(session_id: Uuid, revision: u64, state: &DashboardState) -> Self {
        let logs_status = state.feed_status(FeedKind::Logs);

        Self {
            session_id,
            revision,
            logs: state.retained_logs.clone(),
            last_seen_timestamp: state.last_seen_timestamp,
            loading: logs_status.loading,
            error: logs_status.error.clone(),
            polling_paused: logs_status.phase == PollPhase::Paused,
            consecutive_failures: logs_status.consecutive_failures,
            last_update: state.last_update,
            anomalous_ips: state.anomalous_ips.clone(),
            attack_timeline: state.attack_timeline.clone(),
            attack_origins: state.attack_origins.clone(),
            prevention_enabled: state.prevention_enabled,
            feeds: state.feed_statuses(),
            summary: DashboardSummary::derive(
                &state.retained_logs,
                &state.anomalous_ips,
                &state.attack_timeline,
            ),
        }
    }

    pub fn feed(&self, feed: FeedKind) -> Option<&FeedStatus> {
        self.feeds.get(&feed)
    }

    /// Any feed currently surfacing an error
    pub fn has_errors(&self) -> bool {
        self.feeds.values().any(|status| status.error.is_some())
    }
}
