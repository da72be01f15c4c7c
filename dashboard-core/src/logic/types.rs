//! Backend record types
//!
//! Wire shapes of the dashboard API (snake_case JSON). Validation and
//! coercion happen here, once, at the fetch boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::timestamp_serde;

// ============================================================================
// LOGS
// ============================================================================

/// One observed HTTP request event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(with = "timestamp_serde")]
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub ip: String,
    #[serde(default)]
    pub analysis_result: AnalysisResult,
}

impl LogRecord {
    pub fn is_attack(&self) -> bool {
        self.analysis_result.injection_detected
    }
}

/// Verdict attached to a log record by the backend analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub injection_detected: bool,
    #[serde(default)]
    pub matched_rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// ANOMALOUS IPS
// ============================================================================

/// Aggregate per source IP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalousIp {
    pub ip: String,
    /// 0-100 risk score
    pub threat_level: f64,
    pub total_requests: u64,
    pub anomalous_requests: u64,
    #[serde(with = "timestamp_serde")]
    pub last_detected: DateTime<Utc>,
    #[serde(default)]
    pub matched_rules: Vec<String>,
}

impl AnomalousIp {
    /// Clamp values the backend occasionally gets wrong
    pub fn normalize(mut self) -> Self {
        self.threat_level = if self.threat_level.is_finite() {
            self.threat_level.clamp(0.0, 100.0)
        } else {
            0.0
        };

        if self.anomalous_requests > self.total_requests {
            tracing::warn!(
                ip = %self.ip,
                anomalous = self.anomalous_requests,
                total = self.total_requests,
                "anomalous_requests exceeds total_requests, clamping"
            );
            self.anomalous_requests = self.total_requests;
        }
        self
    }

    pub fn threat_band(&self) -> ThreatBand {
        ThreatBand::from_level(self.threat_level)
    }
}

/// Coarse risk bucket of a threat score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatBand {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatBand {
    pub fn from_level(level: f64) -> Self {
        if level >= 75.0 {
            Self::Critical
        } else if level >= 50.0 {
            Self::High
        } else if level >= 25.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

// ============================================================================
// ATTACK TIMELINE
// ============================================================================

/// One bucket of the attack timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTimelinePoint {
    /// Bucket start
    #[serde(with = "timestamp_serde")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub attacks: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_requests: u64,
}

/// Sort timeline buckets oldest first
pub fn order_timeline(mut points: Vec<AttackTimelinePoint>) -> Vec<AttackTimelinePoint> {
    points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    points
}

/// Accept any JSON value as a count; negative, non-finite or non-numeric become 0
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_count(&value))
}

pub(crate) fn coerce_count(value: &Value) -> u64 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n > 0.0 => n.floor() as u64,
        _ => 0,
    }
}

// ============================================================================
// ATTACK ORIGINS
// ============================================================================

/// Per-country aggregate
///
/// `country` is whatever identifier the backend emits (ISO code or name);
/// it is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOriginEntry {
    pub country: String,
    #[serde(flatten)]
    pub stats: OriginStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginStats {
    #[serde(default)]
    pub attack_count: u64,
    #[serde(default)]
    pub unique_ips: u64,
    #[serde(with = "timestamp_serde")]
    pub last_attack: DateTime<Utc>,
    #[serde(default)]
    pub top_attack_types: Vec<AttackType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackType {
    pub rule: String,
    pub count: u64,
}

/// Attack origins arrive either as a list or keyed by country
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OriginsPayload {
    List(Vec<AttackOriginEntry>),
    Keyed(BTreeMap<String, OriginStats>),
}

impl OriginsPayload {
    /// Flatten into a list, busiest country first
    pub fn into_entries(self) -> Vec<AttackOriginEntry> {
        let mut entries = match self {
            Self::List(list) => list,
            Self::Keyed(map) => map
                .into_iter()
                .map(|(country, stats)| AttackOriginEntry { country, stats })
                .collect(),
        };

        entries.sort_by(|a, b| {
            b.stats
                .attack_count
                .cmp(&a.stats.attack_count)
                .then_with(|| a.country.cmp(&b.country))
        });
        entries
    }
}

// ============================================================================
// PREVENTION MODE
// ============================================================================

/// Blocking-vs-logging flag of the backend WAF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreventionMode {
    pub enabled: bool,
}
