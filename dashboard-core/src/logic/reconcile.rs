//! Log Reconciler
//!
//! Merges a freshly fetched batch of log records into the retained set:
//! de-duplicate, newest first, keep at most `capacity` records, and advance
//! the "since" watermark used for the next incremental fetch.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::LogRecord;
use crate::constants::DEFAULT_LOG_CAPACITY;

/// Identity used to decide whether two records are the same event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupKey {
    /// Records with equal timestamps are the same event.
    /// Lossy when the backend's clock granularity is coarse.
    #[default]
    Timestamp,
    /// Timestamp plus ip, method, path and query
    Composite,
}

impl FromStr for DedupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timestamp" => Ok(Self::Timestamp),
            "composite" => Ok(Self::Composite),
            other => Err(format!("unknown dedup key {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RecordKey {
    Instant(DateTime<Utc>),
    Composite {
        timestamp: DateTime<Utc>,
        ip: String,
        method: String,
        path: String,
        query: Option<String>,
    },
}

impl DedupKey {
    fn key_of(&self, record: &LogRecord) -> RecordKey {
        match self {
            Self::Timestamp => RecordKey::Instant(record.timestamp),
            Self::Composite => RecordKey::Composite {
                timestamp: record.timestamp,
                ip: record.ip.clone(),
                method: record.method.clone(),
                path: record.path.clone(),
                query: record.query.clone(),
            },
        }
    }
}

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Retained records, newest first
    pub logs: Vec<LogRecord>,
    /// Watermark for the next `since` request
    pub cursor: Option<DateTime<Utc>>,
    /// Records from the batch that were not already held
    pub added: usize,
}

#[derive(Debug, Clone)]
pub struct LogReconciler {
    capacity: usize,
    dedup: DedupKey,
}

impl Default for LogReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY, DedupKey::Timestamp)
    }
}

impl LogReconciler {
    pub fn new(capacity: usize, dedup: DedupKey) -> Self {
        Self { capacity, dedup }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Merge `incoming` into `existing`.
    ///
    /// Without a cursor (first poll or forced full reload) the batch replaces
    /// the held records outright. The returned cursor never moves backwards.
    pub fn reconcile(
        &self,
        existing: &[LogRecord],
        incoming: Vec<LogRecord>,
        cursor: Option<DateTime<Utc>>,
    ) -> Reconciled {
        let newest_incoming = incoming.iter().map(|r| r.timestamp).max();

        let mut merged: Vec<LogRecord> = match cursor {
            Some(_) => existing.to_vec(),
            None => Vec::with_capacity(incoming.len()),
        };

        let mut seen: HashSet<RecordKey> = merged.iter().map(|r| self.dedup.key_of(r)).collect();
        let mut added = 0;

        for record in incoming {
            if seen.insert(self.dedup.key_of(&record)) {
                merged.push(record);
                added += 1;
            }
        }

        // Stable: equal timestamps keep arrival order
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        merged.truncate(self.capacity);

        let cursor = match (cursor, newest_incoming) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, new) => new.or(old),
        };

        Reconciled { logs: merged, cursor, added }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::types::AnalysisResult;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn record(offset_secs: i64, ip: &str) -> LogRecord {
        LogRecord {
            timestamp: base() + Duration::seconds(offset_secs),
            method: "GET".to_string(),
            path: "/".to_string(),
            query: None,
            ip: ip.to_string(),
            analysis_result: AnalysisResult::default(),
        }
    }

    #[test]
    fn test_first_poll_takes_incoming() {
        let reconciler = LogReconciler::default();
        let existing = vec![record(-100, "9.9.9.9")];

        let out = reconciler.reconcile(&existing, vec![record(1, "a"), record(3, "b")], None);

        assert_eq!(out.logs.len(), 2);
        assert_eq!(out.logs[0].ip, "b");
        assert_eq!(out.cursor, Some(base() + Duration::seconds(3)));
        assert_eq!(out.added, 2);
    }

    #[test]
    fn test_merge_newest_first_and_cursor_advances() {
        let reconciler = LogReconciler::default();
        let existing = vec![record(0, "0.0.0.0")];
        let incoming = vec![record(5, "1.1.1.1")];

        let out = reconciler.reconcile(&existing, incoming, Some(base()));

        assert_eq!(out.logs.len(), 2);
        assert_eq!(out.logs[0].ip, "1.1.1.1");
        assert_eq!(out.logs[1].ip, "0.0.0.0");
        assert_eq!(out.cursor, Some(base() + Duration::seconds(5)));
    }

    #[test]
    fn test_duplicate_timestamp_is_dropped() {
        let reconciler = LogReconciler::default();
        let existing = vec![record(5, "first")];

        let out = reconciler.reconcile(&existing, vec![record(5, "second")], Some(base()));

        assert_eq!(out.logs.len(), 1);
        assert_eq!(out.logs[0].ip, "first");
        assert_eq!(out.added, 0);
    }

    #[test]
    fn test_composite_key_keeps_same_second_events() {
        let reconciler = LogReconciler::new(100, DedupKey::Composite);
        let existing = vec![record(5, "first")];

        let out = reconciler.reconcile(
            &existing,
            vec![record(5, "second"), record(5, "first")],
            Some(base()),
        );

        assert_eq!(out.logs.len(), 2);
        assert_eq!(out.added, 1);
    }

    #[test]
    fn test_empty_batch_keeps_state() {
        let reconciler = LogReconciler::default();
        let existing = vec![record(2, "a"), record(1, "b")];
        let cursor = Some(base() + Duration::seconds(2));

        let out = reconciler.reconcile(&existing, Vec::new(), cursor);

        assert_eq!(out.logs, existing);
        assert_eq!(out.cursor, cursor);
        assert_eq!(out.added, 0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let reconciler = LogReconciler::default();
        let incoming: Vec<LogRecord> = (0..101).map(|i| record(i, "x")).collect();

        let out = reconciler.reconcile(&[], incoming, Some(base()));

        assert_eq!(out.logs.len(), 100);
        assert!(out.logs.iter().all(|r| r.timestamp != base()));
        assert_eq!(out.logs.last().unwrap().timestamp, base() + Duration::seconds(1));
    }

    #[test]
    fn test_cursor_never_regresses() {
        let reconciler = LogReconciler::default();
        let cursor = Some(base() + Duration::seconds(60));

        let out = reconciler.reconcile(&[], vec![record(10, "late")], cursor);

        assert_eq!(out.cursor, cursor);
    }

    #[test]
    fn test_dedup_key_parse() {
        assert_eq!("timestamp".parse::<DedupKey>(), Ok(DedupKey::Timestamp));
        assert_eq!("Composite".parse::<DedupKey>(), Ok(DedupKey::Composite));
        assert!("ip".parse::<DedupKey>().is_err());
    }
}
