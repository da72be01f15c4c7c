//! In-memory fixture store
//!
//! Holds the request log, the prevention flag and the fault plan that the
//! HTTP handlers serve from.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use waf_dashboard_core::LogRecord;

use crate::models::FaultPlan;

/// Oldest records are dropped past this many
pub const MAX_STORED_LOGS: usize = 5_000;

#[derive(Debug)]
pub struct FixtureStore {
    /// Oldest first
    logs: RwLock<Vec<LogRecord>>,
    prevention_enabled: RwLock<bool>,
    faults: FaultPlan,
}

impl FixtureStore {
    pub fn new(prevention_enabled: bool) -> Self {
        Self {
            logs: RwLock::new(Vec::new()),
            prevention_enabled: RwLock::new(prevention_enabled),
            faults: FaultPlan::new(),
        }
    }

    /// Append records, keeping chronological order
    pub fn insert(&self, records: Vec<LogRecord>) -> usize {
        let count = records.len();
        let mut logs = self.logs.write();
        logs.extend(records);
        logs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        if logs.len() > MAX_STORED_LOGS {
            let excess = logs.len() - MAX_STORED_LOGS;
            logs.drain(..excess);
        }
        count
    }

    /// Records strictly newer than `since` (all records without it)
    pub fn logs_since(&self, since: Option<DateTime<Utc>>) -> Vec<LogRecord> {
        let logs = self.logs.read();
        match since {
            Some(since) => logs.iter().filter(|r| r.timestamp > since).cloned().collect(),
            None => logs.clone(),
        }
    }

    pub fn log_count(&self) -> usize {
        self.logs.read().len()
    }

    /// Run `f` over the stored logs without copying them
    pub fn with_logs<T>(&self, f: impl FnOnce(&[LogRecord]) -> T) -> T {
        f(&self.logs.read())
    }

    pub fn prevention_enabled(&self) -> bool {
        *self.prevention_enabled.read()
    }

    pub fn set_prevention(&self, enabled: bool) -> bool {
        *self.prevention_enabled.write() = enabled;
        enabled
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }
}
