//! Fetch attempt telemetry
//!
//! The fetcher reports every attempt to an `AttemptSink`. The default sink
//! forwards to `tracing`; `MemorySink` keeps events for inspection.

use std::time::Duration;

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failed { reason: String, message: String },
}

/// One HTTP attempt made by the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptEvent {
    pub endpoint: String,
    /// 1-based
    pub attempt: u32,
    pub max_attempts: u32,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

impl AttemptEvent {
    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

pub trait AttemptSink: Send + Sync {
    fn record(&self, event: &AttemptEvent);
}

/// Emits attempt events as structured tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AttemptSink for TracingSink {
    fn record(&self, event: &AttemptEvent) {
        let elapsed_ms = event.elapsed.as_millis() as u64;

        match &event.outcome {
            AttemptOutcome::Success => tracing::debug!(
                endpoint = %event.endpoint,
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                elapsed_ms,
                "fetch attempt succeeded"
            ),
            AttemptOutcome::Failed { reason, message } => tracing::warn!(
                endpoint = %event.endpoint,
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                elapsed_ms,
                reason = %reason,
                error = %message,
                "fetch attempt failed"
            ),
        }
    }
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AttemptEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AttemptEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AttemptSink for MemorySink {
    fn record(&self, event: &AttemptEvent) {
        self.events.lock().push(event.clone());
    }
}
