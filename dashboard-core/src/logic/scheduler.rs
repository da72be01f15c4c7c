//! Poll Scheduler
//!
//! Pure state machine deciding when a feed polls next. Timers never carry
//! state of their own: the driver sleeps until `next_wake()` and signals
//! back with `on_timer`, so there is exactly one authority per feed.
//!
//! ```text
//! Idle ──▶ Polling ──success──▶ Idle (wait interval)
//!             │
//!             └─failure─▶ BackoffWait ──▶ Polling
//!             └─failure #threshold─▶ Paused ──cooldown──▶ Idle
//! ```

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    Idle,
    Polling,
    BackoffWait,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerPolicy {
    /// Wait after a successful poll
    pub interval: Duration,
    /// Consecutive failures that trigger a pause
    pub failure_threshold: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub pause_cooldown: Duration,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(constants::DEFAULT_LOG_POLL_MS),
            failure_threshold: constants::DEFAULT_FAILURE_THRESHOLD,
            backoff_base: Duration::from_millis(constants::DEFAULT_RETRY_BASE_MS),
            backoff_cap: Duration::from_millis(constants::DEFAULT_BACKOFF_CAP_MS),
            pause_cooldown: Duration::from_millis(constants::DEFAULT_PAUSE_MS),
        }
    }
}

impl SchedulerPolicy {
    /// Retry delay after `failures` consecutive failures (1-based), capped
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }
}

#[derive(Debug, Clone)]
pub struct PollScheduler {
    policy: SchedulerPolicy,
    phase: PollPhase,
    consecutive_failures: u32,
    next_wake: Option<Instant>,
}

impl PollScheduler {
    pub fn new(policy: SchedulerPolicy) -> Self {
        Self {
            policy,
            phase: PollPhase::Idle,
            consecutive_failures: 0,
            next_wake: None,
        }
    }

    pub fn policy(&self) -> &SchedulerPolicy {
        &self.policy
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_paused(&self) -> bool {
        self.phase == PollPhase::Paused
    }

    /// When the driver should call `on_timer` next
    pub fn next_wake(&self) -> Option<Instant> {
        self.next_wake
    }

    /// Initial transition: Idle -> Polling
    pub fn start(&mut self) {
        if self.phase == PollPhase::Idle {
            self.phase = PollPhase::Polling;
            self.next_wake = None;
        }
    }

    /// Timer fired. Returns true when the feed should poll now.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        let due = self.next_wake.map_or(false, |at| now >= at);
        if !due {
            return self.phase == PollPhase::Polling;
        }

        if self.phase == PollPhase::Paused {
            tracing::info!("pause cooldown elapsed, resuming polling");
            self.consecutive_failures = 0;
            self.phase = PollPhase::Idle;
        }

        match self.phase {
            PollPhase::Idle | PollPhase::BackoffWait => {
                self.phase = PollPhase::Polling;
                self.next_wake = None;
                true
            }
            PollPhase::Polling => true,
            PollPhase::Paused | PollPhase::Stopped => false,
        }
    }

    /// Poll succeeded: reset failures and wait one interval
    pub fn on_success(&mut self, now: Instant) -> Duration {
        if self.phase == PollPhase::Stopped {
            return Duration::ZERO;
        }
        self.consecutive_failures = 0;
        self.phase = PollPhase::Idle;
        self.next_wake = Some(now + self.policy.interval);
        self.policy.interval
    }

    /// Poll failed: back off, or pause once the threshold is reached
    pub fn on_failure(&mut self, now: Instant) -> Duration {
        if self.phase == PollPhase::Stopped {
            return Duration::ZERO;
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        let delay = if self.consecutive_failures >= self.policy.failure_threshold {
            tracing::warn!(
                failures = self.consecutive_failures,
                cooldown_ms = self.policy.pause_cooldown.as_millis() as u64,
                "too many consecutive failures, pausing polling"
            );
            self.phase = PollPhase::Paused;
            self.policy.pause_cooldown
        } else {
            self.phase = PollPhase::BackoffWait;
            self.policy.backoff_for(self.consecutive_failures)
        };

        self.next_wake = Some(now + delay);
        delay
    }

    /// User-triggered retry: poll immediately regardless of backoff or pause
    pub fn manual_retry(&mut self) {
        if self.phase == PollPhase::Stopped {
            return;
        }
        self.consecutive_failures = 0;
        self.phase = PollPhase::Polling;
        self.next_wake = None;
    }

    /// Teardown: no further polls
    pub fn stop(&mut self) {
        self.phase = PollPhase::Stopped;
        self.next_wake = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> PollScheduler {
        PollScheduler::new(SchedulerPolicy::default())
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = SchedulerPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(8_000));
        assert_eq!(policy.backoff_for(5), Duration::from_millis(10_000));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(10_000));
    }

    #[test]
    fn test_start_polls_immediately() {
        let mut s = scheduler();
        assert_eq!(s.phase(), PollPhase::Idle);
        s.start();
        assert_eq!(s.phase(), PollPhase::Polling);
    }

    #[test]
    fn test_success_waits_interval() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start();

        assert_eq!(s.on_success(now), Duration::from_millis(5_000));
        assert_eq!(s.phase(), PollPhase::Idle);
        assert!(!s.on_timer(now + Duration::from_millis(4_999)));
        assert!(s.on_timer(now + Duration::from_millis(5_000)));
        assert_eq!(s.phase(), PollPhase::Polling);
    }

    #[test]
    fn test_failures_back_off_then_pause() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start();

        assert_eq!(s.on_failure(now), Duration::from_millis(1_000));
        assert_eq!(s.phase(), PollPhase::BackoffWait);
        assert!(s.on_timer(now + Duration::from_millis(1_000)));

        assert_eq!(s.on_failure(now), Duration::from_millis(2_000));
        assert!(s.on_timer(now + Duration::from_millis(2_000)));

        assert_eq!(s.on_failure(now), Duration::from_millis(30_000));
        assert_eq!(s.phase(), PollPhase::Paused);
        assert_eq!(s.consecutive_failures(), 3);
    }

    #[test]
    fn test_paused_issues_no_poll_until_cooldown() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start();
        for _ in 0..3 {
            s.on_failure(now);
            s.on_timer(now);
        }
        assert!(s.is_paused());

        assert!(!s.on_timer(now + Duration::from_millis(29_999)));
        assert!(s.is_paused());

        assert!(s.on_timer(now + Duration::from_millis(30_000)));
        assert_eq!(s.phase(), PollPhase::Polling);
        assert_eq!(s.consecutive_failures(), 0);
    }

    #[test]
    fn test_manual_retry_overrides_pause() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start();
        for _ in 0..3 {
            s.on_failure(now);
        }
        assert!(s.is_paused());

        s.manual_retry();
        assert_eq!(s.phase(), PollPhase::Polling);
        assert_eq!(s.next_wake(), None);

        s.on_success(now);
        assert_eq!(s.consecutive_failures(), 0);
        assert_eq!(s.phase(), PollPhase::Idle);
    }

    #[test]
    fn test_success_resets_failures() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start();
        s.on_failure(now);
        s.on_failure(now);
        assert_eq!(s.consecutive_failures(), 2);

        s.on_success(now);
        assert_eq!(s.consecutive_failures(), 0);

        // Next failure starts the backoff ladder from the bottom again
        assert_eq!(s.on_failure(now), Duration::from_millis(1_000));
    }

    #[test]
    fn test_stop_is_terminal() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start();
        s.stop();

        s.manual_retry();
        assert_eq!(s.phase(), PollPhase::Stopped);
        assert_eq!(s.on_failure(now), Duration::ZERO);
        assert!(!s.on_timer(now + Duration::from_secs(60)));
    }
}
