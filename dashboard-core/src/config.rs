//! Configuration module

use std::env;
use std::time::Duration;

use crate::constants;
use crate::error::ConfigError;
use crate::logic::reconcile::DedupKey;
use crate::logic::scheduler::SchedulerPolicy;
use crate::logic::sync::RetryPolicy;

/// Dashboard session configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend base URL (no trailing slash)
    pub api_url: String,

    /// Interval between successful log polls
    pub log_poll_interval: Duration,

    /// Interval between successful polls of the aggregate feeds
    pub aux_poll_interval: Duration,

    /// Deadline of a single HTTP attempt
    pub fetch_timeout: Duration,

    /// Attempts per logical fetch
    pub max_attempts: u32,

    /// Base delay of the fetcher's exponential backoff
    pub retry_base: Duration,

    /// Minimum spacing between calls to the same endpoint
    pub throttle_interval: Duration,

    /// Consecutive failed polls before a feed pauses
    pub failure_threshold: u32,

    /// Upper bound of the scheduler's retry backoff
    pub backoff_cap: Duration,

    /// How long a paused feed stays paused
    pub pause_cooldown: Duration,

    /// Maximum number of retained log records
    pub log_capacity: usize,

    /// Identity used to de-duplicate log records
    pub dedup_key: DedupKey,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: constants::DEFAULT_API_URL.to_string(),
            log_poll_interval: Duration::from_millis(constants::DEFAULT_LOG_POLL_MS),
            aux_poll_interval: Duration::from_millis(constants::DEFAULT_AUX_POLL_MS),
            fetch_timeout: Duration::from_millis(constants::DEFAULT_FETCH_TIMEOUT_MS),
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            retry_base: Duration::from_millis(constants::DEFAULT_RETRY_BASE_MS),
            throttle_interval: Duration::from_millis(constants::DEFAULT_THROTTLE_MS),
            failure_threshold: constants::DEFAULT_FAILURE_THRESHOLD,
            backoff_cap: Duration::from_millis(constants::DEFAULT_BACKOFF_CAP_MS),
            pause_cooldown: Duration::from_millis(constants::DEFAULT_PAUSE_MS),
            log_capacity: constants::DEFAULT_LOG_CAPACITY,
            dedup_key: DedupKey::Timestamp,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            api_url: lookup("DASHBOARD_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            log_poll_interval: millis(&lookup, "DASHBOARD_LOG_POLL_MS", defaults.log_poll_interval)?,
            aux_poll_interval: millis(&lookup, "DASHBOARD_AUX_POLL_MS", defaults.aux_poll_interval)?,
            fetch_timeout: millis(&lookup, "DASHBOARD_FETCH_TIMEOUT_MS", defaults.fetch_timeout)?,
            max_attempts: parsed(&lookup, "DASHBOARD_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_base: millis(&lookup, "DASHBOARD_RETRY_BASE_MS", defaults.retry_base)?,
            throttle_interval: millis(&lookup, "DASHBOARD_THROTTLE_MS", defaults.throttle_interval)?,
            failure_threshold: parsed(&lookup, "DASHBOARD_FAILURE_THRESHOLD", defaults.failure_threshold)?,
            backoff_cap: millis(&lookup, "DASHBOARD_BACKOFF_CAP_MS", defaults.backoff_cap)?,
            pause_cooldown: millis(&lookup, "DASHBOARD_PAUSE_MS", defaults.pause_cooldown)?,
            log_capacity: parsed(&lookup, "DASHBOARD_LOG_CAPACITY", defaults.log_capacity)?,
            dedup_key: parsed(&lookup, "DASHBOARD_DEDUP_KEY", defaults.dedup_key)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or spin the engine
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Zero { name: "max_attempts" });
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::Zero { name: "failure_threshold" });
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::Zero { name: "log_capacity" });
        }
        if self.log_poll_interval.is_zero() {
            return Err(ConfigError::Zero { name: "log_poll_interval" });
        }
        if self.aux_poll_interval.is_zero() {
            return Err(ConfigError::Zero { name: "aux_poll_interval" });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::Zero { name: "fetch_timeout" });
        }
        if self.api_url.is_empty() {
            return Err(ConfigError::Invalid { name: "api_url", value: String::new() });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: self.fetch_timeout,
            max_attempts: self.max_attempts,
            base_delay: self.retry_base,
        }
    }

    /// Schedule of the primary log feed
    pub fn log_schedule(&self) -> SchedulerPolicy {
        self.schedule(self.log_poll_interval)
    }

    /// Schedule shared by the aggregate feeds
    pub fn aux_schedule(&self) -> SchedulerPolicy {
        self.schedule(self.aux_poll_interval)
    }

    fn schedule(&self, interval: Duration) -> SchedulerPolicy {
        SchedulerPolicy {
            interval,
            failure_threshold: self.failure_threshold,
            backoff_base: self.retry_base,
            backoff_cap: self.backoff_cap,
            pause_cooldown: self.pause_cooldown,
        }
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

fn millis<F>(lookup: &F, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parsed(lookup, name, default.as_millis() as u64).map(Duration::from_millis)
}
