//! Central Configuration Constants
//!
//! Single source of truth for the polling engine defaults.
//! Every value here can be overridden through `DashboardConfig::from_env`.

/// Default backend base URL
///
/// Fallback when `DASHBOARD_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Per-attempt request timeout (milliseconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Attempts per logical fetch before the error is surfaced
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for the fetcher's exponential backoff (milliseconds)
pub const DEFAULT_RETRY_BASE_MS: u64 = 1_000;

/// Minimum spacing between two calls to the same endpoint (milliseconds)
pub const DEFAULT_THROTTLE_MS: u64 = 2_000;

/// Poll interval of the primary log feed (milliseconds)
pub const DEFAULT_LOG_POLL_MS: u64 = 5_000;

/// Poll interval of the aggregate feeds (milliseconds)
pub const DEFAULT_AUX_POLL_MS: u64 = 30_000;

/// Consecutive failed polls before a feed pauses
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Upper bound of the scheduler's retry backoff (milliseconds)
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 10_000;

/// Cooldown of a paused feed (milliseconds)
pub const DEFAULT_PAUSE_MS: u64 = 30_000;

/// Maximum number of retained log records
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "WAF Dashboard";

// ============================================
// Backend API paths
// ============================================

pub const LOGS_PATH: &str = "/api/logs";
pub const ANOMALOUS_IPS_PATH: &str = "/api/anomalous-ips";
pub const ATTACK_TIMELINE_PATH: &str = "/api/attack-timeline";
pub const ATTACK_ORIGINS_PATH: &str = "/api/attack-origins";
pub const PREVENTION_PATH: &str = "/api/waf/prevention";
