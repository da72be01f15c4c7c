//! Configuration module

use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Synthetic log records created at startup
    pub seed_logs: usize,

    /// Interval of the background traffic generator (`None` = off)
    pub generate_traffic: Option<Duration>,

    /// Prevention mode at startup
    pub prevention_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            seed_logs: 25,
            generate_traffic: None,
            prevention_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            seed_logs: env::var("SEED_LOGS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.seed_logs),

            generate_traffic: env::var("GENERATE_TRAFFIC_MS")
                .ok()
                .and_then(|ms| ms.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),

            prevention_enabled: env::var("PREVENTION_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.prevention_enabled),
        }
    }
}
