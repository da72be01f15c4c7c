//! Endpoint Throttle
//!
//! Spaces calls to the same logical endpoint at least `min_interval` apart.
//! A call that arrives too early is delayed, never dropped. The throttle is
//! owned by one dashboard session; there is no process-wide instance.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep, Instant};

#[derive(Debug)]
pub struct EndpointThrottle {
    min_interval: Duration,
    last_calls: Mutex<HashMap<String, Instant>>,
}

impl EndpointThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time left before `key` may be called again
    pub fn remaining(&self, key: &str, now: Instant) -> Option<Duration> {
        let last = *self.last_calls.lock().get(key)?;
        let ready_at = last + self.min_interval;
        (ready_at > now).then(|| ready_at - now)
    }

    /// Whether a call to `key` right now would have to wait
    pub fn should_delay(&self, key: &str) -> bool {
        self.remaining(key, Instant::now()).is_some()
    }

    pub fn record_call(&self, key: &str, now: Instant) {
        self.last_calls.lock().insert(key.to_string(), now);
    }

    /// Claim the next free slot for `key` and return how long to wait for it.
    ///
    /// The slot is recorded immediately, so concurrent callers queue behind
    /// each other instead of all waking at the same instant.
    pub fn reserve(&self, key: &str, now: Instant) -> Duration {
        let mut last_calls = self.last_calls.lock();
        let slot = match last_calls.get(key) {
            Some(last) => (*last + self.min_interval).max(now),
            None => now,
        };
        last_calls.insert(key.to_string(), slot);
        slot - now
    }

    /// Wait until a call to `key` is allowed, then record it
    pub async fn acquire(&self, key: &str) {
        let wait = self.reserve(key, Instant::now());
        if !wait.is_zero() {
            tracing::debug!(endpoint = key, wait_ms = wait.as_millis() as u64, "throttling endpoint call");
            sleep(wait).await;
        }
    }

    /// Forget all recorded calls (session teardown)
    pub fn clear(&self) {
        self.last_calls.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_millis(2_000);

    #[tokio::test(start_paused = true)]
    async fn test_first_call_not_delayed() {
        let throttle = EndpointThrottle::new(WINDOW);
        assert!(!throttle.should_delay("GET /api/logs"));

        let started = Instant::now();
        throttle.acquire("GET /api/logs").await;
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(throttle.should_delay("GET /api/logs"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_waits_out_window() {
        let throttle = EndpointThrottle::new(WINDOW);
        let first = Instant::now();
        throttle.record_call("GET /api/logs", first);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(
            throttle.remaining("GET /api/logs", Instant::now()),
            Some(Duration::from_millis(1_500))
        );

        throttle.acquire("GET /api/logs").await;
        assert_eq!(first.elapsed(), WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let throttle = EndpointThrottle::new(WINDOW);
        throttle.acquire("GET /api/logs").await;

        let started = Instant::now();
        throttle.acquire("GET /api/anomalous-ips").await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_queue() {
        let throttle = Arc::new(EndpointThrottle::new(WINDOW));
        let started = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move {
                throttle.acquire("GET /api/logs").await;
                Instant::now()
            }));
        }

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap() - started);
        }
        finished.sort();

        assert_eq!(finished, vec![Duration::ZERO, WINDOW, WINDOW * 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expires() {
        let throttle = EndpointThrottle::new(WINDOW);
        throttle.acquire("GET /api/logs").await;

        tokio::time::advance(WINDOW).await;
        assert!(!throttle.should_delay("GET /api/logs"));
    }
}
