//! Resilient Fetcher
//!
//! One logical fetch = up to `max_attempts` HTTP attempts, each bounded by
//! `attempt_timeout`, separated by `base_delay * 2^attempt`. Every failure
//! kind is retried the same way. The body is validated here and nowhere else.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::{sleep, timeout, Instant};

use super::transport::{ApiRequest, Transport};
use crate::constants;
use crate::error::FetchError;
use crate::logic::telemetry::{AttemptEvent, AttemptOutcome, AttemptSink, TracingSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(constants::DEFAULT_FETCH_TIMEOUT_MS),
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(constants::DEFAULT_RETRY_BASE_MS),
        }
    }
}

impl RetryPolicy {
    /// Pause after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    sink: Arc<dyn AttemptSink>,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the attempt sink
    pub fn with_sink(mut self, sink: Arc<dyn AttemptSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch with the policy's attempt bound
    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, FetchError> {
        self.fetch_with_attempts(request, self.policy.max_attempts).await
    }

    pub async fn fetch_with_attempts<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        max_attempts: u32,
    ) -> Result<T, FetchError> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();
            let result = self.attempt::<T>(request).await;

            let outcome = match &result {
                Ok(_) => AttemptOutcome::Success,
                Err(e) => AttemptOutcome::Failed {
                    reason: e.reason(),
                    message: e.to_string(),
                },
            };
            self.sink.record(&AttemptEvent {
                endpoint: request.path.clone(),
                attempt,
                max_attempts,
                outcome,
                elapsed: started.elapsed(),
            });

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(_) => sleep(self.policy.delay_after(attempt)).await,
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, FetchError> {
        // Dropping the transport future on timeout aborts the request
        let response = match timeout(self.policy.attempt_timeout, self.transport.send(request)).await {
            Err(_) => {
                return Err(FetchError::Timeout {
                    after: self.policy.attempt_timeout,
                })
            }
            Ok(Err(e)) => return Err(FetchError::Network { message: e.0 }),
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status,
            });
        }

        decode_body(&response.body)
    }
}

/// Parse and shape-check a 2xx body.
///
/// A JSON object carrying an `error` field is a failure even on 200.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::malformed(format!("body is not JSON: {}", e)))?;

    if let Some(error) = value.as_object().and_then(|obj| obj.get("error")) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(FetchError::malformed(format!("backend reported error: {}", message)));
    }

    serde_json::from_value(value)
        .map_err(|e| FetchError::malformed(format!("unexpected shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::sync::scripted::{ScriptedTransport, Step};
    use crate::logic::telemetry::MemorySink;
    use crate::logic::sync::transport::RawResponse;

    const PATH: &str = "/api/logs";

    fn fetcher(transport: &Arc<ScriptedTransport>, sink: &Arc<MemorySink>) -> ResilientFetcher {
        ResilientFetcher::new(transport.clone(), RetryPolicy::default()).with_sink(sink.clone())
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(2_000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4_000));
        assert_eq!(policy.delay_after(64), Duration::from_millis(1_000).saturating_mul(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try() {
        let transport = Arc::new(ScriptedTransport::new());
        let sink = Arc::new(MemorySink::new());
        transport.push(PATH, Step::ok("[1, 2, 3]"));

        let values: Vec<u32> = fetcher(&transport, &sink).fetch(&ApiRequest::get(PATH)).await.unwrap();

        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(transport.calls_to(PATH), 1);
        assert_eq!(sink.len(), 1);
        assert!(sink.events()[0].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_500_exhausts_attempts() {
        let transport = Arc::new(ScriptedTransport::new());
        let sink = Arc::new(MemorySink::new());
        transport.fallback(PATH, Step::status(500));

        let started = Instant::now();
        let err = fetcher(&transport, &sink)
            .fetch::<Vec<Value>>(&ApiRequest::get(PATH))
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::HttpStatus { status: 500 });
        assert_eq!(transport.calls_to(PATH), 3);
        // 2s after the first failure, 4s after the second, none after the last
        assert_eq!(started.elapsed(), Duration::from_millis(6_000));

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events.iter().map(|e| e.attempt).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(events.iter().all(|e| matches!(
            &e.outcome,
            AttemptOutcome::Failed { reason, .. } if reason == "httpStatus:500"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let transport = Arc::new(ScriptedTransport::new());
        let sink = Arc::new(MemorySink::new());
        transport.push(PATH, Step::Refuse("connection refused".into()));
        transport.push(PATH, Step::status(502));
        transport.push(PATH, Step::ok("[]"));

        let values: Vec<Value> = fetcher(&transport, &sink).fetch(&ApiRequest::get(PATH)).await.unwrap();

        assert!(values.is_empty());
        assert_eq!(transport.calls_to(PATH), 3);
        let reasons: Vec<_> = sink
            .events()
            .into_iter()
            .map(|e| match e.outcome {
                AttemptOutcome::Success => "ok".to_string(),
                AttemptOutcome::Failed { reason, .. } => reason,
            })
            .collect();
        assert_eq!(reasons, vec!["network", "httpStatus:502", "ok"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_attempt() {
        let transport = Arc::new(ScriptedTransport::new());
        let sink = Arc::new(MemorySink::new());
        transport.fallback(PATH, Step::Delay(Duration::from_secs(60), RawResponse::new(200, "[]")));

        let started = Instant::now();
        let err = fetcher(&transport, &sink)
            .fetch_with_attempts::<Vec<Value>>(&ApiRequest::get(PATH), 1)
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Timeout { after: Duration::from_secs(10) });
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert_eq!(sink.events()[0].outcome, AttemptOutcome::Failed {
            reason: "timeout".into(),
            message: "Request timed out after 10000ms".into(),
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_field_is_malformed_and_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        let sink = Arc::new(MemorySink::new());
        transport.push(PATH, Step::ok(r#"{"error": "database unavailable"}"#));
        transport.push(PATH, Step::ok("[]"));

        let values: Vec<Value> = fetcher(&transport, &sink).fetch(&ApiRequest::get(PATH)).await.unwrap();

        assert!(values.is_empty());
        assert_eq!(transport.calls_to(PATH), 2);
    }

    #[test]
    fn test_decode_body_shapes() {
        let err = decode_body::<Vec<Value>>(r#"{"error": "boom"}"#).unwrap_err();
        assert_eq!(err, FetchError::malformed("backend reported error: boom"));

        let err = decode_body::<Vec<Value>>(r#"{"logs": []}"#).unwrap_err();
        assert_eq!(err.reason(), "malformedResponse");

        let err = decode_body::<Vec<Value>>("<html>502 Bad Gateway</html>").unwrap_err();
        assert_eq!(err.reason(), "malformedResponse");

        let ok = decode_body::<Vec<u8>>("[1]").unwrap();
        assert_eq!(ok, vec![1]);
    }
}
