//! Dashboard API Client
//!
//! Typed calls for each backend feed. Every logical call passes through the
//! endpoint throttle once, then through the resilient fetcher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::fetcher::ResilientFetcher;
use super::throttle::EndpointThrottle;
use super::transport::ApiRequest;
use crate::constants::{
    ANOMALOUS_IPS_PATH, ATTACK_ORIGINS_PATH, ATTACK_TIMELINE_PATH, LOGS_PATH, PREVENTION_PATH,
};
use crate::error::FetchError;
use crate::logic::timestamp_serde::format_timestamp;
use crate::logic::types::{
    order_timeline, AnomalousIp, AttackOriginEntry, AttackTimelinePoint, LogRecord,
    OriginsPayload, PreventionMode,
};

pub struct ApiClient {
    fetcher: ResilientFetcher,
    throttle: Arc<EndpointThrottle>,
}

impl ApiClient {
    pub fn new(fetcher: ResilientFetcher, throttle: Arc<EndpointThrottle>) -> Self {
        Self { fetcher, throttle }
    }

    pub fn throttle(&self) -> &Arc<EndpointThrottle> {
        &self.throttle
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, FetchError> {
        self.throttle.acquire(&request.endpoint_key()).await;
        self.fetcher.fetch(&request).await
    }

    /// Fetch logs, optionally only those newer than `since`
    pub async fn fetch_logs(&self, since: Option<DateTime<Utc>>) -> Result<Vec<LogRecord>, FetchError> {
        let mut request = ApiRequest::get(LOGS_PATH);
        if let Some(since) = since {
            request = request.with_query("since", format_timestamp(&since));
        }

        tracing::debug!(since = ?since, "fetching logs");
        let logs: Vec<LogRecord> = self.call(request).await?;
        tracing::debug!(count = logs.len(), "received logs");
        Ok(logs)
    }

    pub async fn fetch_anomalous_ips(&self) -> Result<Vec<AnomalousIp>, FetchError> {
        let ips: Vec<AnomalousIp> = self.call(ApiRequest::get(ANOMALOUS_IPS_PATH)).await?;
        Ok(ips.into_iter().map(AnomalousIp::normalize).collect())
    }

    pub async fn fetch_attack_timeline(&self) -> Result<Vec<AttackTimelinePoint>, FetchError> {
        let points: Vec<AttackTimelinePoint> = self.call(ApiRequest::get(ATTACK_TIMELINE_PATH)).await?;
        Ok(order_timeline(points))
    }

    pub async fn fetch_attack_origins(&self) -> Result<Vec<AttackOriginEntry>, FetchError> {
        let payload: OriginsPayload = self.call(ApiRequest::get(ATTACK_ORIGINS_PATH)).await?;
        Ok(payload.into_entries())
    }

    /// Current blocking-vs-logging mode of the backend WAF
    pub async fn prevention_mode(&self) -> Result<bool, FetchError> {
        let mode: PreventionMode = self.call(ApiRequest::get(PREVENTION_PATH)).await?;
        Ok(mode.enabled)
    }

    /// Relay a mode change; returns the state the backend reports back
    pub async fn set_prevention_mode(&self, enabled: bool) -> Result<bool, FetchError> {
        tracing::info!(enabled, "toggling prevention mode");
        let request = ApiRequest::post(PREVENTION_PATH, json!({ "enabled": enabled }));
        let mode: PreventionMode = self.call(request).await?;
        Ok(mode.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::sync::fetcher::RetryPolicy;
    use crate::logic::sync::scripted::{ScriptedTransport, Step};
    use crate::logic::sync::transport::HttpMethod;
    use crate::logic::types::ThreatBand;
    use std::time::Duration;
    use tokio::time::Instant;

    fn client(transport: &Arc<ScriptedTransport>) -> ApiClient {
        let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
        ApiClient::new(fetcher, Arc::new(EndpointThrottle::new(Duration::from_millis(2_000))))
    }

    #[tokio::test(start_paused = true)]
    async fn test_since_query_parameter() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fallback(LOGS_PATH, Step::ok("[]"));
        let client = client(&transport);

        client.fetch_logs(None).await.unwrap();
        let since = "2024-01-01T00:00:05Z".parse::<DateTime<Utc>>().unwrap();
        client.fetch_logs(Some(since)).await.unwrap();

        let requests = transport.requests_to(LOGS_PATH);
        assert!(requests[0].query.is_empty());
        assert_eq!(
            requests[1].query,
            vec![("since".to_string(), "2024-01-01T00:00:05Z".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_calls_are_spaced() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fallback(LOGS_PATH, Step::ok("[]"));
        let client = client(&transport);

        let started = Instant::now();
        client.fetch_logs(None).await.unwrap();
        client.fetch_logs(None).await.unwrap();

        let times = transport.call_times(LOGS_PATH);
        assert_eq!(times[0] - started, Duration::ZERO);
        assert_eq!(times[1] - started, Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_object_body_is_malformed() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fallback(LOGS_PATH, Step::ok(r#"{"logs": []}"#));
        let client = client(&transport);

        let err = client.fetch_logs(None).await.unwrap_err();
        assert_eq!(err.reason(), "malformedResponse");
        assert_eq!(transport.calls_to(LOGS_PATH), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_with_invalid_timestamp_fail_fast() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fallback(
            LOGS_PATH,
            Step::ok(r#"[{"timestamp": "soon", "method": "GET", "path": "/", "ip": "1.1.1.1"}]"#),
        );

        let err = client(&transport).fetch_logs(None).await.unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregate_feeds_are_normalized() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            ANOMALOUS_IPS_PATH,
            Step::ok(r#"[{"ip": "5.5.5.5", "threat_level": 62.5, "total_requests": 8,
                        "anomalous_requests": 3, "last_detected": "2024-01-01T00:00:00Z",
                        "matched_rules": []}]"#),
        );
        transport.push(
            ATTACK_TIMELINE_PATH,
            Step::ok(r#"[{"timestamp": "2024-01-01T01:00:00Z", "attacks": 2, "total_requests": 9},
                        {"timestamp": "2024-01-01T00:00:00Z", "attacks": -1, "total_requests": 4}]"#),
        );
        transport.push(
            ATTACK_ORIGINS_PATH,
            Step::ok(r#"{"FR": {"attack_count": 2, "unique_ips": 1, "last_attack": "2024-01-01T00:00:00Z"}}"#),
        );
        let client = client(&transport);

        let ips = client.fetch_anomalous_ips().await.unwrap();
        assert_eq!(ips[0].threat_band(), ThreatBand::High);

        let timeline = client.fetch_attack_timeline().await.unwrap();
        assert_eq!(timeline[0].attacks, 0);
        assert_eq!(timeline[1].attacks, 2);

        let origins = client.fetch_attack_origins().await.unwrap();
        assert_eq!(origins[0].country, "FR");
    }

    #[tokio::test(start_paused = true)]
    async fn test_prevention_toggle_posts_body() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(PREVENTION_PATH, Step::ok(r#"{"enabled": false}"#));
        transport.push(PREVENTION_PATH, Step::ok(r#"{"enabled": true}"#));
        let client = client(&transport);

        assert!(!client.prevention_mode().await.unwrap());
        assert!(client.set_prevention_mode(true).await.unwrap());

        let requests = transport.requests_to(PREVENTION_PATH);
        assert_eq!(requests[1].method, HttpMethod::Post);
        assert_eq!(requests[1].body, Some(json!({ "enabled": true })));
    }
}
