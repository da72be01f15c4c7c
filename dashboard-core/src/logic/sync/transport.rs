//! HTTP transport
//!
//! The fetcher only ever sees `Transport`, so tests can script backend
//! behavior without sockets. `HttpTransport` is the real reqwest client.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One logical backend call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Logical endpoint identity used by the throttle (query excluded)
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection-level failure (refused, reset, DNS, TLS...)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport rooted at the backend base URL
pub struct HttpTransport {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        // Deadlines are enforced per attempt by the fetcher
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            HttpMethod::Get => self.http_client.get(&url),
            HttpMethod::Post => self.http_client.post(&url),
        };

        builder = builder
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}
