//! Scripted in-memory transport for tests

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::transport::{ApiRequest, RawResponse, Transport, TransportError};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Reply(RawResponse),
    Refuse(String),
    Delay(Duration, RawResponse),
}

impl Step {
    pub(crate) fn ok(body: &str) -> Self {
        Self::Reply(RawResponse::new(200, body))
    }

    pub(crate) fn status(status: u16) -> Self {
        Self::Reply(RawResponse::new(status, r#"{"error":"scripted failure"}"#))
    }
}

/// Per-path FIFO of replies, with an optional fallback once a script runs dry
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<(ApiRequest, Instant)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, path: &str, step: Step) {
        self.scripts
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(step);
    }

    pub(crate) fn fallback(&self, path: &str, step: Step) {
        self.fallback.lock().insert(path.to_string(), step);
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|(r, _)| r.path == path).count()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|(r, _)| r.path == path)
            .map(|(r, _)| r.clone())
            .collect()
    }

    pub(crate) fn call_times(&self, path: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|(r, _)| r.path == path)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.calls.lock().push((request.clone(), Instant::now()));

        let step = {
            let scripted = self
                .scripts
                .lock()
                .get_mut(&request.path)
                .and_then(|queue| queue.pop_front());
            scripted.or_else(|| self.fallback.lock().get(&request.path).cloned())
        };

        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Refuse(message)) => Err(TransportError(message)),
            Some(Step::Delay(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Ok(RawResponse::new(404, r#"{"error":"no script"}"#)),
        }
    }
}
