//! Dashboard State Store
//!
//! Owns one dashboard session: the API client (and its throttle), one
//! polling task per feed, and the reconciled state those tasks write into.
//!
//! ## Guarantees
//! - One request in flight per feed; ticks that arrive meanwhile are queued
//! - Responses carry a per-feed sequence number; an older response never
//!   overwrites a newer one
//! - After teardown no task touches the state again

mod feed;
mod state;


pub use state::{DashboardState, FeedKind, FeedStatus};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use self::feed::{run_feed, FeedCommand};
use self::state::FeedPayload;
use crate::api::DashboardSnapshot;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, FetchError};
use crate::logic::reconcile::LogReconciler;
use crate::logic::scheduler::{PollScheduler, SchedulerPolicy};
use crate::logic::sync::{ApiClient, EndpointThrottle, HttpTransport, ResilientFetcher, Transport};
use crate::logic::telemetry::{AttemptSink, TracingSink};

// ============================================================================
// SHARED INNER STATE
// ============================================================================

pub(crate) struct StoreInner {
    session_id: Uuid,
    state: RwLock<DashboardState>,
    revision: watch::Sender<u64>,
    closed: AtomicBool,
    client: ApiClient,
    reconciler: LogReconciler,
}

impl StoreInner {
    fn new(client: ApiClient, reconciler: LogReconciler) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            session_id: Uuid::new_v4(),
            state: RwLock::new(DashboardState::default()),
            revision,
            closed: AtomicBool::new(false),
            client,
            reconciler,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Hand out the next sequence number for `feed` and mark it loading.
    /// `None` once the store is closed.
    pub(crate) fn begin(&self, feed: FeedKind) -> Option<u64> {
        let mut state = self.state.write();
        if self.is_closed() {
            return None;
        }
        let slot = state.slot_mut(feed);
        slot.issued_seq += 1;
        slot.status.loading = true;
        Some(slot.issued_seq)
    }

    /// Fetch one feed. Nothing is applied here; the caller hands the
    /// outcome and its sequence number to `complete`.
    pub(crate) async fn poll(
        &self,
        feed: FeedKind,
        full_reload: bool,
    ) -> (u64, Result<FeedPayload, FetchError>) {
        let Some(seq) = self.begin(feed) else {
            return (0, Err(FetchError::Closed));
        };

        let result = match feed {
            FeedKind::Logs => {
                let cursor = if full_reload {
                    None
                } else {
                    self.state.read().last_seen_timestamp
                };
                self.client
                    .fetch_logs(cursor)
                    .await
                    .map(|batch| FeedPayload::Logs { batch, cursor })
            }
            FeedKind::AnomalousIps => self
                .client
                .fetch_anomalous_ips()
                .await
                .map(FeedPayload::AnomalousIps),
            FeedKind::AttackTimeline => self
                .client
                .fetch_attack_timeline()
                .await
                .map(FeedPayload::AttackTimeline),
            FeedKind::AttackOrigins => self
                .client
                .fetch_attack_origins()
                .await
                .map(FeedPayload::AttackOrigins),
            FeedKind::PreventionMode => self
                .client
                .prevention_mode()
                .await
                .map(FeedPayload::PreventionMode),
        };

        if let Err(e) = &result {
            tracing::warn!(feed = feed.name(), reason = %e.reason(), error = %e, "poll failed");
        }
        (seq, result)
    }

    /// Apply a finished poll. Returns false when the response was discarded
    /// (store closed, or a newer response already applied).
    pub(crate) fn complete(
        &self,
        feed: FeedKind,
        seq: u64,
        result: &Result<FeedPayload, FetchError>,
        scheduler: Option<&PollScheduler>,
    ) -> bool {
        if self.is_closed() {
            return false;
        }

        {
            let mut state = self.state.write();
            let slot = state.slot_mut(feed);

            if let Some(scheduler) = scheduler {
                slot.sync_schedule(scheduler);
            }
            if seq <= slot.applied_seq {
                tracing::debug!(
                    feed = feed.name(),
                    seq,
                    applied = slot.applied_seq,
                    "discarding stale response"
                );
                drop(state);
                self.bump_revision();
                return false;
            }
            slot.applied_seq = seq;
            // An older request may still be outstanding; loading only ends
            // once the newest issued request has been answered.
            slot.status.loading = seq < slot.issued_seq;

            match result {
                Ok(payload) => {
                    let now = Utc::now();
                    let slot = state.slot_mut(feed);
                    slot.status.error = None;
                    slot.status.last_update = Some(now);
                    self.apply_payload(&mut state, payload.clone());
                    if feed.is_primary() {
                        state.last_update = Some(now);
                    }
                }
                Err(e) => {
                    state.slot_mut(feed).status.error = Some(e.to_string());
                }
            }
        }

        self.bump_revision();
        true
    }

    fn apply_payload(&self, state: &mut DashboardState, payload: FeedPayload) {
        match payload {
            FeedPayload::Logs { batch, cursor } => {
                let received = batch.len();
                let reconciled = self
                    .reconciler
                    .reconcile(&state.retained_logs, batch, cursor);
                tracing::debug!(
                    received,
                    added = reconciled.added,
                    retained = reconciled.logs.len(),
                    "logs reconciled"
                );
                state.retained_logs = reconciled.logs;
                state.last_seen_timestamp = reconciled.cursor;
            }
            FeedPayload::AnomalousIps(ips) => state.anomalous_ips = ips,
            FeedPayload::AttackTimeline(points) => state.attack_timeline = points,
            FeedPayload::AttackOrigins(origins) => state.attack_origins = origins,
            FeedPayload::PreventionMode(enabled) => state.prevention_enabled = Some(enabled),
        }
    }

    /// Mirror scheduler phase into the feed's status
    pub(crate) fn record_schedule(&self, feed: FeedKind, scheduler: &PollScheduler) {
        if self.is_closed() {
            return;
        }
        self.state.write().slot_mut(feed).sync_schedule(scheduler);
        self.bump_revision();
    }

    /// Manual retry clears the surfaced error
    pub(crate) fn clear_error(&self, feed: FeedKind) {
        if self.is_closed() {
            return;
        }
        self.state.write().slot_mut(feed).status.error = None;
        self.bump_revision();
    }

    fn snapshot(&self) -> DashboardSnapshot {
        let revision = *self.revision.borrow();
        let state = self.state.read();
        DashboardSnapshot::from_state(self.session_id, revision, &state)
    }
}

// ============================================================================
// PUBLIC HANDLE
// ============================================================================

/// A running dashboard session
pub struct DashboardStore {
    inner: Arc<StoreInner>,
    commands: HashMap<FeedKind, mpsc::UnboundedSender<FeedCommand>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DashboardStore {
    /// Start polling the backend named in `config`. Must run inside a tokio runtime.
    pub fn start(config: &DashboardConfig) -> Result<Self, DashboardError> {
        config.validate()?;
        let transport = HttpTransport::new(&config.api_url)?;
        Ok(Self::start_with(config, Arc::new(transport), Arc::new(TracingSink)))
    }

    /// Start with an explicit transport and attempt sink
    pub fn start_with(
        config: &DashboardConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn AttemptSink>,
    ) -> Self {
        let fetcher = ResilientFetcher::new(transport, config.retry_policy()).with_sink(sink);
        let throttle = Arc::new(EndpointThrottle::new(config.throttle_interval));
        let client = ApiClient::new(fetcher, throttle);
        let reconciler = LogReconciler::new(config.log_capacity, config.dedup_key);
        let inner = Arc::new(StoreInner::new(client, reconciler));

        let (shutdown, _) = watch::channel(false);
        let mut commands = HashMap::new();
        let mut tasks = Vec::new();

        let span = tracing::info_span!("dashboard", session = %inner.session_id);
        let _enter = span.enter();
        tracing::info!(api_url = %config.api_url, "starting dashboard session");

        for feed in FeedKind::ALL {
            let policy: SchedulerPolicy = if feed.is_primary() {
                config.log_schedule()
            } else {
                config.aux_schedule()
            };
            let (tx, rx) = mpsc::unbounded_channel();
            commands.insert(feed, tx);

            let task = run_feed(
                inner.clone(),
                feed,
                PollScheduler::new(policy),
                rx,
                shutdown.subscribe(),
            );
            tasks.push(tokio::spawn(task.instrument(span.clone())));
        }

        Self {
            inner,
            commands,
            shutdown,
            tasks: Mutex::new(tasks),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    /// Read-only copy of the current view
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.inner.snapshot()
    }

    /// Revision counter, bumped after every applied change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Full reload of every feed, ignoring the incremental cursor once
    pub fn refresh(&self) {
        tracing::info!("manual refresh requested");
        self.broadcast(FeedCommand::Refresh);
    }

    /// Poll every feed now, regardless of backoff or pause
    pub fn retry(&self) {
        tracing::info!("manual retry requested");
        self.broadcast(FeedCommand::Retry);
    }

    fn broadcast(&self, command: FeedCommand) {
        if self.inner.is_closed() {
            return;
        }
        for tx in self.commands.values() {
            let _ = tx.send(command);
        }
    }

    /// Relay a prevention-mode change to the backend
    pub async fn set_prevention_mode(&self, enabled: bool) -> Result<bool, FetchError> {
        let feed = FeedKind::PreventionMode;
        let seq = self.inner.begin(feed).ok_or(FetchError::Closed)?;
        let result = self.inner.client.set_prevention_mode(enabled).await;
        let payload = result.clone().map(FeedPayload::PreventionMode);
        self.inner.complete(feed, seq, &payload, None);
        result
    }

    /// Stop all feeds and wait for their tasks to exit.
    ///
    /// In-flight requests are dropped; nothing is applied afterwards.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(session = %self.inner.session_id, "dashboard teardown");
        let _ = self.shutdown.send(true);
        self.inner.client.throttle().clear();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
    }
}

impl Drop for DashboardStore {
    fn drop(&mut self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}
