//! WAF Dashboard Development Backend
//!
//! Serves the dashboard API from in-memory fixtures, with a per-route fault
//! plan for exercising client retry, backoff and pause behavior.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Router (Axum)                               │
//! │   /health            /api/dev/faults         │
//! │   /api/*  ──▶ inject_faults ──▶ handlers     │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!                 ┌─────────────┐    ┌───────────────────┐
//!                 │FixtureStore │◀───│ TrafficGenerator  │
//!                 └─────────────┘    └───────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Fault, TrafficGenerator};
pub use store::FixtureStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FixtureStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(FixtureStore::new(config.prevention_enabled)),
            config,
        }
    }

    /// Fill the store with `config.seed_logs` records of synthetic history
    pub fn seed(&self, generator: &mut TrafficGenerator) -> usize {
        let records = generator.history(self.config.seed_logs, Utc::now());
        self.store.insert(records)
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Dashboard API (subject to the fault plan)
    let api_routes = Router::new()
        .route("/api/logs", get(handlers::logs::list).post(handlers::logs::ingest))
        .route("/api/anomalous-ips", get(handlers::analytics::anomalous_ips))
        .route("/api/attack-timeline", get(handlers::analytics::attack_timeline))
        .route("/api/attack-origins", get(handlers::analytics::attack_origins))
        .route("/api/waf/prevention", get(handlers::prevention::get).post(handlers::prevention::set))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::faults::inject_faults,
        ));

    // Control routes
    let control_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route(
            "/api/dev/faults",
            get(handlers::faults::list)
                .post(handlers::faults::push)
                .delete(handlers::faults::clear),
        );

    Router::new()
        .merge(api_routes)
        .merge(control_routes)
        .fallback(handlers::health::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

/// Append one synthetic record every `interval`
pub fn spawn_traffic(state: AppState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut generator = TrafficGenerator::from_entropy();
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let record = generator.next_record(Utc::now());
            tracing::debug!(ip = %record.ip, attack = record.is_attack(), "generated request");
            state.store.insert(vec![record]);
        }
    })
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, create_router(state)).await
}

/// Bind an ephemeral local port and serve in the background
pub async fn spawn(state: AppState) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!("server error: {}", e);
        }
    });
    Ok((addr, handle))
}
