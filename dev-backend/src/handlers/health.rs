//! Health check handler

use axum::{extract::State, http::Uri, Json};
use serde::Serialize;

use crate::{AppState, AppError};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    logs: usize,
    prevention_enabled: bool,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        logs: state.store.log_count(),
        prevention_enabled: state.store.prevention_enabled(),
    })
}

/// JSON 404 for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
