//! Fault plan handlers

use std::collections::BTreeMap;

use axum::{extract::State, Json};

use crate::{AppState, AppResult, AppError};
use crate::models::{QueueFault, MAX_QUEUED_FAULTS};

/// Queued fault count per route
pub async fn list(State(state): State<AppState>) -> Json<BTreeMap<String, usize>> {
    Json(state.store.faults().summary())
}

/// Queue a fault for a route
pub async fn push(
    State(state): State<AppState>,
    Json(req): Json<QueueFault>,
) -> AppResult<Json<BTreeMap<String, usize>>> {
    if !req.route.starts_with("/api/") {
        return Err(AppError::ValidationError(format!("Unknown route: {}", req.route)));
    }
    let pending = state.store.faults().pending(&req.route);
    if req.times > MAX_QUEUED_FAULTS.saturating_sub(pending) {
        return Err(AppError::ValidationError(format!(
            "At most {} faults may be queued per route ({} pending)",
            MAX_QUEUED_FAULTS, pending
        )));
    }

    tracing::info!(route = %req.route, fault = ?req.fault, times = req.times, "queueing fault");
    for _ in 0..req.times {
        state.store.faults().push(&req.route, req.fault.clone());
    }
    Ok(Json(state.store.faults().summary()))
}

pub async fn clear(State(state): State<AppState>) -> Json<BTreeMap<String, usize>> {
    state.store.faults().clear();
    Json(BTreeMap::new())
}
