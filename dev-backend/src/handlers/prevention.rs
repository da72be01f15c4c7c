//! Prevention mode handlers

use axum::{extract::State, Json};

use waf_dashboard_core::PreventionMode;

use crate::AppState;

pub async fn get(State(state): State<AppState>) -> Json<PreventionMode> {
    Json(PreventionMode {
        enabled: state.store.prevention_enabled(),
    })
}

pub async fn set(
    State(state): State<AppState>,
    Json(req): Json<PreventionMode>,
) -> Json<PreventionMode> {
    tracing::info!(enabled = req.enabled, "prevention mode changed");
    Json(PreventionMode {
        enabled: state.store.set_prevention(req.enabled),
    })
}
