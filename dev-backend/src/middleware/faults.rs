//! Fault injection middleware

use std::time::Duration;

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde_json::json;

use crate::{AppState, AppError};
use crate::models::Fault;

/// Middleware: serve the next queued fault for this route, if any
pub async fn inject_faults(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let route = req.uri().path().to_string();
    let Some(fault) = state.store.faults().take(&route) else {
        return next.run(req).await;
    };

    tracing::info!(route = %route, fault = ?fault, "injecting fault");
    match fault {
        Fault::Status { status } => AppError::Injected(status).into_response(),
        Fault::ErrorBody { message } => (StatusCode::OK, Json(json!({ "error": message }))).into_response(),
        Fault::Garbage => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/html")],
            "<html><body><h1>502 Bad Gateway</h1></body></html>",
        )
            .into_response(),
        Fault::Delay { ms } => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            next.run(req).await
        }
    }
}
