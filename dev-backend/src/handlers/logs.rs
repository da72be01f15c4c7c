//! Request log handlers

use axum::{extract::{State, Query}, Json};
use serde::{Deserialize, Serialize};

use waf_dashboard_core::{parse_timestamp, LogRecord};

use crate::{AppState, AppResult, AppError};

#[derive(Debug, Deserialize, Default)]
pub struct LogFilter {
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub inserted: usize,
    pub total: usize,
}

/// List logs, only those newer than `since` when given
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> AppResult<Json<Vec<LogRecord>>> {
    let since = match filter.since.as_deref() {
        Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
            AppError::ValidationError(format!("Invalid since timestamp: {}", raw))
        })?),
        None => None,
    };

    let logs = state.store.logs_since(since);
    tracing::debug!(since = ?since, count = logs.len(), "serving logs");
    Ok(Json(logs))
}

/// Append log records
pub async fn ingest(
    State(state): State<AppState>,
    Json(records): Json<Vec<LogRecord>>,
) -> AppResult<Json<IngestResponse>> {
    let inserted = state.store.insert(records);
    Ok(Json(IngestResponse {
        inserted,
        total: state.store.log_count(),
    }))
}
