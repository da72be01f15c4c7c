//! Aggregate feed handlers

use std::collections::BTreeMap;

use axum::{extract::{State, Query}, Json};
use serde::{Deserialize, Serialize};

use waf_dashboard_core::{AnomalousIp, AttackOriginEntry, AttackTimelinePoint, OriginStats};

use crate::AppState;
use crate::models::analytics;

pub async fn anomalous_ips(State(state): State<AppState>) -> Json<Vec<AnomalousIp>> {
    Json(state.store.with_logs(analytics::anomalous_ips))
}

pub async fn attack_timeline(State(state): State<AppState>) -> Json<Vec<AttackTimelinePoint>> {
    Json(state.store.with_logs(analytics::attack_timeline))
}

#[derive(Debug, Deserialize, Default)]
pub struct OriginsQuery {
    /// Answer with an object keyed by country instead of a list
    #[serde(default)]
    pub keyed: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OriginsResponse {
    List(Vec<AttackOriginEntry>),
    Keyed(BTreeMap<String, OriginStats>),
}

pub async fn attack_origins(
    State(state): State<AppState>,
    Query(query): Query<OriginsQuery>,
) -> Json<OriginsResponse> {
    let keyed = state.store.with_logs(analytics::attack_origins);
    if query.keyed {
        Json(OriginsResponse::Keyed(keyed))
    } else {
        Json(OriginsResponse::List(analytics::origins_list(keyed)))
    }
}
