/**
 * API STATUT - Exposition HTTP de l'état du kernel de sync
 *
 * ROUTES :
 * - GET  /health              → "ok"
 * - GET  /system/health       → santé du cycle de sync (nb cycles, dernier cycle, alertes)
 * - GET  /alerts?active=true  → alertes, plus récentes d'abord
 * - POST /alerts/{id}/ack     → acquittement d'une alerte
 *
 * Pas d'auth ni de CRUD ici : les serveurs et nodes sont provisionnés ailleurs.
 */

use crate::health::{HealthTracker, SyncHealth};
use crate::models::{Alert, AlertLevel};
use crate::store::{AlertFilter, Store, StoreError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub health: HealthTracker,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertView {
    pub id: String,
    pub device_id: Option<String>,
    pub level: AlertLevel,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: String, // RFC3339
}

fn to_view(a: &Alert) -> AlertView {
    AlertView {
        id: a.id.clone(),
        device_id: a.device_id.clone(),
        level: a.level,
        message: a.message.clone(),
        acknowledged: a.acknowledged,
        created_at: a.created_at.format(&Rfc3339).unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
struct AlertParams {
    active: Option<bool>,
    limit: Option<usize>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/alerts", get(list_alerts))
        .route("/alerts/{id}/ack", post(acknowledge_alert))
        .with_state(app_state)
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<SyncHealth> {
    Json(app.health.get_health())
}

// GET /alerts
async fn list_alerts(
    State(app): State<AppState>,
    Query(params): Query<AlertParams>,
) -> Result<Json<Vec<AlertView>>, StatusCode> {
    let filter = AlertFilter { active_only: params.active.unwrap_or(false), limit: params.limit };
    match app.store.list_alerts(&filter) {
        Ok(alerts) => Ok(Json(alerts.iter().map(to_view).collect())),
        Err(e) => {
            error!("[http] failed to list alerts: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// POST /alerts/{id}/ack
async fn acknowledge_alert(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AlertView>, StatusCode> {
    match app.store.acknowledge_alert(&id) {
        Ok(alert) => {
            info!("[http] alert {} acknowledged", id);
            Ok(Json(to_view(&alert)))
        }
        Err(StoreError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("[http] failed to acknowledge alert {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
