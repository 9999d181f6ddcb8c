use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{internal_error, not_found, ApiError};
use crate::api::ErrorResponse;
use crate::models::event::Alert;

#[derive(Clone)]
pub struct AlertsState {
    pub pool: SqlitePool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AlertListQuery {
    /// Only return alerts not yet marked read
    pub unread_only: Option<bool>,
    /// Page size (default 50)
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertListResponse {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAlertReadRequest {
    pub alert_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAlertReadResponse {
    pub alert_id: String,
}

/// List alerts, newest first
#[utoipa::path(
    get,
    path = "/api/alerts",
    params(AlertListQuery),
    responses(
        (status = 200, description = "Alerts ordered by creation time", body = AlertListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AlertsState>,
    Query(query): Query<AlertListQuery>,
) -> Result<Json<AlertListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    let unread_only = query.unread_only.unwrap_or(false);

    let alerts: Vec<Alert> = sqlx::query_as(
        "SELECT * FROM alerts WHERE (? = 0 OR is_read = 0) \
         ORDER BY created_at DESC LIMIT ?",
    )
    .bind(unread_only)
    .bind(limit)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    Ok(Json(AlertListResponse { alerts }))
}

/// Mark one alert as read
#[utoipa::path(
    post,
    path = "/api/alerts/mark-read",
    request_body = MarkAlertReadRequest,
    responses(
        (status = 200, description = "Alert marked read", body = MarkAlertReadResponse),
        (status = 404, description = "Alert not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn mark_alert_read(
    State(state): State<AlertsState>,
    Json(request): Json<MarkAlertReadRequest>,
) -> Result<Json<MarkAlertReadResponse>, ApiError> {
    let result = sqlx::query("UPDATE alerts SET is_read = 1 WHERE id = ?")
        .bind(&request.alert_id)
        .execute(&state.pool)
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    if result.rows_affected() == 0 {
        return Err(not_found("alert not found"));
    }
    Ok(Json(MarkAlertReadResponse {
        alert_id: request.alert_id,
    }))
}

pub fn router(pool: SqlitePool) -> Router {
    let state = AlertsState { pool };
    Router::new()
        .route("/", get(list_alerts))
        .route("/mark-read", post(mark_alert_read))
        .with_state(state)
}
