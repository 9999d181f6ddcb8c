use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::error::{internal_error, ApiError};
use crate::models::message::SenderType;
use crate::models::trip::TripStatus;

#[derive(Clone)]
pub struct HealthState {
    pub pool: SqlitePool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Total number of trips in the store
    pub trips_total: i64,
    /// Trips currently in the scheduled state
    pub trips_scheduled: i64,
    /// Trips currently in progress
    pub trips_in_progress: i64,
    /// Unread driver messages across active trips
    pub unread_driver_messages: i64,
    /// Alerts not yet marked read
    pub open_alerts: i64,
}

async fn count_trips(pool: &SqlitePool, status: Option<TripStatus>) -> Result<i64, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM trips WHERE status = ?")
                .bind(status)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM trips")
                .fetch_one(pool)
                .await
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(state): State<HealthState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let trips_total = count_trips(&state.pool, None)
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    let trips_scheduled = count_trips(&state.pool, Some(TripStatus::Scheduled))
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    let trips_in_progress = count_trips(&state.pool, Some(TripStatus::InProgress))
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    let unread_driver_messages: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM trip_messages m \
         JOIN trips t ON t.id = m.trip_id \
         WHERE m.sender_type = ? AND m.is_read = 0 AND t.status IN (?, ?)",
    )
    .bind(SenderType::Driver)
    .bind(TripStatus::Scheduled)
    .bind(TripStatus::InProgress)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    let open_alerts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alerts WHERE is_read = 0")
        .fetch_one(&state.pool)
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    Ok(Json(HealthResponse {
        healthy: true,
        trips_total,
        trips_scheduled,
        trips_in_progress,
        unread_driver_messages,
        open_alerts,
    }))
}

pub fn router(pool: SqlitePool) -> Router {
    let state = HealthState { pool };
    Router::new()
        .route("/", get(health_check))
        .with_state(state)
}
