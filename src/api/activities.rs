use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{internal_error, ApiError};
use crate::api::ErrorResponse;
use crate::models::event::Activity;

#[derive(Clone)]
pub struct ActivitiesState {
    pub pool: SqlitePool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityListQuery {
    /// Page size (default 50)
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityListResponse {
    pub activities: Vec<Activity>,
}

/// Recent activity log entries, newest first
#[utoipa::path(
    get,
    path = "/api/activities",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "Activity log", body = ActivityListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "activities"
)]
pub async fn list_activities(
    State(state): State<ActivitiesState>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<ActivityListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    let activities: Vec<Activity> =
        sqlx::query_as("SELECT * FROM activities ORDER BY created_at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&state.pool)
            .await
            .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    Ok(Json(ActivityListResponse { activities }))
}

pub fn router(pool: SqlitePool) -> Router {
    let state = ActivitiesState { pool };
    Router::new()
        .route("/", get(list_activities))
        .with_state(state)
}
