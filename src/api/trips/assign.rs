use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::TripsState;
use crate::api::error::{from_dispatch, internal_error, ApiError};
use crate::api::ErrorResponse;
use crate::models::assignment::TripAssignment;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDriverRequest {
    pub trip_id: String,
    pub driver_id: String,
    /// Optional dispatcher note recorded on the assignment
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentHistoryRequest {
    pub trip_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentListResponse {
    pub assignments: Vec<TripAssignment>,
}

/// Assign a driver to a trip.
///
/// Records a pending assignment, moves the trip's current-driver pointer and
/// logs the activity, all in one transaction. Re-assignment appends to the
/// history; it never overwrites.
#[utoipa::path(
    post,
    path = "/api/trips/assign",
    request_body = AssignDriverRequest,
    responses(
        (status = 200, description = "The recorded assignment", body = TripAssignment),
        (status = 404, description = "Trip or driver not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "trips"
)]
pub async fn assign_driver(
    State(state): State<TripsState>,
    Json(request): Json<AssignDriverRequest>,
) -> Result<Json<TripAssignment>, ApiError> {
    let assignment = state
        .service
        .assign_driver(&request.trip_id, &request.driver_id, request.note)
        .await
        .map_err(from_dispatch)?;
    Ok(Json(assignment))
}

/// Assignment history for a trip, newest first
#[utoipa::path(
    post,
    path = "/api/trips/assignments",
    request_body = AssignmentHistoryRequest,
    responses(
        (status = 200, description = "Assignment history", body = AssignmentListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "trips"
)]
pub async fn list_assignments(
    State(state): State<TripsState>,
    Json(request): Json<AssignmentHistoryRequest>,
) -> Result<Json<AssignmentListResponse>, ApiError> {
    let assignments: Vec<TripAssignment> = sqlx::query_as(
        "SELECT * FROM trip_assignments WHERE trip_id = ? ORDER BY assigned_at DESC",
    )
    .bind(&request.trip_id)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    Ok(Json(AssignmentListResponse { assignments }))
}
