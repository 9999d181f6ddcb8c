use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::TripsState;
use crate::api::error::{from_dispatch, ApiError};
use crate::api::ErrorResponse;
use crate::models::trip::TripStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub trip_id: String,
    pub status: TripStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SetStatusResponse {
    pub trip_id: String,
    pub status: TripStatus,
}

/// Apply a manual status transition.
///
/// The lifecycle is linear: scheduled -> in_progress -> completed/cancelled,
/// plus direct completion or cancellation from scheduled. Completed and
/// cancelled are terminal.
#[utoipa::path(
    post,
    path = "/api/trips/set-status",
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = SetStatusResponse),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "trips"
)]
pub async fn set_trip_status(
    State(state): State<TripsState>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<SetStatusResponse>, ApiError> {
    state
        .service
        .set_status(&request.trip_id, request.status)
        .await
        .map_err(from_dispatch)?;

    Ok(Json(SetStatusResponse {
        trip_id: request.trip_id,
        status: request.status,
    }))
}
