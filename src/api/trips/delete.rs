use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::TripsState;
use crate::api::error::{from_dispatch, ApiError};
use crate::api::ErrorResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteTripRequest {
    pub trip_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteTripResponse {
    pub trip_id: String,
}

/// Delete a trip.
///
/// Dependent assignment and message rows are removed first; the whole
/// cleanup is one transaction.
#[utoipa::path(
    post,
    path = "/api/trips/delete",
    request_body = DeleteTripRequest,
    responses(
        (status = 200, description = "Trip deleted", body = DeleteTripResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "trips"
)]
pub async fn delete_trip(
    State(state): State<TripsState>,
    Json(request): Json<DeleteTripRequest>,
) -> Result<Json<DeleteTripResponse>, ApiError> {
    state
        .service
        .delete_trip(&request.trip_id)
        .await
        .map_err(from_dispatch)?;
    Ok(Json(DeleteTripResponse {
        trip_id: request.trip_id,
    }))
}
