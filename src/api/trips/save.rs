use axum::extract::State;
use axum::Json;

use super::TripsState;
use crate::api::error::{from_dispatch, ApiError};
use crate::api::ErrorResponse;
use crate::dispatch::{SaveOutcome, SaveTripRequest};

/// Create or update a trip.
///
/// One endpoint, three outcomes: an update when `editing_trip_id` is present,
/// a batch of generated trips when the recurrence flag is set, otherwise a
/// single create. New trips always start `scheduled`.
#[utoipa::path(
    post,
    path = "/api/trips/save",
    request_body = SaveTripRequest,
    responses(
        (status = 200, description = "Save outcome with the affected trip ids", body = SaveOutcome),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "trips"
)]
pub async fn save_trip(
    State(state): State<TripsState>,
    Json(request): Json<SaveTripRequest>,
) -> Result<Json<SaveOutcome>, ApiError> {
    let outcome = state
        .service
        .save_trip(request)
        .await
        .map_err(from_dispatch)?;
    Ok(Json(outcome))
}
