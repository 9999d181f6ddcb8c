use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::TripsState;
use crate::api::error::{internal_error, not_found, ApiError};
use crate::api::ErrorResponse;
use crate::models::trip::{DisplayTrip, TripStatus};

const DISPLAY_TRIP_SELECT: &str = "\
    SELECT t.*, \
           c.name AS client_name, c.client_type AS client_type, \
           CASE WHEN v.id IS NULL THEN NULL \
                ELSE v.make || ' ' || v.model || ' (' || v.plate_number || ')' END AS vehicle, \
           d.name AS driver_name, d.avatar_url AS driver_avatar_url, d.phone AS driver_phone \
    FROM trips t \
    JOIN clients c ON c.id = t.client_id \
    LEFT JOIN vehicles v ON v.id = t.vehicle_id \
    LEFT JOIN drivers d ON d.id = t.driver_id";

#[derive(Debug, Deserialize, IntoParams)]
pub struct TripListQuery {
    /// Filter by lifecycle status
    pub status: Option<TripStatus>,
    /// Inclusive start date (YYYY-MM-DD)
    pub from: Option<NaiveDate>,
    /// Inclusive end date (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TripListResponse {
    pub trips: Vec<DisplayTrip>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TripByIdRequest {
    pub trip_id: String,
}

/// List trips with their joined client, vehicle and driver display data
#[utoipa::path(
    get,
    path = "/api/trips",
    params(TripListQuery),
    responses(
        (status = 200, description = "Trips ordered by date and pickup time", body = TripListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "trips"
)]
pub async fn list_trips(
    State(state): State<TripsState>,
    Query(query): Query<TripListQuery>,
) -> Result<Json<TripListResponse>, ApiError> {
    let sql = format!(
        "{} WHERE (? IS NULL OR t.status = ?) \
            AND (? IS NULL OR t.date >= ?) \
            AND (? IS NULL OR t.date <= ?) \
         ORDER BY t.date, t.pickup_time",
        DISPLAY_TRIP_SELECT
    );
    let trips: Vec<DisplayTrip> = sqlx::query_as(&sql)
        .bind(query.status)
        .bind(query.status)
        .bind(query.from)
        .bind(query.from)
        .bind(query.to)
        .bind(query.to)
        .fetch_all(&state.pool)
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    Ok(Json(TripListResponse { trips }))
}

/// Get one trip with its display data
#[utoipa::path(
    post,
    path = "/api/trips/by-id",
    request_body = TripByIdRequest,
    responses(
        (status = 200, description = "The trip", body = DisplayTrip),
        (status = 404, description = "Trip not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "trips"
)]
pub async fn get_trip(
    State(state): State<TripsState>,
    Json(request): Json<TripByIdRequest>,
) -> Result<Json<DisplayTrip>, ApiError> {
    let sql = format!("{} WHERE t.id = ?", DISPLAY_TRIP_SELECT);
    let trip: Option<DisplayTrip> = sqlx::query_as(&sql)
        .bind(&request.trip_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    trip.map(Json).ok_or_else(|| not_found("trip not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::directory::ClientType;
    use crate::testutil;

    #[tokio::test]
    async fn display_join_builds_vehicle_and_driver_fields() {
        let pool = testutil::setup_pool().await;
        let client_id = testutil::seed_client(&pool, ClientType::Organization).await;
        let vehicle_id = testutil::seed_vehicle(&pool).await;
        let driver_id = testutil::seed_driver(&pool, "Amina Yusuf").await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;
        sqlx::query("UPDATE trips SET vehicle_id = ?, driver_id = ? WHERE id = ?")
            .bind(&vehicle_id)
            .bind(&driver_id)
            .bind(&trip_id)
            .execute(&pool)
            .await
            .unwrap();

        let sql = format!("{} WHERE t.id = ?", DISPLAY_TRIP_SELECT);
        let trip: DisplayTrip = sqlx::query_as(&sql)
            .bind(&trip_id)
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(trip.trip.id, trip_id);
        assert_eq!(trip.client_type, ClientType::Organization);
        assert_eq!(trip.vehicle.as_deref(), Some("Toyota Hiace (KDA 123X)"));
        assert_eq!(trip.driver_name.as_deref(), Some("Amina Yusuf"));
    }

    #[tokio::test]
    async fn unassigned_trips_join_to_empty_display_fields() {
        let pool = testutil::setup_pool().await;
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        let sql = format!("{} WHERE t.id = ?", DISPLAY_TRIP_SELECT);
        let trip: DisplayTrip = sqlx::query_as(&sql)
            .bind(&trip_id)
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(trip.vehicle.is_none());
        assert!(trip.driver_name.is_none());
        assert_eq!(trip.client_name, "Acme Logistics");
    }
}
