//! Reference-data lists the back office joins trips against.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::error::{internal_error, ApiError};
use crate::api::ErrorResponse;
use crate::models::directory::{Client, Driver, Vehicle};

#[derive(Clone)]
pub struct DirectoryState {
    pub pool: SqlitePool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientListResponse {
    pub clients: Vec<Client>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VehicleListResponse {
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverListResponse {
    pub drivers: Vec<Driver>,
}

/// List clients
#[utoipa::path(
    get,
    path = "/api/clients",
    responses(
        (status = 200, description = "All clients", body = ClientListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "directory"
)]
pub async fn list_clients(
    State(state): State<DirectoryState>,
) -> Result<Json<ClientListResponse>, ApiError> {
    let clients: Vec<Client> = sqlx::query_as("SELECT * FROM clients ORDER BY name")
        .fetch_all(&state.pool)
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    Ok(Json(ClientListResponse { clients }))
}

/// List vehicles
#[utoipa::path(
    get,
    path = "/api/vehicles",
    responses(
        (status = 200, description = "All vehicles", body = VehicleListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "directory"
)]
pub async fn list_vehicles(
    State(state): State<DirectoryState>,
) -> Result<Json<VehicleListResponse>, ApiError> {
    let vehicles: Vec<Vehicle> =
        sqlx::query_as("SELECT * FROM vehicles ORDER BY make, model, plate_number")
            .fetch_all(&state.pool)
            .await
            .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    Ok(Json(VehicleListResponse { vehicles }))
}

/// List drivers
#[utoipa::path(
    get,
    path = "/api/drivers",
    responses(
        (status = 200, description = "All drivers", body = DriverListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "directory"
)]
pub async fn list_drivers(
    State(state): State<DirectoryState>,
) -> Result<Json<DriverListResponse>, ApiError> {
    let drivers: Vec<Driver> = sqlx::query_as("SELECT * FROM drivers ORDER BY name")
        .fetch_all(&state.pool)
        .await
        .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    Ok(Json(DriverListResponse { drivers }))
}

pub fn router(pool: SqlitePool) -> Router {
    let state = DirectoryState { pool };
    Router::new()
        .route("/clients", get(list_clients))
        .route("/vehicles", get(list_vehicles))
        .route("/drivers", get(list_drivers))
        .with_state(state)
}
