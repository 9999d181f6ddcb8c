use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::dispatch::DispatchError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error shape every handler returns: a status code plus a JSON body.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn respond(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    respond(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    respond(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    respond(StatusCode::NOT_FOUND, message)
}

pub fn service_unavailable(message: impl Into<String>) -> ApiError {
    respond(StatusCode::SERVICE_UNAVAILABLE, message)
}

pub fn bad_gateway(message: impl Into<String>) -> ApiError {
    respond(StatusCode::BAD_GATEWAY, message)
}

/// Map a dispatch failure onto the HTTP boundary.
pub fn from_dispatch(err: DispatchError) -> ApiError {
    match err {
        DispatchError::Validation(_) => bad_request(err.to_string()),
        DispatchError::NotFound(_) => not_found(err.to_string()),
        DispatchError::Database(_) => internal_error(err.to_string()),
    }
}
