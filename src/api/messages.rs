//! Per-trip message threads and the dispatcher inbox queries.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{from_dispatch, internal_error, ApiError};
use crate::api::ErrorResponse;
use crate::dispatch::DispatchService;
use crate::models::message::{SenderType, TripMessage};
use crate::models::trip::TripStatus;

const RECENT_LIMIT_DEFAULT: u32 = 10;
const RECENT_LIMIT_MAX: u32 = 50;

#[derive(Clone)]
pub struct MessagesState {
    pub pool: SqlitePool,
    pub service: DispatchService,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub trip_id: String,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TripMessagesRequest {
    pub trip_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageListResponse {
    pub messages: Vec<TripMessage>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentMessagesQuery {
    /// Page size for the notification dropdown (default 10, max 50)
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    /// Unread driver messages across scheduled and in-progress trips
    pub count: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub trip_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Append a message to a trip's thread
#[utoipa::path(
    post,
    path = "/api/messages/send",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "The stored message", body = TripMessage),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn send_message(
    State(state): State<MessagesState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<TripMessage>, ApiError> {
    let message = state
        .service
        .send_message(
            &request.trip_id,
            request.sender_type,
            &request.sender_name,
            &request.message,
        )
        .await
        .map_err(from_dispatch)?;
    Ok(Json(message))
}

/// Thread for one trip, oldest first
#[utoipa::path(
    post,
    path = "/api/messages/by-trip",
    request_body = TripMessagesRequest,
    responses(
        (status = 200, description = "Messages ordered ascending by time", body = MessageListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn list_trip_messages(
    State(state): State<MessagesState>,
    Json(request): Json<TripMessagesRequest>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let messages: Vec<TripMessage> = sqlx::query_as(
        "SELECT * FROM trip_messages WHERE trip_id = ? ORDER BY sent_at ASC, id ASC",
    )
    .bind(&request.trip_id)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    Ok(Json(MessageListResponse { messages }))
}

/// Latest messages across all trips, newest first
#[utoipa::path(
    get,
    path = "/api/messages/recent",
    params(RecentMessagesQuery),
    responses(
        (status = 200, description = "Recent messages", body = MessageListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn recent_messages(
    State(state): State<MessagesState>,
    Query(query): Query<RecentMessagesQuery>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(RECENT_LIMIT_DEFAULT)
        .min(RECENT_LIMIT_MAX);

    let messages: Vec<TripMessage> = sqlx::query_as(
        "SELECT * FROM trip_messages ORDER BY sent_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(format!("Database error: {}", e)))?;

    Ok(Json(MessageListResponse { messages }))
}

/// Unread driver messages for the dispatcher inbox badge, scoped to active
/// trips
#[utoipa::path(
    get,
    path = "/api/messages/unread-count",
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn unread_count(
    State(state): State<MessagesState>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count: i64 = sqlx::query_scalar(
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

    Ok(Json(UnreadCountResponse { count }))
}

/// Mark a trip's driver messages as read
#[utoipa::path(
    post,
    path = "/api/messages/mark-read",
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Number of messages marked read", body = MarkReadResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn mark_messages_read(
    State(state): State<MessagesState>,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let updated = state
        .service
        .mark_messages_read(&request.trip_id)
        .await
        .map_err(from_dispatch)?;
    Ok(Json(MarkReadResponse { updated }))
}

pub fn router(pool: SqlitePool, service: DispatchService) -> Router {
    let state = MessagesState { pool, service };
    Router::new()
        .route("/send", post(send_message))
        .route("/by-trip", post(list_trip_messages))
        .route("/recent", get(recent_messages))
        .route("/unread-count", get(unread_count))
        .route("/mark-read", post(mark_messages_read))
        .with_state(state)
}
