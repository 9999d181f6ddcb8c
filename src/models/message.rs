use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SenderType {
    Admin,
    Driver,
}

/// One message in a trip's dispatcher/driver thread. Append-only; there is no
/// edit or delete.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TripMessage {
    pub id: String,
    pub trip_id: String,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub message: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}
