use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Accepted,
    Rejected,
}

/// One historical record of a driver being attached to a trip. Append-only;
/// the trip's `driver_id` pointer always reflects the latest row.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TripAssignment {
    pub id: String,
    pub trip_id: String,
    pub driver_id: String,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub assigned_at: DateTime<Utc>,
}
