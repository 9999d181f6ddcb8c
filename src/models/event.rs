//! Fire-and-forget audit and notification records emitted as side effects of
//! trip operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
}

/// A notification surfaced in the back-office alert badge.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub alert_type: String,
    pub priority: AlertPriority,
    pub description: Option<String>,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One line in the append-only activity log.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub activity_type: String,
    pub related_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
