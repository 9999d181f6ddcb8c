//! Reference data the dispatch workflow joins against: clients, vehicles,
//! drivers and invoices.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ClientType {
    Individual,
    Organization,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub client_type: ClientType,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Vehicle {
    pub id: String,
    pub make: String,
    pub model: String,
    pub plate_number: String,
    pub year: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: String,
    pub client_id: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
