//! Invoice list and outbound delivery through the mail provider.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::api::error::{
    bad_gateway, internal_error, not_found, service_unavailable, ApiError,
};
use crate::api::ErrorResponse;
use crate::dispatch::{insert_activity, publish_change, ChangeOp, ChangeSender};
use crate::models::directory::{Invoice, InvoiceStatus};
use crate::providers::mail::MailClient;

#[derive(Clone)]
pub struct InvoicesState {
    pub pool: SqlitePool,
    pub mail: Option<Arc<MailClient>>,
    pub changes_tx: ChangeSender,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendInvoiceRequest {
    pub invoice_id: String,
    /// Recipient email address
    pub recipient: String,
    /// Overrides the default "Invoice <id>" subject
    pub subject: Option<String>,
    /// Extra text placed above the invoice summary
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendInvoiceResponse {
    pub invoice_id: String,
    pub recipient: String,
}

#[derive(Debug, FromRow)]
struct InvoiceWithClient {
    #[sqlx(flatten)]
    invoice: Invoice,
    client_name: String,
}

/// List invoices, newest first
#[utoipa::path(
    get,
    path = "/api/invoices",
    responses(
        (status = 200, description = "All invoices", body = InvoiceListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<InvoicesState>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let invoices: Vec<Invoice> =
        sqlx::query_as("SELECT * FROM invoices ORDER BY created_at DESC")
            .fetch_all(&state.pool)
            .await
            .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    Ok(Json(InvoiceListResponse { invoices }))
}

/// Email an invoice to its recipient
#[utoipa::path(
    post,
    path = "/api/invoices/send-email",
    request_body = SendInvoiceRequest,
    responses(
        (status = 200, description = "Invoice sent", body = SendInvoiceResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse),
        (status = 502, description = "Mail provider rejected the message", body = ErrorResponse),
        (status = 503, description = "Outbound mail is not configured", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn send_invoice_email(
    State(state): State<InvoicesState>,
    Json(request): Json<SendInvoiceRequest>,
) -> Result<Json<SendInvoiceResponse>, ApiError> {
    let Some(mail) = state.mail.as_ref() else {
        return Err(service_unavailable("outbound mail is not configured"));
    };

    let row: Option<InvoiceWithClient> = sqlx::query_as(
        "SELECT i.*, c.name AS client_name \
         FROM invoices i JOIN clients c ON c.id = i.client_id \
         WHERE i.id = ?",
    )
    .bind(&request.invoice_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    let row = row.ok_or_else(|| not_found("invoice not found"))?;

    let subject = request
        .subject
        .clone()
        .unwrap_or_else(|| format!("Invoice {}", &row.invoice.id[..row.invoice.id.len().min(8)]));
    let html = render_invoice_html(&row.invoice, &row.client_name, request.message.as_deref());

    let email = mail.compose(&request.recipient, &subject, &html);
    mail.send(&email)
        .await
        .map_err(|e| bad_gateway(e.to_string()))?;

    // Delivery is the state change worth recording; a paid invoice stays paid
    if row.invoice.status != InvoiceStatus::Paid {
        sqlx::query("UPDATE invoices SET status = ? WHERE id = ?")
            .bind(InvoiceStatus::Sent)
            .bind(&row.invoice.id)
            .execute(&state.pool)
            .await
            .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    }
    insert_activity(
        &state.pool,
        &format!("Invoice emailed to {}", request.recipient),
        "invoice_sent",
        Some(&row.invoice.id),
    )
    .await
    .map_err(|e| internal_error(format!("Database error: {}", e)))?;
    publish_change(&state.changes_tx, "invoices", ChangeOp::Update, &row.invoice.id);

    Ok(Json(SendInvoiceResponse {
        invoice_id: request.invoice_id,
        recipient: request.recipient,
    }))
}

fn render_invoice_html(invoice: &Invoice, client_name: &str, message: Option<&str>) -> String {
    let intro = message
        .map(|m| format!("<p>{}</p>", m))
        .unwrap_or_default();
    let due = invoice
        .due_date
        .map(|d| format!("<p>Due date: {}</p>", d))
        .unwrap_or_default();
    let link = invoice
        .pdf_url
        .as_deref()
        .map(|url| format!("<p><a href=\"{}\">Download PDF</a></p>", url))
        .unwrap_or_default();

    format!(
        "<html><body>\
         <p>Dear {},</p>{}\
         <p>Please find your invoice below.</p>\
         <p>Amount due: {:.2}</p>{}{}\
         </body></html>",
        client_name, intro, invoice.amount, due, link
    )
}

pub fn router(pool: SqlitePool, mail: Option<Arc<MailClient>>, changes_tx: ChangeSender) -> Router {
    let state = InvoicesState {
        pool,
        mail,
        changes_tx,
    };
    Router::new()
        .route("/", get(list_invoices))
        .route("/send-email", post(send_invoice_email))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn invoice() -> Invoice {
        Invoice {
            id: "inv-123".to_string(),
            client_id: "client-1".to_string(),
            amount: 450.5,
            status: InvoiceStatus::Draft,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            pdf_url: Some("https://files.example/inv-123.pdf".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn invoice_html_includes_amount_client_and_link() {
        let html = render_invoice_html(&invoice(), "Acme Logistics", None);
        assert!(html.contains("Acme Logistics"));
        assert!(html.contains("450.50"));
        assert!(html.contains("2024-06-01"));
        assert!(html.contains("inv-123.pdf"));
    }

    #[test]
    fn custom_message_is_placed_before_the_summary() {
        let html = render_invoice_html(&invoice(), "Acme", Some("Thanks for your business"));
        let intro = html.find("Thanks for your business").unwrap();
        let summary = html.find("Amount due").unwrap();
        assert!(intro < summary);
    }
}
