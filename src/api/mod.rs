pub mod activities;
pub mod alerts;
pub mod directory;
pub mod error;
pub mod health;
pub mod invoices;
pub mod messages;
pub mod trips;
pub mod ws;

pub use error::{internal_error, ErrorResponse};

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

use crate::dispatch::DispatchService;
use crate::providers::mail::MailClient;

pub fn router(
    pool: SqlitePool,
    service: DispatchService,
    mail: Option<Arc<MailClient>>,
) -> Router {
    let changes_tx = service.changes_sender();
    let ws_state = ws::WsState {
        changes_tx: changes_tx.clone(),
    };

    Router::new()
        .nest("/trips", trips::router(pool.clone(), service.clone()))
        .nest("/messages", messages::router(pool.clone(), service))
        .nest("/alerts", alerts::router(pool.clone()))
        .nest("/activities", activities::router(pool.clone()))
        .merge(directory::router(pool.clone()))
        .nest("/invoices", invoices::router(pool.clone(), mail, changes_tx))
        .nest("/health", health::router(pool))
        .route("/ws", get(ws::ws_changes).with_state(ws_state))
}
