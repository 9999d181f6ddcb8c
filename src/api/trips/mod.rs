mod assign;
mod delete;
mod list;
mod save;
mod status;

pub use assign::*;
pub use delete::*;
pub use list::*;
pub use save::*;
pub use status::*;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

use crate::dispatch::DispatchService;

#[derive(Clone)]
pub struct TripsState {
    pub pool: SqlitePool,
    pub service: DispatchService,
}

pub fn router(pool: SqlitePool, service: DispatchService) -> Router {
    let state = TripsState { pool, service };
    Router::new()
        .route("/", get(list_trips))
        .route("/by-id", post(get_trip))
        .route("/save", post(save_trip))
        .route("/set-status", post(set_trip_status))
        .route("/assign", post(assign_driver))
        .route("/assignments", post(list_assignments))
        .route("/delete", post(delete_trip))
        .with_state(state)
}
