pub mod api;
mod config;
mod dispatch;
mod models;
mod monitor;
mod providers;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "dev-tools")]
use axum_sql_viewer::SqlViewerLayer;
#[cfg(feature = "dev-tools")]
use tracing_web_console::TracingLayer;

use config::Config;
use dispatch::DispatchService;
use monitor::OverdueMonitor;
use providers::mail::MailClient;

#[derive(OpenApi)]
#[openapi(
    info(title = "Fleetdesk API", version = "0.2.0"),
    paths(
        api::trips::list_trips,
        api::trips::get_trip,
        api::trips::save_trip,
        api::trips::set_trip_status,
        api::trips::assign_driver,
        api::trips::list_assignments,
        api::trips::delete_trip,
        api::messages::send_message,
        api::messages::list_trip_messages,
        api::messages::recent_messages,
        api::messages::unread_count,
        api::messages::mark_messages_read,
        api::alerts::list_alerts,
        api::alerts::mark_alert_read,
        api::activities::list_activities,
        api::directory::list_clients,
        api::directory::list_vehicles,
        api::directory::list_drivers,
        api::invoices::list_invoices,
        api::invoices::send_invoice_email,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::trips::TripListResponse,
        api::trips::TripByIdRequest,
        api::trips::SetStatusRequest,
        api::trips::SetStatusResponse,
        api::trips::AssignDriverRequest,
        api::trips::AssignmentHistoryRequest,
        api::trips::AssignmentListResponse,
        api::trips::DeleteTripRequest,
        api::trips::DeleteTripResponse,
        api::messages::SendMessageRequest,
        api::messages::TripMessagesRequest,
        api::messages::MessageListResponse,
        api::messages::UnreadCountResponse,
        api::messages::MarkReadRequest,
        api::messages::MarkReadResponse,
        api::alerts::AlertListResponse,
        api::alerts::MarkAlertReadRequest,
        api::alerts::MarkAlertReadResponse,
        api::activities::ActivityListResponse,
        api::directory::ClientListResponse,
        api::directory::VehicleListResponse,
        api::directory::DriverListResponse,
        api::invoices::InvoiceListResponse,
        api::invoices::SendInvoiceRequest,
        api::invoices::SendInvoiceResponse,
        api::health::HealthResponse,
        dispatch::SaveTripRequest,
        dispatch::TripForm,
        dispatch::SaveOutcome,
        dispatch::Frequency,
        models::trip::Trip,
        models::trip::DisplayTrip,
        models::trip::TripDocument,
        models::trip::TripStatus,
        models::trip::TripType,
        models::trip::DbServiceType,
        models::assignment::TripAssignment,
        models::assignment::AssignmentStatus,
        models::message::TripMessage,
        models::message::SenderType,
        models::event::Alert,
        models::event::AlertPriority,
        models::event::Activity,
        models::directory::Client,
        models::directory::ClientType,
        models::directory::Vehicle,
        models::directory::Driver,
        models::directory::Invoice,
        models::directory::InvoiceStatus,
    )),
    tags(
        (name = "trips", description = "Trip lifecycle, saving and dispatch"),
        (name = "messages", description = "Dispatcher/driver trip messaging"),
        (name = "alerts", description = "Notification alerts"),
        (name = "activities", description = "Audit activity log"),
        (name = "directory", description = "Clients, vehicles and drivers"),
        (name = "invoices", description = "Invoices and delivery"),
        (name = "health", description = "Service health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    config.overdue_sweep.validate();
    tracing::info!(
        sweep_interval_secs = config.overdue_sweep.interval_secs,
        "Loaded configuration"
    );

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database
    let cwd = std::env::current_dir().expect("Failed to get current directory");
    let db_path = cwd.join("database");
    if let Err(e) = std::fs::create_dir_all(&db_path) {
        tracing::warn!("Could not create database directory: {}", e);
    }
    let db_file = db_path.join("data.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_file.display());
    let pool = SqlitePool::connect(&db_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Dispatch service owns the change feed every write publishes to
    let service = DispatchService::new(pool.clone());

    // One-time extraction of legacy STATUS: prefixes out of trip notes
    match service.reconcile_legacy_status().await {
        Ok(0) => {}
        Ok(migrated) => tracing::info!(migrated, "Reconciled legacy status notes"),
        Err(e) => tracing::error!(error = %e, "Legacy status reconciliation failed"),
    }

    // Start the overdue monitor in the background
    let monitor = Arc::new(OverdueMonitor::new(
        pool.clone(),
        config.overdue_sweep.clone(),
        service.changes_sender(),
    ));
    tokio::spawn(async move {
        monitor.start().await;
    });

    // Outbound mail is optional
    let mail = match &config.mail {
        Some(mail_config) => Some(Arc::new(
            MailClient::new(mail_config).expect("Failed to build mail client"),
        )),
        None => {
            tracing::info!("Outbound mail disabled (no mail section in config)");
            None
        }
    };

    // Build the app
    #[allow(unused_mut)] // mut needed when dev-tools feature is enabled
    let mut app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(pool.clone(), service, mail))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Add dev tools only when feature is enabled
    #[cfg(feature = "dev-tools")]
    {
        let tracing_layer = TracingLayer::new("/tracing");
        app = app
            .merge(SqlViewerLayer::sqlite("/sql-viewer", pool.clone()).into_router())
            .merge(tracing_layer.into_router());
        tracing::warn!("Dev tools enabled: SQL Viewer and Tracing Console are accessible");
    }

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Fleetdesk API"
}
