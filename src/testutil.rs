//! Shared fixtures for DB-backed tests: an in-memory pool with the real
//! schema, plus seed helpers.

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::dispatch::TripForm;
use crate::models::directory::ClientType;
use crate::models::trip::{DbServiceType, TripStatus};

pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should connect");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations should apply");
    pool
}

pub async fn seed_client(pool: &SqlitePool, client_type: ClientType) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO clients (id, name, client_type, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind("Acme Logistics")
        .bind(client_type)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn seed_driver(pool: &SqlitePool, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO drivers (id, name, created_at) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn seed_vehicle(pool: &SqlitePool) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO vehicles (id, make, model, plate_number, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind("Toyota")
    .bind("Hiace")
    .bind("KDA 123X")
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Insert a bare scheduled trip directly, bypassing the orchestrator.
pub async fn seed_scheduled_trip(pool: &SqlitePool, client_id: &str) -> String {
    seed_trip_at(
        pool,
        client_id,
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        TripStatus::Scheduled,
    )
    .await
}

pub async fn seed_trip_at(
    pool: &SqlitePool,
    client_id: &str,
    date: NaiveDate,
    pickup_time: NaiveTime,
    status: TripStatus,
) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO trips (id, date, pickup_time, service_type, status, client_id, \
            pickup_location, dropoff_location, amount, is_recurring, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)",
    )
    .bind(&id)
    .bind(date)
    .bind(pickup_time)
    .bind(DbServiceType::OneWayTransfer)
    .bind(status)
    .bind(client_id)
    .bind("Airport")
    .bind("Hotel Baobab")
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
    id
}

pub fn base_form(client_id: &str) -> TripForm {
    TripForm {
        client_id: client_id.to_string(),
        vehicle_id: None,
        driver_id: None,
        service_type: "one_way_transfer".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        pickup_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        return_time: None,
        pickup_location: Some("Airport".to_string()),
        dropoff_location: Some("Hotel Baobab".to_string()),
        amount: Some(150.0),
        airline: None,
        flight_number: None,
        terminal: None,
        passengers: None,
        passport_documents: None,
        invitation_documents: None,
        notes: None,
        is_recurring: false,
        occurrences: None,
        frequency: None,
    }
}
