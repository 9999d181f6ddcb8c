//! Dispatch workflow core.
//!
//! This module handles:
//! - Trip save/update orchestration (single, recurring, edit)
//! - Driver assignment with cumulative history
//! - Manual status transitions
//! - The trip message thread
//! - Change-event publication for the realtime feed

mod recurrence;
mod save;
mod status;

pub use recurrence::{expand_dates, Frequency};
pub use save::{SaveOutcome, SaveTripRequest, TripForm};
pub use status::is_allowed;

use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::assignment::{AssignmentStatus, TripAssignment};
use crate::models::event::AlertPriority;
use crate::models::message::{SenderType, TripMessage};
use crate::models::trip::{route_label, TripStatus};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Kind of write a change event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Cache-invalidation signal published after every successful write. Clients
/// re-read the affected collection; the event carries no row data.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub table: String,
    pub op: ChangeOp,
    pub entity_id: String,
    /// Timestamp when this event was generated
    pub timestamp: String,
}

/// Sender for change events
pub type ChangeSender = broadcast::Sender<ChangeEvent>;

/// Publish a change event. Send errors just mean no one is listening.
pub(crate) fn publish_change(tx: &ChangeSender, table: &str, op: ChangeOp, entity_id: &str) {
    let _ = tx.send(ChangeEvent {
        table: table.to_string(),
        op,
        entity_id: entity_id.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    });
}

/// The injected service every trip mutation goes through. Owns the pool and
/// the change broadcast; constructed once at startup.
#[derive(Clone)]
pub struct DispatchService {
    pool: SqlitePool,
    changes_tx: ChangeSender,
}

#[derive(Debug, FromRow)]
struct TripRoute {
    id: String,
    pickup_location: Option<String>,
    dropoff_location: Option<String>,
}

impl DispatchService {
    pub fn new(pool: SqlitePool) -> Self {
        // Capacity 64 - the feed is an invalidation signal, laggards re-read
        let (changes_tx, _) = broadcast::channel(64);
        Self { pool, changes_tx }
    }

    /// Get the change sender for passing to the WebSocket feed and monitor
    pub fn changes_sender(&self) -> ChangeSender {
        self.changes_tx.clone()
    }

    pub(crate) fn publish(&self, table: &str, op: ChangeOp, entity_id: &str) {
        publish_change(&self.changes_tx, table, op, entity_id);
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Assign a driver to a trip: one pending assignment row, the trip's
    /// current-driver pointer, and an activity entry, committed together.
    /// Re-assignment repeats the sequence; history is cumulative.
    pub async fn assign_driver(
        &self,
        trip_id: &str,
        driver_id: &str,
        note: Option<String>,
    ) -> Result<TripAssignment, DispatchError> {
        let driver: Option<(String,)> = sqlx::query_as("SELECT id FROM drivers WHERE id = ?")
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await?;
        if driver.is_none() {
            return Err(DispatchError::NotFound("driver"));
        }

        let trip: Option<TripRoute> = sqlx::query_as(
            "SELECT id, pickup_location, dropoff_location FROM trips WHERE id = ?",
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        let trip = trip.ok_or(DispatchError::NotFound("trip"))?;

        let assignment = TripAssignment {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            driver_id: driver_id.to_string(),
            status: AssignmentStatus::Pending,
            notes: note,
            assigned_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO trip_assignments (id, trip_id, driver_id, status, notes, assigned_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&assignment.id)
        .bind(&assignment.trip_id)
        .bind(&assignment.driver_id)
        .bind(assignment.status)
        .bind(&assignment.notes)
        .bind(assignment.assigned_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE trips SET driver_id = ? WHERE id = ?")
            .bind(driver_id)
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;

        let label = route_label(
            &trip.id,
            trip.pickup_location.as_deref(),
            trip.dropoff_location.as_deref(),
        );
        insert_activity(
            &mut *tx,
            &format!("Driver assigned to {}", label),
            "trip_assignment",
            Some(trip_id),
        )
        .await?;
        tx.commit().await?;

        self.publish("trip_assignments", ChangeOp::Insert, &assignment.id);
        self.publish("trips", ChangeOp::Update, trip_id);
        info!(trip_id, driver_id, "driver assigned");
        Ok(assignment)
    }

    /// Apply a manual status transition, rejecting anything the lifecycle
    /// does not allow.
    pub async fn set_status(
        &self,
        trip_id: &str,
        new_status: TripStatus,
    ) -> Result<(), DispatchError> {
        let current: Option<(TripStatus,)> =
            sqlx::query_as("SELECT status FROM trips WHERE id = ?")
                .bind(trip_id)
                .fetch_optional(&self.pool)
                .await?;
        let (current,) = current.ok_or(DispatchError::NotFound("trip"))?;

        if !status::is_allowed(current, new_status) {
            return Err(DispatchError::Validation(format!(
                "cannot change trip status from {} to {}",
                current.as_str(),
                new_status.as_str()
            )));
        }

        // Entering in_progress/completed stamps the actual pickup/dropoff time
        match new_status {
            TripStatus::InProgress => {
                sqlx::query("UPDATE trips SET status = ?, actual_pickup_at = ? WHERE id = ?")
                    .bind(new_status)
                    .bind(Utc::now())
                    .bind(trip_id)
                    .execute(&self.pool)
                    .await?;
            }
            TripStatus::Completed => {
                sqlx::query("UPDATE trips SET status = ?, actual_dropoff_at = ? WHERE id = ?")
                    .bind(new_status)
                    .bind(Utc::now())
                    .bind(trip_id)
                    .execute(&self.pool)
                    .await?;
            }
            _ => {
                sqlx::query("UPDATE trips SET status = ? WHERE id = ?")
                    .bind(new_status)
                    .bind(trip_id)
                    .execute(&self.pool)
                    .await?;
            }
        }

        self.publish("trips", ChangeOp::Update, trip_id);
        info!(trip_id, status = new_status.as_str(), "trip status changed");
        Ok(())
    }

    /// Append a message to a trip's thread. Messages start unread.
    pub async fn send_message(
        &self,
        trip_id: &str,
        sender_type: SenderType,
        sender_name: &str,
        text: &str,
    ) -> Result<TripMessage, DispatchError> {
        if text.trim().is_empty() {
            return Err(DispatchError::Validation(
                "message text must not be empty".to_string(),
            ));
        }
        let trip: Option<(String,)> = sqlx::query_as("SELECT id FROM trips WHERE id = ?")
            .bind(trip_id)
            .fetch_optional(&self.pool)
            .await?;
        if trip.is_none() {
            return Err(DispatchError::NotFound("trip"));
        }

        let message = TripMessage {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            sender_type,
            sender_name: sender_name.to_string(),
            message: text.to_string(),
            is_read: false,
            sent_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO trip_messages (id, trip_id, sender_type, sender_name, message, is_read, sent_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.trip_id)
        .bind(message.sender_type)
        .bind(&message.sender_name)
        .bind(&message.message)
        .bind(message.is_read)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await?;

        self.publish("trip_messages", ChangeOp::Insert, &message.id);
        Ok(message)
    }

    /// Mark the driver-sent messages of one trip as read. Returns the number
    /// of messages flipped.
    pub async fn mark_messages_read(&self, trip_id: &str) -> Result<u64, DispatchError> {
        let result = sqlx::query(
            "UPDATE trip_messages SET is_read = 1 \
             WHERE trip_id = ? AND sender_type = ? AND is_read = 0",
        )
        .bind(trip_id)
        .bind(SenderType::Driver)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            self.publish("trip_messages", ChangeOp::Update, trip_id);
        }
        Ok(result.rows_affected())
    }

    /// Delete a trip together with its dependent assignment and message rows.
    /// The schema carries no foreign keys; this is the referential cleanup.
    pub async fn delete_trip(&self, trip_id: &str) -> Result<(), DispatchError> {
        let trip: Option<(String,)> = sqlx::query_as("SELECT id FROM trips WHERE id = ?")
            .bind(trip_id)
            .fetch_optional(&self.pool)
            .await?;
        if trip.is_none() {
            return Err(DispatchError::NotFound("trip"));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM trip_messages WHERE trip_id = ?")
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM trip_assignments WHERE trip_id = ?")
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.publish("trips", ChangeOp::Delete, trip_id);
        info!(trip_id, "trip deleted with dependent rows");
        Ok(())
    }

    /// One-time reconciliation of legacy rows that encoded status as a
    /// `STATUS:xxx` prefix on the notes text. Extracts the prefix into the
    /// status column and strips it; rows with an unrecognized prefix are left
    /// untouched. Returns the number of rows migrated.
    pub async fn reconcile_legacy_status(&self) -> Result<u64, DispatchError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, notes FROM trips WHERE notes LIKE 'STATUS:%'")
                .fetch_all(&self.pool)
                .await?;

        let mut migrated = 0u64;
        for (id, notes) in rows {
            let (prefix, rest) = match notes.split_once('\n') {
                Some((prefix, rest)) => (prefix, Some(rest)),
                None => (notes.as_str(), None),
            };
            let Some(status) = TripStatus::parse(prefix.trim_start_matches("STATUS:")) else {
                warn!(trip_id = %id, "unrecognized legacy status prefix, leaving row untouched");
                continue;
            };
            let remaining = rest
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());

            sqlx::query("UPDATE trips SET status = ?, notes = ? WHERE id = ?")
                .bind(status)
                .bind(remaining)
                .bind(&id)
                .execute(&self.pool)
                .await?;
            migrated += 1;
        }

        if migrated > 0 {
            info!(migrated, "extracted legacy status prefixes from trip notes");
        }
        Ok(migrated)
    }
}

pub(crate) async fn insert_activity<'a, E>(
    executor: E,
    title: &str,
    activity_type: &str,
    related_id: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'a, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO activities (id, title, activity_type, related_id, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(title)
    .bind(activity_type)
    .bind(related_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) struct NewAlert<'a> {
    pub title: &'a str,
    pub alert_type: &'a str,
    pub priority: AlertPriority,
    pub description: Option<&'a str>,
    pub related_id: Option<&'a str>,
}

pub(crate) async fn insert_alert<'a, E>(
    executor: E,
    alert: NewAlert<'_>,
) -> Result<String, sqlx::Error>
where
    E: sqlx::Executor<'a, Database = sqlx::Sqlite>,
{
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO alerts (id, title, alert_type, priority, description, related_id, is_read, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(alert.title)
    .bind(alert.alert_type)
    .bind(alert.priority)
    .bind(alert.description)
    .bind(alert.related_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::directory::ClientType;
    use crate::testutil;

    #[tokio::test]
    async fn assign_sets_pointer_and_records_pending_history() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let driver_id = testutil::seed_driver(&pool, "Amina Yusuf").await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        let assignment = service
            .assign_driver(&trip_id, &driver_id, Some("evening run".into()))
            .await
            .unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Pending);

        let (pointer,): (Option<String>,) =
            sqlx::query_as("SELECT driver_id FROM trips WHERE id = ?")
                .bind(&trip_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(pointer.as_deref(), Some(driver_id.as_str()));

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trip_assignments WHERE trip_id = ? AND status = 'pending'")
                .bind(&trip_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);

        let (activities,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM activities WHERE related_id = ?")
                .bind(&trip_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(activities, 1);
    }

    #[tokio::test]
    async fn reassignment_keeps_history_and_moves_pointer() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let first = testutil::seed_driver(&pool, "First Driver").await;
        let second = testutil::seed_driver(&pool, "Second Driver").await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        service.assign_driver(&trip_id, &first, None).await.unwrap();
        service.assign_driver(&trip_id, &second, None).await.unwrap();

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trip_assignments WHERE trip_id = ?")
                .bind(&trip_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 2);

        let (pointer,): (Option<String>,) =
            sqlx::query_as("SELECT driver_id FROM trips WHERE id = ?")
                .bind(&trip_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(pointer.as_deref(), Some(second.as_str()));
    }

    #[tokio::test]
    async fn assigning_unknown_driver_fails_before_any_write() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        let err = service
            .assign_driver(&trip_id, "nope", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound("driver")));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trip_assignments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn status_transitions_follow_the_lifecycle() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        service
            .set_status(&trip_id, TripStatus::InProgress)
            .await
            .unwrap();
        service
            .set_status(&trip_id, TripStatus::Completed)
            .await
            .unwrap();

        let (pickup_at, dropoff_at): (Option<String>, Option<String>) = sqlx::query_as(
            "SELECT actual_pickup_at, actual_dropoff_at FROM trips WHERE id = ?",
        )
        .bind(&trip_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(pickup_at.is_some());
        assert!(dropoff_at.is_some());

        // Completed is terminal
        let err = service
            .set_status(&trip_id, TripStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[tokio::test]
    async fn send_then_list_orders_new_message_last() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        service
            .send_message(&trip_id, SenderType::Admin, "Dispatcher", "Confirm pickup")
            .await
            .unwrap();
        let latest = service
            .send_message(&trip_id, SenderType::Driver, "Amina", "On my way")
            .await
            .unwrap();

        let messages: Vec<TripMessage> = sqlx::query_as(
            "SELECT * FROM trip_messages WHERE trip_id = ? ORDER BY sent_at ASC, id ASC",
        )
        .bind(&trip_id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.last().unwrap().id, latest.id);
        assert!(!latest.is_read);
    }

    #[tokio::test]
    async fn mark_read_flips_driver_messages_only() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        service
            .send_message(&trip_id, SenderType::Driver, "Amina", "Arrived")
            .await
            .unwrap();
        service
            .send_message(&trip_id, SenderType::Admin, "Dispatcher", "Noted")
            .await
            .unwrap();

        let flipped = service.mark_messages_read(&trip_id).await.unwrap();
        assert_eq!(flipped, 1);

        let (admin_unread,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM trip_messages WHERE sender_type = 'admin' AND is_read = 0",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(admin_unread, 1);
    }

    #[tokio::test]
    async fn delete_removes_dependent_rows_first() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let driver_id = testutil::seed_driver(&pool, "Driver").await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        service.assign_driver(&trip_id, &driver_id, None).await.unwrap();
        service
            .send_message(&trip_id, SenderType::Admin, "Dispatcher", "hello")
            .await
            .unwrap();

        service.delete_trip(&trip_id).await.unwrap();

        for table in ["trips", "trip_assignments", "trip_messages"] {
            let (count,): (i64,) = sqlx::query_as(&format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                table,
                if table == "trips" { "id" } else { "trip_id" }
            ))
            .bind(&trip_id)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(count, 0, "{} should be empty", table);
        }
    }

    #[tokio::test]
    async fn legacy_status_prefix_is_extracted_once() {
        let pool = testutil::setup_pool().await;
        let service = DispatchService::new(pool.clone());
        let client_id = testutil::seed_client(&pool, ClientType::Individual).await;
        let trip_id = testutil::seed_scheduled_trip(&pool, &client_id).await;

        sqlx::query("UPDATE trips SET notes = ? WHERE id = ?")
            .bind("STATUS:in_progress\nCustomer asked for a child seat")
            .bind(&trip_id)
            .execute(&pool)
            .await
            .unwrap();

        let migrated = service.reconcile_legacy_status().await.unwrap();
        assert_eq!(migrated, 1);

        let (status, notes): (TripStatus, Option<String>) =
            sqlx::query_as("SELECT status, notes FROM trips WHERE id = ?")
                .bind(&trip_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, TripStatus::InProgress);
        assert_eq!(notes.as_deref(), Some("Customer asked for a child seat"));

        // Second run finds nothing left to migrate
        assert_eq!(service.reconcile_legacy_status().await.unwrap(), 0);
    }
}
