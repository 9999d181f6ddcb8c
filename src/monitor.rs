//! Background reconciliation of overdue trips.
//!
//! A trip still `scheduled` after its pickup time has passed is invalid; the
//! monitor cancels it, annotates the notes, and raises a high-priority alert.
//! The sweep runs once at startup and then on a configurable interval,
//! independent of any UI session being open.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{error, info, warn};

use crate::config::SweepConfig;
use crate::dispatch::{insert_alert, publish_change, ChangeOp, ChangeSender, NewAlert};
use crate::models::event::AlertPriority;
use crate::models::trip::{route_label, TripStatus};

const OVERDUE_NOTE: &str = "Automatically marked as missed - trip was overdue";

pub struct OverdueMonitor {
    pool: SqlitePool,
    config: SweepConfig,
    changes_tx: ChangeSender,
}

#[derive(Debug, FromRow)]
struct OverdueTrip {
    id: String,
    date: NaiveDate,
    pickup_time: NaiveTime,
    pickup_location: Option<String>,
    dropoff_location: Option<String>,
    notes: Option<String>,
}

impl OverdueMonitor {
    pub fn new(pool: SqlitePool, config: SweepConfig, changes_tx: ChangeSender) -> Self {
        Self {
            pool,
            config,
            changes_tx,
        }
    }

    /// Run the sweep loop forever.
    pub async fn start(self: Arc<Self>) {
        let tz = self.config.timezone();
        info!(
            interval_secs = self.config.interval_secs,
            timezone = %tz,
            "Starting overdue monitor"
        );

        if self.config.run_on_startup {
            self.run_sweep(tz).await;
        }

        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(self.config.interval_secs));
        // Skip the first tick which fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            self.run_sweep(tz).await;
        }
    }

    async fn run_sweep(&self, tz: chrono_tz::Tz) {
        let now = Utc::now().with_timezone(&tz);
        match self.sweep_at(now.date_naive(), now.time()).await {
            Ok(0) => {}
            Ok(count) => info!(count, "cancelled overdue trips"),
            Err(e) => error!(error = %e, "overdue sweep failed"),
        }
    }

    /// Cancel every trip still `scheduled` whose date is before `today`, or
    /// whose date is `today` with a pickup time before `now_time`. Idempotent:
    /// the filter only matches `scheduled` rows, so a second pass over the
    /// same trips is a no-op. Returns the number of trips cancelled.
    pub async fn sweep_at(
        &self,
        today: NaiveDate,
        now_time: NaiveTime,
    ) -> Result<u64, sqlx::Error> {
        let overdue: Vec<OverdueTrip> = sqlx::query_as(
            "SELECT id, date, pickup_time, pickup_location, dropoff_location, notes \
             FROM trips \
             WHERE status = ? AND (date < ? OR (date = ? AND pickup_time < ?))",
        )
        .bind(TripStatus::Scheduled)
        .bind(today)
        .bind(today)
        .bind(now_time)
        .fetch_all(&self.pool)
        .await?;

        for trip in &overdue {
            let notes = match trip.notes.as_deref() {
                Some(existing) => format!("{}\n{}", existing, OVERDUE_NOTE),
                None => OVERDUE_NOTE.to_string(),
            };
            let label = route_label(
                &trip.id,
                trip.pickup_location.as_deref(),
                trip.dropoff_location.as_deref(),
            );
            let description = format!(
                "{} scheduled {} at {} was not started before its pickup time",
                label,
                trip.date,
                trip.pickup_time.format("%H:%M")
            );

            let mut tx = self.pool.begin().await?;
            sqlx::query("UPDATE trips SET status = ?, notes = ? WHERE id = ? AND status = ?")
                .bind(TripStatus::Cancelled)
                .bind(&notes)
                .bind(&trip.id)
                .bind(TripStatus::Scheduled)
                .execute(&mut *tx)
                .await?;
            let alert_id = insert_alert(
                &mut *tx,
                NewAlert {
                    title: "Trip overdue",
                    alert_type: "trip_overdue",
                    priority: AlertPriority::High,
                    description: Some(&description),
                    related_id: Some(&trip.id),
                },
            )
            .await?;
            tx.commit().await?;

            publish_change(&self.changes_tx, "trips", ChangeOp::Update, &trip.id);
            publish_change(&self.changes_tx, "alerts", ChangeOp::Insert, &alert_id);
            warn!(trip_id = %trip.id, "trip overdue, automatically cancelled");
        }

        Ok(overdue.len() as u64)
    }
}
