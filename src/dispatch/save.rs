//! Trip save/update orchestration: one entry point, three outcomes (update,
//! recurring create, single create).

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::directory::ClientType;
use crate::models::trip::{DbServiceType, TripDocument, TripStatus, TripType};

use super::recurrence::{expand_dates, Frequency};
use super::{ChangeOp, DispatchError, DispatchService};

/// Form input for creating or editing a trip, in the UI's vocabulary.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TripForm {
    pub client_id: String,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    /// UI service-type selection, e.g. "airport_pickup" or "full_day_hire".
    /// Unknown values are accepted and recorded as one-way transfers.
    pub service_type: String,
    pub date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub return_time: Option<NaiveTime>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    /// Trip amount; missing means 0
    pub amount: Option<f64>,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub terminal: Option<String>,
    pub passengers: Option<Vec<String>>,
    pub passport_documents: Option<Vec<TripDocument>>,
    pub invitation_documents: Option<Vec<TripDocument>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    /// Number of trips to generate for a recurring series (>= 1)
    pub occurrences: Option<u32>,
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaveTripRequest {
    /// Present when editing an existing trip; the recurrence fields are
    /// ignored on edit.
    pub editing_trip_id: Option<String>,
    pub form: TripForm,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Updated { trip_id: String },
    Created { trip_id: String },
    CreatedRecurring { trip_ids: Vec<String> },
}

/// Storage-ready fields after the gating rules. Gating is uniform across
/// create and edit: flight metadata only for airport trips, return time only
/// for round trips / security escorts / full-day hires, passengers only for
/// organization clients.
struct GatedFields {
    service_type: DbServiceType,
    return_time: Option<NaiveTime>,
    airline: Option<String>,
    flight_number: Option<String>,
    terminal: Option<String>,
    passengers: Option<Json<Vec<String>>>,
}

impl GatedFields {
    fn derive(form: &TripForm, client_type: ClientType) -> Self {
        let trip_type = TripType::from_ui(&form.service_type);

        let (airline, flight_number, terminal) = if trip_type.is_airport() {
            (
                form.airline.clone(),
                form.flight_number.clone(),
                form.terminal.clone(),
            )
        } else {
            (None, None, None)
        };

        let return_time = if trip_type.allows_return_time() {
            form.return_time
        } else {
            None
        };

        let passengers = match client_type {
            ClientType::Organization => form.passengers.clone().map(Json),
            ClientType::Individual => None,
        };

        Self {
            service_type: trip_type.into(),
            return_time,
            airline,
            flight_number,
            terminal,
            passengers,
        }
    }
}

impl DispatchService {
    /// Validate the form, resolve the edit / recurring / single path, and
    /// persist. Validation failures happen before any write; the recurring
    /// batch is one transaction, so a failure creates nothing.
    pub async fn save_trip(&self, req: SaveTripRequest) -> Result<SaveOutcome, DispatchError> {
        let SaveTripRequest {
            editing_trip_id,
            form,
        } = req;
        if form.client_id.trim().is_empty() {
            return Err(DispatchError::Validation("client is required".to_string()));
        }

        let client: Option<(ClientType,)> =
            sqlx::query_as("SELECT client_type FROM clients WHERE id = ?")
                .bind(&form.client_id)
                .fetch_optional(self.pool())
                .await?;
        let (client_type,) = client.ok_or_else(|| {
            DispatchError::Validation(format!("unknown client {}", form.client_id))
        })?;

        let fields = GatedFields::derive(&form, client_type);

        match editing_trip_id {
            Some(trip_id) => self.update_trip(&trip_id, &form, &fields).await,
            None if form.is_recurring => self.create_recurring(&form, &fields).await,
            None => self.create_single(&form, &fields).await,
        }
    }

    async fn create_single(
        &self,
        form: &TripForm,
        fields: &GatedFields,
    ) -> Result<SaveOutcome, DispatchError> {
        let trip_id = Uuid::new_v4().to_string();
        insert_trip(self.pool(), &trip_id, form.date, false, form, fields).await?;
        self.publish("trips", ChangeOp::Insert, &trip_id);
        info!(trip_id, "trip created");
        Ok(SaveOutcome::Created { trip_id })
    }

    async fn create_recurring(
        &self,
        form: &TripForm,
        fields: &GatedFields,
    ) -> Result<SaveOutcome, DispatchError> {
        let occurrences = form.occurrences.ok_or_else(|| {
            DispatchError::Validation(
                "occurrence count is required for recurring trips".to_string(),
            )
        })?;
        let frequency = form.frequency.ok_or_else(|| {
            DispatchError::Validation("frequency is required for recurring trips".to_string())
        })?;
        let dates = expand_dates(form.date, frequency, occurrences)?;

        let mut trip_ids = Vec::with_capacity(dates.len());
        let mut tx = self.pool().begin().await?;
        for date in dates {
            let trip_id = Uuid::new_v4().to_string();
            insert_trip(&mut *tx, &trip_id, date, true, form, fields).await?;
            trip_ids.push(trip_id);
        }
        tx.commit().await?;

        for trip_id in &trip_ids {
            self.publish("trips", ChangeOp::Insert, trip_id);
        }
        info!(count = trip_ids.len(), "recurring trip series created");
        Ok(SaveOutcome::CreatedRecurring { trip_ids })
    }

    async fn update_trip(
        &self,
        trip_id: &str,
        form: &TripForm,
        fields: &GatedFields,
    ) -> Result<SaveOutcome, DispatchError> {
        // Status and the recurrence flag are not form-editable; status moves
        // through set_status only.
        let result = sqlx::query(
            "UPDATE trips SET \
                date = ?, pickup_time = ?, return_time = ?, service_type = ?, \
                client_id = ?, vehicle_id = ?, driver_id = ?, \
                pickup_location = ?, dropoff_location = ?, amount = ?, \
                airline = ?, flight_number = ?, terminal = ?, \
                passengers = ?, passport_documents = ?, invitation_documents = ?, \
                notes = ? \
             WHERE id = ?",
        )
        .bind(form.date)
        .bind(form.pickup_time)
        .bind(fields.return_time)
        .bind(fields.service_type)
        .bind(&form.client_id)
        .bind(&form.vehicle_id)
        .bind(&form.driver_id)
        .bind(&form.pickup_location)
        .bind(&form.dropoff_location)
        .bind(form.amount.unwrap_or(0.0))
        .bind(&fields.airline)
        .bind(&fields.flight_number)
        .bind(&fields.terminal)
        .bind(fields.passengers.clone())
        .bind(form.passport_documents.clone().map(Json))
        .bind(form.invitation_documents.clone().map(Json))
        .bind(&form.notes)
        .bind(trip_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::NotFound("trip"));
        }

        self.publish("trips", ChangeOp::Update, trip_id);
        info!(trip_id, "trip updated");
        Ok(SaveOutcome::Updated {
            trip_id: trip_id.to_string(),
        })
    }
}

async fn insert_trip<'a, E>(
    executor: E,
    trip_id: &str,
    date: NaiveDate,
    is_recurring: bool,
    form: &TripForm,
    fields: &GatedFields,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'a, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO trips (id, date, pickup_time, return_time, service_type, status, \
            client_id, vehicle_id, driver_id, pickup_location, dropoff_location, amount, \
            airline, flight_number, terminal, is_recurring, passengers, \
            passport_documents, invitation_documents, notes, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(trip_id)
    .bind(date)
    .bind(form.pickup_time)
    .bind(fields.return_time)
    .bind(fields.service_type)
    .bind(TripStatus::Scheduled)
    .bind(&form.client_id)
    .bind(&form.vehicle_id)
    .bind(&form.driver_id)
    .bind(&form.pickup_location)
    .bind(&form.dropoff_location)
    .bind(form.amount.unwrap_or(0.0))
    .bind(&fields.airline)
    .bind(&fields.flight_number)
    .bind(&fields.terminal)
    .bind(is_recurring)
    .bind(fields.passengers.clone())
    .bind(form.passport_documents.clone().map(Json))
    .bind(form.invitation_documents.clone().map(Json))
    .bind(&form.notes)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}
