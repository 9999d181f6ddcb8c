//! Trip record model: lifecycle status, service-type vocabularies and the
//! UI-to-storage narrowing between them, plus the authoritative row shape and
//! the denormalized read projection.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::directory::ClientType;

/// Lifecycle status of a trip. Linear forward progression; completed and
/// cancelled are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TripStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Lenient parse used when reconciling legacy rows that encoded status
    /// inside the notes text.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "scheduled" => Some(TripStatus::Scheduled),
            "in_progress" => Some(TripStatus::InProgress),
            "completed" => Some(TripStatus::Completed),
            "cancelled" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }
}

/// Service type as the back office presents it. Richer than what storage
/// accepts; unknown values fall back to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    AirportPickup,
    AirportDropoff,
    Hourly,
    FullDay,
    MultiDay,
    OneWayTransfer,
    RoundTrip,
    SecurityEscort,
    #[serde(other)]
    Other,
}

impl TripType {
    /// Map a raw UI selection to a trip type. The UI historically sends
    /// `full_day_hire` for full-day bookings; anything unrecognized is
    /// `Other`.
    pub fn from_ui(value: &str) -> Self {
        match value {
            "airport_pickup" => TripType::AirportPickup,
            "airport_dropoff" => TripType::AirportDropoff,
            "hourly" => TripType::Hourly,
            "full_day" | "full_day_hire" => TripType::FullDay,
            "multi_day" => TripType::MultiDay,
            "one_way_transfer" => TripType::OneWayTransfer,
            "round_trip" => TripType::RoundTrip,
            "security_escort" => TripType::SecurityEscort,
            _ => TripType::Other,
        }
    }

    /// Flight metadata (airline, flight number, terminal) only applies to
    /// airport trips.
    pub fn is_airport(&self) -> bool {
        matches!(self, TripType::AirportPickup | TripType::AirportDropoff)
    }

    /// A scheduled return time only applies to round trips, security escorts
    /// and full-day hires.
    pub fn allows_return_time(&self) -> bool {
        matches!(
            self,
            TripType::RoundTrip | TripType::SecurityEscort | TripType::FullDay
        )
    }
}

/// Service type as the storage layer records it. Narrower than [`TripType`]:
/// the mapping below is the single point where the lossy narrowing happens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DbServiceType {
    AirportPickup,
    AirportDropoff,
    FullDay,
    OneWayTransfer,
    RoundTrip,
    SecurityEscort,
}

impl From<TripType> for DbServiceType {
    fn from(value: TripType) -> Self {
        match value {
            TripType::AirportPickup => DbServiceType::AirportPickup,
            TripType::AirportDropoff => DbServiceType::AirportDropoff,
            TripType::FullDay => DbServiceType::FullDay,
            TripType::OneWayTransfer => DbServiceType::OneWayTransfer,
            TripType::RoundTrip => DbServiceType::RoundTrip,
            TripType::SecurityEscort => DbServiceType::SecurityEscort,
            // Lossy: hourly, multi-day and unclassified trips are recorded as
            // one-way transfers. Round-tripping does not reproduce the
            // original UI type.
            TripType::Hourly | TripType::MultiDay | TripType::Other => {
                DbServiceType::OneWayTransfer
            }
        }
    }
}

impl From<DbServiceType> for TripType {
    fn from(value: DbServiceType) -> Self {
        match value {
            DbServiceType::AirportPickup => TripType::AirportPickup,
            DbServiceType::AirportDropoff => TripType::AirportDropoff,
            DbServiceType::FullDay => TripType::FullDay,
            DbServiceType::OneWayTransfer => TripType::OneWayTransfer,
            DbServiceType::RoundTrip => TripType::RoundTrip,
            DbServiceType::SecurityEscort => TripType::SecurityEscort,
        }
    }
}

/// An uploaded document descriptor attached to a trip. The file itself lives
/// in external storage; only the pointer is recorded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TripDocument {
    pub name: String,
    pub url: String,
    pub passenger_name: Option<String>,
}

/// The authoritative trip row.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Trip {
    pub id: String,
    pub date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub return_time: Option<NaiveTime>,
    pub actual_pickup_at: Option<DateTime<Utc>>,
    pub actual_dropoff_at: Option<DateTime<Utc>>,
    pub service_type: DbServiceType,
    pub status: TripStatus,
    pub client_id: String,
    pub vehicle_id: Option<String>,
    /// Derived pointer to the latest assignment; trip_assignments is the
    /// authoritative history.
    pub driver_id: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub amount: f64,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub terminal: Option<String>,
    pub is_recurring: bool,
    /// Passenger names; only populated for organization clients.
    #[schema(value_type = Option<Vec<String>>)]
    pub passengers: Option<Json<Vec<String>>>,
    #[schema(value_type = Option<Vec<TripDocument>>)]
    pub passport_documents: Option<Json<Vec<TripDocument>>>,
    #[schema(value_type = Option<Vec<TripDocument>>)]
    pub invitation_documents: Option<Json<Vec<TripDocument>>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Human-readable route label used by activity and alert text:
/// "<pickup> to <dropoff>" when both locations are present, else a short
/// id-derived label.
pub fn route_label(
    trip_id: &str,
    pickup_location: Option<&str>,
    dropoff_location: Option<&str>,
) -> String {
    match (pickup_location, dropoff_location) {
        (Some(pickup), Some(dropoff)) if !pickup.is_empty() && !dropoff.is_empty() => {
            format!("{} to {}", pickup, dropoff)
        }
        _ => format!("trip {}", &trip_id[..trip_id.len().min(8)]),
    }
}

/// Read-only projection of a trip joined with its client, vehicle and driver.
/// Assembled at query time; never written back.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DisplayTrip {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trip: Trip,
    pub client_name: String,
    pub client_type: ClientType,
    /// Descriptive vehicle string, e.g. "Toyota Hiace (KDA 123X)"
    pub vehicle: Option<String>,
    pub driver_name: Option<String>,
    pub driver_avatar_url: Option<String>,
    pub driver_phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_values_parse_to_trip_types() {
        assert_eq!(TripType::from_ui("airport_pickup"), TripType::AirportPickup);
        assert_eq!(TripType::from_ui("full_day_hire"), TripType::FullDay);
        assert_eq!(TripType::from_ui("full_day"), TripType::FullDay);
        assert_eq!(TripType::from_ui("hourly"), TripType::Hourly);
        assert_eq!(TripType::from_ui("round_trip"), TripType::RoundTrip);
    }

    #[test]
    fn unknown_ui_values_default_to_other() {
        assert_eq!(TripType::from_ui("limousine"), TripType::Other);
        assert_eq!(TripType::from_ui(""), TripType::Other);
    }

    #[test]
    fn narrowing_is_identity_on_storage_types() {
        let directly_supported = [
            TripType::AirportPickup,
            TripType::AirportDropoff,
            TripType::FullDay,
            TripType::OneWayTransfer,
            TripType::RoundTrip,
            TripType::SecurityEscort,
        ];
        for ty in directly_supported {
            let narrowed = DbServiceType::from(ty);
            assert_eq!(TripType::from(narrowed), ty);
        }
    }

    #[test]
    fn narrowing_is_idempotent() {
        for ty in [
            TripType::AirportPickup,
            TripType::AirportDropoff,
            TripType::Hourly,
            TripType::FullDay,
            TripType::MultiDay,
            TripType::OneWayTransfer,
            TripType::RoundTrip,
            TripType::SecurityEscort,
            TripType::Other,
        ] {
            let once = DbServiceType::from(ty);
            let twice = DbServiceType::from(TripType::from(once));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn unsupported_types_narrow_to_one_way_transfer() {
        assert_eq!(
            DbServiceType::from(TripType::Hourly),
            DbServiceType::OneWayTransfer
        );
        assert_eq!(
            DbServiceType::from(TripType::MultiDay),
            DbServiceType::OneWayTransfer
        );
        assert_eq!(
            DbServiceType::from(TripType::Other),
            DbServiceType::OneWayTransfer
        );
    }

    #[test]
    fn return_time_gating_covers_three_types() {
        assert!(TripType::RoundTrip.allows_return_time());
        assert!(TripType::SecurityEscort.allows_return_time());
        assert!(TripType::from_ui("full_day_hire").allows_return_time());
        assert!(!TripType::AirportPickup.allows_return_time());
        assert!(!TripType::Hourly.allows_return_time());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TripStatus::Completed.is_terminal());
        assert!(TripStatus::Cancelled.is_terminal());
        assert!(!TripStatus::Scheduled.is_terminal());
        assert!(!TripStatus::InProgress.is_terminal());
    }

    #[test]
    fn legacy_status_strings_parse() {
        assert_eq!(TripStatus::parse("in_progress"), Some(TripStatus::InProgress));
        assert_eq!(TripStatus::parse(" completed "), Some(TripStatus::Completed));
        assert_eq!(TripStatus::parse("unknown"), None);
    }

    #[test]
    fn route_label_prefers_locations() {
        assert_eq!(
            route_label("abc", Some("Airport"), Some("Hotel Sonne")),
            "Airport to Hotel Sonne"
        );
        assert_eq!(
            route_label("0123456789abcdef", None, Some("Hotel")),
            "trip 01234567"
        );
        assert_eq!(route_label("abc", Some(""), Some("Hotel")), "trip abc");
    }
}
