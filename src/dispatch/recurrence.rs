//! Recurring-trip date expansion.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DispatchError;

/// Cadence of a recurring trip series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// Compute the concrete dates of a recurring series: occurrence `i` falls on
/// the base date plus `i` days, `7*i` days, or `i` months. Output is
/// chronological ascending by construction.
///
/// An occurrence count of zero is a validation error, not a clamp. Monthly
/// expansion uses calendar month arithmetic, so month-end bases clamp
/// (Jan 31 -> Feb 29 in a leap year).
pub fn expand_dates(
    base: NaiveDate,
    frequency: Frequency,
    occurrences: u32,
) -> Result<Vec<NaiveDate>, DispatchError> {
    if occurrences < 1 {
        return Err(DispatchError::Validation(
            "occurrence count must be at least 1".to_string(),
        ));
    }

    let mut dates = Vec::with_capacity(occurrences as usize);
    for i in 0..occurrences {
        let date = match frequency {
            Frequency::Daily => base.checked_add_days(Days::new(i as u64)),
            Frequency::Weekly => base.checked_add_days(Days::new(7 * i as u64)),
            Frequency::Monthly => base.checked_add_months(Months::new(i)),
        }
        .ok_or_else(|| {
            DispatchError::Validation(format!(
                "occurrence {} overflows the calendar from base date {}",
                i, base
            ))
        })?;
        dates.push(date);
    }

    Ok(dates)
}
