//! Time handling for the raster pipeline.
//!
//! All timestamps cross crate boundaries as `DateTime<Utc>`, so UTC-offset
//! carriage is enforced by the type system. Uploaded artifacts are named by
//! the calendar date in one fixed operational time zone (Pacific daylight
//! time); production only runs April through October, when that offset holds.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};

/// Fixed operational UTC offset (Pacific daylight time).
pub const OPERATIONAL_OFFSET_HOURS: i32 = -7;

/// Hour of day (UTC) daily rasters are computed for, roughly solar noon
/// over the province.
pub const DAILY_TARGET_HOUR_UTC: u32 = 20;

/// Convert a UTC instant into the fixed operational time zone.
pub fn to_operational_time(utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(OPERATIONAL_OFFSET_HOURS * 3600)
        .expect("static offset is in range");
    utc.with_timezone(&offset)
}

/// Calendar date of a UTC instant in the operational time zone.
pub fn operational_date(utc: DateTime<Utc>) -> NaiveDate {
    to_operational_time(utc).date_naive()
}

/// Hour of day of a UTC instant in the operational time zone.
pub fn operational_hour(utc: DateTime<Utc>) -> u32 {
    to_operational_time(utc).hour()
}

/// The model run (00z or 12z) most recently started at the given UTC hour.
pub fn model_run_for_hour(hour: u32) -> u32 {
    if hour < 12 {
        0
    } else {
        12
    }
}

/// Compact `YYYYMMDD` form of a date, as used in artifact file names.
pub fn compact_date(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}
