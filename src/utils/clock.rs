use crate::errors::AppError;
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};

/// Attendance timestamps are kept at whole-second resolution.
pub fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

pub fn to_unix(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

pub fn from_unix(secs: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        AppError::StorageUnavailable(sqlx::Error::Decode(
            format!("timestamp out of range: {secs}").into(),
        ))
    })
}

/// Local calendar date of `ts` under a fixed offset. Midnight belongs to the new day.
pub fn local_date(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
