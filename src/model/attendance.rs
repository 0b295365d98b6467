use crate::{errors::AppError, model::role::Role, utils::clock};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One person's attendance for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(
    example = json!({
        "identity_token": "6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a94",
        "date": "2026-01-05",
        "time_in": "2026-01-05T09:00:00Z",
        "time_out": "2026-01-05T17:00:00Z",
        "duration_seconds": 28800,
        "duration": "08:00:00"
    })
)]
pub struct AttendanceRecord {
    pub identity_token: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_out: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    /// `duration_seconds` as `HH:MM:SS`.
    pub duration: Option<String>,
}

impl AttendanceRecord {
    pub fn is_complete(&self) -> bool {
        self.time_out.is_some()
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub identity_token: String,
    pub date: NaiveDate,
    pub time_in: i64,
    pub time_out: Option<i64>,
    pub duration_seconds: Option<i64>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = AppError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            identity_token: row.identity_token,
            date: row.date,
            time_in: Some(clock::from_unix(row.time_in)?),
            time_out: row.time_out.map(clock::from_unix).transpose()?,
            duration_seconds: row.duration_seconds,
            duration: row.duration_seconds.map(clock::format_duration),
        })
    }
}

/// Decision taken by the ledger for a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    TimeIn,
    TimeOut { duration_seconds: i64 },
    /// The day's record is already closed. Nothing was written.
    Duplicate,
    /// A time-out attempt not strictly after the stored time-in. Nothing was written.
    ClockSkew { time_in: DateTime<Utc> },
}

/// Inclusive range of attendance dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, AppError> {
        if from > to {
            return Err(AppError::invalid(format!(
                "date range starts after it ends: {from} > {to}"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LogFilter {
    /// Substring of the person's name, identity token, id number or department.
    pub search: Option<String>,
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_range_is_invalid() {
        let a = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(matches!(DateRange::new(a, b), Err(AppError::InvalidInput(_))));
        assert!(DateRange::new(b, a).is_ok());
        assert!(DateRange::new(a, a).is_ok());
    }

    #[test]
    fn open_row_has_no_duration() {
        let row = AttendanceRow {
            identity_token: "t".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            time_in: 1_772_352_000,
            time_out: None,
            duration_seconds: None,
        };
        let record = AttendanceRecord::try_from(row).unwrap();
        assert!(!record.is_complete());
        assert_eq!(record.duration, None);
    }
}
