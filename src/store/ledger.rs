use crate::{
    errors::AppError,
    model::attendance::{AttendanceRecord, AttendanceRow, DateRange, LogFilter, ScanOutcome},
    utils::clock,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

const LOG_SQL: &str = r#"
    SELECT a.identity_token, a.date, a.time_in, a.time_out, a.duration_seconds
    FROM attendance_records a
    JOIN persons p ON p.identity_token = a.identity_token
    WHERE a.date >= ? AND a.date <= ?
    AND (? IS NULL
        OR p.name LIKE ? ESCAPE '\'
        OR p.identity_token LIKE ? ESCAPE '\'
        OR p.id_number LIKE ? ESCAPE '\'
        OR p.department LIKE ? ESCAPE '\')
    AND (? IS NULL OR p.role = ?)
    ORDER BY a.date ASC, a.time_in ASC, a.identity_token ASC
"#;

/// Time-in/time-out state machine over the `attendance_records` table.
///
/// Every transition is a single conditional statement, so the read-decide-write
/// for one (identity, date) is atomic without an application lock. The table's
/// primary key makes a second time-in for the same day impossible, and the
/// time-out update only matches an open record.
#[derive(Clone)]
pub struct AttendanceLedger {
    pool: SqlitePool,
    utc_offset: FixedOffset,
}

impl AttendanceLedger {
    pub fn new(pool: SqlitePool, utc_offset: FixedOffset) -> Self {
        Self { pool, utc_offset }
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        clock::local_date(now, self.utc_offset)
    }

    pub async fn record_scan(
        &self,
        identity_token: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, AppError> {
        let now = clock::truncate_to_second(now);
        let today = self.local_date(now);
        let now_secs = clock::to_unix(now);

        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance_records (identity_token, date, time_in)
            VALUES (?, ?, ?)
            ON CONFLICT (identity_token, date) DO NOTHING
            "#,
        )
        .bind(identity_token)
        .bind(today)
        .bind(now_secs)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::UnknownIdentity;
                }
            }
            storage_error(e, identity_token, "time-in")
        })?;

        if inserted.rows_affected() == 1 {
            info!(identity_token, %today, "Time-in recorded");
            return Ok(ScanOutcome::TimeIn);
        }

        let duration = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE attendance_records
            SET time_out = ?, duration_seconds = ? - time_in
            WHERE identity_token = ?
            AND date = ?
            AND time_out IS NULL
            AND time_in < ?
            RETURNING duration_seconds
            "#,
        )
        .bind(now_secs)
        .bind(now_secs)
        .bind(identity_token)
        .bind(today)
        .bind(now_secs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(e, identity_token, "time-out"))?
        .into_iter()
        .next();

        if let Some(duration_seconds) = duration {
            info!(identity_token, %today, duration_seconds, "Time-out recorded");
            return Ok(ScanOutcome::TimeOut { duration_seconds });
        }

        // Nothing was written; work out why.
        let existing = sqlx::query_as::<_, (i64, Option<i64>)>(
            "SELECT time_in, time_out FROM attendance_records WHERE identity_token = ? AND date = ?",
        )
        .bind(identity_token)
        .bind(today)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(e, identity_token, "classify"))?;

        match existing {
            Some((_, Some(_))) => {
                info!(identity_token, %today, "Duplicate scan ignored");
                Ok(ScanOutcome::Duplicate)
            }
            Some((time_in, None)) => {
                let time_in = clock::from_unix(time_in)?;
                warn!(
                    identity_token,
                    %today,
                    %time_in,
                    scanned_at = %now,
                    "Time-out rejected: scan is not after the recorded time-in"
                );
                Ok(ScanOutcome::ClockSkew { time_in })
            }
            // the person was deleted between statements
            None => Err(AppError::UnknownIdentity),
        }
    }

    pub async fn record(
        &self,
        identity_token: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT identity_token, date, time_in, time_out, duration_seconds
            FROM attendance_records
            WHERE identity_token = ? AND date = ?
            "#,
        )
        .bind(identity_token)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(e, identity_token, "read"))?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    /// Records in `range` ordered by date then time-in. Each call runs a fresh query.
    pub fn get_log(
        &self,
        range: DateRange,
        filter: &LogFilter,
    ) -> BoxStream<'_, Result<AttendanceRecord, AppError>> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let role = filter.role.map(|r| r.to_string());

        sqlx::query_as::<_, AttendanceRow>(LOG_SQL)
            .bind(range.from)
            .bind(range.to)
            .bind(pattern.clone())
            .bind(pattern.clone())
            .bind(pattern.clone())
            .bind(pattern.clone())
            .bind(pattern)
            .bind(role.clone())
            .bind(role)
            .fetch(&self.pool)
            .map(|row| {
                row.map_err(|e| {
                    error!(error = %e, "Failed to read attendance log");
                    AppError::from(e)
                })
                .and_then(AttendanceRecord::try_from)
            })
            .boxed()
    }

    pub fn today(&self, now: DateTime<Utc>) -> DateRange {
        DateRange::single(self.local_date(now))
    }
}

fn storage_error(e: sqlx::Error, identity_token: &str, step: &str) -> AppError {
    error!(error = %e, identity_token, step, "Attendance store query failed");
    AppError::from(e)
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
