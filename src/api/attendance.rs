use crate::{
    errors::AppError,
    model::{
        attendance::{AttendanceRecord, DateRange, LogFilter},
        role::Role,
    },
    store::ledger::AttendanceLedger,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LogQuery {
    #[schema(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
    pub role: Option<Role>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    #[schema(example = 2)]
    pub total: usize,
}

async fn collect_log(
    ledger: &AttendanceLedger,
    range: DateRange,
    filter: LogFilter,
) -> Result<AttendanceListResponse, AppError> {
    let data: Vec<AttendanceRecord> = ledger.get_log(range, &filter).try_collect().await?;
    debug!(from = %range.from, to = %range.to, total = data.len(), "Attendance log read");

    Ok(AttendanceListResponse {
        total: data.len(),
        from: range.from,
        to: range.to,
        data,
    })
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/attendance",
    params(
        ("from", Query, description = "First date (inclusive), defaults to today"),
        ("to", Query, description = "Last date (inclusive), defaults to `from`"),
        ("search", Query, description = "Substring of name, identity token, id number or department"),
        ("role", Query, description = "Student, Teacher or Guest")
    ),
    responses(
        (status = 200, description = "Records ordered by date then time-in", body = AttendanceListResponse),
        (status = 400, description = "Date range starts after it ends")
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    ledger: web::Data<AttendanceLedger>,
    query: web::Query<LogQuery>,
) -> actix_web::Result<impl Responder> {
    let LogQuery {
        from,
        to,
        search,
        role,
    } = query.into_inner();

    let from = from.unwrap_or_else(|| ledger.local_date(Utc::now()));
    let range = DateRange::new(from, to.unwrap_or(from))?;

    let response = collect_log(&ledger, range, LogFilter { search, role }).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Today's attendance
#[utoipa::path(
    get,
    path = "/attendance/today",
    responses(
        (status = 200, description = "Records for the current local date", body = AttendanceListResponse)
    ),
    tag = "Attendance"
)]
pub async fn today_attendance(
    ledger: web::Data<AttendanceLedger>,
) -> actix_web::Result<impl Responder> {
    let range = ledger.today(Utc::now());
    let response = collect_log(&ledger, range, LogFilter::default()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Attendance record of one person on one date
#[utoipa::path(
    get,
    path = "/attendance/{identity_token}/{date}",
    params(
        ("identity_token", Path, description = "Identity token"),
        ("date", Path, description = "Attendance date (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Record found", body = AttendanceRecord),
        (status = 404, description = "No record for that date", body = Object, example = json!({
            "message": "Attendance record not found"
        }))
    ),
    tag = "Attendance"
)]
pub async fn get_record(
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<(String, NaiveDate)>,
) -> actix_web::Result<impl Responder> {
    let (identity_token, date) = path.into_inner();

    match ledger.record(&identity_token, date).await? {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance record not found"
        }))),
    }
}
