use crate::api::attendance::{AttendanceListResponse, LogQuery};
use crate::api::person::RegisteredPerson;
use crate::api::scan::ScanRequest;
use crate::model::attendance::{AttendanceRecord, LogFilter};
use crate::model::person::{NewPerson, Person};
use crate::model::role::Role;
use crate::scan::dispatcher::{RejectReason, ScanResult, ScanStatus};
use utoipa::OpenApi;
use utoipa::openapi::server::Server;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QR Attendance API",
        version = "0.1.0",
        description = r#"
## QR Code Attendance Ledger

Each registered person carries a QR code that encodes their identity token.

### 🔹 Scan rules
- First scan of the day records a **time-in**
- Second scan records a **time-out** and the duration
- Any later scan that day is a **duplicate** and changes nothing
- A time-out scan stamped at or before the time-in is **rejected** (clock skew)

### 📅 Dates
Attendance dates are local calendar dates under a fixed, configured UTC offset.
A scan at exactly local midnight belongs to the new day.

---
Built with **Rust**, **Actix Web**, **SQLx** (SQLite), and **Utoipa**.
"#,
    ),
    paths(
        crate::api::scan::submit_scan,

        crate::api::person::register_person,
        crate::api::person::get_person,
        crate::api::person::delete_person,

        crate::api::attendance::list_attendance,
        crate::api::attendance::today_attendance,
        crate::api::attendance::get_record
    ),
    components(
        schemas(
            ScanRequest,
            ScanResult,
            ScanStatus,
            RejectReason,
            NewPerson,
            Person,
            RegisteredPerson,
            Role,
            AttendanceRecord,
            AttendanceListResponse,
            LogQuery,
            LogFilter
        )
    ),
    tags(
        (name = "Scan", description = "Scan submission"),
        (name = "Person", description = "Registration and lookup"),
        (name = "Attendance", description = "Attendance log retrieval"),
    )
)]
pub struct ApiDoc;

/// The OpenAPI document with paths served under `api_prefix`.
pub fn api_doc(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(api_prefix)]);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_served_under_the_configured_prefix() {
        let doc = api_doc("/attendance-api");

        let servers = doc.servers.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].url, "/attendance-api");

        assert!(doc.paths.paths.contains_key("/scan"));
        assert!(doc.paths.paths.contains_key("/attendance/{identity_token}/{date}"));
        assert!(doc.paths.paths.keys().all(|p| !p.starts_with("/api/v1")));
    }
}
