use crate::scan::dispatcher::ScanDispatcher;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Decoded text of the scanned code.
    #[schema(example = "6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a94")]
    pub payload: String,
    /// Capture time; defaults to the time the request is received.
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub scanned_at: Option<DateTime<Utc>>,
}

/// Submit a scan
#[utoipa::path(
    post,
    path = "/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan classified (time-in, time-out, duplicate or rejected)", body = crate::scan::dispatcher::ScanResult),
        (status = 422, description = "Payload is not an attendance code", body = Object, example = json!({
            "message": "Scanned code is not a recognized attendance code"
        })),
        (status = 429, description = "Too many scans"),
        (status = 503, description = "Storage unavailable")
    ),
    tag = "Scan"
)]
pub async fn submit_scan(
    dispatcher: web::Data<ScanDispatcher>,
    body: web::Json<ScanRequest>,
) -> actix_web::Result<impl Responder> {
    let ScanRequest { payload, scanned_at } = body.into_inner();
    let now = scanned_at.unwrap_or_else(Utc::now);

    let result = dispatcher.handle_scan(payload.as_bytes(), now).await?;
    Ok(HttpResponse::Ok().json(result))
}
