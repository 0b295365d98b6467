use crate::{
    errors::AppError,
    model::{attendance::ScanOutcome, person::Person},
    scan::decoder::ScanDecoder,
    store::{identity::IdentityStore, ledger::AttendanceLedger},
    utils::clock,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ScanStatus {
    TimeIn,
    TimeOut,
    Duplicate,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum RejectReason {
    UnknownIdentity,
    ClockSkew,
}

/// What the presentation layer shows for one scan.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanResult {
    pub status: ScanStatus,
    pub reason: Option<RejectReason>,
    pub person: Option<Person>,
    pub duration_seconds: Option<i64>,
    #[schema(value_type = String, format = "date-time")]
    pub scanned_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Clone)]
pub struct ScanDispatcher {
    decoder: Arc<dyn ScanDecoder>,
    identities: IdentityStore,
    ledger: AttendanceLedger,
}

impl ScanDispatcher {
    pub fn new(
        decoder: Arc<dyn ScanDecoder>,
        identities: IdentityStore,
        ledger: AttendanceLedger,
    ) -> Self {
        Self {
            decoder,
            identities,
            ledger,
        }
    }

    /// Decode, identify and record one scan. A failed decode is an error;
    /// unknown identities and rejected scans come back as `ScanResult`s.
    #[instrument(name = "handle_scan", skip(self, raw_payload))]
    pub async fn handle_scan(
        &self,
        raw_payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ScanResult, AppError> {
        let identity_token = self.decoder.decode(raw_payload)?;

        let person = match self.identities.lookup(&identity_token).await {
            Ok(person) => person,
            Err(AppError::UnknownIdentity) => {
                info!(identity_token, "Scan rejected: unknown identity");
                return Ok(rejected(RejectReason::UnknownIdentity, None, now));
            }
            Err(e) => return Err(e),
        };

        let outcome = match self.ledger.record_scan(&identity_token, now).await {
            Ok(outcome) => outcome,
            // deleted after lookup
            Err(AppError::UnknownIdentity) => {
                return Ok(rejected(RejectReason::UnknownIdentity, None, now));
            }
            Err(e) => return Err(e),
        };

        Ok(match outcome {
            ScanOutcome::TimeIn => ScanResult {
                status: ScanStatus::TimeIn,
                reason: None,
                duration_seconds: None,
                scanned_at: now,
                message: format!("TIME-IN recorded for {}. Welcome!", person.name),
                person: Some(person),
            },
            ScanOutcome::TimeOut { duration_seconds } => ScanResult {
                status: ScanStatus::TimeOut,
                reason: None,
                duration_seconds: Some(duration_seconds),
                scanned_at: now,
                message: format!(
                    "TIME-OUT recorded for {}. Duration: {}. Thank you!",
                    person.name,
                    clock::format_duration(duration_seconds)
                ),
                person: Some(person),
            },
            ScanOutcome::Duplicate => ScanResult {
                status: ScanStatus::Duplicate,
                reason: None,
                duration_seconds: None,
                scanned_at: now,
                message: format!(
                    "{} already has a time-in and time-out for today.",
                    person.name
                ),
                person: Some(person),
            },
            ScanOutcome::ClockSkew { time_in } => {
                let message = format!(
                    "Scan rejected for {}: clock is earlier than the recorded time-in ({}).",
                    person.name,
                    time_in.format("%H:%M:%S")
                );
                ScanResult {
                    message,
                    ..rejected(RejectReason::ClockSkew, Some(person), now)
                }
            }
        })
    }
}

fn rejected(reason: RejectReason, person: Option<Person>, now: DateTime<Utc>) -> ScanResult {
    let message = match reason {
        RejectReason::UnknownIdentity => "Code is not registered. Please register first.",
        RejectReason::ClockSkew => "Scan rejected: clock is earlier than the recorded time-in.",
    };
    ScanResult {
        status: ScanStatus::Rejected,
        reason: Some(reason),
        person,
        duration_seconds: None,
        scanned_at: now,
        message: message.to_string(),
    }
}
