use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ContactMethod, DayPeriod, ListingId, SlotCandidate, TourRequestId, UserId};
use super::repository::{CacheInvalidator, ProfileDirectory, StoreError, TourRequestStore};
use super::selection::{SelectionDraft, SelectionError};
use super::service::{SubmissionError, TourSchedulingService, TourSubmission};
use super::summary::ConfirmationSummary;

/// Router builder exposing HTTP endpoints for tour scheduling.
pub fn tour_router<S, P, C>(service: Arc<TourSchedulingService<S, P, C>>) -> Router
where
    S: TourRequestStore + 'static,
    P: ProfileDirectory + 'static,
    C: CacheInvalidator + 'static,
{
    Router::new()
        .route("/api/v1/tours/requests", post(submit_handler::<S, P, C>))
        .route(
            "/api/v1/tours/requests/:request_id",
            get(summary_handler::<S, P, C>),
        )
        .route(
            "/api/v1/tours/conflicts",
            post(conflict_preview_handler::<S, P, C>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct TourDateBody {
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    pub period: DayPeriod,
}

#[derive(Debug, Deserialize)]
pub struct TourSlotBody {
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    pub time: NaiveTime,
}

/// Submission payload. `slots` arrive in preference order; the draft is
/// rebuilt through the selection reducer so HTTP input obeys the same caps
/// and window rules as interactive input.
#[derive(Debug, Deserialize)]
pub struct TourRequestBody {
    pub requester_id: String,
    pub listing_id: String,
    #[serde(default)]
    pub additional_listing_ids: Vec<String>,
    pub dates: Vec<TourDateBody>,
    pub slots: Vec<TourSlotBody>,
    pub contact_phone: String,
    #[serde(default = "default_country_code")]
    pub contact_country_code: String,
    pub contact_method: ContactMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_country_code() -> String {
    "+1".to_string()
}

impl TourRequestBody {
    fn into_submission(
        self,
        today: NaiveDate,
        service_draft: SelectionDraft,
    ) -> Result<TourSubmission, SelectionError> {
        let mut selection = service_draft;
        for entry in &self.dates {
            selection.toggle_date(today, entry.date)?;
            selection.set_period(entry.date, entry.period)?;
        }
        for slot in &self.slots {
            selection.toggle_slot(slot.date, slot.time)?;
        }

        Ok(TourSubmission {
            requester_id: UserId(self.requester_id),
            primary_listing_id: ListingId(self.listing_id),
            additional_listing_ids: self
                .additional_listing_ids
                .into_iter()
                .map(ListingId)
                .collect(),
            selection,
            contact_phone: self.contact_phone,
            contact_country_code: self.contact_country_code,
            contact_method: self.contact_method,
            notes: self.notes,
        })
    }
}

pub(crate) async fn submit_handler<S, P, C>(
    State(service): State<Arc<TourSchedulingService<S, P, C>>>,
    axum::Json(body): axum::Json<TourRequestBody>,
) -> Response
where
    S: TourRequestStore + 'static,
    P: ProfileDirectory + 'static,
    C: CacheInvalidator + 'static,
{
    let now = Utc::now();
    let draft = SelectionDraft::new(service.policy().clone());
    let submission = match body.into_submission(now.date_naive(), draft) {
        Ok(submission) => submission,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match service.submit(&submission, now) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt.summary)).into_response(),
        Err(error) => submission_error_response(error),
    }
}

fn submission_error_response(error: SubmissionError) -> Response {
    match error {
        SubmissionError::DuplicateRequest(existing) => {
            let payload = json!({
                "error": "an active tour request already covers this listing",
                "existing_request_id": existing.request_id.0,
                "requested_on": existing.requested_on.to_rfc3339(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        SubmissionError::SubmissionInProgress => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        SubmissionError::NoSlotsSelected
        | SubmissionError::MissingContact
        | SubmissionError::InvalidContact(_) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn summary_handler<S, P, C>(
    State(service): State<Arc<TourSchedulingService<S, P, C>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: TourRequestStore + 'static,
    P: ProfileDirectory + 'static,
    C: CacheInvalidator + 'static,
{
    let id = TourRequestId(request_id);
    match service.request(&id) {
        Ok(request) => {
            let summary = ConfirmationSummary::from_request(&request);
            (StatusCode::OK, axum::Json(summary)).into_response()
        }
        Err(StoreError::NotFound) => {
            let payload = json!({ "error": "tour request not found", "request_id": id.0 });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConflictPreviewBody {
    pub requester_id: String,
    pub slots: Vec<TourSlotBody>,
    #[serde(default)]
    pub exclude_request_id: Option<String>,
}

pub(crate) async fn conflict_preview_handler<S, P, C>(
    State(service): State<Arc<TourSchedulingService<S, P, C>>>,
    axum::Json(body): axum::Json<ConflictPreviewBody>,
) -> Response
where
    S: TourRequestStore + 'static,
    P: ProfileDirectory + 'static,
    C: CacheInvalidator + 'static,
{
    let user = UserId(body.requester_id);
    let requested: Vec<SlotCandidate> = body
        .slots
        .iter()
        .map(|slot| SlotCandidate {
            date: slot.date,
            time: slot.time,
        })
        .collect();
    let exclude = body.exclude_request_id.map(TourRequestId);

    match service.slot_conflicts(&user, &requested, exclude.as_ref()) {
        Ok(conflicts) => {
            let payload = json!({ "conflicts": conflicts });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| serde::de::Error::custom(format!("'{raw}' is not YYYY-MM-DD ({err})")))
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|err| serde::de::Error::custom(format!("'{raw}' is not HH:MM ({err})")))
}
