use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ContactMethod, ListingId, TourRequest, TourRequestId, TourRequestStatus, TourSlot, UserId,
};

/// Remote-store abstraction for tour requests. Identifier assignment
/// happens inside `insert`; the `active_*` queries return only requests in
/// an active status and an empty result is not an error.
///
/// Uniqueness of `(user, listing)` across active requests is ultimately a
/// store concern (a unique constraint); the conflict checker is a fast
/// pre-check, not the enforcement point.
pub trait TourRequestStore: Send + Sync {
    fn insert(&self, request: NewTourRequest) -> Result<TourRequest, StoreError>;
    fn fetch(&self, id: &TourRequestId) -> Result<Option<TourRequest>, StoreError>;
    fn active_by_user(&self, user: &UserId) -> Result<Vec<TourRequest>, StoreError>;
    fn active_by_listing(&self, listing: &ListingId) -> Result<Vec<TourRequest>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Insert payload: everything but the store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTourRequest {
    pub requester_id: UserId,
    pub primary_listing_id: ListingId,
    pub additional_listing_ids: Vec<ListingId>,
    pub selected_dates: Vec<NaiveDate>,
    pub time_slots: Vec<TourSlot>,
    pub contact_phone: String,
    pub contact_method: ContactMethod,
    pub notes: Option<String>,
    pub preferred_times_summary: String,
    pub priority_slot: Option<TourSlot>,
    pub status: TourRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewTourRequest {
    pub fn into_request(self, id: TourRequestId) -> TourRequest {
        TourRequest {
            id,
            requester_id: self.requester_id,
            primary_listing_id: self.primary_listing_id,
            additional_listing_ids: self.additional_listing_ids,
            selected_dates: self.selected_dates,
            time_slots: self.time_slots,
            contact_phone: self.contact_phone,
            contact_method: self.contact_method,
            notes: self.notes,
            preferred_times_summary: self.preferred_times_summary,
            priority_slot: self.priority_slot,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// On-file contact details for the requesting user.
pub trait ProfileDirectory: Send + Sync {
    fn contact_phone(&self, user: &UserId) -> Result<Option<String>, ProfileError>;
    fn update_contact_phone(&self, user: &UserId, phone: &str) -> Result<(), ProfileError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile service unavailable: {0}")]
    Unavailable(String),
}

/// Logical view tags whose cached data must be refetched after a write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheTag {
    UserTourRequests(UserId),
    ListingTour(ListingId),
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::UserTourRequests(user) => write!(f, "tour-requests:user:{}", user.0),
            CacheTag::ListingTour(listing) => write!(f, "tour:listing:{}", listing.0),
        }
    }
}

/// Fire-and-forget invalidation signal consumed by dependent views.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, tag: CacheTag);
}

const DATE_COLUMN_FORMAT: &str = "%Y-%m-%d";
const TIME_COLUMN_FORMAT: &str = "%H:%M";

/// The persisted column shape. List-valued columns are stored as JSON text;
/// this is the single place where ids and slots cross the typed/untyped
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourRequestRow {
    pub id: String,
    pub user_id: String,
    pub listing_id: String,
    pub additional_listing_ids: String,
    pub selected_dates: String,
    pub selected_time_slots: String,
    pub contact_phone: String,
    pub contact_method: String,
    pub notes: Option<String>,
    pub preferred_times_summary: String,
    pub priority_slot: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row (de)serialization failures.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("malformed {column} column: {source}")]
    Column {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed {column} column: '{value}'")]
    Value { column: &'static str, value: String },
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    #[error("unknown contact method '{0}'")]
    UnknownContactMethod(String),
    #[error("additional listing ids must be unique and exclude the primary listing")]
    ListingIdCollision,
}

#[derive(Debug, Serialize, Deserialize)]
struct SlotColumn {
    date: String,
    time: String,
    priority: u8,
}

impl SlotColumn {
    fn encode(slot: &TourSlot) -> Self {
        Self {
            date: slot.date.format(DATE_COLUMN_FORMAT).to_string(),
            time: slot.time.format(TIME_COLUMN_FORMAT).to_string(),
            priority: slot.priority,
        }
    }

    fn decode(self) -> Result<TourSlot, RowError> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_COLUMN_FORMAT).map_err(|_| {
            RowError::Value {
                column: "selected_time_slots",
                value: self.date.clone(),
            }
        })?;
        let time = NaiveTime::parse_from_str(&self.time, TIME_COLUMN_FORMAT).map_err(|_| {
            RowError::Value {
                column: "selected_time_slots",
                value: self.time.clone(),
            }
        })?;
        Ok(TourSlot {
            date,
            time,
            priority: self.priority,
        })
    }
}

impl TourRequestRow {
    pub fn encode(request: &TourRequest) -> Result<Self, RowError> {
        let additional: Vec<&str> = request
            .additional_listing_ids
            .iter()
            .map(|listing| listing.0.as_str())
            .collect();
        let dates: Vec<String> = request
            .selected_dates
            .iter()
            .map(|date| date.format(DATE_COLUMN_FORMAT).to_string())
            .collect();
        let slots: Vec<SlotColumn> = request.time_slots.iter().map(SlotColumn::encode).collect();

        let priority_slot = request
            .priority_slot
            .as_ref()
            .map(|slot| serde_json::to_string(&SlotColumn::encode(slot)))
            .transpose()
            .map_err(|source| RowError::Column {
                column: "priority_slot",
                source,
            })?;

        Ok(Self {
            id: request.id.0.clone(),
            user_id: request.requester_id.0.clone(),
            listing_id: request.primary_listing_id.0.clone(),
            additional_listing_ids: serde_json::to_string(&additional).map_err(|source| {
                RowError::Column {
                    column: "additional_listing_ids",
                    source,
                }
            })?,
            selected_dates: serde_json::to_string(&dates).map_err(|source| RowError::Column {
                column: "selected_dates",
                source,
            })?,
            selected_time_slots: serde_json::to_string(&slots).map_err(|source| {
                RowError::Column {
                    column: "selected_time_slots",
                    source,
                }
            })?,
            contact_phone: request.contact_phone.clone(),
            contact_method: request.contact_method.label().to_string(),
            notes: request.notes.clone(),
            preferred_times_summary: request.preferred_times_summary.clone(),
            priority_slot,
            status: request.status.label().to_string(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        })
    }

    pub fn decode(self) -> Result<TourRequest, RowError> {
        let additional: Vec<String> =
            serde_json::from_str(&self.additional_listing_ids).map_err(|source| {
                RowError::Column {
                    column: "additional_listing_ids",
                    source,
                }
            })?;
        let mut additional_listing_ids = Vec::with_capacity(additional.len());
        for listing in additional {
            if listing == self.listing_id
                || additional_listing_ids.contains(&ListingId(listing.clone()))
            {
                return Err(RowError::ListingIdCollision);
            }
            additional_listing_ids.push(ListingId(listing));
        }

        let raw_dates: Vec<String> =
            serde_json::from_str(&self.selected_dates).map_err(|source| RowError::Column {
                column: "selected_dates",
                source,
            })?;
        let mut selected_dates = Vec::with_capacity(raw_dates.len());
        for raw in raw_dates {
            let date =
                NaiveDate::parse_from_str(&raw, DATE_COLUMN_FORMAT).map_err(|_| RowError::Value {
                    column: "selected_dates",
                    value: raw.clone(),
                })?;
            selected_dates.push(date);
        }

        let raw_slots: Vec<SlotColumn> =
            serde_json::from_str(&self.selected_time_slots).map_err(|source| {
                RowError::Column {
                    column: "selected_time_slots",
                    source,
                }
            })?;
        let mut time_slots = Vec::with_capacity(raw_slots.len());
        for raw in raw_slots {
            time_slots.push(raw.decode()?);
        }

        let priority_slot = match self.priority_slot {
            Some(raw) => {
                let column: SlotColumn =
                    serde_json::from_str(&raw).map_err(|source| RowError::Column {
                        column: "priority_slot",
                        source,
                    })?;
                Some(column.decode()?)
            }
            None => None,
        };

        let status = TourRequestStatus::from_label(&self.status)
            .ok_or(RowError::UnknownStatus(self.status.clone()))?;
        let contact_method = ContactMethod::from_label(&self.contact_method)
            .ok_or(RowError::UnknownContactMethod(self.contact_method.clone()))?;

        Ok(TourRequest {
            id: TourRequestId(self.id),
            requester_id: UserId(self.user_id),
            primary_listing_id: ListingId(self.listing_id),
            additional_listing_ids,
            selected_dates,
            time_slots,
            contact_phone: self.contact_phone,
            contact_method,
            notes: self.notes,
            preferred_times_summary: self.preferred_times_summary,
            priority_slot,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
