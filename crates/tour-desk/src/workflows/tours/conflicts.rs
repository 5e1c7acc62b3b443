use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use super::domain::{ListingId, SlotCandidate, TourRequest, TourRequestId, UserId};
use super::repository::{StoreError, TourRequestStore};

/// An active request already covering a listing in a new submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateTour {
    pub request_id: TourRequestId,
    pub listing_id: ListingId,
    pub requested_on: DateTime<Utc>,
}

/// A requested slot already held by another active request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeConflict {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub existing_request_id: TourRequestId,
}

/// Read-only pre-checks against the remote store, run before submission.
/// Best-effort: two sessions racing the same listing are resolved by the
/// store, not here.
pub struct ConflictChecker<S> {
    store: Arc<S>,
}

impl<S> Clone for ConflictChecker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: TourRequestStore> ConflictChecker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// First active request for `user` referencing any of `listing_ids` as
    /// primary or additional, if one exists.
    pub fn duplicate_request(
        &self,
        user: &UserId,
        listing_ids: &[ListingId],
    ) -> Result<Option<DuplicateTour>, StoreError> {
        for request in self.active_requests(user)? {
            if !request.is_active() {
                continue;
            }
            if let Some(listing) = listing_ids
                .iter()
                .find(|listing| request.references_listing(listing))
            {
                return Ok(Some(DuplicateTour {
                    request_id: request.id.clone(),
                    listing_id: listing.clone(),
                    requested_on: request.created_at,
                }));
            }
        }
        Ok(None)
    }

    /// Requested slots colliding with an active request's chosen slots.
    /// Sharing a date alone is not a conflict; the exact half-hour must
    /// match. `exclude` skips one request id for re-submission flows.
    pub fn time_conflicts(
        &self,
        user: &UserId,
        requested: &[SlotCandidate],
        exclude: Option<&TourRequestId>,
    ) -> Result<Vec<TimeConflict>, StoreError> {
        let mut conflicts: Vec<TimeConflict> = Vec::new();
        for request in self.active_requests(user)? {
            if Some(&request.id) == exclude || !request.is_active() {
                continue;
            }
            for candidate in requested {
                let held = request
                    .time_slots
                    .iter()
                    .any(|slot| slot.date == candidate.date && slot.time == candidate.time);
                if !held {
                    continue;
                }
                let conflict = TimeConflict {
                    date: candidate.date,
                    time: candidate.time,
                    existing_request_id: request.id.clone(),
                };
                if !conflicts.contains(&conflict) {
                    conflicts.push(conflict);
                }
            }
        }
        Ok(conflicts)
    }

    /// A user with no recorded requests is an empty result, not an error.
    fn active_requests(&self, user: &UserId) -> Result<Vec<TourRequest>, StoreError> {
        match self.store.active_by_user(user) {
            Ok(requests) => Ok(requests),
            Err(StoreError::NotFound) => Ok(Vec::new()),
            Err(other) => Err(other),
        }
    }
}
