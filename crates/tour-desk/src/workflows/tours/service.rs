use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::conflicts::{ConflictChecker, DuplicateTour, TimeConflict};
use super::contact::{validate_phone, PhoneError};
use super::domain::{
    ContactMethod, ListingId, SlotCandidate, TourRequest, TourRequestId, TourRequestStatus,
    TourSlot, UserId,
};
use super::repository::{
    CacheInvalidator, CacheTag, NewTourRequest, ProfileDirectory, ProfileError, StoreError,
    TourRequestStore,
};
use super::selection::{ChosenSlot, SchedulingPolicy, SelectionDraft};
use super::summary::ConfirmationSummary;

/// Everything a user hands over when requesting a tour. The draft stays
/// caller-owned: a failed submission leaves it intact for retry.
#[derive(Debug, Clone)]
pub struct TourSubmission {
    pub requester_id: UserId,
    pub primary_listing_id: ListingId,
    pub additional_listing_ids: Vec<ListingId>,
    pub selection: SelectionDraft,
    pub contact_phone: String,
    pub contact_country_code: String,
    pub contact_method: ContactMethod,
    pub notes: Option<String>,
}

impl TourSubmission {
    /// Additional listings with duplicates and the primary id dropped,
    /// original order preserved.
    pub fn normalized_additional(&self) -> Vec<ListingId> {
        let mut normalized: Vec<ListingId> = Vec::new();
        for listing in &self.additional_listing_ids {
            if *listing != self.primary_listing_id && !normalized.contains(listing) {
                normalized.push(listing.clone());
            }
        }
        normalized
    }

    /// Primary listing followed by the normalized additional listings.
    pub fn listing_ids(&self) -> Vec<ListingId> {
        let mut ids = vec![self.primary_listing_id.clone()];
        ids.extend(self.normalized_additional());
        ids
    }
}

/// Where an in-flight submission currently is. Kept behind a mutex so a
/// second submit during any non-idle phase is rejected rather than queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Checking,
    Persisting,
}

impl SubmissionPhase {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionPhase::Idle => "idle",
            SubmissionPhase::Validating => "validating",
            SubmissionPhase::Checking => "checking",
            SubmissionPhase::Persisting => "persisting",
        }
    }
}

/// Resets the phase to `Idle` on drop, so no failure path can leave the
/// service wedged in a non-idle phase.
struct PhaseGuard<'a> {
    phase: &'a Mutex<SubmissionPhase>,
}

impl<'a> PhaseGuard<'a> {
    fn begin(phase: &'a Mutex<SubmissionPhase>) -> Option<Self> {
        let mut current = phase.lock().expect("submission phase mutex poisoned");
        if *current != SubmissionPhase::Idle {
            return None;
        }
        *current = SubmissionPhase::Validating;
        Some(Self { phase })
    }

    fn advance(&self, next: SubmissionPhase) {
        *self.phase.lock().expect("submission phase mutex poisoned") = next;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.phase.lock().expect("submission phase mutex poisoned") = SubmissionPhase::Idle;
    }
}

/// Error raised by the submission pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("select at least one tour time before submitting")]
    NoSlotsSelected,
    #[error("a contact phone number is required")]
    MissingContact,
    #[error("contact phone rejected: {0}")]
    InvalidContact(#[from] PhoneError),
    #[error(
        "an active tour request from {} already covers listing {}",
        .0.requested_on.format("%Y-%m-%d"),
        .0.listing_id.0
    )]
    DuplicateRequest(DuplicateTour),
    #[error("unable to update contact profile: {0}")]
    ProfileUpdateFailed(#[source] ProfileError),
    #[error("tour request could not be submitted: {0}")]
    SubmissionFailed(#[source] StoreError),
    #[error("a submission is already in flight for this draft")]
    SubmissionInProgress,
}

/// Successful submission: the stored request and its display summary.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub request: TourRequest,
    pub summary: ConfirmationSummary,
}

/// Service composing the conflict checker, profile directory, store, and
/// cache invalidation behind the submission state machine.
pub struct TourSchedulingService<S, P, C> {
    store: Arc<S>,
    profiles: Arc<P>,
    cache: Arc<C>,
    conflicts: ConflictChecker<S>,
    policy: SchedulingPolicy,
    phase: Mutex<SubmissionPhase>,
}

impl<S, P, C> TourSchedulingService<S, P, C>
where
    S: TourRequestStore + 'static,
    P: ProfileDirectory + 'static,
    C: CacheInvalidator + 'static,
{
    pub fn new(store: Arc<S>, profiles: Arc<P>, cache: Arc<C>, policy: SchedulingPolicy) -> Self {
        let conflicts = ConflictChecker::new(store.clone());
        Self {
            store,
            profiles,
            cache,
            conflicts,
            policy,
            phase: Mutex::new(SubmissionPhase::Idle),
        }
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    pub fn phase(&self) -> SubmissionPhase {
        *self.phase.lock().expect("submission phase mutex poisoned")
    }

    /// Drive a draft through validation, duplicate checking, profile sync,
    /// and persistence. Concurrent calls while one submission is in flight
    /// return [`SubmissionError::SubmissionInProgress`] and change nothing.
    pub fn submit(
        &self,
        submission: &TourSubmission,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let guard =
            PhaseGuard::begin(&self.phase).ok_or(SubmissionError::SubmissionInProgress)?;

        let ranked = submission.selection.slots_by_priority();
        if ranked.is_empty() {
            return Err(SubmissionError::NoSlotsSelected);
        }
        let phone = submission.contact_phone.trim();
        if phone.is_empty() {
            return Err(SubmissionError::MissingContact);
        }
        let contact = validate_phone(phone, &submission.contact_country_code)?;

        guard.advance(SubmissionPhase::Checking);
        let listing_ids = submission.listing_ids();
        let existing = self
            .conflicts
            .duplicate_request(&submission.requester_id, &listing_ids)
            .map_err(SubmissionError::SubmissionFailed)?;
        if let Some(existing) = existing {
            warn!(
                user = %submission.requester_id.0,
                listing = %existing.listing_id.0,
                existing_request = %existing.request_id.0,
                "duplicate tour request blocked"
            );
            return Err(SubmissionError::DuplicateRequest(existing));
        }

        guard.advance(SubmissionPhase::Persisting);
        self.sync_profile_phone(&submission.requester_id, &contact.e164())?;

        let stored = self
            .store
            .insert(build_new_request(submission, &ranked, &contact.e164(), now))
            .map_err(SubmissionError::SubmissionFailed)?;

        self.cache
            .invalidate(CacheTag::UserTourRequests(stored.requester_id.clone()));
        for listing in stored.listing_ids() {
            self.cache.invalidate(CacheTag::ListingTour(listing.clone()));
        }

        info!(
            request = %stored.id.0,
            user = %stored.requester_id.0,
            slots = stored.time_slots.len(),
            "tour request submitted"
        );

        let summary = ConfirmationSummary::from_request(&stored);
        Ok(SubmissionReceipt {
            request: stored,
            summary,
        })
    }

    /// UI pre-check: which of the draft's slots collide with the user's
    /// other active requests.
    pub fn preview_conflicts(
        &self,
        user: &UserId,
        selection: &SelectionDraft,
        exclude: Option<&TourRequestId>,
    ) -> Result<Vec<TimeConflict>, StoreError> {
        let requested: Vec<_> = selection
            .slots()
            .iter()
            .map(ChosenSlot::candidate)
            .collect();
        self.slot_conflicts(user, &requested, exclude)
    }

    /// Conflict check over bare `(date, time)` candidates, for callers that
    /// have not built a draft.
    pub fn slot_conflicts(
        &self,
        user: &UserId,
        requested: &[SlotCandidate],
        exclude: Option<&TourRequestId>,
    ) -> Result<Vec<TimeConflict>, StoreError> {
        self.conflicts.time_conflicts(user, requested, exclude)
    }

    /// Fetch a stored request for confirmation display.
    pub fn request(&self, id: &TourRequestId) -> Result<TourRequest, StoreError> {
        self.store.fetch(id)?.ok_or(StoreError::NotFound)
    }

    /// Never persist a tour request whose contact number we failed to put
    /// on file first.
    fn sync_profile_phone(&self, user: &UserId, phone: &str) -> Result<(), SubmissionError> {
        let on_file = self
            .profiles
            .contact_phone(user)
            .map_err(SubmissionError::ProfileUpdateFailed)?;
        if on_file.as_deref() != Some(phone) {
            self.profiles
                .update_contact_phone(user, phone)
                .map_err(SubmissionError::ProfileUpdateFailed)?;
        }
        Ok(())
    }
}

fn build_new_request(
    submission: &TourSubmission,
    ranked: &[ChosenSlot],
    contact_phone: &str,
    now: DateTime<Utc>,
) -> NewTourRequest {
    let time_slots: Vec<TourSlot> = ranked
        .iter()
        .map(|slot| TourSlot {
            date: slot.date,
            time: slot.time,
            priority: slot.priority,
        })
        .collect();

    let mut selected_dates: Vec<_> = submission
        .selection
        .dates()
        .iter()
        .map(|entry| entry.date)
        .collect();
    selected_dates.sort_unstable();

    let notes = submission
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
        .map(str::to_string);

    NewTourRequest {
        requester_id: submission.requester_id.clone(),
        primary_listing_id: submission.primary_listing_id.clone(),
        additional_listing_ids: submission.normalized_additional(),
        selected_dates,
        preferred_times_summary: preferred_times_summary(&time_slots),
        priority_slot: time_slots.first().copied(),
        time_slots,
        contact_phone: contact_phone.to_string(),
        contact_method: submission.contact_method,
        notes,
        status: TourRequestStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

/// `"{priority}. {date} at {time}"` per slot, joined with `", "`, ordered
/// by priority ascending.
fn preferred_times_summary(ranked: &[TourSlot]) -> String {
    ranked
        .iter()
        .map(|slot| {
            format!(
                "{}. {} at {}",
                slot.priority,
                slot.date.format("%Y-%m-%d"),
                slot.time.format("%H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
