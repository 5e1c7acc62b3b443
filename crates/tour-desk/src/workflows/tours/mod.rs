//! Tour-request scheduling: draft selection, priority ranking, contact
//! validation, conflict checks, and the submission pipeline.
//!
//! The flow is one-directional: UI input mutates a [`SelectionDraft`],
//! ranking keeps priorities dense, and on submit the
//! [`TourSchedulingService`] validates the draft, checks for duplicates,
//! syncs the contact profile, persists the request, and hands back a
//! [`ConfirmationSummary`].

pub mod conflicts;
pub mod contact;
pub mod domain;
pub mod repository;
pub mod router;
pub mod selection;
pub mod service;
pub mod summary;

#[cfg(test)]
mod tests;

pub use conflicts::{ConflictChecker, DuplicateTour, TimeConflict};
pub use contact::{is_valid_phone, validate_phone, PhoneError, ValidPhone};
pub use domain::{
    ContactMethod, DayPeriod, ListingId, SlotCandidate, TourRequest, TourRequestId,
    TourRequestStatus, TourSlot, UserId, SLOT_INTERVAL_MINUTES,
};
pub use repository::{
    CacheInvalidator, CacheTag, NewTourRequest, ProfileDirectory, ProfileError, RowError,
    StoreError, TourRequestRow, TourRequestStore,
};
pub use router::tour_router;
pub use selection::{
    reduce, ChosenSlot, SchedulingPolicy, SelectedDate, SelectionAction, SelectionDraft,
    SelectionError,
};
pub use service::{
    SubmissionError, SubmissionPhase, SubmissionReceipt, TourSchedulingService, TourSubmission,
};
pub use summary::{ConfirmationSummary, DateSummary, SlotView};
