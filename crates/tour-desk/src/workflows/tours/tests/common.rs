use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::tours::conflicts::ConflictChecker;
use crate::workflows::tours::domain::{
    ContactMethod, DayPeriod, ListingId, TourRequest, TourRequestId, TourRequestStatus, TourSlot,
    UserId,
};
use crate::workflows::tours::repository::{
    CacheInvalidator, CacheTag, NewTourRequest, ProfileDirectory, ProfileError, StoreError,
    TourRequestStore,
};
use crate::workflows::tours::selection::{SchedulingPolicy, SelectionDraft};
use crate::workflows::tours::service::{TourSchedulingService, TourSubmission};

pub(super) fn day(year: i32, month: u32, dom: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, dom).expect("valid date")
}

pub(super) fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// Fixed clock so window math stays stable in tests.
pub(super) fn today() -> NaiveDate {
    day(2025, 6, 1)
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn user() -> UserId {
    UserId("user-42".to_string())
}

pub(super) fn listing() -> ListingId {
    ListingId("listing-100".to_string())
}

/// The end-to-end draft: 2025-06-10 and 2025-06-12, afternoon on both,
/// 13:00 and 14:30 on the first date, 13:30 on the second.
pub(super) fn afternoon_draft() -> SelectionDraft {
    let mut draft = SelectionDraft::new(SchedulingPolicy::default());
    draft
        .toggle_date(today(), day(2025, 6, 10))
        .expect("first date selects");
    draft
        .toggle_date(today(), day(2025, 6, 12))
        .expect("second date selects");
    draft
        .set_period(day(2025, 6, 10), DayPeriod::Afternoon)
        .expect("period switches");
    draft
        .set_period(day(2025, 6, 12), DayPeriod::Afternoon)
        .expect("period switches");
    draft
        .toggle_slot(day(2025, 6, 10), at(13, 0))
        .expect("slot selects");
    draft
        .toggle_slot(day(2025, 6, 10), at(14, 30))
        .expect("slot selects");
    draft
        .toggle_slot(day(2025, 6, 12), at(13, 30))
        .expect("slot selects");
    draft.promote_to_top(0).expect("promote is a no-op at rank 1");
    draft
}

pub(super) fn submission() -> TourSubmission {
    TourSubmission {
        requester_id: user(),
        primary_listing_id: listing(),
        additional_listing_ids: Vec::new(),
        selection: afternoon_draft(),
        contact_phone: "+15551234567".to_string(),
        contact_country_code: "+1".to_string(),
        contact_method: ContactMethod::Both,
        notes: Some("Gate code 4411".to_string()),
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<HashMap<TourRequestId, TourRequest>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }

    pub(super) fn all(&self) -> Vec<TourRequest> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl TourRequestStore for MemoryStore {
    fn insert(&self, request: NewTourRequest) -> Result<TourRequest, StoreError> {
        let id = TourRequestId(format!(
            "tour-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1
        ));
        let stored = request.into_request(id.clone());
        self.records
            .lock()
            .expect("store mutex poisoned")
            .insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch(&self, id: &TourRequestId) -> Result<Option<TourRequest>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn active_by_user(&self, user: &UserId) -> Result<Vec<TourRequest>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|request| request.requester_id == *user && request.is_active())
            .cloned()
            .collect())
    }

    fn active_by_listing(&self, listing: &ListingId) -> Result<Vec<TourRequest>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|request| request.references_listing(listing) && request.is_active())
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableStore;

impl TourRequestStore for UnavailableStore {
    fn insert(&self, _request: NewTourRequest) -> Result<TourRequest, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &TourRequestId) -> Result<Option<TourRequest>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn active_by_user(&self, _user: &UserId) -> Result<Vec<TourRequest>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn active_by_listing(&self, _listing: &ListingId) -> Result<Vec<TourRequest>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryProfiles {
    phones: Mutex<HashMap<UserId, String>>,
    updates: Mutex<Vec<(UserId, String)>>,
}

impl MemoryProfiles {
    pub(super) fn with_phone(user: UserId, phone: &str) -> Self {
        let profiles = Self::default();
        profiles
            .phones
            .lock()
            .expect("profile mutex poisoned")
            .insert(user, phone.to_string());
        profiles
    }

    pub(super) fn updates(&self) -> Vec<(UserId, String)> {
        self.updates.lock().expect("profile mutex poisoned").clone()
    }
}

impl ProfileDirectory for MemoryProfiles {
    fn contact_phone(&self, user: &UserId) -> Result<Option<String>, ProfileError> {
        Ok(self
            .phones
            .lock()
            .expect("profile mutex poisoned")
            .get(user)
            .cloned())
    }

    fn update_contact_phone(&self, user: &UserId, phone: &str) -> Result<(), ProfileError> {
        self.phones
            .lock()
            .expect("profile mutex poisoned")
            .insert(user.clone(), phone.to_string());
        self.updates
            .lock()
            .expect("profile mutex poisoned")
            .push((user.clone(), phone.to_string()));
        Ok(())
    }
}

pub(super) struct FailingProfiles;

impl ProfileDirectory for FailingProfiles {
    fn contact_phone(&self, _user: &UserId) -> Result<Option<String>, ProfileError> {
        Ok(None)
    }

    fn update_contact_phone(&self, _user: &UserId, _phone: &str) -> Result<(), ProfileError> {
        Err(ProfileError::Unavailable("profile service down".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingCache {
    tags: Mutex<Vec<CacheTag>>,
}

impl RecordingCache {
    pub(super) fn tags(&self) -> Vec<CacheTag> {
        self.tags.lock().expect("cache mutex poisoned").clone()
    }
}

impl CacheInvalidator for RecordingCache {
    fn invalidate(&self, tag: CacheTag) {
        self.tags.lock().expect("cache mutex poisoned").push(tag);
    }
}

pub(super) type MemoryService = TourSchedulingService<MemoryStore, MemoryProfiles, RecordingCache>;

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<MemoryStore>,
    Arc<MemoryProfiles>,
    Arc<RecordingCache>,
) {
    let store = Arc::new(MemoryStore::default());
    let profiles = Arc::new(MemoryProfiles::default());
    let cache = Arc::new(RecordingCache::default());
    let service = Arc::new(TourSchedulingService::new(
        store.clone(),
        profiles.clone(),
        cache.clone(),
        SchedulingPolicy::default(),
    ));
    (service, store, profiles, cache)
}

pub(super) fn checker(store: Arc<MemoryStore>) -> ConflictChecker<MemoryStore> {
    ConflictChecker::new(store)
}

/// Seed an active request directly into the store, bypassing the pipeline.
pub(super) fn seed_request(
    store: &MemoryStore,
    requester: UserId,
    primary: ListingId,
    additional: Vec<ListingId>,
    slots: Vec<TourSlot>,
    status: TourRequestStatus,
) -> TourRequest {
    let selected_dates: Vec<NaiveDate> = {
        let mut dates: Vec<NaiveDate> = slots.iter().map(|slot| slot.date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    };
    store
        .insert(NewTourRequest {
            requester_id: requester,
            primary_listing_id: primary,
            additional_listing_ids: additional,
            selected_dates,
            time_slots: slots,
            contact_phone: "+15550000000".to_string(),
            contact_method: ContactMethod::Phone,
            notes: None,
            preferred_times_summary: String::new(),
            priority_slot: None,
            status,
            created_at: now(),
            updated_at: now(),
        })
        .expect("seed insert succeeds")
}

pub(super) fn slot(date: NaiveDate, time: NaiveTime, priority: u8) -> TourSlot {
    TourSlot {
        date,
        time,
        priority,
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
