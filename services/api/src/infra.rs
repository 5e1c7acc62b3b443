use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tour_desk::workflows::tours::{
    CacheInvalidator, CacheTag, ListingId, NewTourRequest, ProfileDirectory, ProfileError,
    RowError, StoreError, TourRequest, TourRequestId, TourRequestRow, TourRequestStore, UserId,
};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory stand-in for the hosted tour-request store. Identifier
/// assignment happens here, and records live as persisted rows so every
/// read and write crosses the typed/untyped boundary the way the hosted
/// backend's would.
#[derive(Default)]
pub(crate) struct InMemoryTourRequestStore {
    rows: Mutex<HashMap<String, TourRequestRow>>,
    sequence: AtomicU64,
}

fn corrupt_row(err: RowError) -> StoreError {
    StoreError::Unavailable(format!("corrupt tour request row: {err}"))
}

impl InMemoryTourRequestStore {
    fn decoded(
        &self,
        keep: impl Fn(&TourRequest) -> bool,
    ) -> Result<Vec<TourRequest>, StoreError> {
        let rows = self.rows.lock().expect("store mutex poisoned");
        let mut requests = Vec::new();
        for row in rows.values() {
            let request = row.clone().decode().map_err(corrupt_row)?;
            if keep(&request) {
                requests.push(request);
            }
        }
        Ok(requests)
    }
}

impl TourRequestStore for InMemoryTourRequestStore {
    fn insert(&self, request: NewTourRequest) -> Result<TourRequest, StoreError> {
        let id = TourRequestId(format!(
            "tour-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1
        ));
        let stored = request.into_request(id.clone());
        let row = TourRequestRow::encode(&stored).map_err(corrupt_row)?;
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .insert(id.0.clone(), row);
        Ok(stored)
    }

    fn fetch(&self, id: &TourRequestId) -> Result<Option<TourRequest>, StoreError> {
        let rows = self.rows.lock().expect("store mutex poisoned");
        match rows.get(&id.0) {
            Some(row) => row.clone().decode().map(Some).map_err(corrupt_row),
            None => Ok(None),
        }
    }

    fn active_by_user(&self, user: &UserId) -> Result<Vec<TourRequest>, StoreError> {
        self.decoded(|request| request.requester_id == *user && request.is_active())
    }

    fn active_by_listing(&self, listing: &ListingId) -> Result<Vec<TourRequest>, StoreError> {
        self.decoded(|request| request.references_listing(listing) && request.is_active())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryProfileDirectory {
    phones: Mutex<HashMap<UserId, String>>,
}

impl ProfileDirectory for InMemoryProfileDirectory {
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
        Ok(())
    }
}

/// Logs invalidation tags; dependent views refetch on their own schedule.
#[derive(Default)]
pub(crate) struct LoggingCacheInvalidator;

impl CacheInvalidator for LoggingCacheInvalidator {
    fn invalidate(&self, tag: CacheTag) {
        debug!(%tag, "cache invalidated");
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
