use std::sync::Arc;

use super::common::*;
use crate::workflows::tours::domain::{ListingId, SlotCandidate, TourRequestStatus, UserId};
use crate::workflows::tours::repository::StoreError;

#[test]
fn empty_store_reports_no_duplicates_or_conflicts() {
    let store = Arc::new(MemoryStore::default());
    let checker = checker(store);

    let duplicate = checker
        .duplicate_request(&user(), &[listing()])
        .expect("check succeeds");
    assert!(duplicate.is_none());

    let conflicts = checker
        .time_conflicts(
            &user(),
            &[SlotCandidate {
                date: day(2025, 6, 10),
                time: at(13, 0),
            }],
            None,
        )
        .expect("check succeeds");
    assert!(conflicts.is_empty());
}

#[test]
fn duplicate_found_for_primary_listing() {
    let store = Arc::new(MemoryStore::default());
    let existing = seed_request(
        &store,
        user(),
        listing(),
        Vec::new(),
        vec![slot(day(2025, 6, 5), at(10, 0), 1)],
        TourRequestStatus::Pending,
    );

    let duplicate = checker(store)
        .duplicate_request(&user(), &[listing()])
        .expect("check succeeds")
        .expect("duplicate reported");
    assert_eq!(duplicate.request_id, existing.id);
    assert_eq!(duplicate.listing_id, listing());
    assert_eq!(duplicate.requested_on, existing.created_at);
}

#[test]
fn duplicate_found_when_listing_was_bundled_as_additional() {
    let store = Arc::new(MemoryStore::default());
    seed_request(
        &store,
        user(),
        ListingId("listing-x".to_string()),
        vec![ListingId("listing-y".to_string())],
        vec![slot(day(2025, 6, 5), at(10, 0), 1)],
        TourRequestStatus::Confirmed,
    );

    // A new request for Y alone is blocked by the bundled [X, Y] tour.
    let duplicate = checker(store)
        .duplicate_request(&user(), &[ListingId("listing-y".to_string())])
        .expect("check succeeds");
    assert!(duplicate.is_some());
}

#[test]
fn settled_requests_do_not_block_new_submissions() {
    let store = Arc::new(MemoryStore::default());
    for status in [TourRequestStatus::Completed, TourRequestStatus::Cancelled] {
        seed_request(
            &store,
            user(),
            listing(),
            Vec::new(),
            vec![slot(day(2025, 6, 5), at(10, 0), 1)],
            status,
        );
    }

    let duplicate = checker(store)
        .duplicate_request(&user(), &[listing()])
        .expect("check succeeds");
    assert!(duplicate.is_none());
}

#[test]
fn other_users_requests_are_ignored() {
    let store = Arc::new(MemoryStore::default());
    seed_request(
        &store,
        UserId("user-other".to_string()),
        listing(),
        Vec::new(),
        vec![slot(day(2025, 6, 10), at(13, 0), 1)],
        TourRequestStatus::Pending,
    );
    let checker = checker(store);

    assert!(checker
        .duplicate_request(&user(), &[listing()])
        .expect("check succeeds")
        .is_none());
    assert!(checker
        .time_conflicts(
            &user(),
            &[SlotCandidate {
                date: day(2025, 6, 10),
                time: at(13, 0),
            }],
            None,
        )
        .expect("check succeeds")
        .is_empty());
}

#[test]
fn exact_slot_match_is_a_conflict_same_day_alone_is_not() {
    let store = Arc::new(MemoryStore::default());
    let existing = seed_request(
        &store,
        user(),
        ListingId("listing-200".to_string()),
        Vec::new(),
        vec![slot(day(2025, 6, 1), at(10, 0), 1)],
        TourRequestStatus::Pending,
    );
    let checker = checker(store);

    let same_pair = checker
        .time_conflicts(
            &user(),
            &[SlotCandidate {
                date: day(2025, 6, 1),
                time: at(10, 0),
            }],
            None,
        )
        .expect("check succeeds");
    assert_eq!(same_pair.len(), 1);
    assert_eq!(same_pair[0].existing_request_id, existing.id);
    assert_eq!(same_pair[0].date, day(2025, 6, 1));
    assert_eq!(same_pair[0].time, at(10, 0));

    let same_day_different_time = checker
        .time_conflicts(
            &user(),
            &[SlotCandidate {
                date: day(2025, 6, 1),
                time: at(10, 30),
            }],
            None,
        )
        .expect("check succeeds");
    assert!(same_day_different_time.is_empty());
}

#[test]
fn excluded_request_is_skipped() {
    let store = Arc::new(MemoryStore::default());
    let existing = seed_request(
        &store,
        user(),
        listing(),
        Vec::new(),
        vec![slot(day(2025, 6, 10), at(13, 0), 1)],
        TourRequestStatus::Pending,
    );

    let conflicts = checker(store)
        .time_conflicts(
            &user(),
            &[SlotCandidate {
                date: day(2025, 6, 10),
                time: at(13, 0),
            }],
            Some(&existing.id),
        )
        .expect("check succeeds");
    assert!(conflicts.is_empty());
}

#[test]
fn duplicate_candidates_yield_one_conflict_entry() {
    let store = Arc::new(MemoryStore::default());
    seed_request(
        &store,
        user(),
        listing(),
        Vec::new(),
        vec![slot(day(2025, 6, 10), at(13, 0), 1)],
        TourRequestStatus::Pending,
    );

    let candidate = SlotCandidate {
        date: day(2025, 6, 10),
        time: at(13, 0),
    };
    let conflicts = checker(store)
        .time_conflicts(&user(), &[candidate, candidate], None)
        .expect("check succeeds");
    assert_eq!(conflicts.len(), 1);
}

#[test]
fn store_outage_propagates_as_store_error() {
    let store = Arc::new(UnavailableStore);
    let checker = crate::workflows::tours::conflicts::ConflictChecker::new(store);

    assert!(matches!(
        checker.duplicate_request(&user(), &[listing()]),
        Err(StoreError::Unavailable(_))
    ));
}
