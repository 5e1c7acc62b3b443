use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use super::domain::{ListingId, TourRequest, TourRequestId};

/// One ranked time inside a date group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub time: NaiveTime,
    pub rank: u8,
}

/// All chosen times on one date, rank ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateSummary {
    pub date: NaiveDate,
    pub best_rank: u8,
    pub slots: Vec<SlotView>,
}

/// Read-only projection of a persisted request for confirmation display.
/// Dates are ordered by their best (minimum) slot rank, slots within a
/// date by rank ascending. No I/O, no side effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationSummary {
    pub request_id: TourRequestId,
    pub primary_listing_id: ListingId,
    pub additional_listing_ids: Vec<ListingId>,
    pub status: &'static str,
    pub contact_method: &'static str,
    pub priority_slot: Option<SlotView>,
    pub dates: Vec<DateSummary>,
    pub preferred_times_summary: String,
    pub requested_on: DateTime<Utc>,
}

impl ConfirmationSummary {
    pub fn from_request(request: &TourRequest) -> Self {
        let mut groups: BTreeMap<NaiveDate, Vec<SlotView>> = BTreeMap::new();
        for slot in &request.time_slots {
            groups.entry(slot.date).or_default().push(SlotView {
                time: slot.time,
                rank: slot.priority,
            });
        }

        let mut dates: Vec<DateSummary> = groups
            .into_iter()
            .map(|(date, mut slots)| {
                slots.sort_by_key(|slot| slot.rank);
                let best_rank = slots.first().map(|slot| slot.rank).unwrap_or(u8::MAX);
                DateSummary {
                    date,
                    best_rank,
                    slots,
                }
            })
            .collect();
        dates.sort_by_key(|summary| summary.best_rank);

        let priority_slot = request.priority_slot.map(|slot| SlotView {
            time: slot.time,
            rank: slot.priority,
        });

        Self {
            request_id: request.id.clone(),
            primary_listing_id: request.primary_listing_id.clone(),
            additional_listing_ids: request.additional_listing_ids.clone(),
            status: request.status.label(),
            contact_method: request.contact_method.label(),
            priority_slot,
            dates,
            preferred_times_summary: request.preferred_times_summary.clone(),
            requested_on: request.created_at,
        }
    }

    /// Total slots across all date groups.
    pub fn slot_count(&self) -> usize {
        self.dates.iter().map(|date| date.slots.len()).sum()
    }

    pub fn listing_count(&self) -> usize {
        1 + self.additional_listing_ids.len()
    }
}
