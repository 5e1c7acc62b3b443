use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for persisted tour requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TourRequestId(pub String);

/// Identifier wrapper for the requesting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for a rental listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Spacing between offered tour times.
pub const SLOT_INTERVAL_MINUTES: i64 = 30;

/// Half-day bucket narrowing the offered slot set for a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    Morning,
    Afternoon,
}

impl DayPeriod {
    pub const fn label(self) -> &'static str {
        match self {
            DayPeriod::Morning => "morning",
            DayPeriod::Afternoon => "afternoon",
        }
    }

    /// Inclusive window of tourable times for this half-day.
    pub fn window(self) -> (NaiveTime, NaiveTime) {
        match self {
            DayPeriod::Morning => (clock(9, 0), clock(12, 0)),
            DayPeriod::Afternoon => (clock(13, 0), clock(17, 0)),
        }
    }

    /// Offered tour times, in half-hour steps across the window.
    pub fn candidate_slots(self) -> Vec<NaiveTime> {
        let (start, end) = self.window();
        let step = Duration::minutes(SLOT_INTERVAL_MINUTES);
        let mut slots = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            slots.push(cursor);
            cursor = cursor.overflowing_add_signed(step).0;
        }
        slots
    }

    pub fn offers(self, time: NaiveTime) -> bool {
        self.candidate_slots().contains(&time)
    }
}

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("in-range clock value")
}

/// A candidate `(date, time)` pair prior to ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// A chosen tour time carrying its preference rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: u8,
}

impl TourSlot {
    pub fn candidate(&self) -> SlotCandidate {
        SlotCandidate {
            date: self.date,
            time: self.time,
        }
    }
}

/// How the requester wants to be reached for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Email,
    Phone,
    Both,
}

impl ContactMethod {
    pub const fn label(self) -> &'static str {
        match self {
            ContactMethod::Email => "email",
            ContactMethod::Phone => "phone",
            ContactMethod::Both => "both",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

/// Request lifecycle; every transition after `Pending` is made by an
/// external coordinator, never by this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourRequestStatus {
    Pending,
    Confirmed,
    Contacted,
    Completed,
    Cancelled,
}

impl TourRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TourRequestStatus::Pending => "pending",
            TourRequestStatus::Confirmed => "confirmed",
            TourRequestStatus::Contacted => "contacted",
            TourRequestStatus::Completed => "completed",
            TourRequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "contacted" => Some(Self::Contacted),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Active requests block duplicate submissions and participate in
    /// time-conflict checks.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            TourRequestStatus::Pending | TourRequestStatus::Confirmed | TourRequestStatus::Contacted
        )
    }
}

/// The persisted tour request. Created only by the submission pipeline and
/// never mutated by this subsystem afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourRequest {
    pub id: TourRequestId,
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

impl TourRequest {
    /// Primary listing followed by the bundled additional listings.
    pub fn listing_ids(&self) -> impl Iterator<Item = &ListingId> {
        std::iter::once(&self.primary_listing_id).chain(self.additional_listing_ids.iter())
    }

    pub fn references_listing(&self, listing: &ListingId) -> bool {
        self.listing_ids().any(|id| id == listing)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morning_window_offers_seven_half_hour_slots() {
        let slots = DayPeriod::Morning.candidate_slots();
        assert_eq!(slots.len(), 7);
        assert_eq!(slots[0], clock(9, 0));
        assert_eq!(slots[6], clock(12, 0));
    }

    #[test]
    fn afternoon_window_offers_nine_half_hour_slots() {
        let slots = DayPeriod::Afternoon.candidate_slots();
        assert_eq!(slots.len(), 9);
        assert_eq!(slots[0], clock(13, 0));
        assert_eq!(slots[8], clock(17, 0));
    }

    #[test]
    fn periods_reject_unaligned_times() {
        assert!(DayPeriod::Morning.offers(clock(10, 30)));
        assert!(!DayPeriod::Morning.offers(clock(10, 15)));
        assert!(!DayPeriod::Morning.offers(clock(13, 0)));
        assert!(!DayPeriod::Afternoon.offers(clock(12, 0)));
    }

    #[test]
    fn status_activity_matches_lifecycle() {
        assert!(TourRequestStatus::Pending.is_active());
        assert!(TourRequestStatus::Confirmed.is_active());
        assert!(TourRequestStatus::Contacted.is_active());
        assert!(!TourRequestStatus::Completed.is_active());
        assert!(!TourRequestStatus::Cancelled.is_active());
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            TourRequestStatus::Pending,
            TourRequestStatus::Confirmed,
            TourRequestStatus::Contacted,
            TourRequestStatus::Completed,
            TourRequestStatus::Cancelled,
        ] {
            assert_eq!(TourRequestStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(TourRequestStatus::from_label("archived"), None);
    }
}
