use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::domain::{DayPeriod, SlotCandidate};

const DEFAULT_BOOKING_WINDOW_DAYS: i64 = 30;
const DEFAULT_MAX_SELECTED_DATES: usize = 3;
const DEFAULT_MAX_TOTAL_SLOTS: usize = 3;
const DEFAULT_MAX_SLOTS_PER_DATE: usize = 3;

/// Caps and booking window applied to a draft selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingPolicy {
    pub booking_window_days: i64,
    pub max_selected_dates: usize,
    pub max_total_slots: usize,
    pub max_slots_per_date: usize,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            booking_window_days: DEFAULT_BOOKING_WINDOW_DAYS,
            max_selected_dates: DEFAULT_MAX_SELECTED_DATES,
            max_total_slots: DEFAULT_MAX_TOTAL_SLOTS,
            max_slots_per_date: DEFAULT_MAX_SLOTS_PER_DATE,
        }
    }
}

impl SchedulingPolicy {
    /// Latest selectable tour date, measured from `today`.
    pub fn window_end(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.booking_window_days)
    }
}

/// A date the user has picked, with the half-day whose slots are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedDate {
    pub date: NaiveDate,
    pub period: DayPeriod,
}

/// A chosen slot inside the draft. The containing vec preserves insertion
/// order; `priority` carries the dense 1..=N rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: u8,
}

impl ChosenSlot {
    pub fn candidate(&self) -> SlotCandidate {
        SlotCandidate {
            date: self.date,
            time: self.time,
        }
    }
}

/// Rejected draft mutations. The draft is left untouched on every error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no more than {max} tour dates may be selected")]
    DateLimitReached { max: usize },
    #[error("{date} is outside the bookable window of {window} days")]
    DateOutOfWindow { date: NaiveDate, window: i64 },
    #[error("no more than {max} time slots may be selected")]
    SlotLimitReached { max: usize },
    #[error("no more than {max} time slots may be selected on {date}")]
    DateSlotLimitReached { date: NaiveDate, max: usize },
    #[error("{date} is not a selected tour date")]
    DateNotSelected { date: NaiveDate },
    #[error("{time} is not offered during the {} period", .period.label())]
    SlotOutsidePeriod {
        date: NaiveDate,
        time: NaiveTime,
        period: DayPeriod,
    },
    #[error("no chosen slot at position {index}")]
    SlotIndexOutOfRange { index: usize },
}

/// Every mutation the selection UI can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionAction {
    ToggleDate { date: NaiveDate },
    SetPeriod { date: NaiveDate, period: DayPeriod },
    ToggleSlot { date: NaiveDate, time: NaiveTime },
    PromoteToTop { index: usize },
    ResetOrder,
}

/// The in-progress, unpersisted selection state before submission.
///
/// Invariant: slot priorities always form exactly `{1, .., N}` with no gaps
/// or repeats, and every slot's date belongs to the selected dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDraft {
    policy: SchedulingPolicy,
    dates: Vec<SelectedDate>,
    slots: Vec<ChosenSlot>,
}

impl Default for SelectionDraft {
    fn default() -> Self {
        Self::new(SchedulingPolicy::default())
    }
}

/// Pure reducer form of [`SelectionDraft::apply`]: the input draft is left
/// untouched and a new draft is returned on success.
pub fn reduce(
    draft: &SelectionDraft,
    today: NaiveDate,
    action: SelectionAction,
) -> Result<SelectionDraft, SelectionError> {
    let mut next = draft.clone();
    next.apply(today, action)?;
    Ok(next)
}

impl SelectionDraft {
    pub fn new(policy: SchedulingPolicy) -> Self {
        Self {
            policy,
            dates: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    /// Selected dates in the order the user picked them.
    pub fn dates(&self) -> &[SelectedDate] {
        &self.dates
    }

    /// Chosen slots in insertion order.
    pub fn slots(&self) -> &[ChosenSlot] {
        &self.slots
    }

    /// Chosen slots ordered by rank, best first.
    pub fn slots_by_priority(&self) -> Vec<ChosenSlot> {
        let mut ordered = self.slots.clone();
        ordered.sort_by_key(|slot| slot.priority);
        ordered
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn period_for(&self, date: NaiveDate) -> Option<DayPeriod> {
        self.dates
            .iter()
            .find(|entry| entry.date == date)
            .map(|entry| entry.period)
    }

    pub fn apply(&mut self, today: NaiveDate, action: SelectionAction) -> Result<(), SelectionError> {
        match action {
            SelectionAction::ToggleDate { date } => self.toggle_date(today, date),
            SelectionAction::SetPeriod { date, period } => self.set_period(date, period),
            SelectionAction::ToggleSlot { date, time } => self.toggle_slot(date, time),
            SelectionAction::PromoteToTop { index } => self.promote_to_top(index),
            SelectionAction::ResetOrder => {
                self.reset_order();
                Ok(())
            }
        }
    }

    /// Select a date, or deselect it and cascade-remove its slots.
    pub fn toggle_date(&mut self, today: NaiveDate, date: NaiveDate) -> Result<(), SelectionError> {
        if let Some(position) = self.dates.iter().position(|entry| entry.date == date) {
            self.dates.remove(position);
            self.remove_slots_for_date(date);
            return Ok(());
        }

        if date <= today || date > self.policy.window_end(today) {
            return Err(SelectionError::DateOutOfWindow {
                date,
                window: self.policy.booking_window_days,
            });
        }
        if self.dates.len() >= self.policy.max_selected_dates {
            return Err(SelectionError::DateLimitReached {
                max: self.policy.max_selected_dates,
            });
        }

        self.dates.push(SelectedDate {
            date,
            period: DayPeriod::Morning,
        });
        Ok(())
    }

    /// Switch which half-day's slots are offered for `date`. The offered
    /// slot set changes, so slots already chosen on that date are dropped.
    pub fn set_period(&mut self, date: NaiveDate, period: DayPeriod) -> Result<(), SelectionError> {
        let entry = self
            .dates
            .iter_mut()
            .find(|entry| entry.date == date)
            .ok_or(SelectionError::DateNotSelected { date })?;

        if entry.period == period {
            return Ok(());
        }

        entry.period = period;
        self.remove_slots_for_date(date);
        Ok(())
    }

    /// Choose a slot at rank N+1, or drop an already-chosen slot.
    pub fn toggle_slot(&mut self, date: NaiveDate, time: NaiveTime) -> Result<(), SelectionError> {
        if let Some(position) = self
            .slots
            .iter()
            .position(|slot| slot.date == date && slot.time == time)
        {
            self.slots.remove(position);
            self.renumber_preserving_rank();
            return Ok(());
        }

        let period = self
            .period_for(date)
            .ok_or(SelectionError::DateNotSelected { date })?;
        if !period.offers(time) {
            return Err(SelectionError::SlotOutsidePeriod { date, time, period });
        }
        if self.slots.len() >= self.policy.max_total_slots {
            return Err(SelectionError::SlotLimitReached {
                max: self.policy.max_total_slots,
            });
        }
        let on_date = self.slots.iter().filter(|slot| slot.date == date).count();
        if on_date >= self.policy.max_slots_per_date {
            return Err(SelectionError::DateSlotLimitReached {
                date,
                max: self.policy.max_slots_per_date,
            });
        }

        self.slots.push(ChosenSlot {
            date,
            time,
            priority: self.slots.len() as u8 + 1,
        });
        Ok(())
    }

    /// Make the slot at `index` (insertion order) the first preference.
    /// Slots previously ranked ahead of it shift down one place; relative
    /// order among the rest is preserved. No-op when already at rank 1.
    pub fn promote_to_top(&mut self, index: usize) -> Result<(), SelectionError> {
        let promoted = self
            .slots
            .get(index)
            .copied()
            .ok_or(SelectionError::SlotIndexOutOfRange { index })?;
        if promoted.priority == 1 {
            return Ok(());
        }

        for slot in &mut self.slots {
            if slot.priority < promoted.priority {
                slot.priority += 1;
            }
        }
        self.slots[index].priority = 1;
        Ok(())
    }

    /// Re-assign ranks by original insertion order.
    pub fn reset_order(&mut self) {
        for (position, slot) in self.slots.iter_mut().enumerate() {
            slot.priority = position as u8 + 1;
        }
    }

    fn remove_slots_for_date(&mut self, date: NaiveDate) {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.date != date);
        if self.slots.len() != before {
            self.renumber_preserving_rank();
        }
    }

    /// Restore the dense 1..=N rank sequence after removals, keeping the
    /// surviving slots' relative order.
    fn renumber_preserving_rank(&mut self) {
        let mut order: Vec<usize> = (0..self.slots.len()).collect();
        order.sort_by_key(|position| self.slots[*position].priority);
        for (rank, position) in order.into_iter().enumerate() {
            self.slots[position].priority = rank as u8 + 1;
        }
    }
}
