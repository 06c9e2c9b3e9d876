//! Rolling-window projection of recurring slots onto concrete dates.

use chrono::{Duration, NaiveDate};
use roundtable_domain::{RecurringSlot, SlotOccurrence, Weekday};

/// Project recurring slot definitions onto every matching calendar date in
/// `[today, today + horizon_days]`, both ends inclusive.
///
/// Pure and deterministic: one occurrence per (active slot, matching date),
/// ordered by date, then slot start time. A horizon shorter than a week can
/// legitimately produce nothing for some slots; `horizon_days == 0` yields
/// only today's matches.
pub fn project(
    slots: &[RecurringSlot],
    today: NaiveDate,
    horizon_days: u32,
) -> Vec<SlotOccurrence> {
    let mut occurrences = Vec::new();

    for offset in 0..=i64::from(horizon_days) {
        let date = today + Duration::days(offset);
        let weekday = Weekday::of(date);

        let mut todays: Vec<&RecurringSlot> =
            slots.iter().filter(|slot| slot.active && slot.day_of_week == weekday).collect();
        todays.sort_by_key(|slot| (slot.start_time, slot.id));

        occurrences.extend(todays.into_iter().map(|slot| SlotOccurrence {
            date,
            slot_id: slot.id,
            start_time: slot.start_time,
        }));
    }

    occurrences
}
