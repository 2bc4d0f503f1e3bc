//! Binding time slots to a calendar date.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::slots::TimeSlot;

/// A slot bound to a concrete date: an absolute departure time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartureInstant {
    pub slot: TimeSlot,
    pub at: DateTime<Utc>,
}

/// Bind `slot` onto `date` in `tz`, seconds zeroed.
///
/// Returns `None` when the local time does not exist on that date (a DST gap).
/// An ambiguous local time resolves to its earlier instant.
pub fn resolve<Tz: TimeZone>(tz: &Tz, date: NaiveDate, slot: TimeSlot) -> Option<DepartureInstant> {
    let local = date.and_time(slot.to_naive_time());
    let at = tz.from_local_datetime(&local).earliest()?;
    Some(DepartureInstant {
        slot,
        at: at.with_timezone(&Utc),
    })
}

/// Strictly after `now`.
pub fn is_future(instant: &DepartureInstant, now: DateTime<Utc>) -> bool {
    instant.at > now
}

/// Resolve every slot and keep the ones strictly after `now`, preserving
/// slot order. `now` is captured once by the caller for the whole window.
pub fn future_departures<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    slots: &[TimeSlot],
    now: DateTime<Utc>,
) -> Vec<DepartureInstant> {
    slots
        .iter()
        .filter_map(|slot| resolve(tz, date, *slot))
        .filter(|instant| is_future(instant, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    #[test]
    fn resolve_zeroes_seconds() {
        let instant = resolve(&Utc, date(), slot("07:45")).unwrap();
        assert_eq!(instant.at.hour(), 7);
        assert_eq!(instant.at.minute(), 45);
        assert_eq!(instant.at.second(), 0);
        assert_eq!(instant.at.nanosecond(), 0);
    }

    #[test]
    fn resolve_applies_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let instant = resolve(&tz, date(), slot("08:00")).unwrap();
        assert_eq!(instant.at.hour(), 6);
        assert_eq!(instant.slot, slot("08:00"));
    }

    #[test]
    fn boundary_instant_is_not_future() {
        let instant = resolve(&Utc, date(), slot("07:00")).unwrap();
        assert!(!is_future(&instant, instant.at));
        assert!(is_future(&instant, instant.at - chrono::Duration::seconds(1)));
    }

    #[test]
    fn future_departures_drops_elapsed_slots() {
        let slots = crate::slots::generate(slot("06:00"), slot("08:00"), 30).unwrap();
        let now = resolve(&Utc, date(), slot("07:00")).unwrap().at;
        let kept = future_departures(&Utc, date(), &slots, now);
        let labels: Vec<_> = kept.iter().map(|d| d.slot.to_string()).collect();
        assert_eq!(labels, vec!["07:30", "08:00"]);
    }

    #[test]
    fn future_departures_empty_for_past_date() {
        let slots = crate::slots::generate(slot("06:00"), slot("08:00"), 30).unwrap();
        let now = Utc::now();
        let past = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        assert!(future_departures(&Utc, past, &slots, now).is_empty());
    }
}
