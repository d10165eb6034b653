// ⏰ Scheduling - date/time slots, daily windows, next appointment
//
// All instants are local wall-clock NaiveDateTime values. No timezone
// conversion happens anywhere in this module.

use crate::entities::AgendaEntry;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Date format submitted by `<input type="date">`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format submitted by `<input type="time">`
pub const TIME_FORMAT: &str = "%H:%M";

// ============================================================================
// SLOT PARSING
// ============================================================================

pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
}

/// Accepts "HH:MM" and, from browsers that send seconds, "HH:MM:SS"
pub fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
}

/// Combine a calendar date and a time of day into one bookable instant
pub fn combine(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

// ============================================================================
// DAILY WINDOW
// ============================================================================

/// One calendar day: [local midnight, next midnight - 1ms], inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    pub fn containing(now: NaiveDateTime) -> Self {
        let start = now.date().and_time(NaiveTime::MIN);
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        DayWindow { start, end }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }
}

// ============================================================================
// NEXT APPOINTMENT
// ============================================================================

/// Earliest non-canceled entry at or after `now`.
///
/// Entries sharing the same instant resolve to the first one in slice order;
/// the store hands them over in creation order, so the earliest booking wins.
pub fn next_upcoming(entries: &[AgendaEntry], now: NaiveDateTime) -> Option<&AgendaEntry> {
    entries
        .iter()
        .filter(|e| !e.appointment.is_canceled() && e.appointment.date_time >= now)
        .min_by_key(|e| e.appointment.date_time)
}
