//! Time source and duration formatting.
//!
//! All timestamps are integer milliseconds since the Unix epoch. Day buckets
//! are computed in the clock's local calendar.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use crate::types::{DAY_ID_FORMAT, SessionId};

/// A wall clock in epoch milliseconds, with a local calendar for day buckets.
pub trait Clock {
    /// Current time in milliseconds since the epoch.
    fn now_ms(&self) -> i64;

    /// The local wall-clock reading of the instant `ms`.
    fn local_datetime(&self, ms: i64) -> NaiveDateTime;

    /// The local-calendar session id for the instant `ms`.
    fn day_id(&self, ms: i64) -> SessionId {
        SessionId::from_date(self.local_datetime(ms).date())
    }

    /// The session id for "today".
    fn today(&self) -> SessionId {
        self.day_id(self.now_ms())
    }
}

/// The operating system clock in the machine's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn local_datetime(&self, ms: i64) -> NaiveDateTime {
        local_datetime(ms, &Local)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and advance the time seen by a tracker that owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
    offset: FixedOffset,
}

impl ManualClock {
    /// A clock at `now_ms` whose local calendar is UTC.
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        Self::with_offset(now_ms, Utc.fix())
    }

    /// A clock at `now_ms` whose local calendar is `offset`.
    #[must_use]
    pub fn with_offset(now_ms: i64, offset: FixedOffset) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now_ms)),
            offset,
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    pub fn set_ms(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn local_datetime(&self, ms: i64) -> NaiveDateTime {
        local_datetime(ms, &self.offset)
    }
}

/// The wall-clock reading of `ms` in time zone `tz`.
///
/// Instants outside chrono's representable range read as the epoch.
pub fn local_datetime<Tz: TimeZone>(ms: i64, tz: &Tz) -> NaiveDateTime {
    let utc = DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default();
    utc.with_timezone(tz).naive_local()
}

/// The calendar day containing `ms` in time zone `tz`, as a session id.
pub fn day_bucket_id<Tz: TimeZone>(ms: i64, tz: &Tz) -> SessionId {
    SessionId::from_date(local_datetime(ms, tz).date())
}

/// Formats the local time of day of `ms` as `HH:MM:SS`.
pub fn clock_time<C: Clock + ?Sized>(clock: &C, ms: i64) -> String {
    clock.local_datetime(ms).format("%H:%M:%S").to_string()
}

/// Whole seconds in a millisecond span, floored and never negative.
pub fn clamped_duration_seconds(ms: i64) -> u64 {
    u64::try_from(ms.div_euclid(1000)).unwrap_or(0)
}

/// Formats seconds as `MM:SS`; negative input renders as `00:00`.
pub fn format_duration(seconds: i64) -> String {
    let safe = seconds.max(0);
    format!("{:02}:{:02}", safe / 60, safe % 60)
}

/// Formats a signed second delta as `+MM:SS` or `−MM:SS`; zero is `+00:00`.
pub fn signed_delta(seconds: i64) -> String {
    if seconds == 0 {
        return "+00:00".to_string();
    }
    let sign = if seconds > 0 { '+' } else { '\u{2212}' };
    format!("{sign}{}", format_duration(seconds.saturating_abs()))
}

/// A short human label for a session id, like `Fri, Oct 16`.
///
/// Ids that are not calendar days are returned unchanged.
pub fn session_label(id: &str) -> String {
    NaiveDate::parse_from_str(id, DAY_ID_FORMAT)
        .map_or_else(|_| id.to_string(), |date| date.format("%a, %b %-d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-03-14T23:59:59Z
    const LATE_EVENING: i64 = 1_741_996_799_000;

    #[test]
    fn day_bucket_is_stable_within_a_day() {
        let start_of_day = LATE_EVENING - 86_399_000;
        assert_eq!(day_bucket_id(start_of_day, &Utc).as_str(), "2025-03-14");
        assert_eq!(day_bucket_id(LATE_EVENING, &Utc).as_str(), "2025-03-14");
    }

    #[test]
    fn day_bucket_changes_at_midnight() {
        assert_eq!(day_bucket_id(LATE_EVENING + 999, &Utc).as_str(), "2025-03-14");
        assert_eq!(day_bucket_id(LATE_EVENING + 1000, &Utc).as_str(), "2025-03-15");
    }

    #[test]
    fn day_bucket_follows_local_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(day_bucket_id(LATE_EVENING, &plus_two).as_str(), "2025-03-15");
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(day_bucket_id(LATE_EVENING + 1000, &minus_five).as_str(), "2025-03-14");
    }

    #[test]
    fn day_bucket_is_defined_for_extreme_input() {
        assert_eq!(day_bucket_id(i64::MAX, &Utc).as_str(), "1970-01-01");
        assert_eq!(day_bucket_id(i64::MIN, &Utc).as_str(), "1970-01-01");
    }

    #[test]
    fn clamped_duration_floors_and_clamps() {
        assert_eq!(clamped_duration_seconds(0), 0);
        assert_eq!(clamped_duration_seconds(999), 0);
        assert_eq!(clamped_duration_seconds(1000), 1);
        assert_eq!(clamped_duration_seconds(6_999), 6);
        assert_eq!(clamped_duration_seconds(-1), 0);
        assert_eq!(clamped_duration_seconds(-5_000), 0);
        assert_eq!(clamped_duration_seconds(i64::MIN), 0);
    }

    #[test]
    fn format_duration_pads_minutes_and_seconds() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(7), "00:07");
        assert_eq!(format_duration(180), "03:00");
        assert_eq!(format_duration(6_005), "100:05");
        assert_eq!(format_duration(-30), "00:00");
    }

    #[test]
    fn signed_delta_renders_sign() {
        assert_eq!(signed_delta(0), "+00:00");
        assert_eq!(signed_delta(10), "+00:10");
        assert_eq!(signed_delta(-70), "\u{2212}01:10");
        assert!(signed_delta(i64::MIN).starts_with('\u{2212}'));
    }

    #[test]
    fn session_label_formats_day() {
        assert_eq!(session_label("2026-10-16"), "Fri, Oct 16");
        assert_eq!(session_label("2025-01-05"), "Sun, Jan 5");
        assert_eq!(session_label("not-a-day"), "not-a-day");
    }

    #[test]
    fn clock_time_uses_local_offset() {
        let clock = ManualClock::with_offset(LATE_EVENING, FixedOffset::east_opt(3600).unwrap());
        assert_eq!(clock_time(&clock, LATE_EVENING), "00:59:59");
        assert_eq!(clock.today().as_str(), "2025-03-15");
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance_secs(5);
        assert_eq!(clock.now_ms(), 6_000);
        clock.set_ms(LATE_EVENING);
        assert_eq!(handle.today().as_str(), "2025-03-14");
    }
}
