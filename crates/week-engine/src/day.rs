//! Canonical calendar days.
//!
//! Every date the engine compares, adds to, or hands to a repository is a
//! [`Day`]: a calendar date observed in UTC, with no time-of-day attached.
//! Timestamps are reduced to a `Day` exactly once, at the boundary, by
//! [`normalize`] or [`Day::from_instant`]. Nothing downstream ever compares a
//! raw timestamp against a `Day`.
//!
//! # Accepted inputs
//!
//! - `YYYY-MM-DD`: taken as-is
//! - RFC 3339 (`2025-03-08T23:30:00-05:00`): converted to UTC, then truncated
//! - Naive ISO 8601 (`2025-03-08T10:00:00`): interpreted as UTC, then truncated

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

// ── Day ─────────────────────────────────────────────────────────────────────

/// A calendar day in the reference timezone (UTC).
///
/// Serializes as `"YYYY-MM-DD"`. Arithmetic saturates at the bounds of
/// `NaiveDate` instead of panicking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Day(NaiveDate);

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Day(date)
    }

    /// Build a day from year, month and day-of-month.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidDate`] for impossible dates such as
    /// February 30.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, CalendarError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Day)
            .ok_or_else(|| CalendarError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// The calendar day of `instant` as observed in `tz`.
    pub fn from_instant(instant: &DateTime<Utc>, tz: &Tz) -> Self {
        Day(instant.with_timezone(tz).date_naive())
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// Day of week, 0 = Sunday through 6 = Saturday.
    pub fn weekday_index(self) -> u8 {
        self.0.weekday().num_days_from_sunday() as u8
    }

    /// Integer day number (days since 0001-01-01 CE, which is day 1).
    pub fn ordinal(self) -> i64 {
        self.0.num_days_from_ce() as i64
    }

    pub fn succ(self) -> Self {
        self.add_days(1)
    }

    pub fn pred(self) -> Self {
        self.add_days(-1)
    }

    pub fn add_days(self, days: i64) -> Self {
        self.0
            .checked_add_signed(Duration::days(days))
            .map(Day)
            .unwrap_or(self)
    }

    /// Signed number of days from `self` to `other` (`other - self`).
    pub fn days_until(self, other: Day) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// The first day on or after `self` whose weekday index is `weekday`.
    pub fn next_weekday(self, weekday: u8) -> Self {
        let ahead = (i64::from(weekday) - i64::from(self.weekday_index())).rem_euclid(7);
        self.add_days(ahead)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for Day {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl From<NaiveDate> for Day {
    fn from(date: NaiveDate) -> Self {
        Day(date)
    }
}

// ── DaySpan ─────────────────────────────────────────────────────────────────

/// An inclusive range of days, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DaySpan {
    pub start: Day,
    pub end: Day,
}

impl DaySpan {
    /// Build a span, rejecting `end < start`.
    pub fn new(start: Day, end: Day) -> Result<Self, CalendarError> {
        if end < start {
            return Err(CalendarError::InvalidRange { start, end });
        }
        Ok(DaySpan { start, end })
    }

    /// Number of days in the span, counting both ends.
    pub fn len_days(&self) -> i64 {
        self.start.days_until(self.end) + 1
    }

    pub fn contains(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Two inclusive spans overlap iff each starts on or before the other ends.
    pub fn overlaps(&self, other: &DaySpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn days(&self) -> DaySpanIter {
        DaySpanIter {
            cur: Some(self.start),
            end: self.end,
        }
    }
}

impl fmt::Display for DaySpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

pub struct DaySpanIter {
    cur: Option<Day>,
    end: Day,
}

impl Iterator for DaySpanIter {
    type Item = Day;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.cur?;
        if cur > self.end {
            self.cur = None;
            return None;
        }
        let next = cur.succ();
        // succ() saturates at NaiveDate::MAX
        self.cur = if next == cur { None } else { Some(next) };
        Some(cur)
    }
}

impl IntoIterator for DaySpan {
    type Item = Day;
    type IntoIter = DaySpanIter;

    fn into_iter(self) -> Self::IntoIter {
        self.days()
    }
}

// ── normalize ───────────────────────────────────────────────────────────────

/// Reduce a date or timestamp string to its canonical [`Day`].
///
/// # Errors
///
/// Returns [`CalendarError::InvalidDate`] when the input matches none of the
/// accepted forms. The normalizer never guesses.
///
/// # Examples
///
/// ```
/// use week_engine::day::normalize;
///
/// // 23:30 in New York on March 8 is already March 9 in UTC.
/// let day = normalize("2025-03-08T23:30:00-05:00").unwrap();
/// assert_eq!(day.to_string(), "2025-03-09");
///
/// assert!(normalize("next tuesday").is_err());
/// ```
pub fn normalize(input: &str) -> Result<Day, CalendarError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(CalendarError::InvalidDate("empty input".to_string()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Day(date));
    }
    if let Ok(dt) = parse_rfc3339(s) {
        return Ok(Day(dt.date_naive()));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Day(Utc.from_utc_datetime(&naive).date_naive()));
    }

    Err(CalendarError::InvalidDate(format!("'{s}'")))
}

/// Reduce an instant to its canonical [`Day`] in the reference timezone.
pub fn normalize_instant<T: TimeZone>(instant: &DateTime<T>) -> Day {
    Day(instant.with_timezone(&Utc).date_naive())
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// Parse an RFC 3339 datetime string into `DateTime<Utc>`.
pub(crate) fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, CalendarError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CalendarError::InvalidDate(format!("'{}': {}", s, e)))
}

/// Parse an IANA timezone string into `Tz`.
pub(crate) fn parse_timezone(s: &str) -> Result<Tz, CalendarError> {
    s.parse::<Tz>()
        .map_err(|_| CalendarError::InvalidTimezone(format!("'{}'", s)))
}
