//! Timestamp and day-key codec shared by every execution context.
//!
//! ISO-8601 formatting and parsing go through a single formatter that owns a
//! scratch buffer and therefore needs exclusive access. It sits behind a
//! mutex, so concurrent callers (UI thread, sensor delivery tasks, the sync
//! pass) block and take turns rather than race inside it.
//!
//! Day-keys (`yyyy-MM-dd` in the configured zone) are built from calendar
//! fields and never touch the shared formatter.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Utc,
};

/// Time zone used to derive calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayZone {
    /// The process-local zone.
    Local,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

/// Reusable ISO-8601 formatter.
///
/// Formatting writes into an owned scratch buffer, so a single instance must
/// never be used from two places at once.
#[derive(Debug, Default)]
struct IsoFormatter {
    scratch: String,
}

impl IsoFormatter {
    fn format(&mut self, instant: DateTime<Utc>) -> String {
        self.scratch.clear();
        // Writing into a String cannot fail.
        let _ = write!(self.scratch, "{}", instant.format("%Y-%m-%dT%H:%M:%SZ"));
        self.scratch.clone()
    }

    fn parse(&mut self, text: &str) -> Option<DateTime<Utc>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(parsed.with_timezone(&Utc));
        }
        // Offset-less timestamps are taken as UTC.
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Thread-safe timestamp / day-key codec.
///
/// Cloning is cheap; clones share the same serialized formatter.
#[derive(Debug, Clone)]
pub struct DateCodec {
    formatter: Arc<Mutex<IsoFormatter>>,
    zone: DayZone,
}

impl DateCodec {
    pub fn new(zone: DayZone) -> Self {
        Self {
            formatter: Arc::new(Mutex::new(IsoFormatter::default())),
            zone,
        }
    }

    /// Codec deriving day-keys in the process-local zone.
    pub fn local() -> Self {
        Self::new(DayZone::Local)
    }

    /// Codec deriving day-keys in UTC.
    pub fn utc() -> Self {
        Self::new(DayZone::Fixed(Utc.fix()))
    }

    /// Codec deriving day-keys at a fixed offset from UTC.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self::new(DayZone::Fixed(offset))
    }

    pub fn zone(&self) -> DayZone {
        self.zone
    }

    /// Format an instant as `yyyy-MM-ddTHH:mm:ssZ`.
    pub fn iso_string(&self, instant: DateTime<Utc>) -> String {
        let mut formatter = self.formatter.lock().unwrap_or_else(PoisonError::into_inner);
        formatter.format(instant)
    }

    /// Parse an ISO-8601 timestamp. Malformed input yields `None`.
    pub fn parse_iso(&self, text: &str) -> Option<DateTime<Utc>> {
        let mut formatter = self.formatter.lock().unwrap_or_else(PoisonError::into_inner);
        formatter.parse(text)
    }

    /// Calendar day of `instant` in this codec's zone.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self.zone {
            DayZone::Local => instant.with_timezone(&Local).date_naive(),
            DayZone::Fixed(offset) => instant.with_timezone(&offset).date_naive(),
        }
    }

    /// Day-key (`yyyy-MM-dd`) of `instant` in this codec's zone.
    pub fn day_key(&self, instant: DateTime<Utc>) -> String {
        Self::format_day(self.day_of(instant))
    }

    /// Format a calendar date as a day-key.
    pub fn format_day(date: NaiveDate) -> String {
        format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
    }

    /// Parse a `yyyy-MM-dd` day-key into a calendar date.
    pub fn parse_day(text: &str) -> Option<NaiveDate> {
        let mut parts = text.trim().split('-');
        let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || year.len() != 4 || month.len() != 2 || day.len() != 2 {
            return None;
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(year) || !all_digits(month) || !all_digits(day) {
            return None;
        }
        NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
    }

    /// Parse a day-key into the instant at which that day starts.
    pub fn parse_day_key(&self, text: &str) -> Option<DateTime<Utc>> {
        Self::parse_day(text).and_then(|date| self.start_of_day(date))
    }

    /// Instant at which `date` starts in this codec's zone.
    ///
    /// Where midnight does not exist locally (DST gap), the first valid
    /// instant of the day is used.
    pub fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        match self.zone {
            DayZone::Local => first_instant_of(&Local, date),
            DayZone::Fixed(offset) => first_instant_of(&offset, date),
        }
    }
}

impl Default for DateCodec {
    fn default() -> Self {
        Self::local()
    }
}

fn first_instant_of<Tz: TimeZone>(zone: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    (0..=2)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| zone.from_local_datetime(&date.and_time(time)).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
