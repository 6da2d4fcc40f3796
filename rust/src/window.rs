//! Daily recurring time-of-day windows and absolute date intervals.
//!
//! A [`TimeWindow`] is a `HH:MM-HH:MM` range that repeats every day. When the
//! end is not after the start the window wraps past midnight (overnight), so
//! `22:00-06:00` covers the night and `00:00-00:00` covers the whole day.
//! An [`Interval`] is an absolute half-open `[start, end)` span used for
//! holidays, machine breakdowns and person reservations.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

/// Minutes in a day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Window used when a window string cannot be parsed.
pub const DEFAULT_OPERATOR_WINDOW: &str = "06:00-22:00";

/// Production window used when no production shift is configured (full day).
pub const DEFAULT_PRODUCTION_WINDOW: &str = "00:00-00:00";

/// A daily recurring window expressed in minutes since midnight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_minute: u32,
    pub end_minute: u32,
    /// True when `end_minute <= start_minute` (wraps past midnight).
    pub overnight: bool,
    pub raw: String,
}

impl TimeWindow {
    /// Parse `H:MM-H:MM` / `HH:MM-HH:MM`. Out-of-range fields are clamped;
    /// anything unparsable falls back to [`DEFAULT_OPERATOR_WINDOW`].
    pub fn parse(text: &str) -> Self {
        Self::try_parse(text).unwrap_or_else(|| {
            Self::try_parse(DEFAULT_OPERATOR_WINDOW).unwrap_or(Self {
                start_minute: 6 * 60,
                end_minute: 22 * 60,
                overnight: false,
                raw: DEFAULT_OPERATOR_WINDOW.to_string(),
            })
        })
    }

    fn try_parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let (left, right) = trimmed.split_once('-')?;
        let start = parse_clock(left)?;
        let end = parse_clock(right)?;
        Some(Self {
            start_minute: start,
            end_minute: end,
            overnight: end <= start,
            raw: text.to_string(),
        })
    }

    /// Whether a minute-of-day falls inside the window (end exclusive).
    #[inline]
    pub fn contains_minute(&self, minute_of_day: u32) -> bool {
        if self.overnight {
            minute_of_day >= self.start_minute || minute_of_day < self.end_minute
        } else {
            minute_of_day >= self.start_minute && minute_of_day < self.end_minute
        }
    }

    /// Whether an instant's wall-clock minute falls inside the window.
    #[inline]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.contains_minute(minute_of_day(at))
    }

    /// Whether the two windows share at least one minute of the day.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        (0..MINUTES_PER_DAY).any(|m| self.contains_minute(m) && other.contains_minute(m))
    }

    /// The next instant at which the window opens, strictly looking forward
    /// from `at` unless `at` is exactly the opening minute of a day window.
    pub fn next_start(&self, at: NaiveDateTime) -> NaiveDateTime {
        let start_today = at_minute(at, self.start_minute);
        if !self.overnight {
            if at <= start_today {
                return start_today;
            }
            return start_today + Duration::days(1);
        }
        if minute_of_day(at) >= self.start_minute {
            return start_today + Duration::days(1);
        }
        start_today
    }

    /// `at` itself if it is inside the window, otherwise the next opening.
    pub fn next_entry(&self, at: NaiveDateTime) -> NaiveDateTime {
        if self.contains(at) {
            at
        } else {
            self.next_start(at)
        }
    }
}

fn parse_clock(text: &str) -> Option<u32> {
    let (hour, minute) = text.trim().split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    if !hour.bytes().all(|b| b.is_ascii_digit()) || !minute.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    Some(hour.min(23) * 60 + minute.min(59))
}

/// Minutes since midnight of an instant.
#[inline]
pub fn minute_of_day(at: NaiveDateTime) -> u32 {
    at.hour() * 60 + at.minute()
}

/// Same calendar day as `at`, at the given minute-of-day with zero seconds.
pub fn at_minute(at: NaiveDateTime, minute_of_day: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(minute_of_day / 60, minute_of_day % 60, 0)
        .unwrap_or(NaiveTime::MIN);
    at.date().and_time(time)
}

/// An absolute half-open time span `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    /// Build an interval; `None` unless `start < end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// The whole calendar day containing `at`.
    pub fn whole_day(at: NaiveDateTime) -> Self {
        let start = at.date().and_time(NaiveTime::MIN);
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    #[inline]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    #[inline]
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && start < self.end
    }
}
