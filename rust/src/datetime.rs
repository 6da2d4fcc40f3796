//! Lenient timestamp parsing and the local timestamp / duration formats used
//! in schedule output.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%b %d %Y", "%B %d %Y"];

/// Parse a local wall-clock timestamp.
///
/// Accepts ISO-like date-times (with or without seconds), RFC 3339 values
/// (the offset is dropped, the wall clock kept) and bare dates (midnight).
/// Returns `None` for empty or unparsable text; callers decide the fallback.
pub fn parse_local_datetime(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_exact(trimmed).or_else(|| {
        let without_commas = trimmed.replace(',', "");
        if without_commas != trimmed {
            parse_exact(&without_commas)
        } else {
            None
        }
    })
}

fn parse_exact(text: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.naive_local());
    }
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(parsed);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Parse an optional field, treating `None` like unparsable text.
pub fn parse_optional(text: Option<&str>) -> Option<NaiveDateTime> {
    text.and_then(parse_local_datetime)
}

/// `YYYY-MM-DDTHH:MM:SS` without a zone marker.
pub fn to_local_iso(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Whole minutes from `from` to `to`, never negative.
pub fn diff_minutes(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    let seconds = (to - from).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + 30) / 60
    }
}

/// Render minutes as `1D3H0M`, `2H15M` or `45M`.
pub fn format_duration(minutes: i64) -> String {
    let total = minutes.max(0);
    let days = total / (24 * 60);
    let hours = (total % (24 * 60)) / 60;
    let mins = total % 60;
    if days > 0 {
        format!("{}D{}H{}M", days, hours, mins)
    } else if hours > 0 {
        format!("{}H{}M", hours, mins)
    } else {
        format!("{}M", mins)
    }
}

/// Elapsed time from setup start to run end, with the paused share appended
/// when production was interrupted.
pub fn format_timing(setup_start: NaiveDateTime, run_end: NaiveDateTime, paused_min: i64) -> String {
    let elapsed = format_duration(diff_minutes(setup_start, run_end));
    if paused_min <= 0 {
        elapsed
    } else {
        format!("{} (paused {})", elapsed, format_duration(paused_min))
    }
}
