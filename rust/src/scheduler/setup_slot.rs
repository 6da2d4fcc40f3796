//! Earliest contiguous setup slot for a (machine, setup person) pair.

use chrono::{Duration, NaiveDateTime};

use crate::log_trace;
use crate::settings::{ParsedSettings, PersonnelSpec};
use crate::window::Interval;

use super::calendar::PersonCalendar;
use super::core::SchedulerError;

/// Minute steps searched before giving up (45 days).
pub const SEARCH_HORIZON_MIN: i64 = 45 * 24 * 60;

/// Whether `person` may work on setting up `machine` during the minute `at`.
fn is_setup_minute_allowed(
    settings: &ParsedSettings,
    people: &PersonCalendar,
    machine: &str,
    person: &PersonnelSpec,
    at: NaiveDateTime,
) -> bool {
    settings.setup_window.contains(at)
        && person.shift.contains(at)
        && !settings.is_holiday(at)
        && !settings.is_breakdown(machine, at)
        && !people.is_reserved_at(&person.name, at)
}

/// Scan forward from `from` for the first `setup_minutes`-long run of
/// allowed minutes. Disallowed minutes jump straight to the next opening of
/// the setup window or the person's shift when that is later.
pub fn find_setup_slot(
    settings: &ParsedSettings,
    people: &PersonCalendar,
    machine: &str,
    person: &PersonnelSpec,
    from: NaiveDateTime,
    setup_minutes: i64,
    verbosity: u8,
) -> Result<Interval, SchedulerError> {
    let setup_minutes = setup_minutes.max(1);
    let mut cursor = from;

    for _ in 0..SEARCH_HORIZON_MIN {
        if !is_setup_minute_allowed(settings, people, machine, person, cursor) {
            let entry = settings
                .setup_window
                .next_entry(cursor)
                .max(person.shift.next_entry(cursor));
            cursor = if entry > cursor {
                entry
            } else {
                cursor + Duration::minutes(1)
            };
            continue;
        }

        let fits = (0..setup_minutes).all(|offset| {
            is_setup_minute_allowed(
                settings,
                people,
                machine,
                person,
                cursor + Duration::minutes(offset),
            )
        });
        if fits {
            log_trace!(
                verbosity,
                "      setup slot {} / {}: {} (+{}m)",
                machine,
                person.name,
                cursor,
                setup_minutes
            );
            return Ok(Interval {
                start: cursor,
                end: cursor + Duration::minutes(setup_minutes),
            });
        }
        cursor += Duration::minutes(1);
    }

    Err(SchedulerError::SetupSlotNotFound {
        machine: machine.to_string(),
        person: person.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BreakdownEntry, HolidayEntry, ScheduleSettings};
    use crate::operations::HandleMode;
    use crate::scheduler::calendar::PersonReservation;
    use chrono::NaiveDate;

    fn dt(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn settings(raw: ScheduleSettings) -> ParsedSettings {
        ParsedSettings::from_raw(&ScheduleSettings {
            global_start_date_time: Some("2026-02-22T06:00:00".to_string()),
            ..raw
        })
    }

    fn slot(parsed: &ParsedSettings, people: &PersonCalendar, from: NaiveDateTime, minutes: i64) -> Interval {
        let person = &parsed.personnel[0];
        find_setup_slot(parsed, people, "VMC 1", person, from, minutes, 0).unwrap()
    }

    #[test]
    fn test_immediate_slot() {
        let parsed = settings(ScheduleSettings::default());
        let s = slot(&parsed, &PersonCalendar::new(), dt(22, 6, 0), 60);
        assert_eq!((s.start, s.end), (dt(22, 6, 0), dt(22, 7, 0)));
    }

    #[test]
    fn test_before_window_jumps_to_opening() {
        let parsed = settings(ScheduleSettings::default());
        let s = slot(&parsed, &PersonCalendar::new(), dt(22, 3, 17), 30);
        assert_eq!(s.start, dt(22, 6, 0));
    }

    #[test]
    fn test_setup_must_fit_before_window_closes() {
        let parsed = settings(ScheduleSettings::default());
        let s = slot(&parsed, &PersonCalendar::new(), dt(22, 21, 30), 60);
        assert_eq!(s.start, dt(23, 6, 0));
    }

    #[test]
    fn test_holiday_pushes_to_next_day() {
        let parsed = settings(ScheduleSettings {
            holidays: vec![HolidayEntry {
                start: Some("2026-02-22".to_string()),
                end: None,
            }],
            ..Default::default()
        });
        let s = slot(&parsed, &PersonCalendar::new(), dt(22, 6, 0), 60);
        assert_eq!(s.start, dt(23, 6, 0));
    }

    #[test]
    fn test_person_reservation_is_skipped() {
        let parsed = settings(ScheduleSettings::default());
        let mut people = PersonCalendar::new();
        let busy = Interval::new(dt(22, 6, 30), dt(22, 8, 0)).unwrap();
        people.reserve(&parsed.personnel[0].name, PersonReservation::run(busy, HandleMode::Double, "x".into()));
        // 06:00-06:30 is too short for 45 minutes
        let s = slot(&parsed, &people, dt(22, 6, 0), 45);
        assert_eq!(s.start, dt(22, 8, 0));
    }

    #[test]
    fn test_permanent_breakdown_is_an_error() {
        let parsed = settings(ScheduleSettings {
            breakdowns: vec![BreakdownEntry {
                start: Some("2026-01-01T00:00".to_string()),
                end: Some("2026-12-31T00:00".to_string()),
                machines: vec!["VMC 1".to_string()],
            }],
            ..Default::default()
        });
        let err = find_setup_slot(
            &parsed,
            &PersonCalendar::new(),
            "VMC 1",
            &parsed.personnel[0],
            dt(22, 6, 0),
            60,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SchedulerError::SetupSlotNotFound { ref machine, .. } if machine == "VMC 1"));
    }
}
