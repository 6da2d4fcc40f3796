//! Piece-level production simulation and run-reservation resolution.
//!
//! A batch's pieces are processed one after another on the machine. Each
//! piece waits for its arrival (the completion of the same piece on the
//! previous operation), then consumes `piece_minutes` allowed production
//! minutes. Minutes lost to closed production windows, holidays or machine
//! breakdowns are counted as paused time.

use chrono::{Duration, NaiveDateTime};

use crate::log_trace;
use crate::operations::HandleMode;
use crate::settings::ParsedSettings;
use crate::window::Interval;

use super::calendar::PersonCalendar;
use super::core::SchedulerError;
use super::setup_slot::SEARCH_HORIZON_MIN;

/// Attempts at pushing a run past a person's conflicting reservations.
pub const MAX_RUN_ATTEMPTS: usize = 120;

/// Simulated production of one batch on one machine.
#[derive(Clone, Debug, PartialEq)]
pub struct RunPlan {
    pub run_start: NaiveDateTime,
    pub run_end: NaiveDateTime,
    /// One interval per piece, in piece order
    pub pieces: Vec<Interval>,
    pub paused_minutes: i64,
}

impl RunPlan {
    /// Per-piece completion instants; the arrivals for the next operation.
    pub fn completions(&self) -> Vec<NaiveDateTime> {
        self.pieces.iter().map(|p| p.end).collect()
    }

    pub fn window(&self) -> Interval {
        Interval {
            start: self.run_start,
            end: self.run_end,
        }
    }
}

fn advance_to_allowed(
    settings: &ParsedSettings,
    machine: &str,
    from: NaiveDateTime,
) -> Result<NaiveDateTime, SchedulerError> {
    let mut cursor = from;
    for _ in 0..SEARCH_HORIZON_MIN {
        if settings.is_run_minute_allowed(machine, cursor) {
            return Ok(cursor);
        }
        cursor += Duration::minutes(1);
    }
    Err(SchedulerError::ProductionWindowUnreachable {
        machine: machine.to_string(),
    })
}

/// Consume `work_minutes` allowed minutes starting at `from`.
/// Returns the end instant and the disallowed minutes skipped on the way.
fn add_work_minutes(
    settings: &ParsedSettings,
    machine: &str,
    from: NaiveDateTime,
    work_minutes: i64,
) -> Result<(NaiveDateTime, i64), SchedulerError> {
    let mut cursor = from;
    let mut remaining = work_minutes.max(1);
    let mut paused = 0;
    for _ in 0..(work_minutes + SEARCH_HORIZON_MIN) {
        if settings.is_run_minute_allowed(machine, cursor) {
            remaining -= 1;
        } else {
            paused += 1;
        }
        cursor += Duration::minutes(1);
        if remaining <= 0 {
            return Ok((cursor, paused));
        }
    }
    Err(SchedulerError::PieceProcessingIncomplete {
        machine: machine.to_string(),
    })
}

/// Walk the pieces of a batch through the machine's production calendar.
///
/// No piece starts before `max(setup_end, run_ready_at)`. An empty
/// `arrivals` slice is treated as a single piece arriving at `setup_end`.
pub fn simulate_piece_flow(
    settings: &ParsedSettings,
    machine: &str,
    setup_end: NaiveDateTime,
    run_ready_at: NaiveDateTime,
    arrivals: &[NaiveDateTime],
    piece_minutes: i64,
) -> Result<RunPlan, SchedulerError> {
    let fallback = [setup_end];
    let arrivals = if arrivals.is_empty() { &fallback[..] } else { arrivals };

    let mut cursor = setup_end.max(run_ready_at);
    let mut pieces = Vec::with_capacity(arrivals.len());
    let mut paused_minutes = 0;

    for &arrival in arrivals {
        cursor = cursor.max(arrival);
        if !settings.is_run_minute_allowed(machine, cursor) {
            let allowed = advance_to_allowed(settings, machine, cursor)?;
            paused_minutes += (allowed - cursor).num_minutes();
            cursor = allowed;
        }
        let (end, paused) = add_work_minutes(settings, machine, cursor, piece_minutes)?;
        paused_minutes += paused;
        pieces.push(Interval { start: cursor, end });
        cursor = end;
    }

    Ok(RunPlan {
        run_start: pieces.first().map_or(setup_end, |p| p.start),
        run_end: cursor,
        pieces,
        paused_minutes,
    })
}

/// Simulate the run and push it later until `person` has capacity for it.
///
/// Returns `Ok(None)` when no conflict-free run is found within
/// [`MAX_RUN_ATTEMPTS`]; the caller then tries other people or machines.
#[allow(clippy::too_many_arguments)]
pub fn find_feasible_run(
    settings: &ParsedSettings,
    people: &PersonCalendar,
    person: &str,
    machine: &str,
    setup_end: NaiveDateTime,
    arrivals: &[NaiveDateTime],
    piece_minutes: i64,
    handle_mode: HandleMode,
    verbosity: u8,
) -> Result<Option<RunPlan>, SchedulerError> {
    let required_units = handle_mode.run_units();
    let mut run_ready_at = setup_end;

    for attempt in 0..MAX_RUN_ATTEMPTS {
        let plan = simulate_piece_flow(settings, machine, setup_end, run_ready_at, arrivals, piece_minutes)?;
        match people.find_run_conflict(person, plan.run_start, plan.run_end, required_units) {
            None => return Ok(Some(plan)),
            Some(next_available) => {
                log_trace!(
                    verbosity,
                    "      run conflict for {} on {} (attempt {}): retry from {}",
                    person,
                    machine,
                    attempt + 1,
                    next_available
                );
                run_ready_at = (run_ready_at + Duration::minutes(1)).max(next_available);
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BreakdownEntry, HolidayEntry, ScheduleSettings};
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

    #[test]
    fn test_straight_run() {
        let parsed = settings(ScheduleSettings::default());
        let arrivals = vec![dt(22, 6, 0); 10];
        let plan = simulate_piece_flow(&parsed, "VMC 1", dt(22, 7, 0), dt(22, 7, 0), &arrivals, 5).unwrap();
        assert_eq!(plan.run_start, dt(22, 7, 0));
        assert_eq!(plan.run_end, dt(22, 7, 50));
        assert_eq!(plan.pieces.len(), 10);
        assert_eq!(plan.pieces[1].start, dt(22, 7, 5));
        assert_eq!(plan.paused_minutes, 0);
        assert_eq!(plan.completions().last(), Some(&dt(22, 7, 50)));
    }

    #[test]
    fn test_empty_arrivals_means_one_piece() {
        let parsed = settings(ScheduleSettings::default());
        let plan = simulate_piece_flow(&parsed, "VMC 1", dt(22, 7, 0), dt(22, 7, 0), &[], 3).unwrap();
        assert_eq!(plan.pieces.len(), 1);
        assert_eq!(plan.run_end, dt(22, 7, 3));
    }

    #[test]
    fn test_pieces_wait_for_arrivals() {
        let parsed = settings(ScheduleSettings::default());
        let arrivals = [dt(22, 7, 10), dt(22, 7, 30)];
        let plan = simulate_piece_flow(&parsed, "VMC 1", dt(22, 7, 0), dt(22, 7, 0), &arrivals, 5).unwrap();
        assert_eq!(plan.run_start, dt(22, 7, 10));
        assert_eq!(plan.pieces[0].end, dt(22, 7, 15));
        assert_eq!(plan.pieces[1].start, dt(22, 7, 30));
        assert_eq!(plan.run_end, dt(22, 7, 35));
        // waiting for material is not paused time
        assert_eq!(plan.paused_minutes, 0);
    }

    #[test]
    fn test_production_window_pauses_work() {
        let parsed = settings(ScheduleSettings {
            production_window_shift1: Some("06:00-22:00".to_string()),
            ..Default::default()
        });
        let arrivals = vec![dt(22, 6, 0); 2];
        let plan = simulate_piece_flow(&parsed, "VMC 1", dt(22, 21, 50), dt(22, 21, 50), &arrivals, 15).unwrap();
        // piece 1: 10 minutes before close, 8h closed, 5 minutes after opening
        assert_eq!(plan.pieces[0].start, dt(22, 21, 50));
        assert_eq!(plan.pieces[0].end, dt(23, 6, 5));
        assert_eq!(plan.pieces[1].end, dt(23, 6, 20));
        assert_eq!(plan.paused_minutes, 8 * 60);
    }

    #[test]
    fn test_start_inside_holiday_advances() {
        let parsed = settings(ScheduleSettings {
            holidays: vec![HolidayEntry {
                start: Some("2026-02-22T07:00".to_string()),
                end: Some("2026-02-22T08:00".to_string()),
            }],
            ..Default::default()
        });
        let plan = simulate_piece_flow(&parsed, "VMC 1", dt(22, 7, 0), dt(22, 7, 0), &[dt(22, 6, 0)], 5).unwrap();
        assert_eq!(plan.run_start, dt(22, 8, 0));
        assert_eq!(plan.run_end, dt(22, 8, 5));
        assert_eq!(plan.paused_minutes, 60);
    }

    #[test]
    fn test_unreachable_production_is_an_error() {
        let parsed = settings(ScheduleSettings {
            breakdowns: vec![BreakdownEntry {
                start: Some("2026-02-22T07:00".to_string()),
                end: Some("2026-12-31T00:00".to_string()),
                machines: vec!["VMC 1".to_string()],
            }],
            ..Default::default()
        });
        let err = simulate_piece_flow(&parsed, "VMC 1", dt(22, 7, 0), dt(22, 7, 0), &[], 5).unwrap_err();
        assert!(matches!(err, SchedulerError::ProductionWindowUnreachable { .. }));
    }

    #[test]
    fn test_feasible_run_waits_for_person() {
        let parsed = settings(ScheduleSettings::default());
        let mut people = PersonCalendar::new();
        let busy = Interval::new(dt(22, 7, 0), dt(22, 8, 0)).unwrap();
        people.reserve("A", PersonReservation::run(busy, HandleMode::Single, "x".into()));

        let arrivals = vec![dt(22, 6, 0); 4];
        let plan = find_feasible_run(&parsed, &people, "A", "VMC 1", dt(22, 7, 0), &arrivals, 5, HandleMode::Double, 0)
            .unwrap()
            .unwrap();
        assert_eq!(plan.run_start, dt(22, 8, 0));
        assert_eq!(plan.run_end, dt(22, 8, 20));

        let free = find_feasible_run(&parsed, &people, "B", "VMC 1", dt(22, 7, 0), &arrivals, 5, HandleMode::Single, 0)
            .unwrap()
            .unwrap();
        assert_eq!(free.run_start, dt(22, 7, 0));
    }

    #[test]
    fn test_run_gives_up_after_bounded_attempts() {
        let parsed = settings(ScheduleSettings::default());
        let mut people = PersonCalendar::new();
        // Back-to-back setups: every retry lands on the next one.
        for hour in 7..(7 + MAX_RUN_ATTEMPTS as i64 + 5) {
            let start = dt(22, 0, 0) + Duration::hours(hour);
            let setup = Interval::new(start, start + Duration::hours(1)).unwrap();
            people.reserve("A", PersonReservation::setup(setup, format!("s{}", hour)));
        }
        let result = find_feasible_run(&parsed, &people, "A", "VMC 1", dt(22, 7, 0), &[], 5, HandleMode::Double, 0).unwrap();
        assert!(result.is_none());
    }
}
