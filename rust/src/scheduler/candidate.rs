//! Candidate search: pick the best (machine, setup person, run person)
//! assignment for one operation of one batch.
//!
//! Evaluation only reads the calendars. The winning [`Candidate`] is written
//! back by [`SchedulerState::commit`](super::state::SchedulerState::commit).

use chrono::NaiveDateTime;

use crate::operations::{unique_machines, OperationSpec};
use crate::settings::ParsedSettings;
use crate::window::Interval;
use crate::{log_candidates, log_trace};

use super::core::SchedulerError;
use super::piece_flow::{find_feasible_run, RunPlan};
use super::setup_slot::find_setup_slot;
use super::state::SchedulerState;

/// What is being placed, and what it depends on.
#[derive(Clone, Copy, Debug)]
pub struct PlacementRequest<'a> {
    pub operation: &'a OperationSpec,
    pub order_start: NaiveDateTime,
    /// Arrival of the batch's first piece from the previous operation
    pub predecessor_ready: NaiveDateTime,
    /// Per-piece arrivals from the previous operation
    pub arrivals: &'a [NaiveDateTime],
    /// Machine the batch used for its previous operation
    pub previous_machine: Option<&'a str>,
}

/// One feasible hypothetical assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub machine: String,
    /// Position of the machine in the operation's eligible list
    pub machine_rank: usize,
    pub setup_person: String,
    pub setup_priority: i32,
    pub run_person: String,
    pub run_priority: i32,
    pub setup: Interval,
    pub run: RunPlan,
}

impl Candidate {
    /// Whether `self` should replace the incumbent `best`.
    ///
    /// Earlier completion wins outright. On equal completion the rules apply
    /// in order, each deciding only when it separates the two:
    /// - leave the previous machine: an incumbent on it loses to a candidate
    ///   on another machine (one-sided, never the reverse)
    /// - lower setup priority, then lower run priority
    /// - earlier setup start, then lower eligible-list rank
    ///
    /// A full tie keeps `best`.
    pub fn is_better_than(&self, best: &Candidate, previous_machine: Option<&str>) -> bool {
        if self.run.run_end != best.run.run_end {
            return self.run.run_end < best.run.run_end;
        }
        if let Some(previous) = previous_machine {
            if best.machine == previous && self.machine != previous {
                return true;
            }
        }
        self.setup_priority
            .cmp(&best.setup_priority)
            .then(self.run_priority.cmp(&best.run_priority))
            .then(self.setup.start.cmp(&best.setup.start))
            .then(self.machine_rank.cmp(&best.machine_rank))
            .is_lt()
    }
}

/// Evaluate every eligible machine x setup person x run person and return
/// the best feasible candidate.
///
/// A setup person whose shift never meets the setup window is skipped.
/// Setup-slot or production-window exhaustion is fatal; a run that cannot
/// be fitted around the run person's reservations only drops that triple.
pub fn propose(
    settings: &ParsedSettings,
    state: &SchedulerState,
    request: &PlacementRequest<'_>,
    verbosity: u8,
) -> Result<Candidate, SchedulerError> {
    let operation = request.operation;
    let machines = unique_machines(&operation.eligible_machines);
    let setup_pool = settings.setup_pool();
    let run_pool = settings.run_pool();
    let piece_minutes = operation.piece_minutes();

    let mut best: Option<Candidate> = None;

    for (machine_rank, machine) in machines.iter().enumerate() {
        let machine_ready = state
            .machines
            .next_free(machine)
            .unwrap_or(settings.global_start);
        let base = request
            .order_start
            .max(request.predecessor_ready)
            .max(machine_ready);

        for setup_person in setup_pool {
            if !settings.setup_window.overlaps(&setup_person.shift) {
                log_candidates!(
                    verbosity,
                    "    skip setup person {}: shift {} never meets setup window",
                    setup_person.name,
                    setup_person.shift.raw
                );
                continue;
            }

            let from = state.people.next_availability(&setup_person.name, base);
            let setup = find_setup_slot(
                settings,
                &state.people,
                machine,
                setup_person,
                from,
                operation.setup_time_min,
                verbosity,
            )?;

            for run_person in run_pool {
                let Some(run) = find_feasible_run(
                    settings,
                    &state.people,
                    &run_person.name,
                    machine,
                    setup.end,
                    request.arrivals,
                    piece_minutes,
                    operation.handle_mode,
                    verbosity,
                )?
                else {
                    log_candidates!(
                        verbosity,
                        "    {} / {} / {}: no conflict-free run window",
                        machine,
                        setup_person.name,
                        run_person.name
                    );
                    continue;
                };

                let current = Candidate {
                    machine: machine.clone(),
                    machine_rank,
                    setup_person: setup_person.name.clone(),
                    setup_priority: setup_person.setup_priority,
                    run_person: run_person.name.clone(),
                    run_priority: run_person.setup_priority,
                    setup,
                    run,
                };
                log_trace!(
                    verbosity,
                    "    candidate {} / {} / {}: setup {}, run {}..{}",
                    current.machine,
                    current.setup_person,
                    current.run_person,
                    current.setup.start,
                    current.run.run_start,
                    current.run.run_end
                );

                let replace = match &best {
                    None => true,
                    Some(incumbent) => current.is_better_than(incumbent, request.previous_machine),
                };
                if replace {
                    best = Some(current);
                }
            }
        }
    }

    best.ok_or_else(|| SchedulerError::NoFeasibleCandidate {
        operation: operation.operation_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PersonnelProfile, ScheduleSettings};
    use crate::operations::HandleMode;
    use crate::scheduler::calendar::PersonReservation;
    use chrono::NaiveDate;

    fn dt(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 22)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn op(machines: &[&str], setup: i64, cycle: f64) -> OperationSpec {
        OperationSpec {
            operation_seq: 1,
            operation_name: "Operation 1".to_string(),
            setup_time_min: setup,
            cycle_time_min: cycle,
            minimum_batch_size: 1,
            eligible_machines: machines.iter().map(|m| m.to_string()).collect(),
            handle_mode: HandleMode::Single,
        }
    }

    fn settings() -> ParsedSettings {
        ParsedSettings::from_raw(&ScheduleSettings {
            global_start_date_time: Some("2026-02-22T06:00:00".to_string()),
            ..Default::default()
        })
    }

    fn candidate(machine: &str, rank: usize, run_end: NaiveDateTime, setup_priority: i32) -> Candidate {
        Candidate {
            machine: machine.to_string(),
            machine_rank: rank,
            setup_person: "A".to_string(),
            setup_priority,
            run_person: "A".to_string(),
            run_priority: 5,
            setup: Interval::new(dt(6, 0), dt(7, 0)).unwrap(),
            run: RunPlan {
                run_start: dt(7, 0),
                run_end,
                pieces: vec![],
                paused_minutes: 0,
            },
        }
    }

    #[test]
    fn test_earlier_completion_wins() {
        let a = candidate("VMC 1", 0, dt(8, 0), 5);
        let b = candidate("VMC 2", 1, dt(7, 59), 9);
        assert!(b.is_better_than(&a, None));
        assert!(!a.is_better_than(&b, None));
    }

    #[test]
    fn test_tie_moves_off_previous_machine() {
        let on_prev = candidate("VMC 1", 0, dt(8, 0), 5);
        let other = candidate("VMC 2", 1, dt(8, 0), 5);
        assert!(other.is_better_than(&on_prev, Some("VMC 1")));
        // only an incumbent on the previous machine is displaced; the other
        // way round the remaining rules decide, here the list rank
        assert!(on_prev.is_better_than(&other, Some("VMC 1")));
        assert!(on_prev.is_better_than(&other, None));
    }

    #[test]
    fn test_previous_machine_with_better_priority_wins() {
        let incumbent = candidate("VMC 2", 1, dt(8, 0), 5);
        let on_prev = candidate("VMC 1", 0, dt(8, 0), 1);
        assert!(on_prev.is_better_than(&incumbent, Some("VMC 1")));

        let worse_on_prev = candidate("VMC 1", 0, dt(8, 0), 9);
        assert!(!worse_on_prev.is_better_than(&incumbent, Some("VMC 1")));
    }

    #[test]
    fn test_tie_prefers_setup_priority_then_rank() {
        let low_prio = candidate("VMC 2", 1, dt(8, 0), 1);
        let high_prio = candidate("VMC 1", 0, dt(8, 0), 5);
        assert!(low_prio.is_better_than(&high_prio, None));
        let same = candidate("VMC 1", 0, dt(8, 0), 5);
        assert!(!same.is_better_than(&high_prio, None));
    }

    #[test]
    fn test_propose_single_machine() {
        let parsed = settings();
        let state = SchedulerState::new();
        let operation = op(&["VMC 1"], 60, 5.0);
        let arrivals = vec![dt(6, 0); 10];
        let request = PlacementRequest {
            operation: &operation,
            order_start: dt(6, 0),
            predecessor_ready: dt(6, 0),
            arrivals: &arrivals,
            previous_machine: None,
        };
        let best = propose(&parsed, &state, &request, 0).unwrap();
        assert_eq!(best.machine, "VMC 1");
        assert_eq!(best.setup_person, "A");
        assert_eq!(best.run_person, "A");
        assert_eq!((best.setup.start, best.setup.end), (dt(6, 0), dt(7, 0)));
        assert_eq!((best.run.run_start, best.run.run_end), (dt(7, 0), dt(7, 50)));
    }

    #[test]
    fn test_propose_prefers_free_machine() {
        let parsed = settings();
        let mut state = SchedulerState::new();
        state.machines.set_next_free("VMC 1", dt(9, 0));
        let operation = op(&["VMC 1", "VMC 2"], 30, 1.0);
        let arrivals = vec![dt(6, 0); 5];
        let request = PlacementRequest {
            operation: &operation,
            order_start: dt(6, 0),
            predecessor_ready: dt(6, 0),
            arrivals: &arrivals,
            previous_machine: None,
        };
        let best = propose(&parsed, &state, &request, 0).unwrap();
        assert_eq!(best.machine, "VMC 2");
        assert_eq!(best.machine_rank, 1);
        assert_eq!(best.run.run_end, dt(6, 35));
    }

    #[test]
    fn test_propose_skips_busy_people() {
        let parsed = settings();
        let mut state = SchedulerState::new();
        let busy = Interval::new(dt(6, 0), dt(12, 0)).unwrap();
        state.people.reserve("A", PersonReservation::setup(busy, "x".into()));
        let operation = op(&["VMC 1"], 30, 1.0);
        let request = PlacementRequest {
            operation: &operation,
            order_start: dt(6, 0),
            predecessor_ready: dt(6, 0),
            arrivals: &[],
            previous_machine: None,
        };
        let best = propose(&parsed, &state, &request, 0).unwrap();
        assert_eq!(best.setup_person, "B");
        assert_eq!(best.run_person, "B");
        assert_eq!(best.setup.start, dt(6, 0));
    }

    #[test]
    fn test_setup_person_outside_setup_window_is_skipped() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            global_start_date_time: Some("2026-02-22T06:00:00".to_string()),
            global_setup_window: Some("06:00-14:00".to_string()),
            enforce_operator_shifts: true,
            shift1: Some("22:00-06:00".to_string()),
            personnel_profiles: vec![PersonnelProfile {
                name: "Night".to_string(),
                level_up: true,
                ..Default::default()
            }],
            ..Default::default()
        });
        let state = SchedulerState::new();
        let operation = op(&["VMC 1"], 30, 1.0);
        let request = PlacementRequest {
            operation: &operation,
            order_start: dt(6, 0),
            predecessor_ready: dt(6, 0),
            arrivals: &[],
            previous_machine: None,
        };
        let err = propose(&parsed, &state, &request, 0).unwrap_err();
        assert!(matches!(err, SchedulerError::NoFeasibleCandidate { .. }));
    }
}
