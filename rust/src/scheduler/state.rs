//! Mutable scheduler state for one run: machine and person calendars.

use crate::operations::HandleMode;

use super::calendar::{MachineCalendar, PersonCalendar, PersonReservation};
use super::candidate::Candidate;

/// Calendars owned by one scheduling run.
///
/// Candidate evaluation borrows this immutably; only [`commit`](Self::commit)
/// writes to it.
#[derive(Clone, Debug, Default)]
pub struct SchedulerState {
    pub machines: MachineCalendar,
    pub people: PersonCalendar,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write back a chosen candidate: the machine is busy until the run
    /// ends, the setup person holds a full-capacity setup reservation and
    /// the run person a run reservation sized by `handle_mode`.
    pub fn commit(&mut self, candidate: &Candidate, handle_mode: HandleMode, reference: &str) {
        self.machines
            .set_next_free(&candidate.machine, candidate.run.run_end);
        self.people.reserve(
            &candidate.setup_person,
            PersonReservation::setup(candidate.setup, reference.to_string()),
        );
        self.people.reserve(
            &candidate.run_person,
            PersonReservation::run(candidate.run.window(), handle_mode, reference.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::calendar::ReservationKind;
    use crate::scheduler::piece_flow::RunPlan;
    use crate::window::Interval;
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 22)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_commit_updates_both_calendars() {
        let mut state = SchedulerState::new();
        let candidate = Candidate {
            machine: "VMC 3".to_string(),
            machine_rank: 0,
            setup_person: "Setter".to_string(),
            setup_priority: 1,
            run_person: "Runner".to_string(),
            run_priority: 99,
            setup: Interval::new(dt(6, 0), dt(6, 30)).unwrap(),
            run: RunPlan {
                run_start: dt(6, 30),
                run_end: dt(8, 0),
                pieces: vec![Interval::new(dt(6, 30), dt(8, 0)).unwrap()],
                paused_minutes: 0,
            },
        };
        state.commit(&candidate, HandleMode::Double, "PN/B01/OP1");

        assert_eq!(state.machines.next_free("VMC 3"), Some(dt(8, 0)));
        let setup = &state.people.reservations("Setter")[0];
        assert_eq!(setup.kind, ReservationKind::Setup);
        assert_eq!(setup.units, 2);
        let run = &state.people.reservations("Runner")[0];
        assert_eq!(run.kind, ReservationKind::Run);
        assert_eq!(run.units, 1);
        assert_eq!(run.reference, "PN/B01/OP1");
        assert_eq!((run.interval.start, run.interval.end), (dt(6, 30), dt(8, 0)));
    }
}
