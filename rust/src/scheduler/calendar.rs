//! Machine and person calendars: the only mutable state of a scheduling run.
//!
//! Both are written strictly additively at commit time. Person reservations
//! are kept sorted by start so lookups can stop at the first reservation that
//! begins after the probed range.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

use crate::operations::HandleMode;
use crate::window::Interval;

/// Capacity units each person has for concurrent work.
pub const PERSON_CAPACITY_UNITS: u32 = 2;

/// Hop limit when skipping over back-to-back reservations.
const MAX_AVAILABILITY_HOPS: usize = 2000;

/// Bucket used for reservations with a blank person name.
const UNASSIGNED: &str = "Unassigned";

/// Next-free instant per machine.
#[derive(Clone, Debug, Default)]
pub struct MachineCalendar {
    next_free: FxHashMap<String, NaiveDateTime>,
}

impl MachineCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the machine's last committed run ends, if it has any.
    pub fn next_free(&self, machine: &str) -> Option<NaiveDateTime> {
        self.next_free.get(machine).copied()
    }

    pub fn set_next_free(&mut self, machine: &str, at: NaiveDateTime) {
        self.next_free.insert(machine.to_string(), at);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReservationKind {
    Setup,
    Run,
}

/// A block of a person's time.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonReservation {
    pub interval: Interval,
    pub kind: ReservationKind,
    pub units: u32,
    pub handle_mode: HandleMode,
    /// `<part>/<batch>/OP<seq>`, for tracing only
    pub reference: String,
}

impl PersonReservation {
    /// Setups always take the whole pool.
    pub fn setup(interval: Interval, reference: String) -> Self {
        Self {
            interval,
            kind: ReservationKind::Setup,
            units: PERSON_CAPACITY_UNITS,
            handle_mode: HandleMode::Single,
            reference,
        }
    }

    pub fn run(interval: Interval, handle_mode: HandleMode, reference: String) -> Self {
        Self {
            interval,
            kind: ReservationKind::Run,
            units: handle_mode.run_units(),
            handle_mode,
            reference,
        }
    }
}

/// Reservations per person name.
#[derive(Clone, Debug, Default)]
pub struct PersonCalendar {
    reservations: FxHashMap<String, Vec<PersonReservation>>,
}

fn person_key(person: &str) -> &str {
    let trimmed = person.trim();
    if trimmed.is_empty() {
        UNASSIGNED
    } else {
        trimmed
    }
}

impl PersonCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reservations of `person`, sorted by start.
    pub fn reservations(&self, person: &str) -> &[PersonReservation] {
        self.reservations
            .get(person_key(person))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Insert keeping start order; equal starts keep insertion order.
    pub fn reserve(&mut self, person: &str, reservation: PersonReservation) {
        let bucket = self
            .reservations
            .entry(person_key(person).to_string())
            .or_default();
        let idx = bucket.partition_point(|r| r.interval.start <= reservation.interval.start);
        bucket.insert(idx, reservation);
    }

    /// Reservations that start before `end` (the only ones that can overlap
    /// a range ending there).
    fn starting_before(&self, person: &str, end: NaiveDateTime) -> &[PersonReservation] {
        let all = self.reservations(person);
        let idx = all.partition_point(|r| r.interval.start < end);
        &all[..idx]
    }

    /// Whether any reservation of `person` covers the minute at `at`.
    pub fn is_reserved_at(&self, person: &str, at: NaiveDateTime) -> bool {
        let all = self.reservations(person);
        let idx = all.partition_point(|r| r.interval.start <= at);
        all[..idx].iter().any(|r| r.interval.contains(at))
    }

    /// First instant at or after `from` not covered by a reservation,
    /// hopping over chained reservations a bounded number of times.
    pub fn next_availability(&self, person: &str, from: NaiveDateTime) -> NaiveDateTime {
        let all = self.reservations(person);
        let mut cursor = from;
        for _ in 0..MAX_AVAILABILITY_HOPS {
            match all.iter().find(|r| r.interval.contains(cursor)) {
                Some(active) => cursor = active.interval.end,
                None => return cursor,
            }
        }
        cursor
    }

    /// Check whether `person` can take a run of `required_units` over
    /// `[run_start, run_end)`.
    ///
    /// Returns `None` when it fits, otherwise the earliest instant worth
    /// retrying from: the end of the earliest-ending overlapping setup, or
    /// the earliest end among runs active in the first over-capacity slice.
    pub fn find_run_conflict(
        &self,
        person: &str,
        run_start: NaiveDateTime,
        run_end: NaiveDateTime,
        required_units: u32,
    ) -> Option<NaiveDateTime> {
        let overlapping: Vec<&PersonReservation> = self
            .starting_before(person, run_end)
            .iter()
            .filter(|r| r.interval.overlaps(run_start, run_end))
            .collect();
        if overlapping.is_empty() {
            return None;
        }

        if let Some(end) = overlapping
            .iter()
            .filter(|r| r.kind == ReservationKind::Setup)
            .map(|r| r.interval.end)
            .min()
        {
            return Some(end);
        }

        let runs: Vec<&PersonReservation> = overlapping
            .into_iter()
            .filter(|r| r.kind == ReservationKind::Run)
            .collect();
        if runs.is_empty() {
            return None;
        }

        let mut points = vec![run_start, run_end];
        for r in &runs {
            points.push(r.interval.start.max(run_start));
            points.push(r.interval.end.min(run_end));
        }
        points.sort();
        points.dedup();

        for slice in points.windows(2) {
            let (from, to) = (slice[0], slice[1]);
            if to <= from {
                continue;
            }
            let probe = from + (to - from) / 2;
            let active: Vec<&&PersonReservation> =
                runs.iter().filter(|r| r.interval.contains(probe)).collect();
            let used: u32 = active.iter().map(|r| r.units).sum();
            if used + required_units > PERSON_CAPACITY_UNITS {
                return active.iter().map(|r| r.interval.end).min();
            }
        }
        None
    }
}
