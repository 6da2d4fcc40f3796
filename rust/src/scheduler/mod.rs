//! Greedy deterministic production scheduler.
//!
//! Candidate search evaluates (machine, setup person, run person) triples
//! against read-only calendars; only the winner is committed.

mod calendar;
mod candidate;
mod core;
mod piece_flow;
mod setup_slot;
mod state;

pub use calendar::{
    MachineCalendar, PersonCalendar, PersonReservation, ReservationKind, PERSON_CAPACITY_UNITS,
};
pub use candidate::{propose, Candidate, PlacementRequest};
pub use core::{ProductionScheduler, SchedulerError, MAX_ORDER_QTY};
pub use piece_flow::{find_feasible_run, simulate_piece_flow, RunPlan, MAX_RUN_ATTEMPTS};
pub use setup_slot::{find_setup_slot, SEARCH_HORIZON_MIN};
pub use state::SchedulerState;
