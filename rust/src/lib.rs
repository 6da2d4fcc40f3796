//! Rust implementation of the shop-floor production scheduler.
//!
//! Turns work orders into a finite-capacity plan of machine, setup and run
//! assignments plus a per-piece timeline, and re-verifies such timelines.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

pub mod batching;
mod config;
pub mod datetime;
pub mod logging;
mod models;
pub mod operations;
pub mod scheduler;
pub mod settings;
pub mod sorting;
pub mod verify;
pub mod window;

pub use config::{BreakdownEntry, HolidayEntry, PersonnelProfile, ScheduleSettings};
pub use models::{
    MasterDataRow, OperationOverride, Order, PieceTimelineEntry, ScheduleResult, ScheduleRow,
};
pub use operations::MasterData;
pub use scheduler::{ProductionScheduler, SchedulerError};
pub use verify::{IssueCode, VerificationIssue, VerificationReport};

/// Schedule `orders` against empty calendars.
///
/// Same input always yields the same result.
pub fn run_schedule<M: MasterData + ?Sized>(
    orders: &[Order],
    settings: &ScheduleSettings,
    master_data: &M,
) -> Result<ScheduleResult, SchedulerError> {
    ProductionScheduler::new(settings).schedule(orders, master_data)
}

/// JSON in, JSON out: parse orders, settings and master-data rows, schedule,
/// and serialize `{ rows, pieceTimeline }`.
pub fn schedule_json(
    orders_json: &str,
    settings_json: &str,
    master_json: &str,
) -> Result<String, SchedulerError> {
    let orders: Vec<Order> = serde_json::from_str(orders_json)?;
    let settings: ScheduleSettings = serde_json::from_str(settings_json)?;
    let master_data: Vec<MasterDataRow> = if master_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(master_json)?
    };

    let result = run_schedule(&orders, &settings, master_data.as_slice())?;
    Ok(serde_json::to_string(&result)?)
}

/// Run the production scheduler.
///
/// # Arguments
/// * `orders` - Work orders to schedule
/// * `settings` - Calendar, personnel and window settings
/// * `master_data` - Default per-part operation parameters
///
/// # Returns
/// * ScheduleResult with one row per (order, batch, operation) and the piece timeline
///
/// # Raises
/// * ValueError if an order cannot be placed
#[pyfunction]
#[pyo3(name = "run_schedule", signature = (orders, settings, master_data=None))]
fn py_run_schedule(
    orders: Vec<Order>,
    settings: ScheduleSettings,
    master_data: Option<Vec<MasterDataRow>>,
) -> PyResult<ScheduleResult> {
    let master_data = master_data.unwrap_or_default();
    run_schedule(&orders, &settings, master_data.as_slice())
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// Run the scheduler on JSON documents and return the JSON result.
#[pyfunction]
#[pyo3(name = "schedule_json", signature = (orders_json, settings_json, master_json="[]"))]
fn py_schedule_json(orders_json: &str, settings_json: &str, master_json: &str) -> PyResult<String> {
    schedule_json(orders_json, settings_json, master_json)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// Re-check a piece timeline for machine overlaps, precedence and run-person
/// capacity.
#[pyfunction]
#[pyo3(name = "verify_piece_flow")]
fn py_verify_piece_flow(timeline: Vec<PieceTimelineEntry>) -> VerificationReport {
    verify::verify_piece_flow(&timeline)
}

/// The shopsched.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Input types
    m.add_class::<Order>()?;
    m.add_class::<OperationOverride>()?;
    m.add_class::<MasterDataRow>()?;

    // Config types
    m.add_class::<ScheduleSettings>()?;
    m.add_class::<PersonnelProfile>()?;
    m.add_class::<HolidayEntry>()?;
    m.add_class::<BreakdownEntry>()?;

    // Output types
    m.add_class::<ScheduleRow>()?;
    m.add_class::<PieceTimelineEntry>()?;
    m.add_class::<ScheduleResult>()?;
    m.add_class::<VerificationIssue>()?;
    m.add_class::<VerificationReport>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(py_run_schedule, m)?)?;
    m.add_function(wrap_pyfunction!(py_schedule_json, m)?)?;
    m.add_function(wrap_pyfunction!(py_verify_piece_flow, m)?)?;

    Ok(())
}
