//! Core production scheduler.
//!
//! Orders are visited once in priority order. For each order the operations
//! are resolved and the quantity is split into batches; then, operation by
//! operation and batch by batch, the best candidate assignment is proposed
//! against the current calendars and committed. Each batch carries its
//! per-piece completion times forward as the arrivals of its next operation.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::batching::{split_batch_quantities, BatchMode};
use crate::config::ScheduleSettings;
use crate::datetime::{format_timing, parse_optional, to_local_iso};
use crate::models::{Order, PieceTimelineEntry, ScheduleResult, ScheduleRow};
use crate::operations::{parse_operation_seq, resolve_operation_specs, MasterData, OperationSpec};
use crate::settings::ParsedSettings;
use crate::sorting::{sort_orders, Priority};
use crate::{log_candidates, log_commits};

use super::candidate::{propose, PlacementRequest};
use super::state::SchedulerState;

const STATUS_SCHEDULED: &str = "Scheduled";
const NO_DUE_DATE: &str = "N/A";

/// Largest order quantity accepted; bigger requests are clamped to it.
pub const MAX_ORDER_QTY: u32 = 100_000;

/// Missing or non-finite quantities mean one piece; others are rounded
/// into `1..=MAX_ORDER_QTY`.
fn order_quantity(raw: Option<f64>) -> u32 {
    raw.filter(|q| q.is_finite())
        .map_or(1, |q| q.round().clamp(1.0, MAX_ORDER_QTY as f64) as u32)
}

/// Errors that can occur during scheduling.
///
/// All of these mean the input cannot be satisfied; malformed values are
/// never errors and fall back to defaults instead.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Unable to find setup slot for {machine} / {person}")]
    SetupSlotNotFound { machine: String, person: String },
    #[error("Unable to find next allowed production minute on {machine}")]
    ProductionWindowUnreachable { machine: String },
    #[error("Unable to complete piece processing on {machine}")]
    PieceProcessingIncomplete { machine: String },
    #[error("Unable to place {operation} for available machines")]
    NoFeasibleCandidate { operation: String },
    #[error("Order {order_id}: {source}")]
    Order {
        order_id: String,
        source: Box<SchedulerError>,
    },
    #[error("Invalid JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// One lane of an order flowing through its operations.
struct BatchLane {
    id: String,
    quantity: u32,
    /// Per-piece arrivals at the next operation
    arrivals: Vec<NaiveDateTime>,
    previous_machine: Option<String>,
}

/// Deterministic greedy scheduler for one run.
pub struct ProductionScheduler {
    settings: ParsedSettings,
    state: SchedulerState,
    verbosity: u8,
    batch_counter: u32,
    result: ScheduleResult,
}

impl ProductionScheduler {
    /// Create a scheduler with empty calendars.
    pub fn new(settings: &ScheduleSettings) -> Self {
        Self::from_parsed(ParsedSettings::from_raw(settings), settings.verbosity)
    }

    pub fn from_parsed(settings: ParsedSettings, verbosity: u8) -> Self {
        Self {
            settings,
            state: SchedulerState::new(),
            verbosity,
            batch_counter: 0,
            result: ScheduleResult::default(),
        }
    }

    pub fn settings(&self) -> &ParsedSettings {
        &self.settings
    }

    /// Calendars as committed so far.
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Schedule all orders and return the emitted rows and piece timeline.
    ///
    /// The first order that cannot be placed aborts the run with
    /// [`SchedulerError::Order`].
    pub fn schedule<M: MasterData + ?Sized>(
        &mut self,
        orders: &[Order],
        master_data: &M,
    ) -> Result<ScheduleResult, SchedulerError> {
        log_commits!(
            self.verbosity,
            "Scheduling {} order(s) from {}",
            orders.len(),
            self.settings.global_start
        );

        for order in sort_orders(orders) {
            self.schedule_order(order, master_data)
                .map_err(|source| SchedulerError::Order {
                    order_id: order
                        .id
                        .clone()
                        .unwrap_or_else(|| order.part_number.trim().to_string()),
                    source: Box::new(source),
                })?;
        }

        Ok(std::mem::take(&mut self.result))
    }

    fn next_batch_id(&mut self) -> String {
        self.batch_counter += 1;
        format!("B{:02}", self.batch_counter)
    }

    fn schedule_order<M: MasterData + ?Sized>(
        &mut self,
        order: &Order,
        master_data: &M,
    ) -> Result<(), SchedulerError> {
        let part_number = order.part_number.trim();
        if part_number.is_empty() {
            log_candidates!(self.verbosity, "  skip order {:?}: no part number", order.id);
            return Ok(());
        }

        let order_qty = order_quantity(order.order_quantity);
        let requested = parse_operation_seq(order.operation_seq.as_deref());
        let operations = resolve_operation_specs(order, &requested, master_data);
        if operations.is_empty() {
            return Ok(());
        }
        let order_start =
            parse_optional(order.start_date_time.as_deref()).unwrap_or(self.settings.global_start);

        let machines = &self.state.machines;
        let quantities = split_batch_quantities(
            order_qty,
            BatchMode::parse(order.batch_mode.as_deref()),
            order.custom_batch_size,
            &operations,
            order_start,
            |machine| machines.next_free(machine),
        );

        let mut lanes: Vec<BatchLane> = quantities
            .into_iter()
            .map(|quantity| BatchLane {
                id: self.next_batch_id(),
                quantity,
                arrivals: vec![order_start; quantity.max(1) as usize],
                previous_machine: None,
            })
            .collect();

        log_commits!(
            self.verbosity,
            "Order {} ({} x {}): {} op(s), batches {:?}",
            order.id.as_deref().unwrap_or("-"),
            part_number,
            order_qty,
            operations.len(),
            lanes.iter().map(|l| l.quantity).collect::<Vec<_>>()
        );

        let context = OrderContext {
            order,
            part_number,
            order_qty,
            order_start,
            priority: Priority::parse(order.priority.as_deref()).label(),
            due_date: parse_optional(order.due_date.as_deref())
                .map_or_else(|| NO_DUE_DATE.to_string(), to_local_iso),
        };

        for operation in &operations {
            for lane in lanes.iter_mut() {
                self.place(&context, operation, lane)?;
            }
        }
        Ok(())
    }

    /// Propose, commit and emit one operation of one batch.
    fn place(
        &mut self,
        context: &OrderContext<'_>,
        operation: &OperationSpec,
        lane: &mut BatchLane,
    ) -> Result<(), SchedulerError> {
        let request = PlacementRequest {
            operation,
            order_start: context.order_start,
            predecessor_ready: lane.arrivals.first().copied().unwrap_or(context.order_start),
            arrivals: &lane.arrivals,
            previous_machine: lane.previous_machine.as_deref(),
        };
        let candidate = propose(&self.settings, &self.state, &request, self.verbosity)?;

        let reference = format!(
            "{}/{}/OP{}",
            context.part_number, lane.id, operation.operation_seq
        );
        self.state.commit(&candidate, operation.handle_mode, &reference);

        log_commits!(
            self.verbosity,
            "  {} on {}: setup {} [{}] {}..{}, run [{}] {}..{}",
            reference,
            candidate.machine,
            candidate.setup_person,
            candidate.setup_priority,
            candidate.setup.start,
            candidate.setup.end,
            candidate.run_person,
            candidate.run.run_start,
            candidate.run.run_end
        );

        let row_prefix = match context.order.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{}-{}", context.part_number, lane.id),
        };
        let handle_mode = operation.handle_mode.as_str();

        self.result.rows.push(ScheduleRow {
            id: format!("{}-{}-op-{}", row_prefix, lane.id, operation.operation_seq),
            part_number: context.part_number.to_string(),
            order_qty: context.order_qty,
            priority: context.priority.to_string(),
            batch_id: lane.id.clone(),
            batch_qty: lane.quantity,
            operation_seq: operation.operation_seq,
            operation_name: operation.operation_name.clone(),
            machine: candidate.machine.clone(),
            setup_person_name: candidate.setup_person.clone(),
            production_person_name: candidate.run_person.clone(),
            handle_mode: handle_mode.to_string(),
            setup_start: to_local_iso(candidate.setup.start),
            setup_end: to_local_iso(candidate.setup.end),
            run_start: to_local_iso(candidate.run.run_start),
            run_end: to_local_iso(candidate.run.run_end),
            timing: format_timing(
                candidate.setup.start,
                candidate.run.run_end,
                candidate.run.paused_minutes,
            ),
            due_date: context.due_date.clone(),
            status: STATUS_SCHEDULED.to_string(),
        });

        for (index, piece) in candidate.run.pieces.iter().enumerate() {
            self.result.piece_timeline.push(PieceTimelineEntry {
                part_number: context.part_number.to_string(),
                batch_id: lane.id.clone(),
                piece: index as u32 + 1,
                operation_seq: operation.operation_seq,
                operation_name: operation.operation_name.clone(),
                machine: candidate.machine.clone(),
                person: candidate.run_person.clone(),
                handle_mode: handle_mode.to_string(),
                run_start: to_local_iso(piece.start),
                run_end: to_local_iso(piece.end),
                status: STATUS_SCHEDULED.to_string(),
            });
        }

        lane.arrivals = candidate.run.completions();
        lane.previous_machine = Some(candidate.machine);
        Ok(())
    }
}

/// Per-order values shared by every row of the order.
struct OrderContext<'a> {
    order: &'a Order,
    part_number: &'a str,
    order_qty: u32,
    order_start: NaiveDateTime,
    priority: &'static str,
    due_date: String,
}
