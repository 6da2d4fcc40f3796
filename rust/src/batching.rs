//! Splitting an order's quantity into parallel batches (lanes).

use chrono::{Duration, NaiveDateTime};

use crate::operations::{unique_machines, OperationSpec};

/// Upper bound on auto-split lanes.
pub const AUTO_SPLIT_MAX_LANES: usize = 2;

/// A machine counts as ready for a second lane if it frees up within this
/// many minutes of the order start.
pub const AUTO_SPLIT_READY_WINDOW_MIN: i64 = 120;

/// How an order's quantity is divided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    SingleBatch,
    CustomBatchSize,
    AutoSplit,
}

impl BatchMode {
    /// Case-insensitive; `_` and spaces are treated like `-`. Unknown or
    /// missing values select `AutoSplit`.
    pub fn parse(raw: Option<&str>) -> Self {
        let normalized = raw
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .replace(['_', ' '], "-");
        match normalized.as_str() {
            "single-batch" | "single" => Self::SingleBatch,
            "custom-batch-size" | "custom" => Self::CustomBatchSize,
            _ => Self::AutoSplit,
        }
    }
}

/// Batch quantities for one order, in lane order.
///
/// Every quantity is positive and they sum to `order_qty` (which callers
/// clamp to at least 1). `machine_next_free` reports when a machine's last
/// committed run ends, or `None` if it has no work yet.
pub fn split_batch_quantities<F>(
    order_qty: u32,
    mode: BatchMode,
    custom_batch_size: Option<f64>,
    operations: &[OperationSpec],
    order_start: NaiveDateTime,
    machine_next_free: F,
) -> Vec<u32>
where
    F: Fn(&str) -> Option<NaiveDateTime>,
{
    let order_qty = order_qty.max(1);
    match mode {
        BatchMode::SingleBatch => return vec![order_qty],
        BatchMode::CustomBatchSize => {
            if let Some(size) = custom_batch_size.filter(|s| s.is_finite() && *s >= 1.0) {
                return peel_fixed_size(order_qty, size.floor() as u32);
            }
        }
        BatchMode::AutoSplit => {}
    }

    let min_batch = operations
        .iter()
        .map(|op| op.minimum_batch_size)
        .min()
        .unwrap_or(1)
        .max(1);
    let lanes = pick_auto_split_lanes(order_qty, min_batch, operations, order_start, machine_next_free);
    split_evenly(order_qty, lanes)
}

/// Number of auto-split lanes, judged on the first operation's machines.
pub fn pick_auto_split_lanes<F>(
    order_qty: u32,
    min_batch: u32,
    operations: &[OperationSpec],
    order_start: NaiveDateTime,
    machine_next_free: F,
) -> usize
where
    F: Fn(&str) -> Option<NaiveDateTime>,
{
    let Some(first) = operations.first() else {
        return 1;
    };
    let machines = unique_machines(&first.eligible_machines);
    if machines.len() <= 1 {
        return 1;
    }

    let max_lanes = AUTO_SPLIT_MAX_LANES.min(machines.len());
    if u64::from(order_qty) < max_lanes as u64 * u64::from(min_batch.max(1)) {
        return 1;
    }

    let threshold = order_start + Duration::minutes(AUTO_SPLIT_READY_WINDOW_MIN);
    let ready = machines
        .iter()
        .filter(|m| machine_next_free(m).unwrap_or(order_start) <= threshold)
        .count();
    if ready >= 2 {
        2
    } else {
        max_lanes
    }
}

fn peel_fixed_size(order_qty: u32, size: u32) -> Vec<u32> {
    let size = size.max(1);
    let mut quantities = Vec::new();
    let mut remaining = order_qty;
    while remaining > 0 {
        let take = size.min(remaining);
        quantities.push(take);
        remaining -= take;
    }
    quantities
}

/// Even split; the remainder goes to the last lanes first.
fn split_evenly(order_qty: u32, lanes: usize) -> Vec<u32> {
    if lanes <= 1 {
        return vec![order_qty];
    }
    let lanes_u32 = lanes as u32;
    let base = order_qty / lanes_u32;
    let remainder = (order_qty % lanes_u32) as usize;
    (0..lanes)
        .map(|index| if index >= lanes - remainder { base + 1 } else { base })
        .collect()
}
