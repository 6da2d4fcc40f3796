//! Operation resolution: order overrides, then master data, then synthetic
//! defaults.

use rustc_hash::FxHashSet;

use crate::models::{MasterDataRow, OperationOverride, Order};

/// Machine pool used when a master-data row or override lists no machines.
pub const DEFAULT_MACHINES: [&str; 10] = [
    "VMC 1", "VMC 2", "VMC 3", "VMC 4", "VMC 5", "VMC 6", "VMC 7", "VMC 8", "VMC 9", "VMC 10",
];

/// Machine pool for operations with no override and no master-data row.
pub const SYNTHETIC_MACHINES: [&str; 4] = ["VMC 1", "VMC 2", "VMC 3", "VMC 4"];

const DEFAULT_SETUP_MIN: i64 = 60;
const DEFAULT_CYCLE_MIN: f64 = 1.0;
const DEFAULT_MIN_BATCH: u32 = 200;

/// How much of the run person's attention an operation needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleMode {
    /// Exclusive: the person runs nothing else meanwhile.
    Single,
    /// Shared: the person may run two such jobs at once.
    Double,
}

impl HandleMode {
    /// `Double` iff the text mentions "double" in any case.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(text) if text.to_ascii_lowercase().contains("double") => Self::Double,
            _ => Self::Single,
        }
    }

    /// Capacity units a run in this mode takes from the person's pool of 2.
    pub fn run_units(self) -> u32 {
        match self {
            Self::Single => 2,
            Self::Double => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
        }
    }
}

/// A fully resolved operation.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationSpec {
    pub operation_seq: u32,
    pub operation_name: String,
    pub setup_time_min: i64,
    pub cycle_time_min: f64,
    pub minimum_batch_size: u32,
    /// Deduplicated, order preserved. A fixed machine collapses this to one entry.
    pub eligible_machines: Vec<String>,
    pub handle_mode: HandleMode,
}

impl OperationSpec {
    /// Allowed minutes one piece occupies the machine.
    pub fn piece_minutes(&self) -> i64 {
        (self.cycle_time_min.ceil() as i64).max(1)
    }
}

/// Read-only source of default operation parameters per part.
pub trait MasterData {
    fn lookup(&self, part_number: &str, operation_seq: u32) -> Option<&MasterDataRow>;
}

impl MasterData for [MasterDataRow] {
    fn lookup(&self, part_number: &str, operation_seq: u32) -> Option<&MasterDataRow> {
        self.iter().find(|row| {
            row.part_number.trim() == part_number
                && row.operation_seq.map(|s| s.round() as i64) == Some(operation_seq as i64)
        })
    }
}

impl MasterData for Vec<MasterDataRow> {
    fn lookup(&self, part_number: &str, operation_seq: u32) -> Option<&MasterDataRow> {
        self.as_slice().lookup(part_number, operation_seq)
    }
}

/// Parse a comma separated sequence field such as `"1, 2,OP3"`.
///
/// Non-digits are stripped from each token; zero, empty and duplicate values
/// are dropped. Falls back to `[1]` when nothing usable remains.
pub fn parse_operation_seq(raw: Option<&str>) -> Vec<u32> {
    let mut seen = FxHashSet::default();
    let values: Vec<u32> = raw
        .unwrap_or_default()
        .split(',')
        .filter_map(|token| {
            let digits: String = token.chars().filter(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        })
        .filter(|&v| v > 0)
        .filter(|v| seen.insert(*v))
        .collect();
    if values.is_empty() {
        vec![1]
    } else {
        values
    }
}

/// Resolve the requested operations of an order, sorted by sequence.
pub fn resolve_operation_specs<M: MasterData + ?Sized>(
    order: &Order,
    requested: &[u32],
    master_data: &M,
) -> Vec<OperationSpec> {
    let part_number = order.part_number.trim();
    let overrides = resolve_overrides(&order.operation_details);

    let mut specs: Vec<OperationSpec> = requested
        .iter()
        .map(|&seq| {
            if let Some(spec) = overrides.iter().find(|o| o.operation_seq == seq) {
                return spec.clone();
            }
            match master_data.lookup(part_number, seq) {
                Some(row) => from_master_row(seq, row),
                None => synthetic(seq),
            }
        })
        .collect();
    specs.sort_by_key(|s| s.operation_seq);
    specs
}

fn resolve_overrides(details: &[OperationOverride]) -> Vec<OperationSpec> {
    details
        .iter()
        .filter_map(|item| {
            let seq = item.operation_seq.filter(|s| *s >= 1.0)?.round() as u32;
            let fixed = item
                .fixed_machine
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty());
            let eligible_machines = match fixed {
                Some(machine) => vec![machine.to_string()],
                None => with_default_pool(unique_machines(&item.eligible_machines)),
            };
            Some(OperationSpec {
                operation_seq: seq,
                operation_name: operation_name(item.operation_name.as_deref(), seq),
                setup_time_min: setup_minutes(item.setup_time_min),
                cycle_time_min: cycle_minutes(item.cycle_time_min),
                minimum_batch_size: min_batch(item.minimum_batch_size),
                eligible_machines,
                handle_mode: HandleMode::parse(item.handle_mode.as_deref()),
            })
        })
        .collect()
}

fn from_master_row(seq: u32, row: &MasterDataRow) -> OperationSpec {
    let listed: Vec<String> = row
        .eligible_machines
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::to_string)
        .collect();
    OperationSpec {
        operation_seq: seq,
        operation_name: operation_name(row.operation_name.as_deref(), seq),
        setup_time_min: setup_minutes(row.setup_time_min),
        cycle_time_min: cycle_minutes(row.cycle_time_min),
        minimum_batch_size: min_batch(row.minimum_batch_size),
        eligible_machines: with_default_pool(unique_machines(&listed)),
        handle_mode: HandleMode::parse(row.handle_machines.as_deref()),
    }
}

fn synthetic(seq: u32) -> OperationSpec {
    OperationSpec {
        operation_seq: seq,
        operation_name: format!("Operation {}", seq),
        setup_time_min: DEFAULT_SETUP_MIN,
        cycle_time_min: DEFAULT_CYCLE_MIN,
        minimum_batch_size: DEFAULT_MIN_BATCH,
        eligible_machines: SYNTHETIC_MACHINES.iter().map(|m| m.to_string()).collect(),
        handle_mode: HandleMode::Single,
    }
}

fn operation_name(raw: Option<&str>, seq: u32) -> String {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Operation {}", seq))
}

fn given(raw: Option<f64>) -> Option<f64> {
    raw.filter(|v| v.is_finite() && *v != 0.0)
}

fn setup_minutes(raw: Option<f64>) -> i64 {
    given(raw).map_or(DEFAULT_SETUP_MIN, |v| (v.round() as i64).max(1))
}

fn cycle_minutes(raw: Option<f64>) -> f64 {
    given(raw).map_or(DEFAULT_CYCLE_MIN, |v| v.max(1.0))
}

fn min_batch(raw: Option<f64>) -> u32 {
    given(raw).map_or(DEFAULT_MIN_BATCH, |v| (v.round() as i64).max(1) as u32)
}

/// Trim, drop empties and duplicates, keep first-seen order.
pub fn unique_machines(machines: &[String]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    machines
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .filter(|m| seen.insert(m.to_string()))
        .map(str::to_string)
        .collect()
}

fn with_default_pool(machines: Vec<String>) -> Vec<String> {
    if machines.is_empty() {
        DEFAULT_MACHINES.iter().map(|m| m.to_string()).collect()
    } else {
        machines
    }
}
