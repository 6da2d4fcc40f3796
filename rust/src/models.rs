//! Core data types crossing the engine boundary: raw orders, master data rows
//! and the emitted schedule rows / piece timeline.

use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

// Note: inputs stay loosely typed here; normalization happens in settings.rs
// and operations.rs so malformed values degrade to defaults instead of errors.

/// Per-operation override carried on an order.
#[pyclass]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationOverride {
    #[pyo3(get, set)]
    #[serde(alias = "OperationSeq", deserialize_with = "lenient::number")]
    pub operation_seq: Option<f64>,
    #[pyo3(get, set)]
    #[serde(alias = "OperationName", deserialize_with = "lenient::text")]
    pub operation_name: Option<String>,
    #[pyo3(get, set)]
    #[serde(alias = "SetupTime_Min", deserialize_with = "lenient::number")]
    pub setup_time_min: Option<f64>,
    #[pyo3(get, set)]
    #[serde(alias = "CycleTime_Min", deserialize_with = "lenient::number")]
    pub cycle_time_min: Option<f64>,
    #[pyo3(get, set)]
    #[serde(alias = "Minimum_BatchSize", deserialize_with = "lenient::number")]
    pub minimum_batch_size: Option<f64>,
    #[pyo3(get, set)]
    #[serde(alias = "machine", alias = "Machine", deserialize_with = "lenient::text")]
    pub fixed_machine: Option<String>,
    #[pyo3(get, set)]
    #[serde(alias = "EligibleMachines", deserialize_with = "lenient::list")]
    pub eligible_machines: Vec<String>,
    #[pyo3(get, set)]
    #[serde(
        alias = "HandleMode",
        alias = "HandleMachines",
        alias = "handle_machines",
        deserialize_with = "lenient::text"
    )]
    pub handle_mode: Option<String>,
}

#[pymethods]
impl OperationOverride {
    #[new]
    #[pyo3(signature = (
        operation_seq,
        operation_name=None,
        setup_time_min=None,
        cycle_time_min=None,
        minimum_batch_size=None,
        fixed_machine=None,
        eligible_machines=None,
        handle_mode=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        operation_seq: Option<f64>,
        operation_name: Option<String>,
        setup_time_min: Option<f64>,
        cycle_time_min: Option<f64>,
        minimum_batch_size: Option<f64>,
        fixed_machine: Option<String>,
        eligible_machines: Option<Vec<String>>,
        handle_mode: Option<String>,
    ) -> Self {
        Self {
            operation_seq,
            operation_name,
            setup_time_min,
            cycle_time_min,
            minimum_batch_size,
            fixed_machine,
            eligible_machines: eligible_machines.unwrap_or_default(),
            handle_mode,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "OperationOverride(operation_seq={:?}, machines={:?}, handle_mode={:?})",
            self.operation_seq, self.eligible_machines, self.handle_mode
        )
    }
}

/// A manufacturing work order to be scheduled.
#[pyclass]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::required_text")]
    pub part_number: String,
    #[pyo3(get, set)]
    #[serde(alias = "quantity", deserialize_with = "lenient::number")]
    pub order_quantity: Option<f64>,
    /// Comma separated operation sequence numbers, e.g. `"1, 2, 3"`.
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub operation_seq: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub priority: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub due_date: Option<String>,
    #[pyo3(get, set)]
    #[serde(alias = "startDate", deserialize_with = "lenient::text")]
    pub start_date_time: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub batch_mode: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::number")]
    pub custom_batch_size: Option<f64>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::items")]
    pub operation_details: Vec<OperationOverride>,
}

#[pymethods]
impl Order {
    #[new]
    #[pyo3(signature = (
        id,
        part_number,
        order_quantity,
        operation_seq=None,
        priority=None,
        due_date=None,
        start_date_time=None,
        batch_mode=None,
        custom_batch_size=None,
        operation_details=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: Option<String>,
        part_number: String,
        order_quantity: Option<f64>,
        operation_seq: Option<String>,
        priority: Option<String>,
        due_date: Option<String>,
        start_date_time: Option<String>,
        batch_mode: Option<String>,
        custom_batch_size: Option<f64>,
        operation_details: Option<Vec<OperationOverride>>,
    ) -> Self {
        Self {
            id,
            part_number,
            order_quantity,
            operation_seq,
            priority,
            due_date,
            start_date_time,
            batch_mode,
            custom_batch_size,
            operation_details: operation_details.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Order(id={:?}, part_number={:?}, quantity={:?}, ops={:?})",
            self.id, self.part_number, self.order_quantity, self.operation_seq
        )
    }
}

/// Default per-part operation parameters from the master-data store.
#[pyclass]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterDataRow {
    #[pyo3(get, set)]
    #[serde(alias = "PartNumber", deserialize_with = "lenient::required_text")]
    pub part_number: String,
    #[pyo3(get, set)]
    #[serde(alias = "OperationSeq", deserialize_with = "lenient::number")]
    pub operation_seq: Option<f64>,
    #[pyo3(get, set)]
    #[serde(alias = "OperationName", deserialize_with = "lenient::text")]
    pub operation_name: Option<String>,
    #[pyo3(get, set)]
    #[serde(alias = "SetupTime_Min", deserialize_with = "lenient::number")]
    pub setup_time_min: Option<f64>,
    #[pyo3(get, set)]
    #[serde(alias = "CycleTime_Min", deserialize_with = "lenient::number")]
    pub cycle_time_min: Option<f64>,
    #[pyo3(get, set)]
    #[serde(alias = "Minimum_BatchSize", deserialize_with = "lenient::number")]
    pub minimum_batch_size: Option<f64>,
    /// Comma separated machine names.
    #[pyo3(get, set)]
    #[serde(alias = "EligibleMachines", deserialize_with = "lenient::text")]
    pub eligible_machines: Option<String>,
    #[pyo3(get, set)]
    #[serde(
        alias = "HandleMachines",
        alias = "handle_machines",
        alias = "handleMode",
        deserialize_with = "lenient::text"
    )]
    pub handle_machines: Option<String>,
}

#[pymethods]
impl MasterDataRow {
    #[new]
    #[pyo3(signature = (
        part_number,
        operation_seq,
        operation_name=None,
        setup_time_min=None,
        cycle_time_min=None,
        minimum_batch_size=None,
        eligible_machines=None,
        handle_machines=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        part_number: String,
        operation_seq: Option<f64>,
        operation_name: Option<String>,
        setup_time_min: Option<f64>,
        cycle_time_min: Option<f64>,
        minimum_batch_size: Option<f64>,
        eligible_machines: Option<String>,
        handle_machines: Option<String>,
    ) -> Self {
        Self {
            part_number,
            operation_seq,
            operation_name,
            setup_time_min,
            cycle_time_min,
            minimum_batch_size,
            eligible_machines,
            handle_machines,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "MasterDataRow(part_number={:?}, operation_seq={:?})",
            self.part_number, self.operation_seq
        )
    }
}

/// One emitted row per (order, batch, operation).
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub part_number: String,
    #[pyo3(get)]
    pub order_qty: u32,
    #[pyo3(get)]
    pub priority: String,
    #[pyo3(get)]
    pub batch_id: String,
    #[pyo3(get)]
    pub batch_qty: u32,
    #[pyo3(get)]
    pub operation_seq: u32,
    #[pyo3(get)]
    pub operation_name: String,
    #[pyo3(get)]
    pub machine: String,
    #[pyo3(get)]
    pub setup_person_name: String,
    #[pyo3(get)]
    pub production_person_name: String,
    #[pyo3(get)]
    pub handle_mode: String,
    #[pyo3(get)]
    pub setup_start: String,
    #[pyo3(get)]
    pub setup_end: String,
    #[pyo3(get)]
    pub run_start: String,
    #[pyo3(get)]
    pub run_end: String,
    #[pyo3(get)]
    pub timing: String,
    #[pyo3(get)]
    pub due_date: String,
    #[pyo3(get)]
    pub status: String,
}

#[pymethods]
impl ScheduleRow {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleRow(id={:?}, machine={:?}, setup={}..{}, run={}..{})",
            self.id, self.machine, self.setup_start, self.setup_end, self.run_start, self.run_end
        )
    }
}

/// One emitted entry per individual piece of a batch on one operation.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceTimelineEntry {
    #[pyo3(get)]
    pub part_number: String,
    #[pyo3(get)]
    pub batch_id: String,
    /// 1-based piece index within the batch.
    #[pyo3(get)]
    pub piece: u32,
    #[pyo3(get)]
    pub operation_seq: u32,
    #[pyo3(get)]
    pub operation_name: String,
    #[pyo3(get)]
    pub machine: String,
    #[pyo3(get)]
    pub person: String,
    #[pyo3(get)]
    pub handle_mode: String,
    #[pyo3(get)]
    pub run_start: String,
    #[pyo3(get)]
    pub run_end: String,
    #[pyo3(get)]
    pub status: String,
}

#[pymethods]
impl PieceTimelineEntry {
    #[new]
    #[pyo3(signature = (
        part_number,
        batch_id,
        piece,
        operation_seq,
        machine,
        person,
        run_start,
        run_end,
        handle_mode="single".to_string(),
        operation_name=String::new(),
        status="Scheduled".to_string()
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        part_number: String,
        batch_id: String,
        piece: u32,
        operation_seq: u32,
        machine: String,
        person: String,
        run_start: String,
        run_end: String,
        handle_mode: String,
        operation_name: String,
        status: String,
    ) -> Self {
        Self {
            part_number,
            batch_id,
            piece,
            operation_seq,
            operation_name,
            machine,
            person,
            handle_mode,
            run_start,
            run_end,
            status,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PieceTimelineEntry({}/{}/P{}/OP{} on {}, {}..{})",
            self.part_number,
            self.batch_id,
            self.piece,
            self.operation_seq,
            self.machine,
            self.run_start,
            self.run_end
        )
    }
}

/// Result of one scheduling run.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    #[pyo3(get)]
    pub rows: Vec<ScheduleRow>,
    #[pyo3(get)]
    pub piece_timeline: Vec<PieceTimelineEntry>,
}

#[pymethods]
impl ScheduleResult {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleResult(rows={}, pieces={})",
            self.rows.len(),
            self.piece_timeline.len()
        )
    }
}

/// Deserializers that accept the loosely typed values spreadsheet imports and
/// form posts produce (numbers as strings, flags as 0/1, lists as CSV text).
pub(crate) mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(Value::Bool(b)) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
        .filter(|v| v.is_finite()))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn required_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(d)?.unwrap_or_default())
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            Some(Value::String(s)) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
            }
            _ => false,
        })
    }

    pub fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => s.split(',').map(|part| part.to_string()).collect(),
            _ => Vec::new(),
        })
    }

    /// An array of records. Anything but an array reads as empty; `null` or
    /// unparsable elements are dropped instead of failing the document.
    pub fn items<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter(|item| !item.is_null())
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}
