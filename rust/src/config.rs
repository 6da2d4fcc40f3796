//! Configuration types for a scheduling run.
//!
//! These are the raw, loosely typed settings as the planner UI sends them.
//! [`crate::settings::ParsedSettings::from_raw`] normalizes them once per run.

use pyo3::prelude::*;
use serde::Deserialize;

use crate::models::lenient;

/// A person available to the shop floor.
#[pyclass]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonnelProfile {
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub uid: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::required_text")]
    pub name: String,
    /// "production" or "setup"
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub source_section: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::flag")]
    pub level_up: bool,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::flag")]
    pub setup_eligible: bool,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::flag")]
    pub production_eligible: bool,
    /// Lower is preferred
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::number")]
    pub setup_priority: Option<f64>,
}

#[pymethods]
impl PersonnelProfile {
    #[new]
    #[pyo3(signature = (
        name,
        uid=None,
        source_section=None,
        level_up=false,
        setup_eligible=false,
        production_eligible=false,
        setup_priority=None
    ))]
    fn new(
        name: String,
        uid: Option<String>,
        source_section: Option<String>,
        level_up: bool,
        setup_eligible: bool,
        production_eligible: bool,
        setup_priority: Option<f64>,
    ) -> Self {
        Self {
            uid,
            name,
            source_section,
            level_up,
            setup_eligible,
            production_eligible,
            setup_priority,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PersonnelProfile(name={:?}, source={:?}, setup={}, production={})",
            self.name, self.source_section, self.setup_eligible, self.production_eligible
        )
    }
}

/// A holiday: either a bare date (whole day) or an explicit start/end pair.
#[pyclass]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "HolidayInput")]
pub struct HolidayEntry {
    #[pyo3(get, set)]
    pub start: Option<String>,
    #[pyo3(get, set)]
    pub end: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HolidayInput {
    Date(String),
    Range {
        #[serde(
            alias = "startDateTime",
            alias = "from",
            alias = "date",
            default,
            deserialize_with = "lenient::text"
        )]
        start: Option<String>,
        #[serde(
            alias = "endDateTime",
            alias = "to",
            default,
            deserialize_with = "lenient::text"
        )]
        end: Option<String>,
    },
}

impl From<HolidayInput> for HolidayEntry {
    fn from(input: HolidayInput) -> Self {
        match input {
            HolidayInput::Date(date) => Self {
                start: Some(date),
                end: None,
            },
            HolidayInput::Range { start, end } => Self { start, end },
        }
    }
}

#[pymethods]
impl HolidayEntry {
    #[new]
    #[pyo3(signature = (start, end=None))]
    fn new(start: Option<String>, end: Option<String>) -> Self {
        Self { start, end }
    }

    fn __repr__(&self) -> String {
        format!("HolidayEntry(start={:?}, end={:?})", self.start, self.end)
    }
}

/// A machine breakdown window applying to one or more machines.
#[pyclass]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakdownEntry {
    #[pyo3(get, set)]
    #[serde(alias = "startDateTime", alias = "from", deserialize_with = "lenient::text")]
    pub start: Option<String>,
    #[pyo3(get, set)]
    #[serde(alias = "endDateTime", alias = "to", deserialize_with = "lenient::text")]
    pub end: Option<String>,
    #[pyo3(get, set)]
    #[serde(alias = "machine", deserialize_with = "lenient::list")]
    pub machines: Vec<String>,
}

#[pymethods]
impl BreakdownEntry {
    #[new]
    #[pyo3(signature = (start, end, machines))]
    fn new(start: Option<String>, end: Option<String>, machines: Vec<String>) -> Self {
        Self {
            start,
            end,
            machines,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "BreakdownEntry(start={:?}, end={:?}, machines={:?})",
            self.start, self.end, self.machines
        )
    }
}

/// Raw settings for one scheduling run.
#[pyclass]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    /// Global start, e.g. "2026-02-22T06:00:00"
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub global_start_date_time: Option<String>,
    /// Daily setup window, e.g. "06:00-22:00"
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub global_setup_window: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub production_window_shift1: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub production_window_shift2: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub production_window_shift3: Option<String>,
    /// When false every person works the setup window
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::flag")]
    pub enforce_operator_shifts: bool,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub shift1: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub shift2: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::text")]
    pub shift3: Option<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::items")]
    pub personnel_profiles: Vec<PersonnelProfile>,
    /// Legacy flat operator list, used only without personnel profiles
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::list")]
    pub operators: Vec<String>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::items")]
    pub holidays: Vec<HolidayEntry>,
    #[pyo3(get, set)]
    #[serde(deserialize_with = "lenient::items")]
    pub breakdowns: Vec<BreakdownEntry>,
    /// Log verbosity (0=silent, 1=commits, 2=candidates, 3=trace)
    #[pyo3(get, set)]
    pub verbosity: u8,
}

#[pymethods]
impl ScheduleSettings {
    #[new]
    #[pyo3(signature = (
        global_start_date_time=None,
        global_setup_window=None,
        production_window_shift1=None,
        production_window_shift2=None,
        production_window_shift3=None,
        enforce_operator_shifts=false,
        shift1=None,
        shift2=None,
        shift3=None,
        personnel_profiles=None,
        operators=None,
        holidays=None,
        breakdowns=None,
        verbosity=0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        global_start_date_time: Option<String>,
        global_setup_window: Option<String>,
        production_window_shift1: Option<String>,
        production_window_shift2: Option<String>,
        production_window_shift3: Option<String>,
        enforce_operator_shifts: bool,
        shift1: Option<String>,
        shift2: Option<String>,
        shift3: Option<String>,
        personnel_profiles: Option<Vec<PersonnelProfile>>,
        operators: Option<Vec<String>>,
        holidays: Option<Vec<HolidayEntry>>,
        breakdowns: Option<Vec<BreakdownEntry>>,
        verbosity: u8,
    ) -> Self {
        Self {
            global_start_date_time,
            global_setup_window,
            production_window_shift1,
            production_window_shift2,
            production_window_shift3,
            enforce_operator_shifts,
            shift1,
            shift2,
            shift3,
            personnel_profiles: personnel_profiles.unwrap_or_default(),
            operators: operators.unwrap_or_default(),
            holidays: holidays.unwrap_or_default(),
            breakdowns: breakdowns.unwrap_or_default(),
            verbosity,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleSettings(start={:?}, setup_window={:?}, personnel={}, holidays={}, breakdowns={})",
            self.global_start_date_time,
            self.global_setup_window,
            self.personnel_profiles.len(),
            self.holidays.len(),
            self.breakdowns.len()
        )
    }
}
