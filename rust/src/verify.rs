//! Independent re-check of an emitted piece timeline.
//!
//! Works only from the timeline entries, so it can validate schedules that
//! were edited or produced elsewhere.

use chrono::NaiveDateTime;
use pyo3::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::datetime::{parse_local_datetime, to_local_iso};
use crate::models::PieceTimelineEntry;
use crate::operations::HandleMode;
use crate::scheduler::PERSON_CAPACITY_UNITS;

/// Kinds of timeline defects. All of them invalidate the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MachineOverlap,
    PrecedenceViolation,
    PersonSingleModeOverlap,
    PersonRunCapacityExceeded,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MachineOverlap => "MACHINE_OVERLAP",
            Self::PrecedenceViolation => "PRECEDENCE_VIOLATION",
            Self::PersonSingleModeOverlap => "PERSON_SINGLE_MODE_OVERLAP",
            Self::PersonRunCapacityExceeded => "PERSON_RUN_CAPACITY_EXCEEDED",
        }
    }
}

#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationIssue {
    pub code: IssueCode,
    /// Machine, person or `part|batch|piece` key the issue is about
    #[pyo3(get)]
    pub entity_id: String,
    #[pyo3(get)]
    pub message: String,
    #[pyo3(get)]
    pub start: String,
    #[pyo3(get)]
    pub end: String,
}

#[pymethods]
impl VerificationIssue {
    #[getter(code)]
    fn py_code(&self) -> &'static str {
        self.code.as_str()
    }

    fn __repr__(&self) -> String {
        format!("VerificationIssue({}, {:?})", self.code.as_str(), self.message)
    }
}

#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    #[pyo3(get)]
    pub is_valid: bool,
    #[pyo3(get)]
    pub issues: Vec<VerificationIssue>,
}

#[pymethods]
impl VerificationReport {
    fn __repr__(&self) -> String {
        format!(
            "VerificationReport(is_valid={}, issues={})",
            self.is_valid,
            self.issues.len()
        )
    }
}

/// A timeline entry with parsed times and defaulted identity fields.
#[derive(Debug)]
struct PieceEvent<'a> {
    part: &'a str,
    batch: &'a str,
    piece: u32,
    operation_seq: u32,
    machine: &'a str,
    person: &'a str,
    handle_mode: HandleMode,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl PieceEvent<'_> {
    fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && start < self.end
    }

    fn label(&self) -> String {
        format!("{}/{}/P{}/OP{}", self.part, self.batch, self.piece, self.operation_seq)
    }
}

fn or_default<'a>(text: &'a str, default: &'a str) -> &'a str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}

fn normalize(timeline: &[PieceTimelineEntry]) -> Vec<PieceEvent<'_>> {
    let mut events: Vec<PieceEvent<'_>> = timeline
        .iter()
        .filter_map(|entry| {
            let start = parse_local_datetime(&entry.run_start)?;
            let end = parse_local_datetime(&entry.run_end)?;
            if end <= start {
                return None;
            }
            Some(PieceEvent {
                part: or_default(&entry.part_number, "UNKNOWN"),
                batch: or_default(&entry.batch_id, "B00"),
                piece: entry.piece.max(1),
                operation_seq: entry.operation_seq.max(1),
                machine: or_default(&entry.machine, "UNKNOWN"),
                person: or_default(&entry.person, "Unassigned"),
                handle_mode: HandleMode::parse(Some(entry.handle_mode.as_str())),
                start,
                end,
            })
        })
        .collect();
    events.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    events
}

/// Group while keeping first-seen key order.
fn group_by<'e, 'a, K, F>(
    events: &'e [PieceEvent<'a>],
    key: F,
) -> Vec<(K, Vec<&'e PieceEvent<'a>>)>
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&PieceEvent<'a>) -> K,
{
    let mut index: FxHashMap<K, usize> = FxHashMap::default();
    let mut groups: Vec<(K, Vec<&PieceEvent<'a>>)> = Vec::new();
    for event in events {
        let k = key(event);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(event),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![event]));
            }
        }
    }
    groups
}

#[derive(Default)]
struct IssueCollector {
    seen: FxHashSet<(IssueCode, String, NaiveDateTime, NaiveDateTime, String)>,
    issues: Vec<VerificationIssue>,
}

impl IssueCollector {
    fn add(
        &mut self,
        code: IssueCode,
        entity_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        message: String,
    ) {
        let key = (code, entity_id.to_string(), start, end, message.clone());
        if !self.seen.insert(key) {
            return;
        }
        self.issues.push(VerificationIssue {
            code,
            entity_id: entity_id.to_string(),
            message,
            start: to_local_iso(start),
            end: to_local_iso(end),
        });
    }
}

/// Check a piece timeline for machine overlaps, per-piece precedence and
/// run-person capacity. Entries with unparsable or empty intervals are
/// ignored.
pub fn verify_piece_flow(timeline: &[PieceTimelineEntry]) -> VerificationReport {
    let events = normalize(timeline);
    let mut collector = IssueCollector::default();

    for (machine, on_machine) in group_by(&events, |e| e.machine) {
        for pair in on_machine.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            if prev.overlaps(curr.start, curr.end) {
                collector.add(
                    IssueCode::MachineOverlap,
                    machine,
                    curr.start,
                    prev.end,
                    format!("Overlap on {}: {} with {}.", machine, prev.label(), curr.label()),
                );
            }
        }
    }

    for ((part, batch, piece), mut steps) in group_by(&events, |e| (e.part, e.batch, e.piece)) {
        steps.sort_by(|a, b| a.operation_seq.cmp(&b.operation_seq).then(a.start.cmp(&b.start)));
        let key = format!("{}|{}|{}", part, batch, piece);
        for pair in steps.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            if curr.start < prev.end {
                collector.add(
                    IssueCode::PrecedenceViolation,
                    &key,
                    curr.start,
                    prev.end,
                    format!(
                        "Precedence violation for {}: OP{} starts before prior operation completion.",
                        key, curr.operation_seq
                    ),
                );
            }
        }
    }

    for (person, runs) in group_by(&events, |e| e.person) {
        if runs.len() < 2 {
            continue;
        }
        let mut points: Vec<NaiveDateTime> = runs.iter().flat_map(|e| [e.start, e.end]).collect();
        points.sort();
        points.dedup();

        for slice in points.windows(2) {
            let (start, end) = (slice[0], slice[1]);
            let active: Vec<&&PieceEvent> = runs.iter().filter(|e| e.overlaps(start, end)).collect();
            if active.len() <= 1 {
                continue;
            }
            if active.iter().any(|e| e.handle_mode == HandleMode::Single) {
                collector.add(
                    IssueCode::PersonSingleModeOverlap,
                    person,
                    start,
                    end,
                    format!("{} has a single-handled run overlapping another run.", person),
                );
            }
            let units: u32 = active.iter().map(|e| e.handle_mode.run_units()).sum();
            if units > PERSON_CAPACITY_UNITS {
                collector.add(
                    IssueCode::PersonRunCapacityExceeded,
                    person,
                    start,
                    end,
                    format!(
                        "{} run capacity exceeded (used {}, max {}).",
                        person, units, PERSON_CAPACITY_UNITS
                    ),
                );
            }
        }
    }

    VerificationReport {
        is_valid: collector.issues.is_empty(),
        issues: collector.issues,
    }
}
