//! Normalization of raw [`ScheduleSettings`] into the immutable bundle the
//! engine reads for the whole run.

use chrono::{Local, NaiveDateTime, Timelike};
use rustc_hash::FxHashMap;

use crate::config::{BreakdownEntry, HolidayEntry, PersonnelProfile, ScheduleSettings};
use crate::datetime::parse_optional;
use crate::window::{
    Interval, TimeWindow, DEFAULT_OPERATOR_WINDOW, DEFAULT_PRODUCTION_WINDOW,
};

/// Operator names used when neither profiles nor a legacy list are given.
pub const LEGACY_OPERATORS: [&str; 4] = ["A", "B", "C", "D"];

/// Setup priority assigned to people without any setup standing.
const UNRANKED_SETUP_PRIORITY: i32 = 99;

/// Which personnel block a person was imported from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersonnelSource {
    Production,
    Setup,
}

impl PersonnelSource {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "setup" => Self::Setup,
            _ => Self::Production,
        }
    }
}

/// A normalized, deduplicated person.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonnelSpec {
    pub uid: String,
    pub name: String,
    pub source: PersonnelSource,
    pub level_up: bool,
    pub setup_eligible: bool,
    pub production_eligible: bool,
    /// Lower is preferred
    pub setup_priority: i32,
    pub shift: TimeWindow,
}

/// Settings after normalization. Built once per run, read-only afterwards.
#[derive(Clone, Debug)]
pub struct ParsedSettings {
    pub global_start: NaiveDateTime,
    pub setup_window: TimeWindow,
    pub production_windows: Vec<TimeWindow>,
    /// Full roster sorted by (setup priority, name)
    pub personnel: Vec<PersonnelSpec>,
    pub setup_personnel: Vec<PersonnelSpec>,
    pub production_personnel: Vec<PersonnelSpec>,
    pub holidays: Vec<Interval>,
    pub breakdowns: FxHashMap<String, Vec<Interval>>,
}

impl ParsedSettings {
    /// Normalize raw settings. Never fails: malformed values use defaults.
    pub fn from_raw(raw: &ScheduleSettings) -> Self {
        let setup_window = TimeWindow::parse(
            non_empty(raw.global_setup_window.as_deref()).unwrap_or(DEFAULT_OPERATOR_WINDOW),
        );

        let global_start = parse_optional(raw.global_start_date_time.as_deref())
            .unwrap_or_else(|| setup_window.next_start(current_minute()));

        let production_texts: Vec<&str> = [
            &raw.production_window_shift1,
            &raw.production_window_shift2,
            &raw.production_window_shift3,
        ]
        .into_iter()
        .filter_map(|w| non_empty(w.as_deref()))
        .collect();
        let production_windows = if production_texts.is_empty() {
            vec![TimeWindow::parse(DEFAULT_PRODUCTION_WINDOW)]
        } else {
            production_texts.into_iter().map(TimeWindow::parse).collect()
        };

        let shift_texts: Vec<&str> = [&raw.shift1, &raw.shift2, &raw.shift3]
            .into_iter()
            .filter_map(|w| non_empty(w.as_deref()))
            .collect();
        let shift_windows = if raw.enforce_operator_shifts && !shift_texts.is_empty() {
            shift_texts.into_iter().map(TimeWindow::parse).collect()
        } else {
            vec![setup_window.clone()]
        };

        let personnel = normalize_personnel(&raw.personnel_profiles, &raw.operators, &shift_windows);
        let setup_personnel = personnel.iter().filter(|p| p.setup_eligible).cloned().collect();
        let production_personnel = personnel
            .iter()
            .filter(|p| p.production_eligible)
            .cloned()
            .collect();

        Self {
            global_start,
            setup_window,
            production_windows,
            personnel,
            setup_personnel,
            production_personnel,
            holidays: parse_holidays(&raw.holidays),
            breakdowns: parse_breakdowns(&raw.breakdowns),
        }
    }

    #[inline]
    pub fn is_holiday(&self, at: NaiveDateTime) -> bool {
        self.holidays.iter().any(|h| h.contains(at))
    }

    #[inline]
    pub fn is_breakdown(&self, machine: &str, at: NaiveDateTime) -> bool {
        self.breakdowns
            .get(machine)
            .is_some_and(|intervals| intervals.iter().any(|b| b.contains(at)))
    }

    /// Whether production may run on `machine` during the minute at `at`.
    pub fn is_run_minute_allowed(&self, machine: &str, at: NaiveDateTime) -> bool {
        if self.is_holiday(at) || self.is_breakdown(machine, at) {
            return false;
        }
        self.production_windows.iter().any(|w| w.contains(at))
    }

    /// Setup-eligible people, or the whole roster when nobody is.
    pub fn setup_pool(&self) -> &[PersonnelSpec] {
        if self.setup_personnel.is_empty() {
            &self.personnel
        } else {
            &self.setup_personnel
        }
    }

    /// Production-eligible people, or the whole roster when nobody is.
    pub fn run_pool(&self) -> &[PersonnelSpec] {
        if self.production_personnel.is_empty() {
            &self.personnel
        } else {
            &self.production_personnel
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|s| !s.is_empty())
}

fn current_minute() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

fn normalize_personnel(
    profiles: &[PersonnelProfile],
    operators: &[String],
    shift_windows: &[TimeWindow],
) -> Vec<PersonnelSpec> {
    let shift_for = |index: usize| shift_windows[index % shift_windows.len()].clone();

    let mut by_name: Vec<PersonnelSpec> = Vec::new();
    let mut index_of: FxHashMap<String, usize> = FxHashMap::default();

    for (index, profile) in profiles.iter().enumerate() {
        let name = profile.name.trim();
        if name.is_empty() {
            continue;
        }
        let uid = non_empty(profile.uid.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("UID-{}", index + 1));
        let source = PersonnelSource::parse(profile.source_section.as_deref());
        let level_up = profile.level_up;
        let setup_eligible = profile.setup_eligible || source == PersonnelSource::Setup || level_up;
        // setup staff may also run machines
        let production_eligible = profile.production_eligible
            || matches!(source, PersonnelSource::Production | PersonnelSource::Setup)
            || level_up;
        let setup_priority = match (source, profile.setup_priority) {
            (PersonnelSource::Setup, _) => 1,
            (_, Some(p)) => (p.round() as i32).max(1),
            (_, None) if level_up => 2,
            _ => UNRANKED_SETUP_PRIORITY,
        };

        match index_of.get(name) {
            Some(&existing_idx) => {
                let existing = &mut by_name[existing_idx];
                existing.setup_eligible |= setup_eligible;
                existing.production_eligible |= production_eligible;
                existing.level_up |= level_up;
                existing.setup_priority = existing.setup_priority.min(setup_priority);
                if source == PersonnelSource::Setup {
                    existing.source = PersonnelSource::Setup;
                }
            }
            None => {
                index_of.insert(name.to_string(), by_name.len());
                by_name.push(PersonnelSpec {
                    uid,
                    name: name.to_string(),
                    source,
                    level_up,
                    setup_eligible,
                    production_eligible,
                    setup_priority,
                    shift: shift_for(index),
                });
            }
        }
    }

    if !by_name.is_empty() {
        by_name.sort_by(|a, b| {
            a.setup_priority
                .cmp(&b.setup_priority)
                .then_with(|| a.name.cmp(&b.name))
        });
        return by_name;
    }

    let names: Vec<String> = {
        let given: Vec<String> = operators
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if given.is_empty() {
            LEGACY_OPERATORS.iter().map(|s| s.to_string()).collect()
        } else {
            given
        }
    };

    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| PersonnelSpec {
            uid: format!("LEGACY-{}", index + 1),
            name,
            source: PersonnelSource::Production,
            level_up: true,
            setup_eligible: true,
            production_eligible: true,
            setup_priority: 5,
            shift: shift_for(index),
        })
        .collect()
}

fn parse_holidays(entries: &[HolidayEntry]) -> Vec<Interval> {
    entries
        .iter()
        .filter_map(|entry| {
            let start = parse_optional(entry.start.as_deref())?;
            let end = parse_optional(entry.end.as_deref());
            match end.and_then(|end| Interval::new(start, end)) {
                Some(interval) => Some(interval),
                None => Some(Interval::whole_day(start)),
            }
        })
        .collect()
}

fn parse_breakdowns(entries: &[BreakdownEntry]) -> FxHashMap<String, Vec<Interval>> {
    let mut by_machine: FxHashMap<String, Vec<Interval>> = FxHashMap::default();
    for entry in entries {
        let interval = match (
            parse_optional(entry.start.as_deref()),
            parse_optional(entry.end.as_deref()),
        ) {
            (Some(start), Some(end)) => Interval::new(start, end),
            _ => None,
        };
        let Some(interval) = interval else {
            continue;
        };
        for machine in &entry.machines {
            let machine = machine.trim();
            if machine.is_empty() {
                continue;
            }
            by_machine
                .entry(machine.to_string())
                .or_default()
                .push(interval);
        }
    }
    by_machine
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn profile(name: &str, source: &str, level_up: bool) -> PersonnelProfile {
        PersonnelProfile {
            uid: None,
            name: name.to_string(),
            source_section: Some(source.to_string()),
            level_up,
            setup_eligible: false,
            production_eligible: false,
            setup_priority: None,
        }
    }

    fn base_settings() -> ScheduleSettings {
        ScheduleSettings {
            global_start_date_time: Some("2026-02-22T06:00:00".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let parsed = ParsedSettings::from_raw(&base_settings());
        assert_eq!(parsed.global_start, dt(22, 6, 0));
        assert_eq!(parsed.setup_window.raw, DEFAULT_OPERATOR_WINDOW);
        assert_eq!(parsed.production_windows.len(), 1);
        assert!(parsed.is_run_minute_allowed("VMC 1", dt(22, 23, 59)));
        let names: Vec<&str> = parsed.personnel.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert!(parsed.personnel.iter().all(|p| p.setup_eligible && p.production_eligible));
    }

    #[test]
    fn test_missing_start_uses_next_setup_opening() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            global_start_date_time: Some("not a date".to_string()),
            ..Default::default()
        });
        assert_eq!(parsed.global_start.hour(), 6);
        assert_eq!(parsed.global_start.minute(), 0);
    }

    #[test]
    fn test_legacy_operator_list() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            operators: vec![" Ravi ".to_string(), "".to_string(), "Meena".to_string()],
            ..base_settings()
        });
        let names: Vec<&str> = parsed.personnel.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ravi", "Meena"]);
        assert_eq!(parsed.personnel[1].uid, "LEGACY-2");
    }

    #[test]
    fn test_personnel_eligibility_and_priority() {
        let mut ranked = profile("Prod Ranked", "production", false);
        ranked.setup_priority = Some(0.0);
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            personnel_profiles: vec![
                profile("Prod Only", "production", false),
                profile("Setter", "setup", false),
                profile("Leveled", "production", true),
                ranked,
            ],
            ..base_settings()
        });

        let find = |name: &str| parsed.personnel.iter().find(|p| p.name == name).unwrap();
        assert!(!find("Prod Only").setup_eligible);
        assert_eq!(find("Prod Only").setup_priority, 99);
        assert!(find("Setter").setup_eligible);
        assert!(find("Setter").production_eligible);
        assert_eq!(find("Setter").setup_priority, 1);
        assert!(find("Leveled").setup_eligible && find("Leveled").production_eligible);
        assert_eq!(find("Leveled").setup_priority, 2);
        assert_eq!(find("Prod Ranked").setup_priority, 1);

        let order: Vec<&str> = parsed.personnel.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["Prod Ranked", "Setter", "Leveled", "Prod Only"]);
        assert_eq!(parsed.setup_personnel.len(), 2);
        assert_eq!(parsed.production_personnel.len(), 4);
    }

    #[test]
    fn test_duplicate_names_merge() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            personnel_profiles: vec![
                profile("Kiran", "production", false),
                profile("Kiran", "setup", false),
            ],
            ..base_settings()
        });
        assert_eq!(parsed.personnel.len(), 1);
        let kiran = &parsed.personnel[0];
        assert!(kiran.setup_eligible && kiran.production_eligible);
        assert_eq!(kiran.setup_priority, 1);
        assert_eq!(kiran.source, PersonnelSource::Setup);
        assert_eq!(kiran.uid, "UID-1");
    }

    #[test]
    fn test_shifts_assigned_cyclically_when_enforced() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            enforce_operator_shifts: true,
            shift1: Some("06:00-14:00".to_string()),
            shift2: Some("14:00-22:00".to_string()),
            operators: vec!["P".into(), "Q".into(), "R".into()],
            ..base_settings()
        });
        let shifts: Vec<&str> = parsed.personnel.iter().map(|p| p.shift.raw.as_str()).collect();
        assert_eq!(shifts, vec!["06:00-14:00", "14:00-22:00", "06:00-14:00"]);
    }

    #[test]
    fn test_shifts_ignored_when_not_enforced() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            global_setup_window: Some("07:00-19:00".to_string()),
            shift1: Some("06:00-14:00".to_string()),
            ..base_settings()
        });
        assert!(parsed.personnel.iter().all(|p| p.shift.raw == "07:00-19:00"));
    }

    #[test]
    fn test_holidays() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            holidays: vec![
                HolidayEntry {
                    start: Some("2026-02-23".to_string()),
                    end: None,
                },
                HolidayEntry {
                    start: Some("2026-02-24T08:00".to_string()),
                    end: Some("2026-02-24T12:00".to_string()),
                },
                HolidayEntry {
                    start: Some("garbage".to_string()),
                    end: None,
                },
            ],
            ..base_settings()
        });
        assert_eq!(parsed.holidays.len(), 2);
        assert!(parsed.is_holiday(dt(23, 0, 0)));
        assert!(parsed.is_holiday(dt(23, 23, 59)));
        assert!(!parsed.is_holiday(dt(24, 7, 59)));
        assert!(parsed.is_holiday(dt(24, 8, 0)));
        assert!(!parsed.is_holiday(dt(24, 12, 0)));
    }

    #[test]
    fn test_breakdowns_fan_out() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            breakdowns: vec![
                BreakdownEntry {
                    start: Some("2026-02-22T06:00".to_string()),
                    end: Some("2026-02-22T10:00".to_string()),
                    machines: vec!["VMC 1".to_string(), " VMC 2 ".to_string()],
                },
                BreakdownEntry {
                    start: Some("2026-02-22T10:00".to_string()),
                    end: Some("2026-02-22T09:00".to_string()),
                    machines: vec!["VMC 3".to_string()],
                },
            ],
            ..base_settings()
        });
        assert!(parsed.is_breakdown("VMC 1", dt(22, 6, 0)));
        assert!(parsed.is_breakdown("VMC 2", dt(22, 9, 59)));
        assert!(!parsed.is_breakdown("VMC 2", dt(22, 10, 0)));
        assert!(!parsed.breakdowns.contains_key("VMC 3"));
        assert!(!parsed.is_run_minute_allowed("VMC 1", dt(22, 7, 0)));
        assert!(parsed.is_run_minute_allowed("VMC 4", dt(22, 7, 0)));
    }

    #[test]
    fn test_setup_staff_join_run_pool() {
        let parsed = ParsedSettings::from_raw(&ScheduleSettings {
            personnel_profiles: vec![
                profile("Runner", "production", false),
                profile("Setter", "setup", false),
            ],
            ..base_settings()
        });
        let names = |pool: &[PersonnelSpec]| -> Vec<String> {
            pool.iter().map(|p| p.name.clone()).collect()
        };
        assert_eq!(names(parsed.run_pool()), vec!["Setter", "Runner"]);
        assert_eq!(names(parsed.setup_pool()), vec!["Setter"]);
    }
}
