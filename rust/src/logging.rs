//! Verbosity-gated diagnostics for a scheduling run.
//!
//! `ScheduleSettings::verbosity` picks how much of the search is written to
//! stderr. Each line is tagged with its level so interleaved output can be
//! filtered with grep:
//!
//! ```text
//! [commit]   PN-100/B01/OP1 on VMC 1: setup A [5] ...
//! [candidate]     VMC 2 / A / B: no conflict-free run window
//! [trace]       setup slot VMC 1 / A: 2026-02-22 06:00:00 (+60m)
//! ```
//!
//! Format arguments are only evaluated when the level is enabled.

pub const VERBOSITY_SILENT: u8 = 0;
/// Committed operations and batch splits
pub const VERBOSITY_COMMITS: u8 = 1;
/// Every evaluated candidate and the reason a triple was dropped
pub const VERBOSITY_CANDIDATES: u8 = 2;
/// Slot searches and run-conflict retries
pub const VERBOSITY_TRACE: u8 = 3;

/// Whether a message at `level` is written under `verbosity`.
#[inline]
pub fn enabled(verbosity: u8, level: u8) -> bool {
    level != VERBOSITY_SILENT && verbosity >= level
}

/// Short tag printed in front of every line at `level`.
pub fn level_tag(level: u8) -> &'static str {
    match level {
        VERBOSITY_COMMITS => "commit",
        VERBOSITY_CANDIDATES => "candidate",
        _ => "trace",
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($level:expr, $verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $level) {
            eprintln!("[{}] {}", $crate::logging::level_tag($level), format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_commits {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_COMMITS, $verbosity, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_candidates {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CANDIDATES, $verbosity, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_trace {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_TRACE, $verbosity, $($arg)*)
    };
}
