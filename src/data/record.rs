//! Report Record Module
//! Normalized rows shared by the incident and call-log datasets.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Timestamp layout of the console report, independent of the input format.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Origin of a report. The numeric code orders the kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ReportKind {
    /// Call log entry that never connected (`tipo = f`)
    Attempt = 0,
    /// Completed call log entry (`tipo = t`)
    Call = 1,
    /// Row of the incident dataset
    Incident = 2,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Attempt, ReportKind::Call, ReportKind::Incident];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            ReportKind::Attempt => "Attempts",
            ReportKind::Call => "Calls",
            ReportKind::Incident => "Incidents",
        }
    }

    /// Map the call-log `tipo` flag.
    pub fn from_call_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_ascii_lowercase().as_str() {
            "t" | "true" => Some(ReportKind::Call),
            "f" | "false" => Some(ReportKind::Attempt),
            _ => None,
        }
    }
}

/// One normalized report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub timestamp: NaiveDateTime,
    pub ambit: String,
    pub classification: String,
    pub state: String,
    pub code: i32,
    pub kind: ReportKind,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {} | {} | {}",
            self.timestamp.format(DISPLAY_TIMESTAMP_FORMAT),
            self.ambit,
            self.classification,
            self.state,
            self.code,
            self.kind.code()
        )
    }
}
