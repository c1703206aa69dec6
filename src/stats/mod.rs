//! Stats module - descriptive statistics and report output

mod calculator;
mod report;

pub use calculator::{CategoryCount, ScopeSummary, StatsCalculator};
pub use report::{ReportPrinter, SummaryDocument};
