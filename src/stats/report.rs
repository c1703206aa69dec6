//! Statistics report output: console text and JSON summary.

use crate::stats::{CategoryCount, ScopeSummary};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Column header printed above median report rows.
const REPORT_HEADER: &str = "fecha | ambito | clasificacion | estado | codigo | tipo";

/// Everything the run computed, as exported to JSON.
#[derive(Debug, Serialize)]
pub struct SummaryDocument<'a> {
    pub total_reports: usize,
    pub placeholder: &'a str,
    pub scopes: &'a [ScopeSummary],
}

/// Renders scope summaries for the console.
pub struct ReportPrinter;

impl ReportPrinter {
    pub fn render(scopes: &[ScopeSummary]) -> Result<String, fmt::Error> {
        let mut out = String::new();
        for scope in scopes {
            Self::write_scope(&mut out, scope)?;
            out.push('\n');
        }
        Ok(out)
    }

    fn write_scope(out: &mut String, scope: &ScopeSummary) -> fmt::Result {
        let label = &scope.scope;
        writeln!(out, "== Statistics ({}, {} reports) ==", label, scope.report_count)?;

        writeln!(out, "Median ({}):", label)?;
        if scope.median.is_empty() {
            writeln!(out, "  -")?;
        } else {
            writeln!(out, "  {}", REPORT_HEADER)?;
            for report in &scope.median {
                writeln!(out, "  {}", report)?;
            }
        }

        writeln!(out, "Weighted median ({}, by ambit weight):", label)?;
        Self::write_categories(out, &scope.weighted_median)?;

        writeln!(out, "Mode (ambit, {}): {}", label, Self::or_dash(&scope.mode_ambit))?;
        writeln!(
            out,
            "Mode (classification, {}): {}",
            label,
            Self::or_dash(&scope.mode_classification)
        )?;
        writeln!(out, "Mode (state, {}): {}", label, Self::or_dash(&scope.mode_state))?;
        writeln!(out, "Mean (ambit count, {}): {}", label, Self::number(scope.mean_count))?;
        writeln!(out, "Weighted mean ({}): {}", label, Self::number(scope.weighted_mean))?;
        Ok(())
    }

    fn write_categories(out: &mut String, rows: &[CategoryCount]) -> fmt::Result {
        if rows.is_empty() {
            return writeln!(out, "  -");
        }
        writeln!(out, "  {:<24} {:>8} {:>8}", "ambito", "cantidad", "peso")?;
        for row in rows {
            writeln!(out, "  {:<24} {:>8} {:>8}", row.category, row.count, row.weight)?;
        }
        Ok(())
    }

    fn or_dash(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or("-")
    }

    fn number(value: Option<f64>) -> String {
        value
            .map(|v| format!("{:.6}", v))
            .unwrap_or_else(|| "-".to_string())
    }

    /// Write the pretty-printed JSON summary.
    pub fn write_json(path: &Path, document: &SummaryDocument<'_>) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(document)?;
        fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Report, ReportKind};
    use chrono::NaiveDateTime;

    fn scope() -> ScopeSummary {
        ScopeSummary {
            scope: "all reports".to_string(),
            report_count: 3,
            median: vec![Report {
                timestamp: NaiveDateTime::parse_from_str(
                    "2021-05-01 08:15:00",
                    "%Y-%m-%d %H:%M:%S",
                )
                .unwrap(),
                ambit: "Salud".to_string(),
                classification: "Denuncia".to_string(),
                state: "Lara".to_string(),
                code: 4,
                kind: ReportKind::Call,
            }],
            weighted_median: vec![CategoryCount {
                category: "Salud".to_string(),
                count: 2,
                weight: 6.0,
            }],
            mode_ambit: Some("Salud".to_string()),
            mode_classification: Some("Denuncia".to_string()),
            mode_state: None,
            mean_count: Some(1.5),
            weighted_mean: None,
        }
    }

    #[test]
    fn console_report_lists_every_statistic() {
        let text = ReportPrinter::render(&[scope()]).unwrap();

        assert!(text.contains("== Statistics (all reports, 3 reports) =="));
        assert!(text.contains("2021-05-01 08:15:00 | Salud | Denuncia | Lara | 4 | 1"));
        assert!(text.contains("Mode (ambit, all reports): Salud"));
        assert!(text.contains("Mode (state, all reports): -"));
        assert!(text.contains("Mean (ambit count, all reports): 1.500000"));
        assert!(text.contains("Weighted mean (all reports): -"));
        assert!(text
            .lines()
            .any(|line| line.trim_start().starts_with("Salud") && line.ends_with('6')));
    }

    #[test]
    fn json_summary_round_trips_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let scopes = [scope()];
        let document = SummaryDocument {
            total_reports: 3,
            placeholder: "Sin datos",
            scopes: &scopes,
        };

        ReportPrinter::write_json(&path, &document).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_reports"], 3);
        assert_eq!(value["scopes"][0]["mode_ambit"], "Salud");
        assert_eq!(value["scopes"][0]["median"][0]["kind"], "Call");
        assert!(value["scopes"][0]["weighted_mean"].is_null());
    }

    #[test]
    fn json_summary_write_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("summary.json");
        let document = SummaryDocument {
            total_reports: 0,
            placeholder: "Sin datos",
            scopes: &[],
        };

        match ReportPrinter::write_json(&path, &document) {
            Err(ReportError::Io { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected an io error, got {:?}", other),
        }
    }
}
