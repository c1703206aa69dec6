//! Data Processor Module
//! Merges the datasets and reshapes them into counts and zero-filled crosstabs.

use crate::data::{Report, ReportKind};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Count matrix over every (row, column) label pair, missing pairs zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Crosstab<R, C> {
    pub rows: Vec<R>,
    pub columns: Vec<C>,
    counts: Vec<Vec<usize>>,
}

impl<R: Ord, C: Ord> Crosstab<R, C> {
    /// Count `pairs` on the full `rows` x `columns` grid.
    ///
    /// Pairs whose labels are not on the grid are ignored.
    pub fn reindex(pairs: impl IntoIterator<Item = (R, C)>, rows: Vec<R>, columns: Vec<C>) -> Self {
        let mut counts = vec![vec![0usize; columns.len()]; rows.len()];
        for (r, c) in pairs {
            if let (Some(ri), Some(ci)) = (
                rows.iter().position(|x| *x == r),
                columns.iter().position(|x| *x == c),
            ) {
                counts[ri][ci] += 1;
            }
        }
        Self {
            rows,
            columns,
            counts,
        }
    }

    pub fn get(&self, row: usize, column: usize) -> usize {
        self.counts[row][column]
    }

    /// Counts of one column, in row order.
    pub fn column_values(&self, column: usize) -> Vec<usize> {
        (0..self.rows.len()).map(|row| self.get(row, column)).collect()
    }

    pub fn max(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// Handles merging and reshaping of report rows.
pub struct DataProcessor;

impl DataProcessor {
    /// Concatenate incidents and call logs, oldest report first.
    ///
    /// The sort is stable, so reports sharing a timestamp keep dataset order.
    pub fn merge(incidents: Vec<Report>, calls: Vec<Report>) -> Vec<Report> {
        let mut merged = incidents;
        merged.extend(calls);
        merged.sort_by_key(|r| r.timestamp);
        merged
    }

    /// Value counts keyed by `key`, sorted by key.
    pub fn count_by<K, F>(reports: &[Report], key: F) -> BTreeMap<K, usize>
    where
        K: Ord,
        F: Fn(&Report) -> K,
    {
        let mut counts = BTreeMap::new();
        for report in reports {
            *counts.entry(key(report)).or_insert(0) += 1;
        }
        counts
    }

    /// Drop reports whose ambit is the missing-value placeholder.
    pub fn without_placeholder(reports: &[Report], placeholder: &str) -> Vec<Report> {
        reports
            .iter()
            .filter(|r| r.ambit != placeholder)
            .cloned()
            .collect()
    }

    /// Totals per report kind, ordered attempts, calls, incidents.
    pub fn kind_totals(reports: &[Report]) -> Vec<(ReportKind, usize)> {
        let counts = Self::count_by(reports, |r| r.kind);
        ReportKind::ALL
            .iter()
            .map(|kind| (*kind, counts.get(kind).copied().unwrap_or(0)))
            .collect()
    }

    /// Sorted distinct ambit codes.
    pub fn codes(reports: &[Report]) -> Vec<i32> {
        reports
            .iter()
            .map(|r| r.code)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Codes that only ever appear on placeholder-ambit reports.
    pub fn placeholder_codes(reports: &[Report], placeholder: &str) -> BTreeSet<i32> {
        let mut only_placeholder: BTreeMap<i32, bool> = BTreeMap::new();
        for report in reports {
            let entry = only_placeholder.entry(report.code).or_insert(true);
            *entry &= report.ambit == placeholder;
        }
        only_placeholder
            .into_iter()
            .filter_map(|(code, only)| only.then_some(code))
            .collect()
    }

    /// Reports per (code, kind), every code paired with every kind.
    pub fn code_kind_crosstab(reports: &[Report]) -> Crosstab<i32, ReportKind> {
        Crosstab::reindex(
            reports.iter().map(|r| (r.code, r.kind)),
            Self::codes(reports),
            ReportKind::ALL.to_vec(),
        )
    }

    /// Reports per (state, code) for the given codes, states sorted.
    pub fn state_code_crosstab(reports: &[Report], codes: &[i32]) -> Crosstab<String, i32> {
        let states: Vec<String> = reports
            .iter()
            .map(|r| r.state.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Crosstab::reindex(
            reports.iter().map(|r| (r.state.clone(), r.code)),
            states,
            codes.to_vec(),
        )
    }

    /// Build the unified record as a DataFrame with the source column names.
    ///
    /// Timestamps are written with `date_format`, the format they were parsed with.
    pub fn to_dataframe(reports: &[Report], date_format: &str) -> Result<DataFrame, ProcessorError> {
        let dates: Vec<String> = reports
            .iter()
            .map(|r| r.timestamp.format(date_format).to_string())
            .collect();
        let ambits: Vec<&str> = reports.iter().map(|r| r.ambit.as_str()).collect();
        let classifications: Vec<&str> =
            reports.iter().map(|r| r.classification.as_str()).collect();
        let states: Vec<&str> = reports.iter().map(|r| r.state.as_str()).collect();
        let codes: Vec<i32> = reports.iter().map(|r| r.code).collect();
        let kinds: Vec<i32> = reports.iter().map(|r| r.kind.code()).collect();

        let df = DataFrame::new(vec![
            Column::new("fecha".into(), dates),
            Column::new("ambito".into(), ambits),
            Column::new("clasificacion".into(), classifications),
            Column::new("estado".into(), states),
            Column::new("codigo".into(), codes),
            Column::new("tipo".into(), kinds),
        ])?;

        Ok(df)
    }

    /// Write the unified chronological record as CSV.
    pub fn export_merged(
        reports: &[Report],
        path: &Path,
        separator: u8,
        date_format: &str,
    ) -> Result<(), ProcessorError> {
        let mut df = Self::to_dataframe(reports, date_format)?;
        let mut file = File::create(path).map_err(|source| ProcessorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(separator)
            .finish(&mut df)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn report(ts: &str, ambit: &str, state: &str, code: i32, kind: ReportKind) -> Report {
        Report {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            ambit: ambit.to_string(),
            classification: "A".to_string(),
            state: state.to_string(),
            code,
            kind,
        }
    }

    fn sample() -> Vec<Report> {
        vec![
            report("2021-01-03 00:00:00", "Salud", "Lara", 2, ReportKind::Incident),
            report("2021-01-01 00:00:00", "Agua", "Zulia", 1, ReportKind::Call),
            report("2021-01-02 00:00:00", "Sin datos", "Lara", 0, ReportKind::Attempt),
            report("2021-01-04 00:00:00", "Salud", "Zulia", 2, ReportKind::Call),
        ]
    }

    #[test]
    fn merge_sorts_oldest_first_and_keeps_ties_stable() {
        let incidents = vec![
            report("2021-01-02 00:00:00", "Salud", "Lara", 2, ReportKind::Incident),
            report("2021-01-01 00:00:00", "Agua", "Lara", 1, ReportKind::Incident),
        ];
        let calls = vec![report("2021-01-02 00:00:00", "Agua", "Zulia", 1, ReportKind::Call)];

        let merged = DataProcessor::merge(incidents, calls);
        let kinds: Vec<(String, ReportKind)> =
            merged.iter().map(|r| (r.ambit.clone(), r.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("Agua".to_string(), ReportKind::Incident),
                ("Salud".to_string(), ReportKind::Incident),
                ("Agua".to_string(), ReportKind::Call),
            ]
        );
    }

    #[test]
    fn counts_are_sorted_by_key() {
        let counts = DataProcessor::count_by(&sample(), |r| r.ambit.clone());
        let pairs: Vec<(String, usize)> = counts.into_iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Agua".to_string(), 1),
                ("Salud".to_string(), 2),
                ("Sin datos".to_string(), 1),
            ]
        );
    }

    #[test]
    fn kind_totals_include_absent_kinds() {
        let only_calls = vec![report("2021-01-01 00:00:00", "Agua", "Zulia", 1, ReportKind::Call)];
        assert_eq!(
            DataProcessor::kind_totals(&only_calls),
            vec![
                (ReportKind::Attempt, 0),
                (ReportKind::Call, 1),
                (ReportKind::Incident, 0),
            ]
        );
    }

    #[test]
    fn code_kind_crosstab_fills_missing_pairs_with_zero() {
        let table = DataProcessor::code_kind_crosstab(&sample());
        assert_eq!(table.rows, vec![0, 1, 2]);
        assert_eq!(table.columns, ReportKind::ALL.to_vec());
        assert_eq!(table.column_values(2), vec![0, 0, 1]);
        assert_eq!(table.column_values(1), vec![0, 1, 1]);
        assert_eq!(table.column_values(0), vec![1, 0, 0]);
        assert_eq!(table.max(), 1);
    }

    #[test]
    fn state_code_crosstab_uses_only_requested_codes() {
        let table = DataProcessor::state_code_crosstab(&sample(), &[1, 2]);
        assert_eq!(table.rows, vec!["Lara".to_string(), "Zulia".to_string()]);
        assert_eq!(table.get(0, 0), 0);
        assert_eq!(table.get(0, 1), 1);
        assert_eq!(table.get(1, 0), 1);
        assert_eq!(table.get(1, 1), 1);
    }

    #[test]
    fn placeholder_codes_and_filtering() {
        let mut reports = sample();
        reports.push(report("2021-01-05 00:00:00", "Sin datos", "Lara", 2, ReportKind::Call));

        let codes = DataProcessor::placeholder_codes(&reports, "Sin datos");
        assert_eq!(codes.into_iter().collect::<Vec<_>>(), vec![0]);

        let kept = DataProcessor::without_placeholder(&reports, "Sin datos");
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.ambit != "Sin datos"));
    }

    #[test]
    fn export_writes_merged_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        let merged = DataProcessor::merge(sample(), Vec::new());

        DataProcessor::export_merged(&merged, &path, b';', "%Y-%m-%d %H:%M:%S").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("fecha;ambito;clasificacion;estado;codigo;tipo")
        );
        assert_eq!(lines.next(), Some("2021-01-01 00:00:00;Agua;A;Zulia;1;1"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn export_keeps_configured_date_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        let merged = DataProcessor::merge(sample(), Vec::new());

        DataProcessor::export_merged(&merged, &path, b',', "%d/%m/%Y %H:%M").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().nth(1), Some("01/01/2021 00:00,Agua,A,Zulia,1,1"));
    }

    #[test]
    fn export_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("merged.csv");

        match DataProcessor::export_merged(&sample(), &path, b';', "%Y-%m-%d %H:%M:%S") {
            Err(ProcessorError::Io { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected an io error, got {:?}", other),
        }
    }
}
