//! CSV Data Loader Module
//! Reads the incident and call-log datasets with Polars and normalizes missing values.

use crate::data::{Report, ReportKind};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV {path}: {source}")]
    Read { path: PathBuf, source: PolarsError },
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("{dataset}: missing required column '{column}'")]
    MissingColumn { dataset: String, column: String },
    #[error("{dataset} row {row}: cannot parse timestamp {value:?}")]
    InvalidTimestamp {
        dataset: String,
        row: usize,
        value: String,
    },
    #[error("{dataset} row {row}: invalid value {value:?} in column '{column}'")]
    InvalidValue {
        dataset: String,
        row: usize,
        column: String,
        value: String,
    },
}

/// Values of one column after missing-value normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Text(Vec<String>),
    Int(Vec<i32>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Int(v) => v.len(),
        }
    }
}

/// Column-major table with nulls already replaced.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    columns: Vec<(String, ColumnValues)>,
    height: usize,
}

impl RawTable {
    pub fn new(columns: Vec<(String, ColumnValues)>) -> Self {
        let height = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        Self { columns, height }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, values)| values)
    }
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    separator: u8,
    placeholder: String,
    date_format: String,
}

impl DataLoader {
    pub fn new(separator: u8, placeholder: &str, date_format: &str) -> Self {
        Self {
            separator,
            placeholder: placeholder.to_string(),
            date_format: date_format.to_string(),
        }
    }

    /// Load a CSV file, fill missing values and drop the `id` column.
    ///
    /// Text columns get the placeholder, numeric columns get 0 and become i32.
    pub fn load_table(&self, path: &Path) -> Result<RawTable, LoaderError> {
        let df = LazyCsvReader::new(path)
            .with_separator(self.separator)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|source| LoaderError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        self.normalize(&df)
    }

    /// Replace nulls column by column.
    pub fn normalize(&self, df: &DataFrame) -> Result<RawTable, LoaderError> {
        let mut columns = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == "id" {
                continue;
            }

            let values = if is_numeric(column.dtype()) {
                let ints = column.cast(&DataType::Int32)?;
                ColumnValues::Int(ints.i32()?.into_iter().map(|v| v.unwrap_or(0)).collect())
            } else {
                let text = column.cast(&DataType::String)?;
                ColumnValues::Text(
                    text.str()?
                        .into_iter()
                        .map(|v| match v {
                            Some(s) => s.to_string(),
                            None => self.placeholder.clone(),
                        })
                        .collect(),
                )
            };
            columns.push((name, values));
        }

        Ok(RawTable::new(columns))
    }

    /// Load the incident dataset. Every row is a [`ReportKind::Incident`].
    pub fn load_incidents(&self, path: &Path) -> Result<Vec<Report>, LoaderError> {
        let table = self.load_table(path)?;
        self.incidents(&table, &path.display().to_string())
    }

    /// Load the call-log dataset, mapping `tipo` to attempts and calls.
    pub fn load_call_logs(&self, path: &Path) -> Result<Vec<Report>, LoaderError> {
        let table = self.load_table(path)?;
        self.call_logs(&table, &path.display().to_string())
    }

    pub fn incidents(&self, table: &RawTable, dataset: &str) -> Result<Vec<Report>, LoaderError> {
        let kinds = vec![ReportKind::Incident; table.height()];
        self.build_reports(table, dataset, &kinds)
    }

    pub fn call_logs(&self, table: &RawTable, dataset: &str) -> Result<Vec<Report>, LoaderError> {
        let flags = self.text_column(table, "tipo").ok_or_else(|| LoaderError::MissingColumn {
            dataset: dataset.to_string(),
            column: "tipo".to_string(),
        })?;

        let kinds = flags
            .iter()
            .enumerate()
            .map(|(i, flag)| {
                ReportKind::from_call_flag(flag).ok_or_else(|| LoaderError::InvalidValue {
                    dataset: dataset.to_string(),
                    row: i + 1,
                    column: "tipo".to_string(),
                    value: flag.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.build_reports(table, dataset, &kinds)
    }

    fn build_reports(
        &self,
        table: &RawTable,
        dataset: &str,
        kinds: &[ReportKind],
    ) -> Result<Vec<Report>, LoaderError> {
        let height = table.height();
        if height == 0 {
            warn!(dataset, "dataset has no rows");
        }

        let dates = self.text_column(table, "fecha").ok_or_else(|| LoaderError::MissingColumn {
            dataset: dataset.to_string(),
            column: "fecha".to_string(),
        })?;
        let ambits = self.text_or_placeholder(table, "ambito", height);
        let classifications = self.text_or_placeholder(table, "clasificacion", height);
        let states = self.text_or_placeholder(table, "estado", height);
        let codes = self.int_column(table, "codigo", dataset)?;

        let mut reports = Vec::with_capacity(height);
        for (i, date) in dates.iter().enumerate() {
            let timestamp = NaiveDateTime::parse_from_str(date.trim(), &self.date_format)
                .map_err(|_| LoaderError::InvalidTimestamp {
                    dataset: dataset.to_string(),
                    row: i + 1,
                    value: date.clone(),
                })?;

            reports.push(Report {
                timestamp,
                ambit: ambits[i].clone(),
                classification: classifications[i].clone(),
                state: states[i].clone(),
                code: codes.as_ref().map(|c| c[i]).unwrap_or(0),
                kind: kinds[i],
            });
        }

        debug!(dataset, rows = reports.len(), "reports loaded");
        Ok(reports)
    }

    /// Column as text; integer columns are rendered as decimal strings.
    fn text_column(&self, table: &RawTable, name: &str) -> Option<Vec<String>> {
        table.column(name).map(|values| match values {
            ColumnValues::Text(v) => v.clone(),
            ColumnValues::Int(v) => v.iter().map(|n| n.to_string()).collect(),
        })
    }

    fn text_or_placeholder(&self, table: &RawTable, name: &str, height: usize) -> Vec<String> {
        self.text_column(table, name)
            .unwrap_or_else(|| vec![self.placeholder.clone(); height])
    }

    fn int_column(
        &self,
        table: &RawTable,
        name: &str,
        dataset: &str,
    ) -> Result<Option<Vec<i32>>, LoaderError> {
        match table.column(name) {
            None => Ok(None),
            Some(ColumnValues::Int(v)) => Ok(Some(v.clone())),
            Some(ColumnValues::Text(v)) => v
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if s == &self.placeholder {
                        return Ok(0);
                    }
                    s.trim().parse::<i32>().map_err(|_| LoaderError::InvalidValue {
                        dataset: dataset.to_string(),
                        row: i + 1,
                        column: name.to_string(),
                        value: s.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
        }
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}
