//! Statistics Calculator Module
//! Descriptive statistics over the merged report record: mean, median, mode,
//! weighted mean and weighted median.

use crate::data::{DataProcessor, Report};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    #[error("No rows to compute {0} over")]
    EmptyInput(&'static str),
    #[error("Expected {categories} ambit weights, got {weights}")]
    WeightCount { categories: usize, weights: usize },
    #[error("{values} values but {weights} weights")]
    LengthMismatch { values: usize, weights: usize },
    #[error("Weight at row {0} is negative")]
    NegativeWeight(usize),
    #[error("Total weight is zero")]
    ZeroTotalWeight,
}

/// Row(s) designated by a median over an ordered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MedianRows {
    Single(usize),
    Pair(usize, usize),
}

impl MedianRows {
    pub fn indices(self) -> Vec<usize> {
        match self {
            MedianRows::Single(i) => vec![i],
            MedianRows::Pair(a, b) => vec![a, b],
        }
    }

    /// Pick the designated rows out of `rows`.
    pub fn select<T: Clone>(self, rows: &[T]) -> Vec<T> {
        self.indices()
            .into_iter()
            .filter_map(|i| rows.get(i).cloned())
            .collect()
    }
}

/// One ambit with its report count and configured weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
    pub weight: f64,
}

/// Ambit counts sorted by ambit, paired positionally with weights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryTable {
    pub rows: Vec<CategoryCount>,
}

impl CategoryTable {
    pub fn new(counts: &BTreeMap<String, usize>, weights: &[f64]) -> Result<Self, StatsError> {
        if counts.len() != weights.len() {
            return Err(StatsError::WeightCount {
                categories: counts.len(),
                weights: weights.len(),
            });
        }

        let rows = counts
            .iter()
            .zip(weights)
            .map(|((category, &count), &weight)| CategoryCount {
                category: category.clone(),
                count,
                weight,
            })
            .collect();

        Ok(Self { rows })
    }

    /// Same table without `category`; its weight goes with it.
    pub fn without(&self, category: &str) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| row.category != category)
                .cloned()
                .collect(),
        }
    }

    pub fn counts(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.count as f64).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.weight).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Statistics for one scope of the record.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeSummary {
    pub scope: String,
    pub report_count: usize,
    pub median: Vec<Report>,
    pub weighted_median: Vec<CategoryCount>,
    pub mode_ambit: Option<String>,
    pub mode_classification: Option<String>,
    pub mode_state: Option<String>,
    pub mean_count: Option<f64>,
    pub weighted_mean: Option<f64>,
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Sum of the values over the number of rows.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.mean())
    }

    /// Middle row of an ordered table of `len` rows, both middle rows when even.
    pub fn median(len: usize) -> Option<MedianRows> {
        match len {
            0 => None,
            n if n % 2 == 1 => Some(MedianRows::Single(n / 2)),
            n => Some(MedianRows::Pair(n / 2 - 1, n / 2)),
        }
    }

    /// Most frequent value. Ties go to the smallest value.
    pub fn mode<T, I>(values: I) -> Option<T>
    where
        T: Ord,
        I: IntoIterator<Item = T>,
    {
        let mut counts: BTreeMap<T, usize> = BTreeMap::new();
        for value in values {
            *counts.entry(value).or_insert(0) += 1;
        }

        let mut best: Option<(T, usize)> = None;
        for (value, count) in counts {
            match &best {
                Some((_, top)) if count <= *top => {}
                _ => best = Some((value, count)),
            }
        }
        best.map(|(value, _)| value)
    }

    /// Scan rows in order accumulating weight until reaching half the total.
    ///
    /// Landing exactly on half designates that row and the next one.
    pub fn weighted_median(weights: &[f64]) -> Result<MedianRows, StatsError> {
        if weights.is_empty() {
            return Err(StatsError::EmptyInput("weighted median"));
        }
        if let Some(i) = weights.iter().position(|w| *w < 0.0) {
            return Err(StatsError::NegativeWeight(i));
        }
        let total: f64 = weights.iter().sum();
        if total == 0.0 {
            return Err(StatsError::ZeroTotalWeight);
        }

        let last = weights.len() - 1;
        let mut acc = 0.0;
        for (i, w) in weights.iter().enumerate() {
            acc += w;
            if 2.0 * acc >= total {
                return Ok(if 2.0 * acc == total && i < last {
                    MedianRows::Pair(i, i + 1)
                } else {
                    MedianRows::Single(i)
                });
            }
        }

        Ok(MedianRows::Single(last))
    }

    /// Sum of value times weight over the total weight.
    pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64, StatsError> {
        if values.len() != weights.len() {
            return Err(StatsError::LengthMismatch {
                values: values.len(),
                weights: weights.len(),
            });
        }
        if values.is_empty() {
            return Err(StatsError::EmptyInput("weighted mean"));
        }

        let total: f64 = weights.iter().sum();
        if total == 0.0 {
            return Err(StatsError::ZeroTotalWeight);
        }
        let weighted: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
        Ok(weighted / total)
    }

    /// Compute every statistic for one scope.
    ///
    /// `reports` must be in chronological order; `table` holds the ambit counts.
    pub fn summarize(
        scope: &str,
        reports: &[Report],
        table: &CategoryTable,
    ) -> Result<ScopeSummary, StatsError> {
        let median = Self::median(reports.len())
            .map(|rows| rows.select(reports))
            .unwrap_or_default();

        let (weighted_median, weighted_mean) = if table.is_empty() {
            (Vec::new(), None)
        } else {
            let rows = Self::weighted_median(&table.weights())?.select(&table.rows);
            let mean = Self::weighted_mean(&table.counts(), &table.weights())?;
            (rows, Some(mean))
        };

        debug!(scope, reports = reports.len(), categories = table.rows.len(), "scope summarized");

        Ok(ScopeSummary {
            scope: scope.to_string(),
            report_count: reports.len(),
            median,
            weighted_median,
            mode_ambit: Self::mode(reports.iter().map(|r| r.ambit.clone())),
            mode_classification: Self::mode(reports.iter().map(|r| r.classification.clone())),
            mode_state: Self::mode(reports.iter().map(|r| r.state.clone())),
            mean_count: Self::mean(&table.counts()),
            weighted_mean,
        })
    }

    /// Summaries for all reports and for reports with a known ambit.
    pub fn compute_scopes(
        reports: &[Report],
        placeholder: &str,
        weights: &[f64],
    ) -> Result<Vec<ScopeSummary>, StatsError> {
        let counts = DataProcessor::count_by(reports, |r| r.ambit.clone());
        let table = CategoryTable::new(&counts, weights)?;
        let all = Self::summarize("all reports", reports, &table)?;

        let known = DataProcessor::without_placeholder(reports, placeholder);
        let known_table = table.without(placeholder);
        let without = Self::summarize(
            &format!("excluding ambit '{}'", placeholder),
            &known,
            &known_table,
        )?;

        Ok(vec![all, without])
    }
}
