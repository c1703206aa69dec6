//! Chart Data Module
//! Aligns report counts into chart-ready series and computes chart geometry.

use crate::data::{Crosstab, DataProcessor, Report, ReportKind};
use plotters::style::RGBColor;
use std::f64::consts::TAU;

/// Series colors, in draw order
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),  // Blue
    RGBColor(255, 127, 14),  // Orange
    RGBColor(44, 160, 44),   // Green
    RGBColor(214, 39, 40),   // Red
    RGBColor(148, 103, 189), // Purple
    RGBColor(140, 86, 75),   // Brown
    RGBColor(227, 119, 194), // Pink
    RGBColor(127, 127, 127), // Gray
    RGBColor(188, 189, 34),  // Olive
    RGBColor(23, 190, 207),  // Cyan
];

/// Bottom-to-top stacking order of the bar chart.
pub const STACK_ORDER: [ReportKind; 3] = [ReportKind::Incident, ReportKind::Call, ReportKind::Attempt];

/// Everything the three charts draw.
#[derive(Debug, Clone)]
pub struct ChartData {
    /// Totals per kind, ordered attempts, calls, incidents
    pub kind_totals: Vec<(ReportKind, usize)>,
    /// Codes x kinds, zero-filled
    pub code_kinds: Crosstab<i32, ReportKind>,
    /// States x codes, zero-filled; placeholder-only codes excluded
    pub state_codes: Crosstab<String, i32>,
}

impl ChartData {
    pub fn from_reports(reports: &[Report], placeholder: &str) -> Self {
        let excluded = DataProcessor::placeholder_codes(reports, placeholder);
        let radar_codes: Vec<i32> = DataProcessor::codes(reports)
            .into_iter()
            .filter(|code| !excluded.contains(code))
            .collect();

        Self {
            kind_totals: DataProcessor::kind_totals(reports),
            code_kinds: DataProcessor::code_kind_crosstab(reports),
            state_codes: DataProcessor::state_code_crosstab(reports, &radar_codes),
        }
    }
}

/// One layer of the stacked bar chart: `(bottom, top)` per code.
#[derive(Debug, Clone, PartialEq)]
pub struct StackLayer {
    pub kind: ReportKind,
    pub spans: Vec<(usize, usize)>,
}

/// Layers in [`STACK_ORDER`], each starting where the previous ones end.
pub fn stack_layers(table: &Crosstab<i32, ReportKind>) -> Vec<StackLayer> {
    let mut base = vec![0usize; table.rows.len()];
    STACK_ORDER
        .iter()
        .map(|kind| {
            let values = table
                .columns
                .iter()
                .position(|k| k == kind)
                .map(|col| table.column_values(col))
                .unwrap_or_else(|| vec![0; table.rows.len()]);

            let spans = base
                .iter_mut()
                .zip(values)
                .map(|(bottom, value)| {
                    let span = (*bottom, *bottom + value);
                    *bottom += value;
                    span
                })
                .collect();

            StackLayer { kind: *kind, spans }
        })
        .collect()
}

/// Share of each value as `"12.34%"`; `None` for empty slices.
pub fn percent_labels(values: &[usize]) -> Vec<Option<String>> {
    let total: usize = values.iter().sum();
    values
        .iter()
        .map(|&v| {
            if v == 0 || total == 0 {
                None
            } else {
                Some(format!("{:.2}%", v as f64 * 100.0 / total as f64))
            }
        })
        .collect()
}

/// Screen position of a polar coordinate. Angle 0 points right, growing counter-clockwise.
pub fn polar_to_screen(center: (f64, f64), radius: f64, angle: f64) -> (f64, f64) {
    (
        center.0 + radius * angle.cos(),
        center.1 - radius * angle.sin(),
    )
}

pub fn to_pixel(point: (f64, f64)) -> (i32, i32) {
    (point.0.round() as i32, point.1.round() as i32)
}

/// Closed polygon approximating a pie wedge from `start` to `end` radians.
pub fn wedge_points(center: (f64, f64), radius: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start) / TAU) * 180.0).ceil().max(2.0) as usize;
    let mut points = Vec::with_capacity(steps + 2);
    points.push(to_pixel(center));
    for i in 0..=steps {
        let angle = start + (end - start) * i as f64 / steps as f64;
        points.push(to_pixel(polar_to_screen(center, radius, angle)));
    }
    points
}

/// Evenly spaced spoke angles, first spoke pointing right.
pub fn radar_angles(n: usize) -> Vec<f64> {
    (0..n).map(|i| TAU * i as f64 / n as f64).collect()
}

/// Split a polyline into dash segments of `dash` length separated by `gap`.
pub fn dash_segments(points: &[(f64, f64)], dash: f64, gap: f64) -> Vec<[(f64, f64); 2]> {
    let period = dash + gap;
    let mut segments = Vec::new();
    // Distance along the pattern, carried across polyline vertices.
    let mut phase = 0.0;

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        if length == 0.0 {
            continue;
        }
        let at = |t: f64| (a.0 + (b.0 - a.0) * t / length, a.1 + (b.1 - a.1) * t / length);

        let mut t = 0.0;
        while t < length {
            let in_period = phase % period;
            if in_period < dash {
                let end = (t + dash - in_period).min(length);
                segments.push([at(t), at(end)]);
                phase += end - t;
                t = end;
            } else {
                let end = (t + period - in_period).min(length);
                phase += end - t;
                t = end;
            }
        }
    }

    segments
}

/// Round axis step giving about `target_steps` ticks over `range`.
pub fn nice_step(range: f64, target_steps: usize) -> f64 {
    if range <= 0.0 {
        return 1.0;
    }
    let raw_step = range / target_steps as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;

    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };

    nice * magnitude
}
