//! Static Chart Renderer
//! Writes the three summary charts as PNG files.
//!
//! Charts:
//! 1. Pie: share of attempts, calls and incidents
//! 2. Stacked bar: reports per ambit code, split by kind
//! 3. Radar: reports per state, one dashed line per ambit code

use crate::charts::plotter::{
    dash_segments, nice_step, percent_labels, polar_to_screen, radar_angles, stack_layers,
    to_pixel, wedge_points, ChartData, PALETTE, STACK_ORDER,
};
use crate::data::{Crosstab, ReportKind};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PIE_FILE: &str = "pie_reportes.png";
pub const BAR_FILE: &str = "bar_ambitos.png";
pub const RADAR_FILE: &str = "radar_estados.png";

const FONT: &str = "sans-serif";
const GRID: RGBColor = RGBColor(200, 200, 200);

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render every chart into `out_dir`, creating it when missing.
    pub fn render_all(data: &ChartData, out_dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
        fs::create_dir_all(out_dir)?;

        let pie = out_dir.join(PIE_FILE);
        Self::render_pie(&data.kind_totals, &pie)?;
        info!(path = %pie.display(), "pie chart written");

        let bar = out_dir.join(BAR_FILE);
        Self::render_stacked_bar(&data.code_kinds, &bar)?;
        info!(path = %bar.display(), "stacked bar chart written");

        let radar = out_dir.join(RADAR_FILE);
        Self::render_radar(&data.state_codes, &radar)?;
        info!(path = %radar.display(), "radar chart written");

        Ok(vec![pie, bar, radar])
    }

    /// Pie of report totals per kind, each wedge labelled with its share.
    pub fn render_pie(totals: &[(ReportKind, usize)], path: &Path) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled("Report distribution", (FONT, 26))?;

        let (w, h) = root.dim_in_pixel();
        let center = (w as f64 / 2.0, h as f64 / 2.0);
        let radius = w.min(h) as f64 * 0.36;

        let counts: Vec<usize> = totals.iter().map(|(_, count)| *count).collect();
        let total: usize = counts.iter().sum();
        let labels = percent_labels(&counts);
        let centered = Pos::new(HPos::Center, VPos::Center);
        let label_style = TextStyle::from((FONT, 20).into_font()).pos(centered);
        let pct_style = TextStyle::from((FONT, 18).into_font()).pos(centered);

        let mut start = 0.0;
        for (i, ((kind, count), pct)) in totals.iter().zip(labels).enumerate() {
            let Some(pct) = pct else {
                continue;
            };
            let sweep = std::f64::consts::TAU * *count as f64 / total as f64;
            let end = start + sweep;
            let mid = start + sweep / 2.0;
            let color = PALETTE[i % PALETTE.len()];

            let wedge = wedge_points(center, radius, start, end);
            root.draw(&Polygon::new(wedge.clone(), color.filled()))?;
            let mut outline = wedge;
            if let Some(first) = outline.first().copied() {
                outline.push(first);
            }
            root.draw(&PathElement::new(outline, WHITE.stroke_width(2)))?;

            root.draw(&Text::new(
                kind.label(),
                to_pixel(polar_to_screen(center, radius * 1.15, mid)),
                label_style.clone(),
            ))?;
            root.draw(&Text::new(
                pct,
                to_pixel(polar_to_screen(center, radius * 0.6, mid)),
                pct_style.clone(),
            ))?;

            start = end;
        }

        root.present()?;
        Ok(())
    }

    /// Stacked bars per code: incidents at the base, then calls, then attempts.
    pub fn render_stacked_bar(
        table: &Crosstab<i32, ReportKind>,
        path: &Path,
    ) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
        root.fill(&WHITE)?;

        let layers = stack_layers(table);
        let n = table.rows.len();
        let tallest = layers
            .last()
            .and_then(|layer| layer.spans.iter().map(|(_, top)| *top).max())
            .unwrap_or(0)
            .max(1);

        let mut chart = ChartBuilder::on(&root)
            .caption("Ambit distribution by report", (FONT, 26))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5f64..(n.max(1) as f64 - 0.5), 0f64..tallest as f64 * 1.1)?;

        let codes = &table.rows;
        let code_label = |x: &f64| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            codes
                .get(idx as usize)
                .map(|code| code.to_string())
                .unwrap_or_default()
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.max(1))
            .x_label_formatter(&code_label)
            .x_desc("Codes by ambit")
            .y_desc("Total reports")
            .draw()?;

        let half_width = 0.25;
        for (layer, kind) in layers.iter().zip(STACK_ORDER) {
            let color = PALETTE[kind.code() as usize % PALETTE.len()];
            let bars: Vec<Rectangle<(f64, f64)>> = layer
                .spans
                .iter()
                .enumerate()
                .filter(|(_, (bottom, top))| top > bottom)
                .map(|(i, (bottom, top))| {
                    let x = i as f64;
                    Rectangle::new(
                        [(x - half_width, *bottom as f64), (x + half_width, *top as f64)],
                        color.filled(),
                    )
                })
                .collect();

            chart
                .draw_series(bars)?
                .label(kind.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }

    /// Radar with one spoke per state and one dashed closed line per code.
    pub fn render_radar(table: &Crosstab<String, i32>, path: &Path) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, (1000, 1000)).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled("Ambit distribution by state", (FONT, 26))?;

        let (w, h) = root.dim_in_pixel();
        let center = (w as f64 * 0.45, h as f64 / 2.0);
        let radius = w.min(h) as f64 * 0.36;
        let angles = radar_angles(table.rows.len());

        let peak = table.max().max(1) as f64;
        let step = nice_step(peak, 5);
        let top = (peak / step).ceil() * step;

        let small = TextStyle::from((FONT, 14).into_font());
        let centered = TextStyle::from((FONT, 16).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));

        // Rings with their value labels
        let mut ring = step;
        while ring <= top + step * 1e-9 {
            let r = radius * ring / top;
            root.draw(&Circle::new(to_pixel(center), r.round() as i32, GRID.stroke_width(1)))?;
            root.draw(&Text::new(
                format!("{}", ring),
                to_pixel(polar_to_screen(center, r, std::f64::consts::PI / 8.0)),
                small.clone(),
            ))?;
            ring += step;
        }

        // Spokes and state labels
        for (state, angle) in table.rows.iter().zip(&angles) {
            root.draw(&PathElement::new(
                vec![to_pixel(center), to_pixel(polar_to_screen(center, radius, *angle))],
                GRID.stroke_width(1),
            ))?;
            root.draw(&Text::new(
                state.as_str(),
                to_pixel(polar_to_screen(center, radius * 1.1, *angle)),
                centered.clone(),
            ))?;
        }

        // One closed dashed line per code
        let legend_x = (w as f64 * 0.86) as i32;
        let mut legend_y = (h as f64 * 0.08) as i32;
        root.draw(&Text::new("Ambits", (legend_x, legend_y), small.clone()))?;
        legend_y += 24;

        for (ci, code) in table.columns.iter().enumerate() {
            let color = PALETTE[ci % PALETTE.len()];
            let values = table.column_values(ci);

            let mut points: Vec<(f64, f64)> = values
                .iter()
                .zip(&angles)
                .map(|(v, angle)| polar_to_screen(center, radius * *v as f64 / top, *angle))
                .collect();
            if let Some(first) = points.first().copied() {
                points.push(first);
            }

            for [a, b] in dash_segments(&points, 10.0, 6.0) {
                root.draw(&PathElement::new(
                    vec![to_pixel(a), to_pixel(b)],
                    color.stroke_width(2),
                ))?;
            }

            for [a, b] in dash_segments(
                &[(legend_x as f64, legend_y as f64), (legend_x as f64 + 30.0, legend_y as f64)],
                10.0,
                6.0,
            ) {
                root.draw(&PathElement::new(
                    vec![to_pixel(a), to_pixel(b)],
                    color.stroke_width(2),
                ))?;
            }
            root.draw(&Text::new(
                code.to_string(),
                (legend_x + 38, legend_y - 7),
                small.clone(),
            ))?;
            legend_y += 22;
        }

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Report;
    use chrono::NaiveDateTime;

    fn report(ambit: &str, state: &str, code: i32, kind: ReportKind) -> Report {
        Report {
            timestamp: NaiveDateTime::parse_from_str("2021-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            ambit: ambit.to_string(),
            classification: "A".to_string(),
            state: state.to_string(),
            code,
            kind,
        }
    }

    fn assert_charts_written(paths: &[PathBuf], out_dir: &Path) {
        let names: Vec<&str> = paths
            .iter()
            .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap())
            .collect();
        assert_eq!(names, vec![PIE_FILE, BAR_FILE, RADAR_FILE]);

        for path in paths {
            assert_eq!(path.parent(), Some(out_dir));
            let size = fs::metadata(path).unwrap().len();
            assert!(size > 0, "{} is empty", path.display());
        }
    }

    #[test]
    fn render_all_creates_output_dir_and_three_charts() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("plots");
        assert!(!out_dir.exists());

        let reports = vec![
            report("Sin datos", "Lara", 0, ReportKind::Attempt),
            report("Agua", "Lara", 1, ReportKind::Call),
            report("Salud", "Zulia", 2, ReportKind::Incident),
            report("Salud", "Falcon", 2, ReportKind::Call),
        ];
        let data = ChartData::from_reports(&reports, "Sin datos");

        let paths = StaticChartRenderer::render_all(&data, &out_dir).unwrap();

        assert!(out_dir.is_dir());
        assert_charts_written(&paths, &out_dir);
    }

    #[test]
    fn render_all_with_one_kind_and_one_code() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("plots");

        let reports = vec![
            report("Salud", "Lara", 3, ReportKind::Incident),
            report("Salud", "Zulia", 3, ReportKind::Incident),
        ];
        let data = ChartData::from_reports(&reports, "Sin datos");
        assert_eq!(data.code_kinds.rows, vec![3]);

        let paths = StaticChartRenderer::render_all(&data, &out_dir).unwrap();

        assert_charts_written(&paths, &out_dir);
    }

    #[test]
    fn render_all_with_empty_radar() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("plots");

        // Every code only appears on placeholder rows, so the radar has no lines
        let reports = vec![
            report("Sin datos", "Lara", 0, ReportKind::Attempt),
            report("Sin datos", "Zulia", 0, ReportKind::Call),
        ];
        let data = ChartData::from_reports(&reports, "Sin datos");
        assert!(data.state_codes.columns.is_empty());

        let paths = StaticChartRenderer::render_all(&data, &out_dir).unwrap();

        assert_charts_written(&paths, &out_dir);
    }
}
