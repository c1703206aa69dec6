//! Report Insight - Incident & Call-Log CSV Analysis
//!
//! Merges the incident and call-log datasets into one chronological record,
//! prints descriptive statistics and renders summary charts.

mod charts;
mod config;
mod data;
mod stats;

use anyhow::{Context, Result};
use charts::{ChartData, StaticChartRenderer};
use clap::Parser;
use config::{AnalysisConfig, Cli};
use data::{DataLoader, DataProcessor};
use stats::{ReportPrinter, StatsCalculator, SummaryDocument};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AnalysisConfig::resolve(&cli).context("Invalid configuration")?;
    run(&config)
}

fn run(config: &AnalysisConfig) -> Result<()> {
    let loader = DataLoader::new(
        config.separator_byte()?,
        &config.placeholder,
        &config.date_format,
    );

    info!(path = %config.incidents_path.display(), "loading incidents");
    let incidents = loader
        .load_incidents(&config.incidents_path)
        .context("Failed to load incident reports")?;

    info!(path = %config.calls_path.display(), "loading call logs");
    let calls = loader
        .load_call_logs(&config.calls_path)
        .context("Failed to load call-log reports")?;

    let reports = DataProcessor::merge(incidents, calls);
    info!(reports = reports.len(), "datasets merged");

    if let Some(path) = &config.merged_csv {
        DataProcessor::export_merged(
            &reports,
            path,
            config.separator_byte()?,
            &config.date_format,
        )
        .context("Failed to export merged record")?;
        info!(path = %path.display(), "merged record written");
    }

    let scopes = StatsCalculator::compute_scopes(&reports, &config.placeholder, &config.ambit_weights)
        .context("Failed to compute statistics")?;
    print!("{}", ReportPrinter::render(&scopes)?);

    if let Some(path) = &config.summary_json {
        let document = SummaryDocument {
            total_reports: reports.len(),
            placeholder: &config.placeholder,
            scopes: &scopes,
        };
        ReportPrinter::write_json(path, &document).context("Failed to write summary")?;
        info!(path = %path.display(), "summary written");
    }

    if config.render_charts {
        let chart_data = ChartData::from_reports(&reports, &config.placeholder);
        StaticChartRenderer::render_all(&chart_data, &config.output_dir)
            .map_err(|e| anyhow::anyhow!("Failed to render charts: {}", e))?;
    }

    Ok(())
}
