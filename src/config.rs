//! Configuration Module
//! Command line arguments layered over an optional JSON config file.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Text substituted for missing text values.
pub const DEFAULT_PLACEHOLDER: &str = "Sin datos";

/// Positional weights for the sorted ambit categories.
pub const DEFAULT_WEIGHTS: [f64; 8] = [5.0, 6.0, 1.0, 2.0, 5.0, 3.0, 1.0, 3.0];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Separator must be a single ASCII character, got {0:?}")]
    InvalidSeparator(String),
    #[error("Ambit weights must not be empty")]
    EmptyWeights,
    #[error("Ambit weight #{index} is negative ({value})")]
    NegativeWeight { index: usize, value: f64 },
}

/// Analyze incident and call-log reports and render summary charts.
#[derive(Parser, Debug, Default)]
#[command(name = "report_insight", version, about)]
pub struct Cli {
    /// JSON config file; command line flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Incident reports CSV
    #[arg(long)]
    pub incidents: Option<PathBuf>,

    /// Call-log reports CSV
    #[arg(long)]
    pub calls: Option<PathBuf>,

    /// CSV field separator
    #[arg(long)]
    pub separator: Option<String>,

    /// Directory for the rendered charts
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write the statistics summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Write the merged chronological record as CSV
    #[arg(long)]
    pub merged_csv: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,
}

/// Fully resolved analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub incidents_path: PathBuf,
    pub calls_path: PathBuf,
    pub separator: String,
    pub output_dir: PathBuf,
    pub placeholder: String,
    pub date_format: String,
    pub ambit_weights: Vec<f64>,
    pub summary_json: Option<PathBuf>,
    pub merged_csv: Option<PathBuf>,
    pub render_charts: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            incidents_path: PathBuf::from("incidencias.csv"),
            calls_path: PathBuf::from("llamadas.csv"),
            separator: ";".to_string(),
            output_dir: PathBuf::from("plots"),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            ambit_weights: DEFAULT_WEIGHTS.to_vec(),
            summary_json: None,
            merged_csv: None,
            render_charts: true,
        }
    }
}

impl AnalysisConfig {
    /// Load a config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build the effective config: defaults, then the config file, then flags.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(path) = &cli.incidents {
            config.incidents_path = path.clone();
        }
        if let Some(path) = &cli.calls {
            config.calls_path = path.clone();
        }
        if let Some(sep) = &cli.separator {
            config.separator = sep.clone();
        }
        if let Some(dir) = &cli.output_dir {
            config.output_dir = dir.clone();
        }
        if cli.summary_json.is_some() {
            config.summary_json = cli.summary_json.clone();
        }
        if cli.merged_csv.is_some() {
            config.merged_csv = cli.merged_csv.clone();
        }
        if cli.no_charts {
            config.render_charts = false;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.separator_byte()?;
        if self.ambit_weights.is_empty() {
            return Err(ConfigError::EmptyWeights);
        }
        if let Some((index, &value)) = self
            .ambit_weights
            .iter()
            .enumerate()
            .find(|(_, w)| **w < 0.0)
        {
            return Err(ConfigError::NegativeWeight { index, value });
        }
        Ok(())
    }

    /// Separator as the single byte the CSV reader and writer expect.
    pub fn separator_byte(&self) -> Result<u8, ConfigError> {
        match self.separator.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::InvalidSeparator(self.separator.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_reference_report() {
        let config = AnalysisConfig::resolve(&Cli::default()).unwrap();
        assert_eq!(config.separator_byte().unwrap(), b';');
        assert_eq!(config.ambit_weights, vec![5.0, 6.0, 1.0, 2.0, 5.0, 3.0, 1.0, 3.0]);
        assert_eq!(config.placeholder, "Sin datos");
        assert_eq!(config.output_dir, PathBuf::from("plots"));
        assert!(config.render_charts);
    }

    #[test]
    fn flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "separator": ",", "output_dir": "from_file", "ambit_weights": [1, 2] }}"#
        )
        .unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            output_dir: Some(PathBuf::from("from_flag")),
            no_charts: true,
            ..Default::default()
        };
        let config = AnalysisConfig::resolve(&cli).unwrap();

        assert_eq!(config.separator, ",");
        assert_eq!(config.output_dir, PathBuf::from("from_flag"));
        assert_eq!(config.ambit_weights, vec![1.0, 2.0]);
        assert_eq!(config.incidents_path, PathBuf::from("incidencias.csv"));
        assert!(!config.render_charts);
    }

    #[test]
    fn rejects_bad_separator_and_weights() {
        let mut config = AnalysisConfig {
            separator: ";;".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSeparator(_))
        ));

        config.separator = ";".to_string();
        config.ambit_weights = vec![1.0, -2.0];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeWeight { index: 1, .. })
        ));

        config.ambit_weights.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyWeights)));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/analysis.json")),
            ..Default::default()
        };
        assert!(matches!(
            AnalysisConfig::resolve(&cli),
            Err(ConfigError::Read { .. })
        ));
    }
}
