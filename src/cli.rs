//! CLI argument parsing for Valora

use crate::mediator::Experiment;
use crate::metrics::Metric;
use crate::model::ParamValue;
use crate::ranking::Order;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for experiment reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "valora")]
#[command(version)]
#[command(about = "Benchmark data-valuation methods with removal and noise-detection experiments", long_about = None)]
pub struct Cli {
    /// Registered dataset to load
    #[arg(short, long, default_value = "gaussian_classifier")]
    pub dataset: String,

    /// Load the dataset from a CSV file with a header row instead
    #[arg(long = "data-csv", value_name = "PATH", conflicts_with = "dataset")]
    pub data_csv: Option<PathBuf>,

    /// Column of --data-csv holding the labels
    #[arg(long = "label-column", value_name = "NAME", default_value = "label")]
    pub label_column: String,

    /// TOML file listing extra CSV datasets to register
    #[arg(long = "registry", value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Print the registered dataset names and exit
    #[arg(long = "list-datasets")]
    pub list_datasets: bool,

    /// `indices,data_values` CSV; random baseline values when omitted
    #[arg(long = "values", value_name = "PATH")]
    pub values: Option<PathBuf>,

    /// Experiment to run
    #[arg(short, long, value_enum, default_value = "point-removal")]
    pub experiment: Experiment,

    /// Experiment configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Fraction of training points per bin (overrides config)
    #[arg(long, value_name = "FRACTION")]
    pub percentile: Option<f64>,

    /// Removal order for point-removal (overrides config)
    #[arg(long, value_name = "ORDER")]
    pub order: Option<Order>,

    /// Step of the increasing-threshold sweep (overrides config)
    #[arg(long = "bin-size", value_name = "POINTS")]
    pub bin_size: Option<usize>,

    /// Scoring metric: accuracy, f1 or neg_mse (overrides config)
    #[arg(long, value_name = "METRIC")]
    pub metric: Option<Metric>,

    /// Training epochs per fit (overrides config)
    #[arg(long, value_name = "N")]
    pub epochs: Option<i64>,

    /// Fraction of training labels to corrupt
    #[arg(long = "noise-rate", value_name = "RATE", default_value = "0.0")]
    pub noise_rate: f64,

    /// Training points
    #[arg(long, default_value = "100")]
    pub train: usize,

    /// Validation points
    #[arg(long, default_value = "50")]
    pub valid: usize,

    /// Test points
    #[arg(long, default_value = "50")]
    pub test: usize,

    /// Run a parameter sweep instead of an experiment (e.g. --sweep epochs=10,50)
    #[arg(long = "sweep", value_name = "NAME=V1,V2", value_parser = parse_sweep_axis)]
    pub sweep: Vec<(String, Vec<ParamValue>)>,

    /// Output format (text, json or csv)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Seed for splits, noise and random orderings (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

/// Parse `name=v1,v2,...` into a sweep axis
pub fn parse_sweep_axis(s: &str) -> Result<(String, Vec<ParamValue>), String> {
    let (name, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=V1,V2,..., got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", s));
    }
    let values: Vec<ParamValue> = values
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(|v| match v.parse::<ParamValue>() {
            Ok(value) => value,
            Err(never) => match never {},
        })
        .collect();
    if values.is_empty() {
        return Err(format!("no values for parameter '{}'", name));
    }
    Ok((name.to_string(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["valora"]);
        assert_eq!(cli.dataset, "gaussian_classifier");
        assert_eq!(cli.experiment, Experiment::PointRemoval);
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.metric, None);
        assert_eq!(cli.train, 100);
        assert_eq!(cli.noise_rate, 0.0);
        assert!(cli.sweep.is_empty());
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_metric_flag() {
        let cli = Cli::parse_from(["valora", "--metric", "f1"]);
        assert_eq!(cli.metric, Some(Metric::F1));
        assert!(Cli::try_parse_from(["valora", "--metric", "auc"]).is_err());
    }

    #[test]
    fn test_cli_experiment_flag() {
        let cli = Cli::parse_from(["valora", "--experiment", "discover-corrupted-sample"]);
        assert_eq!(cli.experiment, Experiment::DiscoverCorruptedSample);
    }

    #[test]
    fn test_cli_order_flag() {
        let cli = Cli::parse_from(["valora", "--order", "descending"]);
        assert_eq!(cli.order, Some(Order::Descending));
    }

    #[test]
    fn test_cli_rejects_unknown_order() {
        assert!(Cli::try_parse_from(["valora", "--order", "sideways"]).is_err());
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["valora", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_data_csv_conflicts_with_dataset() {
        assert!(
            Cli::try_parse_from(["valora", "--dataset", "x", "--data-csv", "a.csv"]).is_err()
        );
    }

    #[test]
    fn test_cli_sweep_repeatable() {
        let cli = Cli::parse_from(["valora", "--sweep", "epochs=10,50", "--sweep", "lr=0.1"]);
        assert_eq!(cli.sweep.len(), 2);
        assert_eq!(cli.sweep[0].0, "epochs");
        assert_eq!(cli.sweep[0].1, vec![ParamValue::Int(10), ParamValue::Int(50)]);
        assert_eq!(cli.sweep[1].1, vec![ParamValue::Float(0.1)]);
    }

    #[test]
    fn test_parse_sweep_axis_errors() {
        assert!(parse_sweep_axis("epochs").is_err());
        assert!(parse_sweep_axis("=1,2").is_err());
        assert!(parse_sweep_axis("epochs=").is_err());
    }
}
