//! Report formats for experiment results
//!
//! Text for the terminal, JSON for machine parsing, CSV for spreadsheets.

use crate::error::Result;
use crate::experiment::{EvalResult, Series, AXIS};
use crate::sweep::MeanStdTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// Results of one evaluator
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatorResult {
    pub evaluator: String,
    pub series: EvalResult,
}

/// An evaluator the mediator could not run
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEvaluator {
    pub evaluator: String,
    pub error: String,
}

/// Everything one experiment run produced
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Experiment name, e.g. `point-removal`
    pub experiment: String,
    pub results: Vec<EvaluatorResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEvaluator>,
}

impl ExperimentReport {
    pub fn new(experiment: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "valora-json-v1".to_string(),
            experiment: experiment.into(),
            results: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn add_result(&mut self, evaluator: impl Into<String>, series: EvalResult) {
        self.results.push(EvaluatorResult {
            evaluator: evaluator.into(),
            series,
        });
    }

    pub fn add_skipped(&mut self, evaluator: impl Into<String>, error: impl Into<String>) {
        self.skipped.push(SkippedEvaluator {
            evaluator: evaluator.into(),
            error: error.into(),
        });
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One row per curve position per evaluator
    pub fn to_csv(&self) -> String {
        let mut csv = CsvOutput::new();
        for result in &self.results {
            csv.add_result(&result.evaluator, &result.series);
        }
        csv.format()
    }

    /// Format the report for display
    pub fn format(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n=== {} ===\n", self.experiment));

        for result in &self.results {
            output.push_str(&format!("\nEvaluator: {}\n", result.evaluator));
            for (name, series) in result.series.iter() {
                match series {
                    Series::Scalar(v) => output.push_str(&format!("  {}: {:.4}\n", name, v)),
                    Series::Curve(values) => {
                        let shown: Vec<String> = values.iter().map(|v| format!("{:.4}", v)).collect();
                        output.push_str(&format!("  {} ({}): [{}]\n", name, values.len(), shown.join(", ")));
                    }
                    Series::Indices(values) => {
                        output.push_str(&format!("  {} ({} indices)\n", name, values.len()));
                    }
                }
            }
        }

        if !self.skipped.is_empty() {
            output.push_str(&format!("\nSkipped: {}\n", self.skipped.len()));
            for skipped in &self.skipped {
                output.push_str(&format!("  - {}: {}\n", skipped.evaluator, skipped.error));
            }
        }

        output
    }
}

/// CSV formatter for [`EvalResult`]s
///
/// Columns are `evaluator`, then `axis` when present, then every other
/// series name in order. Series shorter than the longest one in their
/// result leave blank cells.
#[derive(Debug, Default)]
pub struct CsvOutput {
    rows: Vec<(String, EvalResult)>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, evaluator: &str, result: &EvalResult) {
        self.rows.push((evaluator.to_string(), result.clone()));
    }

    fn columns(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .rows
            .iter()
            .flat_map(|(_, result)| result.names())
            .collect();
        let mut columns = Vec::with_capacity(names.len());
        if names.contains(AXIS) {
            columns.push(AXIS.to_string());
        }
        columns.extend(names.into_iter().filter(|&n| n != AXIS).map(str::to_string));
        columns
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn cell(series: Option<&Series>, pos: usize) -> String {
        match series {
            Some(Series::Indices(v)) => v.get(pos).map(ToString::to_string).unwrap_or_default(),
            Some(s) => s.value_at(pos).map(|v| v.to_string()).unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Generate complete CSV output
    pub fn format(&self) -> String {
        let columns = self.columns();
        let mut output = String::new();

        let mut header = vec!["evaluator".to_string()];
        header.extend(columns.iter().map(|c| Self::escape_field(c)));
        output.push_str(&header.join(","));
        output.push('\n');

        for (evaluator, result) in &self.rows {
            let height = result.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
            for pos in 0..height {
                let mut fields = vec![Self::escape_field(evaluator)];
                fields.extend(columns.iter().map(|c| Self::cell(result.get(c), pos)));
                output.push_str(&fields.join(","));
                output.push('\n');
            }
        }

        output
    }
}

/// One row of a saved data-value file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValueRecord {
    /// Original dataset row
    pub indices: usize,
    pub data_values: f64,
}

/// Write the `indices`/`data_values` pair of a saved result as CSV
pub fn write_data_values<W: Write>(result: &EvalResult, writer: W) -> Result<()> {
    let indices = result.indices("indices").unwrap_or_default();
    let values = result.curve("data_values").unwrap_or_default();

    let mut csv_writer = csv::Writer::from_writer(writer);
    for (&index, &value) in indices.iter().zip(values) {
        csv_writer.serialize(DataValueRecord {
            indices: index,
            data_values: value,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// One row of a sweep CSV
#[derive(Debug, Clone, Serialize)]
struct SweepRecord<'a> {
    params: &'a str,
    mean: f64,
    std: f64,
    avg_time: f64,
}

/// Write sweep statistics as CSV, one row per parameter combination
pub fn write_sweep_csv<W: Write>(results: &BTreeMap<String, MeanStdTime>, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (params, stats) in results {
        csv_writer.serialize(SweepRecord {
            params,
            mean: stats.mean,
            std: stats.std,
            avg_time: stats.avg_time,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Format sweep statistics, one line per parameter combination
pub fn format_sweep(results: &BTreeMap<String, MeanStdTime>) -> String {
    let mut output = String::from("\n=== Parameter Sweep ===\n");
    for (params, stats) in results {
        output.push_str(&format!("  {}: {}\n", params, stats.format()));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removal_result() -> EvalResult {
        let mut result = EvalResult::new();
        result.insert_curve("random_add_accuracy", vec![0.9, 0.8, 0.5]);
        result.insert_curve(AXIS, vec![0.0, 0.5]);
        result
    }

    #[test]
    fn test_csv_axis_first_and_blank_tail() {
        let mut csv = CsvOutput::new();
        csv.add_result("dvrl", &removal_result());
        let out = csv.format();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "evaluator,axis,random_add_accuracy");
        assert_eq!(lines[1], "dvrl,0,0.9");
        assert_eq!(lines[2], "dvrl,0.5,0.8");
        assert_eq!(lines[3], "dvrl,,0.5");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_csv_escapes_evaluator_names() {
        let mut csv = CsvOutput::new();
        let mut result = EvalResult::new();
        result.insert_scalar("kmeans_f1", 0.75);
        csv.add_result("knn, shapley", &result);
        let out = csv.format();
        assert!(out.contains("\"knn, shapley\",0.75"));
    }

    #[test]
    fn test_csv_indices_are_integers() {
        let mut result = EvalResult::new();
        result.insert_indices("indices", vec![4, 9]);
        result.insert_curve("data_values", vec![0.25, 1.0]);
        let mut csv = CsvOutput::new();
        csv.add_result("x", &result);
        let out = csv.format();
        assert!(out.contains("x,0.25,4\n"));
        assert!(out.contains("x,1,9\n"));
    }

    #[test]
    fn test_json_report_shape() {
        let mut report = ExperimentReport::new("point-removal");
        report.add_result("fixed", removal_result());
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format"], "valora-json-v1");
        assert_eq!(value["experiment"], "point-removal");
        assert_eq!(value["results"][0]["evaluator"], "fixed");
        assert_eq!(value["results"][0]["series"]["axis"][1], 0.5);
        assert!(value.get("skipped").is_none());
    }

    #[test]
    fn test_json_scalar_series() {
        let mut result = EvalResult::new();
        result.insert_scalar("kmeans_f1", 1.0);
        let mut report = ExperimentReport::new("noisy-detection");
        report.add_result("fixed", result);
        report.add_skipped("broken", "Degenerate input: constant values");
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["results"][0]["series"]["kmeans_f1"], 1.0);
        assert_eq!(value["skipped"][0]["evaluator"], "broken");
    }

    #[test]
    fn test_text_format() {
        let mut report = ExperimentReport::new("point-removal");
        report.add_result("fixed", removal_result());
        report.add_skipped("broken", "boom");
        let text = report.format();
        assert!(text.contains("=== point-removal ==="));
        assert!(text.contains("Evaluator: fixed"));
        assert!(text.contains("random_add_accuracy (3): [0.9000, 0.8000, 0.5000]"));
        assert!(text.contains("- broken: boom"));
    }

    #[test]
    fn test_write_data_values() {
        let mut result = EvalResult::new();
        result.insert_indices("indices", vec![7, 3]);
        result.insert_curve("data_values", vec![0.5, -0.25]);
        let mut buf = Vec::new();
        write_data_values(&result, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "indices,data_values\n7,0.5\n3,-0.25\n"
        );
    }

    #[test]
    fn test_format_sweep() {
        let mut results = BTreeMap::new();
        results.insert(
            "{'epochs': 10}".to_string(),
            MeanStdTime {
                mean: 0.5,
                std: 0.1,
                avg_time: 0.002,
            },
        );
        let text = format_sweep(&results);
        assert!(text.contains("{'epochs': 10}: mean=0.500000 | std=0.100000"));
    }

    #[test]
    fn test_write_sweep_csv_quotes_params() {
        let mut results = BTreeMap::new();
        results.insert(
            "{'epochs': 10, 'lr': 0.1}".to_string(),
            MeanStdTime {
                mean: 0.5,
                std: 0.25,
                avg_time: 0.125,
            },
        );
        let mut buf = Vec::new();
        write_sweep_csv(&results, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "params,mean,std,avg_time\n\"{'epochs': 10, 'lr': 0.1}\",0.5,0.25,0.125\n"
        );
    }
}
