// Benchmark procedures over a data-value ranking
//
// Every procedure borrows an evaluator and a loader, pulls the data values
// once, orders and bins them with the ranking engine and retrains fresh
// clones of the evaluator's template model per bin. Results come back as an
// `EvalResult`: named curves plus, for per-bin experiments, an `"axis"`.
//
// Curves may hold one more entry than the axis when the training split is
// not a multiple of the bin size; `EvalResult::aligned` trims them.

mod discovery;
mod noisy;
mod removal;
mod threshold;

pub use discovery::{discover_corrupted_sample, save_dataval};
pub use noisy::noisy_detection;
pub use removal::{point_removal, remove_high_low};
pub use threshold::increasing_bin_removal;

use crate::error::{BenchError, Result};
use crate::evaluator::DataEvaluator;
use crate::loader::Splits;
use crate::ranking::{check_alignment, BinPlan};
use serde::Serialize;
use std::collections::BTreeMap;

/// Name of the shared x-axis series
pub const AXIS: &str = "axis";

/// One named entry of an [`EvalResult`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Scalar(f64),
    Indices(Vec<usize>),
    Curve(Vec<f64>),
}

impl Series {
    /// Number of positions (1 for a scalar)
    pub fn len(&self) -> usize {
        match self {
            Series::Scalar(_) => 1,
            Series::Indices(v) => v.len(),
            Series::Curve(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `pos` widened to f64, `None` past the end
    pub fn value_at(&self, pos: usize) -> Option<f64> {
        match self {
            Series::Scalar(v) => (pos == 0).then_some(*v),
            Series::Indices(v) => v.get(pos).map(|&i| i as f64),
            Series::Curve(v) => v.get(pos).copied(),
        }
    }
}

/// Named series produced by one experiment, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvalResult {
    series: BTreeMap<String, Series>,
}

impl EvalResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_curve(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), Series::Curve(values));
    }

    pub fn insert_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.series.insert(name.into(), Series::Scalar(value));
    }

    pub fn insert_indices(&mut self, name: impl Into<String>, indices: Vec<usize>) {
        self.series.insert(name.into(), Series::Indices(indices));
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    pub fn curve(&self, name: &str) -> Option<&[f64]> {
        match self.series.get(name) {
            Some(Series::Curve(v)) => Some(v),
            _ => None,
        }
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        match self.series.get(name) {
            Some(Series::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn indices(&self, name: &str) -> Option<&[usize]> {
        match self.series.get(name) {
            Some(Series::Indices(v)) => Some(v),
            _ => None,
        }
    }

    pub fn axis(&self) -> Option<&[f64]> {
        self.curve(AXIS)
    }

    /// Copy with every curve truncated to the axis length
    ///
    /// Without an axis the result is returned unchanged.
    pub fn aligned(&self) -> Self {
        let Some(len) = self.axis().map(<[f64]>::len) else {
            return self.clone();
        };
        let series = self
            .series
            .iter()
            .map(|(name, s)| {
                let s = match s {
                    Series::Curve(v) => Series::Curve(v.iter().take(len).copied().collect()),
                    other => other.clone(),
                };
                (name.clone(), s)
            })
            .collect();
        Self { series }
    }

    /// True when no curve is shorter than the axis
    pub fn is_aligned(&self) -> bool {
        match self.axis() {
            Some(axis) => self
                .series
                .values()
                .all(|s| !matches!(s, Series::Curve(v) if v.len() < axis.len())),
            None => true,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Pull the evaluator's values and check they cover the training split
fn training_values<E: DataEvaluator>(evaluator: &E, splits: &Splits<'_>) -> Result<Vec<f64>> {
    let values = evaluator.evaluate_data_values()?;
    check_alignment(&values, splits)?;
    Ok(values)
}

/// Bin plan for the removal sweeps; at least one whole bin is required
fn removal_plan(num_points: usize, percentile: f64) -> Result<BinPlan> {
    let plan = BinPlan::from_percentile(num_points, percentile)?;
    if plan.num_bins == 0 {
        return Err(BenchError::InsufficientData {
            required: plan.num_period,
            actual: num_points,
        });
    }
    Ok(plan)
}
