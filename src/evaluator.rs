//! Data evaluator contract and a precomputed-values implementation

use crate::error::{BenchError, Result};
use crate::metrics::Metric;
use crate::model::Model;
use crate::output::DataValueRecord;
use std::path::Path;

/// Produces per-point data values and owns the template predictive model
pub trait DataEvaluator {
    type Model: Model;

    /// One value per training point, index-aligned with `x_train`
    fn evaluate_data_values(&self) -> Result<Vec<f64>>;

    /// Template model; experiments clone it and never fit it directly
    fn pred_model(&self) -> &Self::Model;

    /// Scalar performance metric, higher is better
    fn evaluate(&self, y_true: &[f64], y_pred: &[f64]) -> f64;

    /// Display name used in logs and mediator results
    fn name(&self) -> &str;
}

/// Evaluator that serves data values computed elsewhere
#[derive(Debug, Clone)]
pub struct PrecomputedEvaluator<M> {
    name: String,
    values: Vec<f64>,
    model: M,
    metric: Metric,
}

impl<M: Model> PrecomputedEvaluator<M> {
    pub fn new(name: impl Into<String>, values: Vec<f64>, model: M, metric: Metric) -> Self {
        Self {
            name: name.into(),
            values,
            model,
            metric,
        }
    }

    /// Load values from an `indices,data_values` CSV
    ///
    /// `indices` are original dataset rows; they are matched against
    /// `train_indices` so the values line up with the loader's training split.
    pub fn from_csv<P: AsRef<Path>>(
        name: impl Into<String>,
        path: P,
        train_indices: &[usize],
        model: M,
        metric: Metric,
    ) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut by_index = std::collections::HashMap::new();
        for record in reader.deserialize() {
            let record: DataValueRecord = record?;
            by_index.insert(record.indices, record.data_values);
        }

        let values = train_indices
            .iter()
            .map(|idx| {
                by_index.get(idx).copied().ok_or_else(|| {
                    BenchError::Dataset(format!(
                        "no data value for training row {} in {}",
                        idx,
                        path.as_ref().display()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(name, values, model, metric))
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }
}

impl<M: Model> DataEvaluator for PrecomputedEvaluator<M> {
    type Model = M;

    fn evaluate_data_values(&self) -> Result<Vec<f64>> {
        Ok(self.values.clone())
    }

    fn pred_model(&self) -> &M {
        &self.model
    }

    fn evaluate(&self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        self.metric.score(y_true, y_pred)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
