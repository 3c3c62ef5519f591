//! Hyperparameter sweep diagnostic
//!
//! Characterizes how noisy and how expensive a training configuration is:
//! every combination of the candidate values is fit `samples` times on the
//! training split and scored on the validation split. Descriptive statistics
//! go through trueno vectors.

use crate::error::{BenchError, Result};
use crate::loader::Loader;
use crate::model::{Model, ParamValue, TrainParams};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};
use trueno::Vector;

/// Candidate values per parameter name
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Mean, sample standard deviation and average seconds per fit
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MeanStdTime {
    pub mean: f64,
    /// Sample standard deviation (`n - 1` denominator)
    pub std: f64,
    /// Wall-clock seconds per fit/predict/score cycle
    pub avg_time: f64,
}

impl MeanStdTime {
    /// Summarize at least two scores measured over `elapsed_secs`
    pub fn from_samples(scores: &[f64], elapsed_secs: f64) -> Result<Self> {
        let n = scores.len();
        if n < 2 {
            return Err(BenchError::InsufficientData {
                required: 2,
                actual: n,
            });
        }

        // Centre in f64 first: trueno works in f32 and would cancel the spread
        // of scores that are large compared with their deviations
        let mean = scores.iter().sum::<f64>() / n as f64;
        let residuals: Vec<f32> = scores.iter().map(|&s| (s - mean) as f32).collect();
        let v = Vector::from_slice(&residuals);
        // n >= 2, so the statistic cannot fail on an empty vector
        // trueno's stddev is the population (ddof = 0) one
        let population_std = f64::from(v.stddev().unwrap_or(0.0));
        let sample_variance = population_std * population_std * n as f64 / (n - 1) as f64;

        Ok(Self {
            mean,
            std: sample_variance.max(0.0).sqrt(),
            avg_time: elapsed_secs / n as f64,
        })
    }

    /// Format for display, including a projection for 1e5 fits in minutes
    pub fn format(&self) -> String {
        format!(
            "mean={:.6} | std={:.6} | average_time={:.6}s | 1e5 in min {:.2}",
            self.mean,
            self.std,
            self.avg_time,
            1e5 * self.avg_time / 60.0
        )
    }
}

/// Every combination of a grid, keys in name order
pub fn param_product(grid: &ParamGrid) -> Vec<TrainParams> {
    let mut combos = vec![TrainParams::new()];
    for (name, candidates) in grid {
        combos = combos
            .iter()
            .flat_map(|base| {
                candidates.iter().map(move |value| {
                    let mut next = base.clone();
                    next.insert(name.clone(), value.clone());
                    next
                })
            })
            .collect();
    }
    combos
}

/// Render a combination as `{'epochs': 10, 'lr': 0.1}`
pub fn render_params(params: &TrainParams) -> String {
    let body: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("'{}': {}", k, v))
        .collect();
    format!("{{{}}}", body.join(", "))
}

/// Repeated fit/score harness over a parameter grid
pub struct ParamSweep<'a, M, L, F> {
    model: &'a M,
    loader: &'a L,
    metric: F,
    samples: usize,
}

impl<'a, M, L, F> ParamSweep<'a, M, L, F>
where
    M: Model,
    L: Loader,
    F: Fn(&[f64], &[f64]) -> f64,
{
    /// `metric` is called as `metric(y_true, y_pred)`
    pub fn new(model: &'a M, loader: &'a L, metric: F, samples: usize) -> Result<Self> {
        if samples < 2 {
            return Err(BenchError::InvalidConfig(format!(
                "a sweep needs at least 2 samples per combination, got {}",
                samples
            )));
        }
        Ok(Self {
            model,
            loader,
            metric,
            samples,
        })
    }

    /// Run every combination of `grid`, keyed by [`render_params`]
    pub fn sweep(&self, grid: &ParamGrid) -> Result<BTreeMap<String, MeanStdTime>> {
        let splits = self.loader.datapoints();
        if splits.y_valid.is_empty() {
            return Err(BenchError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        let combos = param_product(grid);
        info!(
            combinations = combos.len(),
            samples = self.samples,
            "parameter sweep"
        );

        let mut results = BTreeMap::new();
        for params in combos {
            let mut scores = Vec::with_capacity(self.samples);
            let start = Instant::now();
            for _ in 0..self.samples {
                let mut model = self.model.clone();
                model.fit(splits.x_train, splits.y_train, &params)?;
                let y_hat = model.predict(splits.x_valid)?;
                scores.push((self.metric)(splits.y_valid, &y_hat));
            }
            let stats = MeanStdTime::from_samples(&scores, start.elapsed().as_secs_f64())?;
            let key = render_params(&params);
            debug!(params = %key, mean = stats.mean, std = stats.std, "sweep point");
            results.insert(key, stats);
        }
        Ok(results)
    }
}
