// Increasing-threshold removal: keep only points below a value cutoff

use super::{training_values, EvalResult, AXIS};
use crate::config::ExperimentConfig;
use crate::error::{BenchError, Result};
use crate::evaluator::DataEvaluator;
use crate::loader::Loader;
use crate::ranking::{sorted_indices, EvalSplit, Retrainer, MIN_BIN_SIZE};
use tracing::{debug, info};

/// Smallest training split with a boundary past the initial offset
const MIN_THRESHOLD_POINTS: usize = MIN_BIN_SIZE + 1;

/// Cutoffs into the ascending ordering: `5, 5 + step, ... < n - 1`, then `n - 1`
fn threshold_boundaries(num_points: usize, bin_size: usize) -> Vec<usize> {
    let last = num_points - 1;
    let mut bounds: Vec<usize> = (MIN_BIN_SIZE..last).step_by(bin_size).collect();
    bounds.push(last);
    bounds
}

/// Train on every point whose value lies below a rising threshold
///
/// For each cutoff `e` the model is fit on `sorted[..e]` and scored on the
/// test split. The axis is the value at the cutoff normalized by the
/// largest value, not a fraction of points; `"frac_datapoints_explored"`
/// carries `(e + 1) / n` alongside `"{metric_name}_at_datavalues"`.
///
/// # Errors
/// - [`BenchError::InvalidConfig`] for `bin_size == 0`
/// - [`BenchError::InsufficientData`] for fewer than 6 training points
/// - [`BenchError::Degenerate`] when the largest value is 0
pub fn increasing_bin_removal<E, L>(
    evaluator: &E,
    loader: &L,
    config: &ExperimentConfig,
) -> Result<EvalResult>
where
    E: DataEvaluator,
    L: Loader,
{
    if config.bin_size == 0 {
        return Err(BenchError::InvalidConfig(
            "bin_size must be at least 1".to_string(),
        ));
    }
    let splits = loader.datapoints();
    let values = training_values(evaluator, &splits)?;
    let n = values.len();
    if n < MIN_THRESHOLD_POINTS {
        return Err(BenchError::InsufficientData {
            required: MIN_THRESHOLD_POINTS,
            actual: n,
        });
    }

    let sorted = sorted_indices(&values)?;
    let max_value = values[sorted[n - 1]];
    if max_value == 0.0 {
        return Err(BenchError::Degenerate(
            "largest data value is 0, thresholds cannot be normalized".to_string(),
        ));
    }

    let bounds = threshold_boundaries(n, config.bin_size);
    info!(
        evaluator = evaluator.name(),
        points = n,
        cutoffs = bounds.len(),
        "increasing-threshold removal"
    );

    let retrainer = Retrainer::new(evaluator, &splits, EvalSplit::Test, &config.train_params)?;
    let mut perf = Vec::with_capacity(bounds.len());
    for &e in &bounds {
        let score = retrainer.score(&sorted[..e])?;
        debug!(cutoff = e, score, "threshold bin");
        perf.push(score);
    }

    let explored = bounds.iter().map(|&e| (e + 1) as f64 / n as f64).collect();
    let axis = bounds
        .iter()
        .map(|&e| values[sorted[e]] / max_value)
        .collect();

    let mut result = EvalResult::new();
    result.insert_curve("frac_datapoints_explored", explored);
    result.insert_curve(format!("{}_at_datavalues", config.metric_name), perf);
    result.insert_curve(AXIS, axis);
    info!(evaluator = evaluator.name(), "increasing-threshold removal finished");
    Ok(result)
}
