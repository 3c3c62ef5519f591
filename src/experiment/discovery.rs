// Corrupted-sample discovery and data-value export

use super::{training_values, EvalResult, AXIS};
use crate::config::ExperimentConfig;
use crate::error::{BenchError, Result};
use crate::evaluator::DataEvaluator;
use crate::loader::Loader;
use crate::ranking::{fraction_axis, sorted_indices, BinPlan};
use tracing::{debug, info};

/// Fraction of corrupted points found while inspecting the lowest values first
///
/// Walks the stable ascending ordering in steps of `num_period`, including
/// one step past the end, and records `|prefix ∩ noisy| / |noisy|`. The
/// `"corrupt_found"` curve is non-decreasing and ends at exactly 1.0.
///
/// With `config.reference_curves` the result also carries `"optimal"`
/// (every inspected point is corrupted until all are found) and `"random"`
/// (expected rate under a random ordering, equal to the axis).
///
/// # Errors
/// - [`BenchError::MissingCapability`] if the loader never injected noise
/// - [`BenchError::Degenerate`] if the noisy set is empty
pub fn discover_corrupted_sample<E, L>(
    evaluator: &E,
    loader: &L,
    config: &ExperimentConfig,
) -> Result<EvalResult>
where
    E: DataEvaluator,
    L: Loader,
{
    let noisy = loader.noisy_indices().ok_or_else(|| {
        BenchError::MissingCapability(
            "corrupted-sample discovery requires a loader with noisy indices".to_string(),
        )
    })?;
    let splits = loader.datapoints();
    let values = training_values(evaluator, &splits)?;
    let n = values.len();

    let mut is_noisy = vec![false; n];
    for &i in noisy {
        if i >= n {
            return Err(BenchError::InvalidConfig(format!(
                "noisy index {} outside training split of {} points",
                i, n
            )));
        }
        is_noisy[i] = true;
    }
    let num_noisy = is_noisy.iter().filter(|&&flag| flag).count();
    if num_noisy == 0 {
        return Err(BenchError::Degenerate(
            "noisy index set is empty, discovery rate is undefined".to_string(),
        ));
    }

    let plan = BinPlan::from_percentile(n, config.percentile)?;
    let num_bins = plan.num_bins + 1;
    let sorted = sorted_indices(&values)?;

    info!(
        evaluator = evaluator.name(),
        points = n,
        noisy = num_noisy,
        bins = num_bins,
        "corrupted-sample discovery"
    );

    let mut found_rates = Vec::with_capacity(num_bins + 1);
    let mut found = 0usize;
    let mut inspected = 0usize;
    for b in plan.inclusive_boundaries() {
        let end = b.min(n);
        found += sorted[inspected..end].iter().filter(|&&i| is_noisy[i]).count();
        inspected = end;
        let rate = found as f64 / num_noisy as f64;
        debug!(boundary = b, rate, "discovery bin");
        found_rates.push(rate);
    }

    let axis = fraction_axis(num_bins);
    let mut result = EvalResult::new();
    result.insert_curve("corrupt_found", found_rates);
    if config.reference_curves {
        let noise_rate = num_noisy as f64 / n as f64;
        let optimal = (0..num_bins)
            .map(|i| (i as f64 / num_bins as f64 / noise_rate).min(1.0))
            .collect();
        result.insert_curve("optimal", optimal);
        result.insert_curve("random", axis.clone());
    }
    result.insert_curve(AXIS, axis);
    info!(evaluator = evaluator.name(), "corrupted-sample discovery finished");
    Ok(result)
}

/// Pair every training point's original dataset row with its data value
///
/// Produces `"indices"` and `"data_values"`, the layout
/// [`PrecomputedEvaluator::from_csv`](crate::evaluator::PrecomputedEvaluator::from_csv)
/// reads back.
pub fn save_dataval<E, L>(evaluator: &E, loader: &L) -> Result<EvalResult>
where
    E: DataEvaluator,
    L: Loader,
{
    let splits = loader.datapoints();
    let values = training_values(evaluator, &splits)?;
    let indices = loader.train_indices();
    if indices.len() != values.len() {
        return Err(BenchError::InvalidConfig(format!(
            "{} train indices for {} data values",
            indices.len(),
            values.len()
        )));
    }

    let mut result = EvalResult::new();
    result.insert_indices("indices", indices.to_vec());
    result.insert_curve("data_values", values);
    Ok(result)
}
