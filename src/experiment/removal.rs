// Point-removal sweeps: retrain on what is left after dropping a bin at a time

use super::{removal_plan, training_values, EvalResult, AXIS};
use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::evaluator::DataEvaluator;
use crate::loader::Loader;
use crate::ranking::{sorted_indices, EvalSplit, Retrainer};
use rand::Rng;
use tracing::{debug, info};

/// Remove points bin by bin in `config.order` and score on the validation split
///
/// At boundary `b` the model is trained on `ordering[b..]`, so the first
/// entry uses the whole training split. Produces
/// `"{order}_add_{metric_name}"` and `"axis"`.
pub fn point_removal<E, L, R>(
    evaluator: &E,
    loader: &L,
    config: &ExperimentConfig,
    rng: &mut R,
) -> Result<EvalResult>
where
    E: DataEvaluator,
    L: Loader,
    R: Rng + ?Sized,
{
    let splits = loader.datapoints();
    let values = training_values(evaluator, &splits)?;
    let plan = removal_plan(values.len(), config.percentile)?;
    let ordering = config.order.argsort(&values, rng)?;

    info!(
        evaluator = evaluator.name(),
        order = %config.order,
        points = plan.num_points,
        bins = plan.num_bins,
        "point removal"
    );

    let retrainer = Retrainer::new(evaluator, &splits, EvalSplit::Valid, &config.train_params)?;
    let mut scores = Vec::with_capacity(plan.num_bins + 1);
    for b in plan.boundaries() {
        let score = retrainer.score(&ordering[b..])?;
        debug!(boundary = b, score, "removal bin");
        scores.push(score);
    }

    let mut result = EvalResult::new();
    result.insert_curve(
        format!("{}_add_{}", config.order, config.metric_name),
        scores,
    );
    result.insert_curve(AXIS, plan.axis());
    info!(evaluator = evaluator.name(), "point removal finished");
    Ok(result)
}

/// Two sweeps over the ascending ordering, scored on the test split
///
/// At boundary `b`:
/// - `remove_mostval_{metric}` trains on the `n - b` most valuable points
///   (`sorted[b..]`), i.e. the least valuable were removed
/// - `remove_leastval_{metric}` trains on the `n - b` least valuable points
///   (`sorted[..n - b]`), i.e. the most valuable were removed
///
/// Both start from the full training split.
pub fn remove_high_low<E, L>(
    evaluator: &E,
    loader: &L,
    config: &ExperimentConfig,
) -> Result<EvalResult>
where
    E: DataEvaluator,
    L: Loader,
{
    let splits = loader.datapoints();
    let values = training_values(evaluator, &splits)?;
    let plan = removal_plan(values.len(), config.percentile)?;
    let sorted = sorted_indices(&values)?;
    let n = plan.num_points;

    info!(
        evaluator = evaluator.name(),
        points = n,
        bins = plan.num_bins,
        "high/low removal"
    );

    let retrainer = Retrainer::new(evaluator, &splits, EvalSplit::Test, &config.train_params)?;
    let mut valuable = Vec::with_capacity(plan.num_bins + 1);
    let mut unvaluable = Vec::with_capacity(plan.num_bins + 1);
    for b in plan.boundaries() {
        let kept_high = retrainer.score(&sorted[b..])?;
        let kept_low = retrainer.score(&sorted[..n - b])?;
        debug!(boundary = b, kept_high, kept_low, "high/low bin");
        valuable.push(kept_high);
        unvaluable.push(kept_low);
    }

    let mut result = EvalResult::new();
    result.insert_curve(format!("remove_mostval_{}", config.metric_name), valuable);
    result.insert_curve(format!("remove_leastval_{}", config.metric_name), unvaluable);
    result.insert_curve(AXIS, plan.axis());
    info!(evaluator = evaluator.name(), "high/low removal finished");
    Ok(result)
}
