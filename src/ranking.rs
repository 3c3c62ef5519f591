//! Ranking & binning engine
//!
//! Sorts data values into an index ordering, cuts the ordering into
//! contiguous bins and retrains fresh model clones on the subsets each bin
//! boundary implies. All experiments in [`crate::experiment`] are built on
//! these three pieces.
//!
//! # Bin sizing
//!
//! `num_period = max(round(n * percentile), MIN_BIN_SIZE)` and
//! `num_bins = n / num_period` (integer division). Rounding is half-to-even
//! so bin sizes match the reference harness exactly (e.g. `12.5 -> 12`).
//! A remainder shorter than `num_period` still gets a boundary of its own,
//! which is why removal curves can hold one more point than the axis.

use crate::data::{subset_labels, DataMatrix};
use crate::error::{BenchError, Result};
use crate::evaluator::DataEvaluator;
use crate::loader::Splits;
use crate::model::{Model, TrainParams};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Smallest number of points moved per bin
pub const MIN_BIN_SIZE: usize = 5;

/// Default fraction of points per bin
pub const DEFAULT_PERCENTILE: f64 = 0.05;

/// Default step of the threshold sweep
pub const DEFAULT_BIN_SIZE: usize = 1;

/// Policy used to turn a value array into an index ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Fresh uniform permutation, independent of the values
    #[default]
    Random,
    /// Lowest value first
    Ascending,
    /// Highest value first
    Descending,
    /// Lowest value first, ties kept in index order
    StableAscending,
}

impl Order {
    pub fn name(self) -> &'static str {
        match self {
            Order::Random => "random",
            Order::Ascending => "ascending",
            Order::Descending => "descending",
            Order::StableAscending => "stable_ascending",
        }
    }

    /// Sort `values` into a permutation of `0..values.len()`
    ///
    /// Sorting is stable for every policy, so equal values keep their
    /// original relative order (ascending and stable-ascending therefore
    /// agree). NaN values are rejected.
    pub fn argsort<R: Rng + ?Sized>(self, values: &[f64], rng: &mut R) -> Result<Vec<usize>> {
        match self {
            Order::Ascending | Order::StableAscending => sort_by_value(values, false),
            Order::Descending => sort_by_value(values, true),
            Order::Random => {
                check_not_nan(values)?;
                let mut ordering: Vec<usize> = (0..values.len()).collect();
                ordering.shuffle(rng);
                Ok(ordering)
            }
        }
    }
}

/// Stable ascending ordering of `values`
pub fn sorted_indices(values: &[f64]) -> Result<Vec<usize>> {
    sort_by_value(values, false)
}

fn sort_by_value(values: &[f64], descending: bool) -> Result<Vec<usize>> {
    check_not_nan(values)?;
    let mut ordering: Vec<usize> = (0..values.len()).collect();
    ordering.sort_by(|&a, &b| {
        let (lhs, rhs) = if descending { (b, a) } else { (a, b) };
        values[lhs]
            .partial_cmp(&values[rhs])
            .unwrap_or(Ordering::Equal)
    });
    Ok(ordering)
}

fn check_not_nan(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| v.is_nan()) {
        Some(pos) => Err(BenchError::Degenerate(format!(
            "data value at index {} is NaN",
            pos
        ))),
        None => Ok(()),
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Order {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('-', "_").as_str() {
            "random" => Ok(Order::Random),
            "ascending" => Ok(Order::Ascending),
            "descending" => Ok(Order::Descending),
            "stable_ascending" => Ok(Order::StableAscending),
            other => Err(BenchError::InvalidConfig(format!(
                "unknown order '{}', expected random, ascending, descending or stable-ascending",
                other
            ))),
        }
    }
}

/// Bin layout over `num_points` ordered indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinPlan {
    pub num_points: usize,
    /// Points per bin
    pub num_period: usize,
    /// Whole bins that fit in `num_points`, may be 0
    pub num_bins: usize,
}

impl BinPlan {
    /// Size bins as a fraction of the data, never smaller than [`MIN_BIN_SIZE`]
    pub fn from_percentile(num_points: usize, percentile: f64) -> Result<Self> {
        if percentile.is_nan() || percentile <= 0.0 || percentile > 1.0 {
            return Err(BenchError::InvalidConfig(format!(
                "percentile must be in (0, 1], got {}",
                percentile
            )));
        }
        let nominal = (num_points as f64 * percentile).round_ties_even() as usize;
        let num_period = nominal.max(MIN_BIN_SIZE);
        Ok(Self {
            num_points,
            num_period,
            num_bins: num_points / num_period,
        })
    }

    /// Start offset of every bin: `0, num_period, 2 * num_period, ... < n`
    pub fn boundaries(&self) -> impl Iterator<Item = usize> {
        (0..self.num_points).step_by(self.num_period)
    }

    /// Like [`boundaries`](Self::boundaries) but with one extra step past the
    /// end so the last boundary covers every point
    pub fn inclusive_boundaries(&self) -> impl Iterator<Item = usize> {
        (0..self.num_points + self.num_period).step_by(self.num_period)
    }

    /// Fraction of data processed at each whole bin: `i / num_bins`
    ///
    /// Empty when `num_bins == 0`.
    pub fn axis(&self) -> Vec<f64> {
        fraction_axis(self.num_bins)
    }
}

/// `[0, 1/k, 2/k, ..., (k-1)/k]`, empty for `k == 0`
pub fn fraction_axis(k: usize) -> Vec<f64> {
    (0..k).map(|i| i as f64 * (1.0 / k as f64)).collect()
}

/// Which held-out split a retrained model is scored on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalSplit {
    Valid,
    Test,
}

impl EvalSplit {
    pub fn select<'a>(self, splits: &Splits<'a>) -> (&'a DataMatrix, &'a [f64]) {
        match self {
            EvalSplit::Valid => (splits.x_valid, splits.y_valid),
            EvalSplit::Test => (splits.x_test, splits.y_test),
        }
    }
}

/// Clone-fit-predict-score loop shared by all removal experiments
///
/// The evaluator's template model is only ever cloned; each call to
/// [`score`](Self::score) trains its own clone and drops it before returning.
pub struct Retrainer<'a, E: DataEvaluator> {
    evaluator: &'a E,
    x_train: &'a DataMatrix,
    y_train: &'a [f64],
    x_eval: &'a DataMatrix,
    y_eval: &'a [f64],
    params: &'a TrainParams,
}

impl<'a, E: DataEvaluator> Retrainer<'a, E> {
    /// Fails with [`BenchError::InsufficientData`] when the scoring split is
    /// empty, since no metric is defined over zero points
    pub fn new(
        evaluator: &'a E,
        splits: &Splits<'a>,
        eval_split: EvalSplit,
        params: &'a TrainParams,
    ) -> Result<Self> {
        let (x_eval, y_eval) = eval_split.select(splits);
        if y_eval.is_empty() {
            return Err(BenchError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        Ok(Self {
            evaluator,
            x_train: splits.x_train,
            y_train: splits.y_train,
            x_eval,
            y_eval,
            params,
        })
    }

    /// Train a fresh clone on `subset` of the training split and score it
    pub fn score(&self, subset: &[usize]) -> Result<f64> {
        let mut model = self.evaluator.pred_model().clone();
        model.fit(
            &self.x_train.subset(subset),
            &subset_labels(self.y_train, subset),
            self.params,
        )?;
        let y_hat = model.predict(self.x_eval)?;
        let score = self.evaluator.evaluate(self.y_eval, &y_hat);
        trace!(subset = subset.len(), score, "retrained clone");
        Ok(score)
    }
}

/// Values must be index-aligned with the training split
pub(crate) fn check_alignment(values: &[f64], splits: &Splits<'_>) -> Result<()> {
    if values.len() != splits.x_train.n_rows() {
        return Err(BenchError::InvalidConfig(format!(
            "{} data values for {} training points",
            values.len(),
            splits.x_train.n_rows()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_argsort_ascending() {
        let values = [0.1, 0.5, 0.3, 0.9, 0.2];
        let ordering = Order::Ascending.argsort(&values, &mut rng()).unwrap();
        assert_eq!(ordering, vec![0, 4, 2, 1, 3]);
    }

    #[test]
    fn test_argsort_descending() {
        let values = [0.1, 0.5, 0.3, 0.9, 0.2];
        let ordering = Order::Descending.argsort(&values, &mut rng()).unwrap();
        assert_eq!(ordering, vec![3, 1, 2, 4, 0]);
    }

    #[test]
    fn test_argsort_ties_are_stable() {
        let values = [1.0, 0.0, 1.0, 0.0, 1.0];
        assert_eq!(
            Order::StableAscending.argsort(&values, &mut rng()).unwrap(),
            vec![1, 3, 0, 2, 4]
        );
        assert_eq!(
            Order::Descending.argsort(&values, &mut rng()).unwrap(),
            vec![0, 2, 4, 1, 3]
        );
    }

    #[test]
    fn test_argsort_random_is_permutation() {
        let values = vec![0.0; 50];
        let mut ordering = Order::Random.argsort(&values, &mut rng()).unwrap();
        ordering.sort_unstable();
        assert_eq!(ordering, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_sorted_indices_matches_stable_ascending() {
        let values = [0.3, 0.1, 0.3, 0.2];
        assert_eq!(sorted_indices(&values).unwrap(), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_argsort_rejects_nan() {
        let values = [0.1, f64::NAN];
        assert!(matches!(
            Order::Ascending.argsort(&values, &mut rng()),
            Err(BenchError::Degenerate(_))
        ));
    }

    #[test]
    fn test_order_parse() {
        assert_eq!("stable-ascending".parse::<Order>().unwrap(), Order::StableAscending);
        assert_eq!("descending".parse::<Order>().unwrap(), Order::Descending);
        assert!("sideways".parse::<Order>().is_err());
        assert_eq!(Order::Random.to_string(), "random");
    }

    #[test]
    fn test_bin_plan_minimum_bin() {
        let plan = BinPlan::from_percentile(5, 0.05).unwrap();
        assert_eq!(plan.num_period, 5);
        assert_eq!(plan.num_bins, 1);
        assert_eq!(plan.boundaries().collect::<Vec<_>>(), vec![0]);
        assert_eq!(plan.axis(), vec![0.0]);
    }

    #[test]
    fn test_bin_plan_percentile() {
        let plan = BinPlan::from_percentile(200, 0.05).unwrap();
        assert_eq!(plan.num_period, 10);
        assert_eq!(plan.num_bins, 20);
        assert_eq!(plan.boundaries().count(), 20);
        assert_eq!(plan.inclusive_boundaries().count(), 21);
    }

    #[test]
    fn test_bin_plan_uneven_remainder() {
        let plan = BinPlan::from_percentile(23, 0.05).unwrap();
        assert_eq!(plan.num_period, 5);
        assert_eq!(plan.num_bins, 4);
        // the partial fifth bin still has a boundary
        assert_eq!(plan.boundaries().collect::<Vec<_>>(), vec![0, 5, 10, 15, 20]);
    }

    #[test]
    fn test_bin_plan_rounds_half_to_even() {
        assert_eq!(BinPlan::from_percentile(250, 0.05).unwrap().num_period, 12);
        assert_eq!(BinPlan::from_percentile(300, 0.05).unwrap().num_period, 15);
    }

    #[test]
    fn test_bin_plan_zero_bins() {
        let plan = BinPlan::from_percentile(3, 0.05).unwrap();
        assert_eq!(plan.num_bins, 0);
        assert!(plan.axis().is_empty());
    }

    #[test]
    fn test_bin_plan_invalid_percentile() {
        assert!(BinPlan::from_percentile(100, 0.0).is_err());
        assert!(BinPlan::from_percentile(100, 1.5).is_err());
        assert!(BinPlan::from_percentile(100, f64::NAN).is_err());
    }

    #[test]
    fn test_fraction_axis() {
        assert_eq!(fraction_axis(4), vec![0.0, 0.25, 0.5, 0.75]);
        assert!(fraction_axis(0).is_empty());
    }
}
