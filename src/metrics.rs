//! Scalar performance metrics
//!
//! Every metric is "higher is better" so curves from different metrics read
//! the same way; regression error is reported negated.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binary confusion counts for a chosen positive label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ConfusionCounts {
    /// Count agreements between `y_pred` and `y_true` for label `positive`
    pub fn from_predictions<T: PartialEq>(y_true: &[T], y_pred: &[T], positive: &T) -> Self {
        let mut counts = Self::default();
        for (t, p) in y_true.iter().zip(y_pred) {
            match (t == positive, p == positive) {
                (true, true) => counts.true_positives += 1,
                (false, true) => counts.false_positives += 1,
                (true, false) => counts.false_negatives += 1,
                (false, false) => counts.true_negatives += 1,
            }
        }
        counts
    }

    pub fn precision(&self) -> f64 {
        let denom = self.true_positives + self.false_positives;
        if denom == 0 {
            0.0
        } else {
            self.true_positives as f64 / denom as f64
        }
    }

    pub fn recall(&self) -> f64 {
        let denom = self.true_positives + self.false_negatives;
        if denom == 0 {
            0.0
        } else {
            self.true_positives as f64 / denom as f64
        }
    }

    /// Harmonic mean of precision and recall; 0 when both are 0
    pub fn f1_score(&self) -> f64 {
        let denom = 2 * self.true_positives + self.false_positives + self.false_negatives;
        if denom == 0 {
            0.0
        } else {
            2.0 * self.true_positives as f64 / denom as f64
        }
    }
}

/// F1 score of `y_pred` against `y_true` with `positive` as the positive class
pub fn f1_score<T: PartialEq>(y_true: &[T], y_pred: &[T], positive: &T) -> f64 {
    ConfusionCounts::from_predictions(y_true, y_pred, positive).f1_score()
}

/// Fraction of exact matches; 0 for empty input
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

/// Negative mean squared error
pub fn neg_mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sse: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    -sse / y_true.len() as f64
}

/// Named metric selectable from configuration and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Accuracy,
    /// Binary F1 with class 1 as the positive label
    F1,
    NegMse,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::F1 => "f1",
            Metric::NegMse => "neg_mse",
        }
    }

    /// Score `y_pred` against `y_true`
    pub fn score(self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        match self {
            Metric::Accuracy => accuracy(y_true, y_pred),
            Metric::F1 => f1_score(y_true, y_pred, &1.0),
            Metric::NegMse => neg_mse(y_true, y_pred),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accuracy" => Ok(Metric::Accuracy),
            "f1" => Ok(Metric::F1),
            "neg_mse" => Ok(Metric::NegMse),
            other => Err(BenchError::InvalidConfig(format!(
                "unknown metric '{}', expected accuracy, f1 or neg_mse",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1.0, 0.0, 1.0, 1.0], &[1.0, 1.0, 1.0, 0.0]), 0.5);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_f1_perfect() {
        let y = [0, 0, 1, 1];
        assert_eq!(f1_score(&y, &y, &1), 1.0);
    }

    #[test]
    fn test_f1_no_positive_predictions() {
        assert_eq!(f1_score(&[1, 1, 0], &[0, 0, 0], &1), 0.0);
    }

    #[test]
    fn test_f1_partial() {
        // tp=1, fp=1, fn=1 -> 2/(2+1+1)
        let counts = ConfusionCounts::from_predictions(&[1, 1, 0, 0], &[1, 0, 1, 0], &1);
        assert_eq!(counts.true_positives, 1);
        assert_eq!(counts.true_negatives, 1);
        assert!((counts.f1_score() - 0.5).abs() < 1e-12);
        assert_eq!(counts.precision(), 0.5);
        assert_eq!(counts.recall(), 0.5);
    }

    #[test]
    fn test_neg_mse() {
        assert_eq!(neg_mse(&[1.0, 2.0], &[1.0, 4.0]), -2.0);
    }

    #[test]
    fn test_metric_parse_roundtrip() {
        for m in [Metric::Accuracy, Metric::F1, Metric::NegMse] {
            assert_eq!(m.name().parse::<Metric>().unwrap(), m);
        }
        assert!("auc".parse::<Metric>().is_err());
    }
}
