//! Shared full-batch gradient descent for linear classifiers
//!
//! Binary and multiclass logistic regression differ only in how logits turn
//! into probabilities and decisions. That difference lives in
//! [`OutputActivation`]; the fitting loop is the same for both.

use crate::data::DataMatrix;
use crate::error::{BenchError, Result};
use crate::model::params::{param_f64, param_usize, TrainParams};

/// Output strategy of a linear classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    /// One logit, probability of class 1
    Sigmoid,
    /// One logit per class, normalized with softmax
    Softmax,
}

impl OutputActivation {
    /// Number of linear outputs needed for `num_classes`
    pub fn outputs(self, num_classes: usize) -> usize {
        match self {
            OutputActivation::Sigmoid => 1,
            OutputActivation::Softmax => num_classes,
        }
    }

    /// Turn logits into probabilities in place
    pub fn activate(self, logits: &mut [f64]) {
        match self {
            OutputActivation::Sigmoid => {
                for z in logits.iter_mut() {
                    *z = 1.0 / (1.0 + (-*z).exp());
                }
            }
            OutputActivation::Softmax => {
                let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for z in logits.iter_mut() {
                    *z = (*z - max).exp();
                    sum += *z;
                }
                for z in logits.iter_mut() {
                    *z /= sum;
                }
            }
        }
    }

    /// Cross-entropy gradient with respect to the logits: `p - onehot(label)`
    fn logit_gradient(self, probs: &[f64], label: usize, out: &mut [f64]) {
        match self {
            OutputActivation::Sigmoid => {
                out[0] = probs[0] - if label == 1 { 1.0 } else { 0.0 };
            }
            OutputActivation::Softmax => {
                for (k, (g, p)) in out.iter_mut().zip(probs).enumerate() {
                    *g = p - if k == label { 1.0 } else { 0.0 };
                }
            }
        }
    }

    /// Class decision from probabilities; ties resolve to the lower class
    pub fn decide(self, probs: &[f64]) -> usize {
        match self {
            OutputActivation::Sigmoid => usize::from(probs[0] > 0.5),
            OutputActivation::Softmax => {
                let mut best = 0;
                for (k, p) in probs.iter().enumerate() {
                    if *p > probs[best] {
                        best = k;
                    }
                }
                best
            }
        }
    }
}

/// Optimizer settings read from `TrainParams`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub epochs: usize,
    pub lr: f64,
    pub l2: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            lr: 0.1,
            l2: 0.0,
        }
    }
}

impl TrainOptions {
    /// Recognized keys: `epochs`, `lr`, `l2`
    pub fn from_params(params: &TrainParams) -> Result<Self> {
        let defaults = Self::default();
        let options = Self {
            epochs: param_usize(params, "epochs", defaults.epochs)?,
            lr: param_f64(params, "lr", defaults.lr)?,
            l2: param_f64(params, "l2", defaults.l2)?,
        };
        if options.lr.is_nan() || options.lr <= 0.0 || options.l2 < 0.0 {
            return Err(BenchError::Model(format!(
                "lr must be positive and l2 non-negative, got lr={} l2={}",
                options.lr, options.l2
            )));
        }
        Ok(options)
    }
}

/// Weights of a linear map `input_dim -> outputs`, bias stored last per row
#[derive(Debug, Clone, PartialEq)]
pub struct LinearHead {
    input_dim: usize,
    outputs: usize,
    weights: Vec<f64>,
}

impl LinearHead {
    pub fn zeros(input_dim: usize, outputs: usize) -> Self {
        Self {
            input_dim,
            outputs,
            weights: vec![0.0; outputs * (input_dim + 1)],
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn reset(&mut self) {
        self.weights.iter_mut().for_each(|w| *w = 0.0);
    }

    /// Write the logits for one sample into `out`
    pub fn logits(&self, sample: &[f64], out: &mut [f64]) {
        let stride = self.input_dim + 1;
        for (k, z) in out.iter_mut().enumerate().take(self.outputs) {
            let row = &self.weights[k * stride..(k + 1) * stride];
            *z = row[self.input_dim]
                + row[..self.input_dim]
                    .iter()
                    .zip(sample)
                    .map(|(w, x)| w * x)
                    .sum::<f64>();
        }
    }
}

/// Validate that labels are class ids in `0..num_classes`
pub(crate) fn class_labels(y: &[f64], num_classes: usize) -> Result<Vec<usize>> {
    y.iter()
        .map(|&v| {
            if v.fract() == 0.0 && v >= 0.0 && (v as usize) < num_classes {
                Ok(v as usize)
            } else {
                Err(BenchError::Model(format!(
                    "label {} is not a class id in 0..{}",
                    v, num_classes
                )))
            }
        })
        .collect()
}

/// Fit `head` from zero with full-batch gradient descent on cross-entropy
///
/// Training on an empty subset leaves the head at zero, which predicts the
/// lowest class everywhere.
pub fn gradient_descent(
    head: &mut LinearHead,
    activation: OutputActivation,
    x: &DataMatrix,
    y: &[f64],
    num_classes: usize,
    options: &TrainOptions,
) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(BenchError::Model(format!(
            "{} rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    if x.n_rows() > 0 && x.n_cols() != head.input_dim {
        return Err(BenchError::Model(format!(
            "expected {} features, got {}",
            head.input_dim,
            x.n_cols()
        )));
    }
    let labels = class_labels(y, num_classes)?;

    head.reset();
    if labels.is_empty() {
        return Ok(());
    }

    let stride = head.input_dim + 1;
    let n = labels.len() as f64;
    let mut grad = vec![0.0; head.weights.len()];
    let mut probs = vec![0.0; head.outputs];
    let mut delta = vec![0.0; head.outputs];

    for _ in 0..options.epochs {
        grad.iter_mut().for_each(|g| *g = 0.0);

        for (sample, &label) in x.rows().zip(&labels) {
            head.logits(sample, &mut probs);
            activation.activate(&mut probs);
            activation.logit_gradient(&probs, label, &mut delta);

            for (k, d) in delta.iter().enumerate() {
                let row = &mut grad[k * stride..(k + 1) * stride];
                for (g, xi) in row.iter_mut().zip(sample) {
                    *g += d * xi;
                }
                row[head.input_dim] += d;
            }
        }

        for (i, (w, g)) in head.weights.iter_mut().zip(&grad).enumerate() {
            // bias is not regularized
            let decay = if i % stride == head.input_dim {
                0.0
            } else {
                options.l2 * *w
            };
            *w -= options.lr * (g / n + decay);
        }
    }

    Ok(())
}
