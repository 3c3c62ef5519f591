//! Logistic regression classifiers
//!
//! Both variants wrap a [`LinearHead`] and delegate fitting to
//! [`gradient_descent`]; they only choose the output activation.
//! Predictions are class ids encoded as `f64`.

use crate::data::DataMatrix;
use crate::error::{BenchError, Result};
use crate::model::train::{gradient_descent, LinearHead, OutputActivation, TrainOptions};
use crate::model::{Model, TrainParams};

/// Multiclass logistic regression (softmax output)
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    head: LinearHead,
    num_classes: usize,
    activation: OutputActivation,
}

impl LogisticRegression {
    pub fn new(input_dim: usize, num_classes: usize) -> Self {
        Self::with_activation(input_dim, num_classes, OutputActivation::Softmax)
    }

    fn with_activation(input_dim: usize, num_classes: usize, activation: OutputActivation) -> Self {
        Self {
            head: LinearHead::zeros(input_dim, activation.outputs(num_classes)),
            num_classes,
            activation,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Class probabilities per row
    pub fn predict_proba(&self, x: &DataMatrix) -> Result<Vec<Vec<f64>>> {
        if x.n_rows() > 0 && x.n_cols() != self.head.input_dim() {
            return Err(BenchError::Model(format!(
                "expected {} features, got {}",
                self.head.input_dim(),
                x.n_cols()
            )));
        }
        let outputs = self.activation.outputs(self.num_classes);
        Ok(x.rows()
            .map(|sample| {
                let mut probs = vec![0.0; outputs];
                self.head.logits(sample, &mut probs);
                self.activation.activate(&mut probs);
                probs
            })
            .collect())
    }
}

impl Model for LogisticRegression {
    fn fit(&mut self, x: &DataMatrix, y: &[f64], params: &TrainParams) -> Result<()> {
        let options = TrainOptions::from_params(params)?;
        gradient_descent(
            &mut self.head,
            self.activation,
            x,
            y,
            self.num_classes,
            &options,
        )
    }

    fn predict(&self, x: &DataMatrix) -> Result<Vec<f64>> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|probs| self.activation.decide(probs) as f64)
            .collect())
    }
}

/// Two-class logistic regression with a single sigmoid output
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryLogisticRegression {
    inner: LogisticRegression,
}

impl BinaryLogisticRegression {
    pub fn new(input_dim: usize) -> Self {
        Self {
            inner: LogisticRegression::with_activation(input_dim, 2, OutputActivation::Sigmoid),
        }
    }

    /// Probability of class 1 per row
    pub fn predict_proba(&self, x: &DataMatrix) -> Result<Vec<f64>> {
        Ok(self.inner.predict_proba(x)?.into_iter().map(|p| p[0]).collect())
    }
}

impl Model for BinaryLogisticRegression {
    fn fit(&mut self, x: &DataMatrix, y: &[f64], params: &TrainParams) -> Result<()> {
        self.inner.fit(x, y, params)
    }

    fn predict(&self, x: &DataMatrix) -> Result<Vec<f64>> {
        self.inner.predict(x)
    }
}
