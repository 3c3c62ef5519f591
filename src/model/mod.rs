//! Predictive model contract consumed by every experiment
//!
//! Experiments never train the evaluator's model directly: they clone the
//! template once per bin, fit the clone on an index subset and drop it after
//! scoring. `Clone` is therefore part of the contract, and a clone must not
//! share weights or optimizer state with its source.

mod logistic;
mod params;
mod train;

pub use logistic::{BinaryLogisticRegression, LogisticRegression};
pub use params::{param_f64, param_usize, ParamValue, TrainParams};
pub use train::{gradient_descent, LinearHead, OutputActivation, TrainOptions};

use crate::data::DataMatrix;
use crate::error::Result;

/// A cloneable, fittable, predictable model handle
pub trait Model: Clone {
    /// Fit on `(x, y)` in place, starting from freshly initialized parameters
    fn fit(&mut self, x: &DataMatrix, y: &[f64], params: &TrainParams) -> Result<()>;

    /// Predict one target per row of `x`
    fn predict(&self, x: &DataMatrix) -> Result<Vec<f64>>;
}
