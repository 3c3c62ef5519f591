// Experiment configuration
//
// One struct carries every knob the benchmark procedures read, so the CLI,
// the mediator and TOML files all agree on defaults.

use crate::error::Result;
use crate::model::{ParamValue, TrainParams};
use crate::ranking::{Order, DEFAULT_BIN_SIZE, DEFAULT_PERCENTILE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings shared by all benchmark procedures
///
/// # Example
/// ```
/// use valora::config::ExperimentConfig;
///
/// let config = ExperimentConfig::default();
/// assert_eq!(config.percentile, 0.05); // 5% of the points per bin
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Fraction of the training split moved per bin
    ///
    /// Bins never shrink below 5 points regardless of this value.
    ///
    /// Default: 0.05
    pub percentile: f64,

    /// Step of the increasing-threshold sweep, in points
    ///
    /// Default: 1
    pub bin_size: usize,

    /// Label used in curve names, e.g. `random_add_accuracy`
    ///
    /// Default: "accuracy"
    pub metric_name: String,

    /// Ordering policy for point removal
    ///
    /// Default: random
    pub order: Order,

    /// Attach the `optimal` and `random` reference curves to discovery results
    ///
    /// Default: true
    pub reference_curves: bool,

    /// Seed for random orderings; `None` draws from entropy
    pub seed: Option<u64>,

    /// Fit/score repetitions per parameter combination in a sweep
    ///
    /// Default: 10
    pub sweep_samples: usize,

    /// Keyword arguments forwarded to every model fit
    pub train_params: TrainParams,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            percentile: DEFAULT_PERCENTILE,
            bin_size: DEFAULT_BIN_SIZE,
            metric_name: "accuracy".to_string(),
            order: Order::Random,
            reference_curves: true,
            seed: None,
            sweep_samples: 10,
            train_params: TrainParams::new(),
        }
    }
}

impl ExperimentConfig {
    /// Coarse bins and short training, for smoke runs
    pub fn quick() -> Self {
        let mut train_params = TrainParams::new();
        train_params.insert("epochs".to_string(), ParamValue::Int(25));
        Self {
            percentile: 0.10,
            bin_size: 5,
            sweep_samples: 3,
            train_params,
            ..Self::default()
        }
    }

    /// Fine bins and long training
    pub fn thorough() -> Self {
        let mut train_params = TrainParams::new();
        train_params.insert("epochs".to_string(), ParamValue::Int(500));
        Self {
            percentile: 0.02,
            bin_size: 1,
            sweep_samples: 30,
            train_params,
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML file; missing keys keep their defaults
    ///
    /// # Example TOML
    /// ```toml
    /// percentile = 0.1
    /// order = "descending"
    /// seed = 7
    ///
    /// [train_params]
    /// epochs = 200
    /// lr = 0.05
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.percentile.is_nan() || self.percentile <= 0.0 || self.percentile > 1.0 {
            return Err(format!(
                "percentile must be in (0, 1], got {}",
                self.percentile
            ));
        }

        if self.bin_size == 0 {
            return Err("bin_size must be >= 1".to_string());
        }

        if self.metric_name.is_empty() {
            return Err("metric_name must not be empty".to_string());
        }

        if self.sweep_samples < 2 {
            return Err(format!(
                "sweep_samples must be >= 2 for a sample standard deviation, got {}",
                self.sweep_samples
            ));
        }

        Ok(())
    }
}
