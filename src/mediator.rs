//! Runs one experiment over several evaluators sharing a loader

use crate::config::ExperimentConfig;
use crate::error::{BenchError, Result};
use crate::evaluator::DataEvaluator;
use crate::experiment::{
    discover_corrupted_sample, increasing_bin_removal, noisy_detection, point_removal,
    remove_high_low, save_dataval, EvalResult,
};
use crate::loader::Loader;
use crate::output::ExperimentReport;
use crate::ranking::EvalSplit;
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Benchmark procedure selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Experiment {
    /// Retrain after removing bins in the configured order
    PointRemoval,
    /// Remove the lowest- and highest-valued bins side by side
    RemoveHighLow,
    /// Fraction of corrupted points found inspecting low values first
    DiscoverCorruptedSample,
    /// Retrain on every point below a rising value threshold
    IncreasingBinRemoval,
    /// Two-cluster separation of noisy points
    NoisyDetection,
    /// Export training rows with their data values
    SaveDataval,
}

impl Experiment {
    pub const ALL: [Experiment; 6] = [
        Experiment::PointRemoval,
        Experiment::RemoveHighLow,
        Experiment::DiscoverCorruptedSample,
        Experiment::IncreasingBinRemoval,
        Experiment::NoisyDetection,
        Experiment::SaveDataval,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Experiment::PointRemoval => "point-removal",
            Experiment::RemoveHighLow => "remove-high-low",
            Experiment::DiscoverCorruptedSample => "discover-corrupted-sample",
            Experiment::IncreasingBinRemoval => "increasing-bin-removal",
            Experiment::NoisyDetection => "noisy-detection",
            Experiment::SaveDataval => "save-dataval",
        }
    }

    /// True for experiments that read the loader's noisy indices
    pub fn needs_noise(self) -> bool {
        matches!(
            self,
            Experiment::DiscoverCorruptedSample | Experiment::NoisyDetection
        )
    }

    /// Held-out split the procedure scores retrained models on, if any
    pub fn eval_split(self) -> Option<EvalSplit> {
        match self {
            Experiment::PointRemoval => Some(EvalSplit::Valid),
            Experiment::RemoveHighLow | Experiment::IncreasingBinRemoval => Some(EvalSplit::Test),
            Experiment::DiscoverCorruptedSample
            | Experiment::NoisyDetection
            | Experiment::SaveDataval => None,
        }
    }

    /// Run this procedure for a single evaluator
    pub fn run<E, L, R>(
        self,
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
        match self {
            Experiment::PointRemoval => point_removal(evaluator, loader, config, rng),
            Experiment::RemoveHighLow => remove_high_low(evaluator, loader, config),
            Experiment::DiscoverCorruptedSample => {
                discover_corrupted_sample(evaluator, loader, config)
            }
            Experiment::IncreasingBinRemoval => increasing_bin_removal(evaluator, loader, config),
            Experiment::NoisyDetection => noisy_detection(evaluator, loader),
            Experiment::SaveDataval => save_dataval(evaluator, loader),
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Experiment {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.replace('_', "-");
        Experiment::ALL
            .into_iter()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| BenchError::InvalidConfig(format!("unknown experiment '{}'", s)))
    }
}

/// Evaluators and the loader they were computed against
///
/// One RNG, seeded from the configuration, drives every random ordering of
/// a run, so a seeded run is reproducible across all evaluators.
pub struct ExperimentMediator<'a, L, E> {
    loader: &'a L,
    evaluators: Vec<E>,
    config: ExperimentConfig,
}

impl<'a, L, E> ExperimentMediator<'a, L, E>
where
    L: Loader,
    E: DataEvaluator,
{
    pub fn new(loader: &'a L, evaluators: Vec<E>, config: ExperimentConfig) -> Result<Self> {
        config.validate().map_err(BenchError::InvalidConfig)?;
        Ok(Self {
            loader,
            evaluators,
            config,
        })
    }

    pub fn evaluators(&self) -> &[E] {
        &self.evaluators
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run `experiment` for every evaluator
    ///
    /// An evaluator whose run fails is reported under `skipped`; the others
    /// still run.
    pub fn evaluate(&self, experiment: Experiment) -> ExperimentReport {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            experiment = %experiment,
            evaluators = self.evaluators.len(),
            seed = ?self.config.seed,
            "starting experiment"
        );

        let mut report = ExperimentReport::new(experiment.name());
        for evaluator in &self.evaluators {
            match experiment.run(evaluator, self.loader, &self.config, &mut rng) {
                Ok(result) => report.add_result(evaluator.name(), result),
                Err(e) => {
                    warn!(evaluator = evaluator.name(), error = %e, "skipping evaluator");
                    report.add_skipped(evaluator.name(), e.to_string());
                }
            }
        }
        report
    }
}
