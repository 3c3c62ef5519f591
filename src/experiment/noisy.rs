//! Noisy-point detection by clustering the data values (aprender KMeans)
//!
//! Corrupted points should receive low values, so a two-cluster partition
//! of the 1-D value array separates them from the rest: the cluster holding
//! the lowest value is "corrupted", the one holding the highest is "correct".

use super::{training_values, EvalResult};
use crate::error::{BenchError, Result};
use crate::evaluator::DataEvaluator;
use crate::loader::Loader;
use crate::metrics::f1_score;
use aprender::cluster::KMeans;
use aprender::primitives::Matrix;
use aprender::traits::UnsupervisedEstimator;
use tracing::{debug, info};

/// Centers and sizes of the two value clusters
#[derive(Debug, Clone, PartialEq)]
struct ClusterSummary {
    centers: Vec<f64>,
    sizes: Vec<usize>,
}

impl ClusterSummary {
    fn from_assignments(values: &[f64], labels: &[usize]) -> Self {
        let k = labels.iter().copied().max().map_or(0, |m| m + 1);
        let mut centers = vec![0.0; k];
        let mut sizes = vec![0usize; k];

        for (&value, &cluster) in values.iter().zip(labels) {
            centers[cluster] += value;
            sizes[cluster] += 1;
        }

        for (center, &size) in centers.iter_mut().zip(&sizes) {
            if size > 0 {
                *center /= size as f64;
            }
        }

        Self { centers, sizes }
    }
}

/// Cluster the values into two groups and score them against the noisy set
///
/// The ground-truth vector marks every point "correct" except the loader's
/// noisy indices; F1 is computed with the corrupted cluster as the positive
/// class. Produces the scalar `"kmeans_f1"`.
///
/// # Errors
/// - [`BenchError::MissingCapability`] if the loader never injected noise
/// - [`BenchError::InsufficientData`] for fewer than 2 points
/// - [`BenchError::Degenerate`] when all values are identical once cast to
///   `f32`, the precision the clustering runs at
pub fn noisy_detection<E, L>(evaluator: &E, loader: &L) -> Result<EvalResult>
where
    E: DataEvaluator,
    L: Loader,
{
    let noisy = loader.noisy_indices().ok_or_else(|| {
        BenchError::MissingCapability(
            "noisy detection requires a loader with noisy indices".to_string(),
        )
    })?;
    let splits = loader.datapoints();
    let values = training_values(evaluator, &splits)?;
    let n = values.len();
    if n < 2 {
        return Err(BenchError::InsufficientData {
            required: 2,
            actual: n,
        });
    }
    if let Some(&i) = noisy.iter().find(|&&i| i >= n) {
        return Err(BenchError::InvalidConfig(format!(
            "noisy index {} outside training split of {} points",
            i, n
        )));
    }

    let (lowest, highest) = extreme_positions(&values)?;
    // KMeans runs in f32, so values that only differ below f32 resolution collapse
    if values[lowest] as f32 == values[highest] as f32 {
        return Err(BenchError::Degenerate(
            "all data values are identical at f32 precision, clustering is undefined"
                .to_string(),
        ));
    }

    info!(
        evaluator = evaluator.name(),
        points = n,
        noisy = noisy.len(),
        "noisy detection"
    );

    let labels = cluster_values(&values)?;
    let corrupted = labels[lowest];
    let correct = labels[highest];
    if corrupted == correct {
        return Err(BenchError::Degenerate(
            "lowest and highest data values fell into one cluster".to_string(),
        ));
    }

    let summary = ClusterSummary::from_assignments(&values, &labels);
    debug!(
        centers = ?summary.centers,
        sizes = ?summary.sizes,
        corrupted,
        correct,
        "value clusters"
    );

    let mut validation = vec![correct; n];
    for &i in noisy {
        validation[i] = corrupted;
    }
    let f1 = f1_score(&validation, &labels, &corrupted);

    let mut result = EvalResult::new();
    result.insert_scalar("kmeans_f1", f1);
    info!(evaluator = evaluator.name(), f1, "noisy detection finished");
    Ok(result)
}

/// Positions of the first minimum and first maximum value
fn extreme_positions(values: &[f64]) -> Result<(usize, usize)> {
    if let Some(pos) = values.iter().position(|v| v.is_nan()) {
        return Err(BenchError::Degenerate(format!(
            "data value at index {} is NaN",
            pos
        )));
    }
    let mut lowest = 0;
    let mut highest = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[lowest] {
            lowest = i;
        }
        if v > values[highest] {
            highest = i;
        }
    }
    Ok((lowest, highest))
}

/// Two-cluster assignment of a 1-D value array
fn cluster_values(values: &[f64]) -> Result<Vec<usize>> {
    let features_data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let features = Matrix::from_vec(values.len(), 1, features_data)
        .map_err(|e| BenchError::Model(format!("cannot build feature matrix: {}", e)))?;

    let mut kmeans = KMeans::new(2);
    kmeans
        .fit(&features)
        .map_err(|e| BenchError::Model(format!("kmeans fit failed: {}", e)))?;
    Ok(kmeans.predict(&features))
}
