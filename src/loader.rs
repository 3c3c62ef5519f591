//! Loader contract and an in-memory implementation
//!
//! A loader owns the train/valid/test splits and, optionally, the indices of
//! training points whose labels were corrupted. Experiments only ever borrow
//! a loader immutably.

use crate::data::{subset_labels, DataMatrix, Dataset};
use crate::error::{BenchError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Borrowed view of the six data splits, always in this order
#[derive(Debug, Clone, Copy)]
pub struct Splits<'a> {
    pub x_train: &'a DataMatrix,
    pub y_train: &'a [f64],
    pub x_valid: &'a DataMatrix,
    pub y_valid: &'a [f64],
    pub x_test: &'a DataMatrix,
    pub y_test: &'a [f64],
}

/// Source of data splits and corruption ground truth
pub trait Loader {
    /// `(x_train, y_train, x_valid, y_valid, x_test, y_test)`
    fn datapoints(&self) -> Splits<'_>;

    /// Training indices with corrupted labels, `None` if noise was never injected
    fn noisy_indices(&self) -> Option<&[usize]>;

    /// Original dataset row of every training point
    fn train_indices(&self) -> &[usize];
}

/// Number of rows assigned to each split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    pub train: usize,
    pub valid: usize,
    pub test: usize,
}

impl SplitSizes {
    /// Convert fractions of `n` into counts (floored)
    pub fn from_fractions(n: usize, train: f64, valid: f64, test: f64) -> Result<Self> {
        let fractions = [train, valid, test];
        if fractions.iter().any(|f| !(0.0..=1.0).contains(f)) || train + valid + test > 1.0 + 1e-9 {
            return Err(BenchError::InvalidConfig(format!(
                "split fractions must lie in [0, 1] and sum to at most 1, got {}/{}/{}",
                train, valid, test
            )));
        }
        Ok(Self {
            train: (n as f64 * train).floor() as usize,
            valid: (n as f64 * valid).floor() as usize,
            test: (n as f64 * test).floor() as usize,
        })
    }

    pub fn total(&self) -> usize {
        self.train + self.valid + self.test
    }
}

/// In-memory loader built from a [`Dataset`]
#[derive(Debug, Clone)]
pub struct DataLoader {
    x_train: DataMatrix,
    y_train: Vec<f64>,
    x_valid: DataMatrix,
    y_valid: Vec<f64>,
    x_test: DataMatrix,
    y_test: Vec<f64>,
    train_indices: Vec<usize>,
    valid_indices: Vec<usize>,
    test_indices: Vec<usize>,
    noisy_indices: Option<Vec<usize>>,
    num_classes: Option<usize>,
}

impl DataLoader {
    /// Shuffle the dataset and cut it into train/valid/test
    pub fn split<R: Rng + ?Sized>(dataset: &Dataset, sizes: SplitSizes, rng: &mut R) -> Result<Self> {
        if sizes.total() > dataset.len() {
            return Err(BenchError::InvalidConfig(format!(
                "requested {} points but dataset has {}",
                sizes.total(),
                dataset.len()
            )));
        }
        if sizes.train == 0 {
            return Err(BenchError::InvalidConfig(
                "training split must not be empty".to_string(),
            ));
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(rng);

        let train_indices = order[..sizes.train].to_vec();
        let valid_indices = order[sizes.train..sizes.train + sizes.valid].to_vec();
        let test_indices = order[sizes.train + sizes.valid..sizes.total()].to_vec();

        debug!(
            train = train_indices.len(),
            valid = valid_indices.len(),
            test = test_indices.len(),
            "split dataset"
        );

        Ok(Self::from_indices(dataset, train_indices, valid_indices, test_indices))
    }

    /// Build splits from explicit row indices, keeping the given order
    pub fn from_indices(
        dataset: &Dataset,
        train_indices: Vec<usize>,
        valid_indices: Vec<usize>,
        test_indices: Vec<usize>,
    ) -> Self {
        let x = &dataset.covariates;
        let y = &dataset.labels;
        Self {
            x_train: x.subset(&train_indices),
            y_train: subset_labels(y, &train_indices),
            x_valid: x.subset(&valid_indices),
            y_valid: subset_labels(y, &valid_indices),
            x_test: x.subset(&test_indices),
            y_test: subset_labels(y, &test_indices),
            train_indices,
            valid_indices,
            test_indices,
            noisy_indices: None,
            num_classes: dataset.num_classes(),
        }
    }

    /// Flip the labels of `round(noise_rate * n_train)` random training points
    ///
    /// Each selected label moves to a different class chosen uniformly. Only
    /// the training split is corrupted; the selected indices become the
    /// loader's ground-truth `noisy_indices`.
    pub fn noisify<R: Rng + ?Sized>(&mut self, noise_rate: f64, rng: &mut R) -> Result<()> {
        if !(0.0..=1.0).contains(&noise_rate) {
            return Err(BenchError::InvalidConfig(format!(
                "noise_rate must be in [0, 1], got {}",
                noise_rate
            )));
        }
        let num_classes = match self.num_classes {
            Some(k) if k >= 2 => k,
            _ => {
                return Err(BenchError::Dataset(
                    "label noise requires at least two integer classes".to_string(),
                ))
            }
        };

        let n = self.y_train.len();
        let num_noisy = (n as f64 * noise_rate).round() as usize;
        let mut noisy = rand::seq::index::sample(rng, n, num_noisy).into_vec();
        noisy.sort_unstable();

        for &i in &noisy {
            let shift = rng.gen_range(1..num_classes);
            let old = self.y_train[i] as usize;
            self.y_train[i] = ((old + shift) % num_classes) as f64;
        }

        debug!(noisy = noisy.len(), noise_rate, "injected label noise");
        self.noisy_indices = Some(noisy);
        Ok(())
    }

    pub fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    pub fn valid_indices(&self) -> &[usize] {
        &self.valid_indices
    }

    pub fn test_indices(&self) -> &[usize] {
        &self.test_indices
    }
}

impl Loader for DataLoader {
    fn datapoints(&self) -> Splits<'_> {
        Splits {
            x_train: &self.x_train,
            y_train: &self.y_train,
            x_valid: &self.x_valid,
            y_valid: &self.y_valid,
            x_test: &self.x_test,
            y_test: &self.y_test,
        }
    }

    fn noisy_indices(&self) -> Option<&[usize]> {
        self.noisy_indices.as_deref()
    }

    fn train_indices(&self) -> &[usize] {
        &self.train_indices
    }
}
