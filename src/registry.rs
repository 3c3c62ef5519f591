use crate::data::{minmax_scale, DataMatrix, Dataset};
use crate::error::{BenchError, Result};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces covariates and labels together
pub type CovarLabelFn = Box<dyn Fn(&mut StdRng) -> Result<(DataMatrix, Vec<f64>)>>;
/// Produces covariates only
pub type CovarFn = Box<dyn Fn(&mut StdRng) -> Result<DataMatrix>>;
/// Produces labels only
pub type LabelFn = Box<dyn Fn(&mut StdRng) -> Result<Vec<f64>>>;
/// Applied to the covariates after loading
pub type CovarTransform = Box<dyn Fn(&DataMatrix) -> DataMatrix>;
/// Applied to the labels after loading
pub type LabelTransform = Box<dyn Fn(&[f64]) -> Vec<f64>>;

/// Where a registered dataset gets its data from
pub enum CovarLabelSource {
    /// One function returns `(covariates, labels)`
    Combined(CovarLabelFn),
    /// Covariates and labels come from separate functions
    Split { covariates: CovarFn, labels: LabelFn },
}

/// A named dataset definition
///
/// # Example Usage
/// ```no_run
/// use valora::registry::{DatasetRegistry, Register};
///
/// let mut registry = DatasetRegistry::with_builtins()?;
/// registry.register(Register::from_csv("wine", "wine.csv", "quality").categorical())?;
/// # Ok::<(), valora::BenchError>(())
/// ```
pub struct Register {
    name: String,
    categorical: bool,
    source: CovarLabelSource,
    covar_transform: Option<CovarTransform>,
    label_transform: Option<LabelTransform>,
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Register")
            .field("name", &self.name)
            .field("categorical", &self.categorical)
            .field("covar_transform", &self.covar_transform.is_some())
            .field("label_transform", &self.label_transform.is_some())
            .finish()
    }
}

impl Register {
    pub fn new(name: impl Into<String>, source: CovarLabelSource) -> Self {
        Self {
            name: name.into(),
            categorical: false,
            source,
            covar_transform: None,
            label_transform: None,
        }
    }

    /// Register from a single `(covariates, labels)` function
    pub fn from_covar_label_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut StdRng) -> Result<(DataMatrix, Vec<f64>)> + 'static,
    {
        Self::new(name, CovarLabelSource::Combined(Box::new(func)))
    }

    /// Register from separate covariate and label functions
    pub fn from_split_fns<C, L>(name: impl Into<String>, covariates: C, labels: L) -> Self
    where
        C: Fn(&mut StdRng) -> Result<DataMatrix> + 'static,
        L: Fn(&mut StdRng) -> Result<Vec<f64>> + 'static,
    {
        Self::new(
            name,
            CovarLabelSource::Split {
                covariates: Box::new(covariates),
                labels: Box::new(labels),
            },
        )
    }

    /// Register a CSV file with a header row; `label_column` names the target
    pub fn from_csv(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        label_column: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let label_column = label_column.into();
        Self::from_covar_label_fn(name, move |_| read_csv(&path, &label_column))
    }

    /// In-memory covariates and labels
    pub fn from_memory(name: impl Into<String>, covariates: DataMatrix, labels: Vec<f64>) -> Self {
        Self::from_covar_label_fn(name, move |_| Ok((covariates.clone(), labels.clone())))
    }

    /// Labels are class ids; loading fails if any label is not
    pub fn categorical(mut self) -> Self {
        self.categorical = true;
        self
    }

    pub fn with_covar_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&DataMatrix) -> DataMatrix + 'static,
    {
        self.covar_transform = Some(Box::new(transform));
        self
    }

    pub fn with_label_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + 'static,
    {
        self.label_transform = Some(Box::new(transform));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_categorical(&self) -> bool {
        self.categorical
    }

    /// Fetch the data and apply the registered transforms
    pub fn load(&self, rng: &mut StdRng) -> Result<Dataset> {
        let (mut covariates, mut labels) = match &self.source {
            CovarLabelSource::Combined(func) => func(rng)?,
            CovarLabelSource::Split { covariates, labels } => (covariates(rng)?, labels(rng)?),
        };

        if let Some(transform) = &self.covar_transform {
            covariates = transform(&covariates);
        }
        if let Some(transform) = &self.label_transform {
            labels = transform(&labels);
        }

        let dataset = Dataset::new(covariates, labels)?;
        if self.categorical && dataset.num_classes().is_none() {
            return Err(BenchError::Dataset(format!(
                "dataset '{}' is categorical but has non-integer labels",
                self.name
            )));
        }
        debug!(
            dataset = %self.name,
            rows = dataset.len(),
            features = dataset.covariates.n_cols(),
            "loaded dataset"
        );
        Ok(dataset)
    }
}

/// Registry of named datasets
///
/// Names are unique; registering a name twice is an error rather than a
/// silent overwrite.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, Register>,
}

#[derive(Debug, Deserialize)]
struct DatasetEntry {
    name: String,
    path: PathBuf,
    label_column: String,
    #[serde(default)]
    categorical: bool,
    #[serde(default)]
    scale_covariates: bool,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the synthetic generators
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(
            Register::from_covar_label_fn("gaussian_classifier", |rng| {
                gaussian_classifier(10_000, 10, rng)
            })
            .categorical(),
        )?;
        registry.register(
            Register::from_covar_label_fn("gaussian_classifier_high_dim", |rng| {
                gaussian_classifier(10_000, 100, rng)
            })
            .categorical(),
        )?;
        Ok(registry)
    }

    /// Add CSV datasets listed in a TOML file to this registry
    ///
    /// Relative paths resolve against the TOML file's directory.
    ///
    /// # Example TOML
    /// ```toml
    /// [[dataset]]
    /// name = "wine"
    /// path = "wine.csv"
    /// label_column = "quality"
    /// categorical = true
    /// scale_covariates = true
    /// ```
    pub fn load_toml<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = fs::read_to_string(path.as_ref())?;
        let base = path.as_ref().parent().map(Path::to_path_buf).unwrap_or_default();

        #[derive(Deserialize)]
        struct DatasetFile {
            dataset: Vec<DatasetEntry>,
        }

        let file: DatasetFile = toml::from_str(&content)?;
        for entry in file.dataset {
            let csv_path = if entry.path.is_absolute() {
                entry.path
            } else {
                base.join(entry.path)
            };
            let mut register = Register::from_csv(entry.name, csv_path, entry.label_column);
            if entry.categorical {
                register = register.categorical();
            }
            if entry.scale_covariates {
                register = register.with_covar_transform(|m| m.map_columns(minmax_scale));
            }
            self.register(register)?;
        }
        Ok(())
    }

    /// Add a dataset; fails if the name is taken
    pub fn register(&mut self, register: Register) -> Result<()> {
        if self.datasets.contains_key(register.name()) {
            return Err(BenchError::DuplicateDataset(register.name().to_string()));
        }
        self.datasets.insert(register.name().to_string(), register);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.datasets.get(name)
    }

    /// Load a registered dataset by name
    pub fn load(&self, name: &str, rng: &mut StdRng) -> Result<Dataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| BenchError::UnknownDataset(name.to_string()))?
            .load(rng)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

/// Standard-normal covariates with Bernoulli labels from a random logistic model
pub fn gaussian_classifier(
    n: usize,
    input_dim: usize,
    rng: &mut StdRng,
) -> Result<(DataMatrix, Vec<f64>)> {
    let covar: Vec<f64> = StandardNormal.sample_iter(&mut *rng).take(n * input_dim).collect();
    let beta: Vec<f64> = StandardNormal.sample_iter(&mut *rng).take(input_dim).collect();
    let covariates = DataMatrix::from_vec(n, input_dim, covar)?;

    let labels = covariates
        .rows()
        .map(|row| {
            let z: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
            let p = 1.0 / (1.0 + (-z).exp());
            if rng.gen::<f64>() < p {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    Ok((covariates, labels))
}

/// Read a headed CSV of numeric columns, splitting off `label_column`
pub fn read_csv(path: &Path, label_column: &str) -> Result<(DataMatrix, Vec<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let label_idx = headers
        .iter()
        .position(|h| h == label_column)
        .ok_or_else(|| {
            BenchError::Dataset(format!(
                "label column '{}' not found in {}",
                label_column,
                path.display()
            ))
        })?;

    let cols = headers.len() - 1;
    if cols == 0 {
        return Err(BenchError::Dataset(format!(
            "{} has no feature columns besides '{}'",
            path.display(),
            label_column
        )));
    }
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        for (col, field) in record.iter().enumerate() {
            let value: f64 = field.trim().parse().map_err(|_| {
                BenchError::Dataset(format!(
                    "{}: row {} column '{}' is not numeric: '{}'",
                    path.display(),
                    row + 1,
                    headers.get(col).unwrap_or("?"),
                    field
                ))
            })?;
            if col == label_idx {
                labels.push(value);
            } else {
                data.push(value);
            }
        }
    }

    let covariates = DataMatrix::from_vec(labels.len(), cols, data)?;
    Ok((covariates, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    fn tiny() -> Register {
        Register::from_memory(
            "tiny",
            DataMatrix::from_rows(&[vec![1.0, 10.0], vec![3.0, 20.0]]).unwrap(),
            vec![0.0, 1.0],
        )
    }

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = DatasetRegistry::new();
        registry.register(tiny()).unwrap();
        let err = registry.register(tiny()).unwrap_err();
        assert!(matches!(err, BenchError::DuplicateDataset(ref name) if name == "tiny"));
        assert_eq!(
            err.to_string(),
            "Dataset 'tiny' has been registered, names must be unique"
        );
    }

    #[test]
    fn test_unknown_dataset() {
        let registry = DatasetRegistry::new();
        assert!(matches!(
            registry.load("missing", &mut rng()),
            Err(BenchError::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = DatasetRegistry::with_builtins().unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["gaussian_classifier", "gaussian_classifier_high_dim"]);
        assert!(registry.get("gaussian_classifier").unwrap().is_categorical());
    }

    #[test]
    fn test_gaussian_classifier_shape_and_labels() {
        let (x, y) = gaussian_classifier(200, 4, &mut rng()).unwrap();
        assert_eq!(x.n_rows(), 200);
        assert_eq!(x.n_cols(), 4);
        assert!(y.iter().all(|&l| l == 0.0 || l == 1.0));
        // both classes appear with overwhelming probability
        assert!(y.contains(&0.0) && y.contains(&1.0));
    }

    #[test]
    fn test_gaussian_classifier_seeded() {
        let a = gaussian_classifier(50, 3, &mut rng()).unwrap();
        let b = gaussian_classifier(50, 3, &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_source_and_transforms() {
        let register = Register::from_split_fns(
            "split",
            |_| DataMatrix::from_rows(&[vec![2.0], vec![4.0], vec![6.0]]),
            |_| Ok(vec![1.0, 2.0, 3.0]),
        )
        .with_covar_transform(|m| m.map_columns(minmax_scale))
        .with_label_transform(|y| y.iter().map(|v| v - 1.0).collect());

        let ds = register.load(&mut rng()).unwrap();
        assert_eq!(ds.covariates.row(1), &[0.5]);
        assert_eq!(ds.labels, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_categorical_rejects_fractional_labels() {
        let register = Register::from_memory(
            "frac",
            DataMatrix::from_rows(&[vec![1.0]]).unwrap(),
            vec![0.5],
        )
        .categorical();
        assert!(matches!(register.load(&mut rng()), Err(BenchError::Dataset(_))));
    }

    #[test]
    fn test_read_csv_splits_label_column() {
        let file = csv_file("a,label,b\n1.0,0,2.0\n3.0,1,4.0\n");
        let (x, y) = read_csv(file.path(), "label").unwrap();
        assert_eq!(x.n_cols(), 2);
        assert_eq!(x.row(1), &[3.0, 4.0]);
        assert_eq!(y, vec![0.0, 1.0]);
    }

    #[test]
    fn test_read_csv_missing_label_column() {
        let file = csv_file("a,b\n1,2\n");
        assert!(matches!(
            read_csv(file.path(), "label"),
            Err(BenchError::Dataset(_))
        ));
    }

    #[test]
    fn test_read_csv_label_only_rejected() {
        let file = csv_file("label\n0\n1\n");
        match read_csv(file.path(), "label") {
            Err(BenchError::Dataset(msg)) => assert!(msg.contains("no feature columns")),
            other => panic!("expected dataset error, got {:?}", other.map(|(x, _)| x.n_cols())),
        }
    }

    #[test]
    fn test_read_csv_non_numeric() {
        let file = csv_file("a,label\nx,1\n");
        assert!(read_csv(file.path(), "label").is_err());
    }

    #[test]
    fn test_load_toml_registers_csv_datasets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("points.csv"), "x,y\n0,0\n10,1\n5,1\n").unwrap();
        let toml_path = dir.path().join("datasets.toml");
        fs::write(
            &toml_path,
            r#"
[[dataset]]
name = "points"
path = "points.csv"
label_column = "y"
categorical = true
scale_covariates = true
"#,
        )
        .unwrap();

        let mut registry = DatasetRegistry::new();
        registry.load_toml(&toml_path).unwrap();
        let ds = registry.load("points", &mut rng()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.covariates.row(2), &[0.5]);
        assert_eq!(ds.num_classes(), Some(2));
    }

    #[test]
    fn test_load_toml_duplicate_with_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("datasets.toml");
        fs::write(
            &toml_path,
            "[[dataset]]\nname = \"gaussian_classifier\"\npath = \"x.csv\"\nlabel_column = \"y\"\n",
        )
        .unwrap();
        let mut registry = DatasetRegistry::with_builtins().unwrap();
        assert!(matches!(
            registry.load_toml(&toml_path),
            Err(BenchError::DuplicateDataset(_))
        ));
    }
}
