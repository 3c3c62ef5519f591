use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;
use valora::cli::{Cli, OutputFormat};
use valora::config::ExperimentConfig;
use valora::data::Dataset;
use valora::evaluator::PrecomputedEvaluator;
use valora::loader::{DataLoader, Loader, SplitSizes};
use valora::mediator::ExperimentMediator;
use valora::metrics::Metric;
use valora::model::{LogisticRegression, ParamValue};
use valora::output::{self, ExperimentReport};
use valora::ranking::EvalSplit;
use valora::registry::{DatasetRegistry, Register};
use valora::sweep::{ParamGrid, ParamSweep};

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Merge the config file, if any, with command-line overrides
fn build_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_toml(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    if let Some(percentile) = cli.percentile {
        config.percentile = percentile;
    }
    if let Some(order) = cli.order {
        config.order = order;
    }
    if let Some(bin_size) = cli.bin_size {
        config.bin_size = bin_size;
    }
    if let Some(epochs) = cli.epochs {
        config
            .train_params
            .insert("epochs".to_string(), ParamValue::Int(epochs));
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(metric) = cli.metric {
        config.metric_name = metric.name().to_string();
    }

    if let Err(e) = config.validate() {
        bail!("Invalid configuration: {}", e);
    }
    Ok(config)
}

fn build_registry(cli: &Cli) -> Result<DatasetRegistry> {
    let mut registry = DatasetRegistry::with_builtins()?;
    if let Some(path) = &cli.registry {
        registry
            .load_toml(path)
            .with_context(|| format!("Failed to load dataset registry: {}", path.display()))?;
    }
    Ok(registry)
}

fn load_dataset(cli: &Cli, mut registry: DatasetRegistry, rng: &mut StdRng) -> Result<Dataset> {
    let name = match &cli.data_csv {
        Some(path) => {
            let name = csv_dataset_name(path);
            registry.register(Register::from_csv(&name, path, &cli.label_column).categorical())?;
            name
        }
        None => cli.dataset.clone(),
    };

    registry
        .load(&name, rng)
        .with_context(|| format!("Failed to load dataset '{}'", name))
}

fn csv_dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| format!("csv:{}", s.to_string_lossy()))
        .unwrap_or_else(|| "csv".to_string())
}

fn build_evaluator(
    cli: &Cli,
    loader: &DataLoader,
    num_features: usize,
    num_classes: usize,
    metric: Metric,
    rng: &mut StdRng,
) -> Result<PrecomputedEvaluator<LogisticRegression>> {
    let model = LogisticRegression::new(num_features, num_classes);
    match &cli.values {
        Some(path) => PrecomputedEvaluator::from_csv(
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "values".to_string()),
            path,
            loader.train_indices(),
            model,
            metric,
        )
        .with_context(|| format!("Failed to load data values: {}", path.display())),
        None => {
            let values = (0..loader.train_indices().len())
                .map(|_| rng.gen::<f64>())
                .collect();
            Ok(PrecomputedEvaluator::new("random", values, model, metric))
        }
    }
}

fn print_report(report: &ExperimentReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.format()),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Csv => print!("{}", report.to_csv()),
    }
    Ok(())
}

fn run_sweep(
    cli: &Cli,
    loader: &DataLoader,
    model: &LogisticRegression,
    metric: Metric,
    samples: usize,
) -> Result<()> {
    let mut grid = ParamGrid::new();
    for (name, values) in &cli.sweep {
        if grid.insert(name.clone(), values.clone()).is_some() {
            bail!("Parameter '{}' given to --sweep more than once", name);
        }
    }

    let sweep = ParamSweep::new(
        model,
        loader,
        |y_true: &[f64], y_pred: &[f64]| metric.score(y_true, y_pred),
        samples,
    )?;
    let results = sweep.sweep(&grid)?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Csv => output::write_sweep_csv(&results, std::io::stdout().lock())?,
        OutputFormat::Text => print!("{}", output::format_sweep(&results)),
    }
    Ok(())
}

/// Reject empty held-out splits before any model is trained
fn check_eval_split(loader: &DataLoader, split: EvalSplit, context: &str) -> Result<()> {
    let (len, name, flag) = match split {
        EvalSplit::Valid => (loader.valid_indices().len(), "validation", "--valid"),
        EvalSplit::Test => (loader.test_indices().len(), "test", "--test"),
    };
    if len == 0 {
        bail!("{} needs a non-empty {} split, pass {} > 0", context, name, flag);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let registry = build_registry(&cli)?;
    if cli.list_datasets {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = build_config(&cli)?;
    let metric: Metric = config
        .metric_name
        .parse()
        .context("Failed to resolve scoring metric")?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!(seed = ?config.seed, "initial random seed");

    let dataset = load_dataset(&cli, registry, &mut rng)?;
    let num_classes = dataset
        .num_classes()
        .context("Labels must be non-negative integer class ids")?
        .max(2);
    let num_features = dataset.covariates.n_cols();

    let sizes = SplitSizes {
        train: cli.train,
        valid: cli.valid,
        test: cli.test,
    };
    let mut loader =
        DataLoader::split(&dataset, sizes, &mut rng).context("Failed to split dataset")?;
    if cli.noise_rate > 0.0 {
        loader
            .noisify(cli.noise_rate, &mut rng)
            .context("Failed to inject label noise")?;
    }

    if !cli.sweep.is_empty() {
        check_eval_split(&loader, EvalSplit::Valid, "Parameter sweep")?;
        let model = LogisticRegression::new(num_features, num_classes);
        return run_sweep(&cli, &loader, &model, metric, config.sweep_samples);
    }

    if let Some(split) = cli.experiment.eval_split() {
        check_eval_split(&loader, split, &format!("Experiment '{}'", cli.experiment))?;
    }

    if cli.experiment.needs_noise() && loader.noisy_indices().is_none() {
        bail!(
            "Experiment '{}' needs corrupted labels, pass --noise-rate",
            cli.experiment
        );
    }

    let evaluator = build_evaluator(&cli, &loader, num_features, num_classes, metric, &mut rng)?;
    let mediator = ExperimentMediator::new(&loader, vec![evaluator], config)?;
    let report = mediator.evaluate(cli.experiment);

    if report.results.is_empty() {
        let reasons: Vec<String> = report
            .skipped
            .iter()
            .map(|s| format!("{}: {}", s.evaluator, s.error))
            .collect();
        bail!("Experiment '{}' failed: {}", cli.experiment, reasons.join("; "));
    }

    print_report(&report, cli.format)
}
