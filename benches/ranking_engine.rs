//! Ranking & binning engine benchmark
//!
//! Measures the pieces every experiment pays for before any model is
//! trained: sorting data values, laying out bins and walking the sorted
//! order to count corrupted points.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench ranking_engine
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use valora::config::ExperimentConfig;
use valora::data::{DataMatrix, Dataset};
use valora::evaluator::PrecomputedEvaluator;
use valora::experiment::discover_corrupted_sample;
use valora::loader::DataLoader;
use valora::metrics::Metric;
use valora::model::LogisticRegression;
use valora::ranking::{BinPlan, Order};

fn random_values(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen::<f64>()).collect()
}

fn bench_argsort(c: &mut Criterion) {
    let mut group = c.benchmark_group("argsort");
    for &n in &[1_000usize, 10_000, 100_000] {
        let values = random_values(n, 42);
        for order in [Order::Ascending, Order::Descending, Order::Random] {
            group.bench_with_input(BenchmarkId::new(order.name(), n), &values, |b, values| {
                let mut rng = StdRng::seed_from_u64(7);
                b.iter(|| order.argsort(black_box(values), &mut rng));
            });
        }
    }
    group.finish();
}

fn bench_bin_plan(c: &mut Criterion) {
    c.bench_function("bin_plan_inclusive_boundaries_100k", |b| {
        b.iter(|| {
            let plan = BinPlan::from_percentile(black_box(100_000), black_box(0.01));
            plan.map(|p| p.inclusive_boundaries().count())
        });
    });
}

fn bench_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("discover_corrupted_sample");
    for &n in &[1_000usize, 10_000] {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let labels = (0..n).map(|i| (i % 2) as f64).collect();
        let dataset = match DataMatrix::from_rows(&rows).and_then(|m| Dataset::new(m, labels)) {
            Ok(dataset) => dataset,
            Err(e) => panic!("bench dataset: {}", e),
        };
        let mut loader = DataLoader::from_indices(&dataset, (0..n).collect(), Vec::new(), Vec::new());
        let mut rng = StdRng::seed_from_u64(3);
        if let Err(e) = loader.noisify(0.1, &mut rng) {
            panic!("bench noise: {}", e);
        }
        let evaluator = PrecomputedEvaluator::new(
            "bench",
            random_values(n, 11),
            LogisticRegression::new(1, 2),
            Metric::Accuracy,
        );
        let config = ExperimentConfig {
            percentile: 0.01,
            ..ExperimentConfig::default()
        };

        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| discover_corrupted_sample(black_box(&evaluator), &loader, &config));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_argsort, bench_bin_plan, bench_discovery);
criterion_main!(benches);
