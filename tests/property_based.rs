//! Property-based tests for the ranking and binning engine
//!
//! Covers orderings, bin layouts, discovery curves and result alignment
//! with random value arrays. Kept small enough to run as a quick gate.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use valora::config::ExperimentConfig;
use valora::data::{DataMatrix, Dataset};
use valora::evaluator::PrecomputedEvaluator;
use valora::experiment::{discover_corrupted_sample, EvalResult, AXIS};
use valora::loader::{DataLoader, Loader};
use valora::metrics::Metric;
use valora::model::LogisticRegression;
use valora::ranking::{BinPlan, Order, MIN_BIN_SIZE};

fn two_class_dataset(n: usize) -> Dataset {
    let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
    let labels = (0..n).map(|i| (i % 2) as f64).collect();
    Dataset::new(DataMatrix::from_rows(&rows).unwrap(), labels).unwrap()
}

fn order_strategy() -> impl Strategy<Value = Order> {
    prop_oneof![
        Just(Order::Random),
        Just(Order::Ascending),
        Just(Order::Descending),
        Just(Order::StableAscending),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_argsort_is_permutation(
        values in prop::collection::vec(-1000.0f64..1000.0, 0..200),
        order in order_strategy(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ordering = order.argsort(&values, &mut rng).unwrap();
        ordering.sort_unstable();
        let expected: Vec<usize> = (0..values.len()).collect();
        prop_assert_eq!(ordering, expected);
    }

    #[test]
    fn prop_ascending_is_sorted_and_stable(
        values in prop::collection::vec(prop_oneof![Just(0.0f64), Just(1.0), -5.0f64..5.0], 1..100),
    ) {
        let mut rng = StdRng::seed_from_u64(0);
        let ordering = Order::Ascending.argsort(&values, &mut rng).unwrap();
        for pair in ordering.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(values[a] <= values[b]);
            if values[a] == values[b] {
                prop_assert!(a < b);
            }
        }
    }

    #[test]
    fn prop_descending_reverses_value_order(
        values in prop::collection::vec(-100.0f64..100.0, 1..100),
    ) {
        let mut rng = StdRng::seed_from_u64(0);
        let ordering = Order::Descending.argsort(&values, &mut rng).unwrap();
        for pair in ordering.windows(2) {
            prop_assert!(values[pair[0]] >= values[pair[1]]);
        }
    }

    #[test]
    fn prop_bin_plan_invariants(n in 0usize..5000, percentile in 0.001f64..1.0) {
        let plan = BinPlan::from_percentile(n, percentile).unwrap();
        prop_assert!(plan.num_period >= MIN_BIN_SIZE);
        prop_assert_eq!(plan.num_bins, n / plan.num_period);
        prop_assert!(plan.num_bins * plan.num_period <= n);

        let boundaries: Vec<usize> = plan.boundaries().collect();
        prop_assert!(boundaries.iter().all(|&b| b < n.max(1)));
        prop_assert_eq!(boundaries.len(), (n + plan.num_period - 1) / plan.num_period);

        let axis = plan.axis();
        prop_assert_eq!(axis.len(), plan.num_bins);
        prop_assert!(axis.iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn prop_inclusive_boundaries_cover_all_points(n in 1usize..2000, percentile in 0.001f64..1.0) {
        let plan = BinPlan::from_percentile(n, percentile).unwrap();
        let last = plan.inclusive_boundaries().last().unwrap();
        prop_assert!(last >= n);
    }

    #[test]
    fn prop_discovery_is_monotonic_and_complete(
        values in prop::collection::vec(-10.0f64..10.0, 40),
        noise_rate in 0.05f64..0.5,
        seed in any::<u64>(),
    ) {
        let dataset = two_class_dataset(40);
        let mut loader = DataLoader::from_indices(&dataset, (0..40).collect(), Vec::new(), Vec::new());
        let mut rng = StdRng::seed_from_u64(seed);
        loader.noisify(noise_rate, &mut rng).unwrap();
        prop_assume!(!loader.noisy_indices().unwrap_or_default().is_empty());

        let evaluator = PrecomputedEvaluator::new(
            "prop",
            values,
            LogisticRegression::new(1, 2),
            Metric::Accuracy,
        );
        let result = discover_corrupted_sample(&evaluator, &loader, &ExperimentConfig::default()).unwrap();
        let found = result.curve("corrupt_found").unwrap();

        for pair in found.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        prop_assert_eq!(found.first().copied(), Some(0.0));
        prop_assert_eq!(found.last().copied(), Some(1.0));

        let optimal = result.curve("optimal").unwrap();
        prop_assert!(optimal.iter().all(|&v| (0.0..=1.0).contains(&v)));
        prop_assert_eq!(result.curve("random").unwrap(), result.axis().unwrap());
    }

    #[test]
    fn prop_aligned_truncates_to_axis(
        axis_len in 0usize..20,
        extra in 0usize..5,
    ) {
        let mut result = EvalResult::new();
        result.insert_curve(AXIS, (0..axis_len).map(|i| i as f64).collect());
        result.insert_curve("curve", vec![0.5; axis_len + extra]);
        result.insert_scalar("kmeans_f1", 0.5);

        let aligned = result.aligned();
        prop_assert!(aligned.is_aligned());
        prop_assert_eq!(aligned.curve("curve").unwrap().len(), axis_len);
        prop_assert_eq!(aligned.scalar("kmeans_f1"), Some(0.5));
    }
}

#[test]
fn test_argsort_rejects_nan() {
    let mut rng = StdRng::seed_from_u64(1);
    for order in [Order::Random, Order::Ascending, Order::Descending] {
        assert!(order.argsort(&[1.0, f64::NAN], &mut rng).is_err());
    }
}
