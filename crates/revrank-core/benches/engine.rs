//! Benchmarks for per-algorithm metric computation and significance testing.
//!
//! Run with: `cargo bench -p revrank-core --bench engine`
//!
//! Inputs are synthetic but deterministic: every request has three reviewers
//! drawn from a pool of 200 developers and every ranked list holds 30
//! candidates.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use revrank_core::config::EvaluationConfig;
use revrank_core::evaluation::{GroundTruth, MetricsEngine, SignificanceTester};
use revrank_core::types::{AlgorithmResult, CandidateId, RequestId};
use std::collections::BTreeMap;

const POOL: u64 = 200;
const LIST_LEN: u64 = 30;

// =============================================================================
// Test Data Generation
// =============================================================================

fn ground_truth(requests: u64) -> GroundTruth {
    GroundTruth::from_pairs((0..requests).map(|id| {
        let reviewers: Vec<String> = (0..3)
            .map(|i| format!("dev{}", (id * 7 + i * 13) % POOL))
            .collect();
        (id, reviewers)
    }))
}

fn algorithm(requests: u64, seed: u64) -> AlgorithmResult {
    (0..requests)
        .map(|id| {
            let list = (0..LIST_LEN)
                .map(|rank| {
                    let dev = (id * 7 + rank * (seed + 3)) % POOL;
                    (
                        CandidateId::new(format!("dev{}", dev)),
                        1.0 - rank as f64 / LIST_LEN as f64,
                    )
                })
                .collect();
            (RequestId::from_u64(id), list)
        })
        .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_engine_by_requests(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/compute_by_requests");
    group.sample_size(50);

    let engine = MetricsEngine::new(&EvaluationConfig::default());
    for size in [100u64, 1_000, 10_000] {
        let gt = ground_truth(size);
        let result = algorithm(size, 1);

        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| engine.compute("bench", black_box(&gt), black_box(&result)))
        });
    }
    group.finish();
}

fn bench_significance_by_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("significance/by_algorithms");
    group.sample_size(50);

    let config = EvaluationConfig::default();
    let engine = MetricsEngine::new(&config);
    let tester = SignificanceTester::new(&config);
    let gt = ground_truth(1_000);

    for algorithms in [2u64, 5, 10] {
        let bundles: BTreeMap<String, _> = (0..algorithms)
            .filter_map(|seed| {
                engine
                    .compute("bench", &gt, &algorithm(1_000, seed))
                    .ok()
                    .flatten()
                    .map(|bundle| (format!("algo{}", seed), bundle))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(algorithms),
            &algorithms,
            |b, _| b.iter(|| tester.test(black_box(&bundles))),
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_engine_by_requests,
    bench_significance_by_algorithms
);
criterion_main!(benches);
