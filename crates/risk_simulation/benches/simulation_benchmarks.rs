//! Benchmarks for the GBM simulation hot path.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use risk_simulation::{MonteCarloConfig, MonteCarloEngine, SimulationParameters};

fn bench_path_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("gbm_paths");

    for &num_paths in &[1_000usize, 10_000, 100_000] {
        let params = SimulationParameters::new(100.0, 0.05, 0.2, 1.0, 252, num_paths)
            .unwrap()
            .with_seed(42);

        group.bench_with_input(
            BenchmarkId::new("antithetic", num_paths),
            &params,
            |b, params| {
                let engine = MonteCarloEngine::with_defaults();
                b.iter(|| engine.run(params).unwrap());
            },
        );

        group.bench_with_input(
            BenchmarkId::new("plain", num_paths),
            &params,
            |b, params| {
                let engine = MonteCarloEngine::new(MonteCarloConfig {
                    antithetic: false,
                    batch_size: 1024,
                });
                b.iter(|| engine.run(params).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_path_generation);
criterion_main!(benches);
