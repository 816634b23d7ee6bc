use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_tail_fit(c: &mut Criterion) {
    // Deterministic heavy-tailed sample: inverse-CDF of a Pareto(2.2, 1.0) on a grid.
    let xs: Vec<f64> =
        (1..2_000).map(|i| (1.0 - i as f64 / 2_000.0).powf(-1.0 / 1.2)).collect();

    c.bench_function("pareto_fit_tail_2k", |b| {
        b.iter(|| black_box(bf_prob::pareto::fit_tail(black_box(&xs), 50)).unwrap())
    });

    c.bench_function("nanquantile_2k", |b| {
        b.iter(|| black_box(bf_prob::math::nanquantile(black_box(&xs), 0.9)))
    });

    c.bench_function("lognormal_fit_2k", |b| {
        b.iter(|| black_box(bf_prob::lognormal::fit_mle(black_box(&xs))).unwrap())
    });
}

criterion_group!(benches, bench_tail_fit);
criterion_main!(benches);
