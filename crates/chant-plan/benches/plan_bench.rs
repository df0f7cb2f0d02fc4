//! Benchmarks for chant tier planning
//!
//! Measures performance of:
//! - Cell-size planning at population scale
//! - Tier allocation across shapes
//! - Idea partitioning

use chant_plan::{allocate_tier, partition_ideas, plan_cell_sizes};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Benchmark cell-size planning at different population scales
fn bench_plan_cell_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_cell_sizes");

    for &n in &[16usize, 100, 1_000, 10_000, 100_000, 1_000_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| plan_cell_sizes(black_box(n)))
        });
    }
    group.finish();
}

/// Benchmark full tier allocation (roster + pool -> blueprints)
fn bench_allocate_tier(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_tier");

    // (roster, ideas) pairs covering unique, batched, and showdown shapes
    let shapes = [
        ("unique", 1_000usize, 1_000usize),
        ("batched", 1_000, 50),
        ("showdown", 1_000, 5),
        ("unique_large", 100_000, 100_000),
    ];

    for (name, people, ideas) in shapes {
        let roster: Vec<u64> = (0..people as u64).collect();
        let pool: Vec<u64> = (0..ideas as u64).collect();
        let plan = plan_cell_sizes(people);

        group.throughput(Throughput::Elements(people as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(&roster, &pool, &plan),
            |b, (roster, pool, plan)| b.iter(|| allocate_tier(roster, pool, plan)),
        );
    }
    group.finish();
}

/// Benchmark idea partitioning
fn bench_partition_ideas(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_ideas");

    for &n in &[25usize, 250, 2_500, 25_000] {
        let pool: Vec<u64> = (0..n as u64).collect();
        let batches = n.div_ceil(5);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &pool, |b, pool| {
            b.iter(|| partition_ideas(black_box(pool), batches))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_plan_cell_sizes,
    bench_allocate_tier,
    bench_partition_ideas,
);

criterion_main!(benches);
