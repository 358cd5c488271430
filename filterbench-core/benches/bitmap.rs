//! Benchmarks for filter bitmap construction under each schema.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use filterbench_core::{build_bitmap, EmRangeItem, EmRangeQuery, ItemAttributes, QueryAttributes, Range};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const N_QUERIES: usize = 100;

fn attributes(n_items: usize, rng: &mut StdRng) -> Vec<(&'static str, ItemAttributes, QueryAttributes)> {
    let em_items: Vec<i32> = (0..n_items).map(|_| rng.gen_range(0..16)).collect();
    let em_queries: Vec<i32> = (0..N_QUERIES).map(|_| rng.gen_range(0..16)).collect();

    let r_items: Vec<i32> = (0..n_items).map(|_| rng.gen_range(0..1000)).collect();
    let r_queries: Vec<Range> = (0..N_QUERIES)
        .map(|_| {
            let start = rng.gen_range(0..900);
            Range::new(start, start + 100)
        })
        .collect();

    let emis_items: Vec<Vec<i32>> = (0..n_items)
        .map(|_| (0..rng.gen_range(1..6)).map(|_| rng.gen_range(0..32)).collect())
        .collect();
    let emis_queries: Vec<i32> = (0..N_QUERIES).map(|_| rng.gen_range(0..32)).collect();

    let em_r_items: Vec<EmRangeItem> = (0..n_items)
        .map(|_| EmRangeItem {
            em: rng.gen_range(0..4),
            r: rng.gen_range(0..1000),
        })
        .collect();
    let em_r_queries: Vec<EmRangeQuery> = (0..N_QUERIES)
        .map(|_| {
            let start = rng.gen_range(0..900);
            EmRangeQuery {
                em: rng.gen_range(0..4),
                range: Range::new(start, start + 100),
            }
        })
        .collect();

    vec![
        ("EM", ItemAttributes::Em(em_items), QueryAttributes::Em(em_queries)),
        ("R", ItemAttributes::R(r_items), QueryAttributes::R(r_queries)),
        ("EMIS", ItemAttributes::Emis(emis_items), QueryAttributes::Emis(emis_queries)),
        ("EM_R", ItemAttributes::EmR(em_r_items), QueryAttributes::EmR(em_r_queries)),
    ]
}

fn bench_build_bitmap(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    for n_items in [1_000, 10_000, 50_000] {
        let mut group = c.benchmark_group(format!("build_bitmap/{}_items", n_items));
        group.throughput(Throughput::Elements((n_items * N_QUERIES) as u64));

        for (name, items, queries) in attributes(n_items, &mut rng) {
            group.bench_with_input(BenchmarkId::from_parameter(name), &(items, queries), |bench, (items, queries)| {
                bench.iter(|| build_bitmap(black_box(items), black_box(queries)))
            });
        }

        group.finish();
    }
}

criterion_group!(benches, bench_build_bitmap);
criterion_main!(benches);
