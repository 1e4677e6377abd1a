use alloy::primitives::{Address, U256};
use arbwatch::arb::{
    detector::CycleDetector,
    graph::RateGraph,
    pool::PoolRecord,
    types::{Exchange, OrderingKey, PoolId, TokenId},
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

/// Random address, good enough to key tokens and pools
fn random_address() -> Address {
    let mut bytes = [0u8; 20];
    fastrand::fill(&mut bytes);
    Address::from(bytes)
}

/// Synthetic market of `pool_count` pools over `token_count` tokens, spread over two
/// exchanges, with reserves in the thousands to millions
fn generate_pools(pool_count: usize, token_count: usize) -> Vec<PoolRecord> {
    let mut rng = rand::rng();
    let tokens: Vec<TokenId> = (0..token_count).map(|_| TokenId(random_address())).collect();
    let exchanges = [Exchange::from("uniswapV2"), Exchange::from("sushiswapV2")];

    (0..pool_count)
        .map(|i| {
            let idx_a = rng.random_range(0..token_count);
            let mut idx_b = rng.random_range(0..token_count);
            while idx_a == idx_b {
                idx_b = rng.random_range(0..token_count);
            }

            let mut pool = PoolRecord::new(
                PoolId(random_address()),
                tokens[idx_a],
                tokens[idx_b],
                18,
                18,
                exchanges[i % exchanges.len()].clone(),
            );
            pool.set_reserves(
                U256::from(rng.random_range(1_000..1_000_000_u64)),
                U256::from(rng.random_range(1_000..1_000_000_u64)),
                OrderingKey::new(1, 0),
            );
            pool
        })
        .collect()
}

/// Graph construction from the pool table
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_graph_build");
    group.sample_size(20);

    for pool_count in [100_usize, 1000, 5000] {
        let pools = generate_pools(pool_count, (pool_count / 5).max(10));
        group.throughput(criterion::Throughput::Elements(pool_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pool_count), &pools, |b, pools| {
            b.iter(|| black_box(RateGraph::build(pools)));
        });
    }
    group.finish();
}

/// Negative cycle search from a random anchor
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_search");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    for pool_count in [100_usize, 500, 1000, 5000] {
        let token_count = (pool_count / 5).max(10);
        let pools = generate_pools(pool_count, token_count);
        let graph = RateGraph::build(&pools);
        let anchor = pools[fastrand::usize(0..pools.len())].token_a;

        println!(
            "cycle_search: {pool_count} pools, {} tokens, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        group.throughput(criterion::Throughput::Elements(pool_count as u64));
        group.bench_with_input(BenchmarkId::new("search", pool_count), &graph, |b, graph| {
            b.iter(|| black_box(CycleDetector::new(graph).search(&anchor)));
        });
        group.bench_with_input(
            BenchmarkId::new("has_any_negative_cycle", pool_count),
            &graph,
            |b, graph| {
                b.iter(|| black_box(CycleDetector::new(graph).has_any_negative_cycle()));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
