use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use pisa_matrix_providers::travel_distances::{TravelDistanceRow, TravelDistanceTable};
use pisa_optimizer::{
    problem::{
        coverage_index::CoverageIndex,
        demand::DemandWeights,
        facility::{AlreadyOpen, FacilityId},
    },
    solver::{
        backend::branch_and_bound::BranchAndBoundBackend, heuristics::greedy_sweep,
        solver::CoverageSolver, solver_params::SolverParams, verifier,
    },
};
use rand::{Rng, SeedableRng, rngs::SmallRng};

fn random_table(
    num_demands: usize,
    num_facilities: usize,
    rows_per_facility: usize,
) -> TravelDistanceTable {
    let mut rng = SmallRng::seed_from_u64(7);

    (0..num_facilities)
        .flat_map(|facility| {
            (0..rows_per_facility)
                .map(|_| {
                    TravelDistanceRow::new(
                        rng.random_range(0..num_demands),
                        facility,
                        rng.random_range(0.0..5000.0),
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn coverage_index_benchmark(c: &mut Criterion) {
    let table = random_table(200_000, 500, 2_000);

    c.bench_function("coverage index build (1M rows)", |b| {
        b.iter(|| CoverageIndex::build(black_box(&table), black_box(2500.0)))
    });
}

fn verifier_benchmark(c: &mut Criterion) {
    let table = random_table(200_000, 500, 2_000);
    let index = CoverageIndex::build(&table, 2500.0);
    let open: Vec<FacilityId> = index.facilities().iter().copied().step_by(5).collect();

    c.bench_function("covered demands (100 open)", |b| {
        b.iter(|| verifier::covered_demands(black_box(&index), black_box(&open)))
    });
}

fn sweep_benchmark(c: &mut Criterion) {
    let table = random_table(20_000, 200, 400);
    let index = CoverageIndex::build(&table, 2500.0);
    let weights = DemandWeights::new(vec![1.0; 20_000]).unwrap();
    let budgets = [5, 10, 20];
    let params = SolverParams::default();

    c.bench_function("greedy sweep", |b| {
        b.iter(|| greedy_sweep(&index, &weights, &AlreadyOpen::none(), &budgets, &params))
    });

    let mut group = c.benchmark_group("exact");
    group.sample_size(10);
    group.bench_function("branch and bound sweep", |b| {
        b.iter(|| {
            CoverageSolver::<BranchAndBoundBackend>::new(params.clone()).solve_budgets(
                &index,
                &weights,
                &AlreadyOpen::none(),
                &[1, 2, 3],
            )
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    coverage_index_benchmark,
    verifier_benchmark,
    sweep_benchmark
);
criterion_main!(benches);
