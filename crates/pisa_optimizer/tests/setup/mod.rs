#![allow(dead_code)]

use pisa_matrix_providers::travel_distances::{TravelDistanceRow, TravelDistanceTable};
use pisa_optimizer::problem::{
    coverage_index::CoverageIndex,
    demand::{DemandId, DemandWeights},
    facility::{AlreadyOpen, FacilityId},
};
use rand::{Rng, SeedableRng, rngs::SmallRng};

pub struct RandomInstance {
    pub table: TravelDistanceTable,
    pub weights: DemandWeights,
    pub already_open: AlreadyOpen,
}

/// Sparse random table: every (demand, facility) pair exists with
/// probability `density`, distances uniform in [0, 1000). Roughly one demand
/// point in ten weighs 0.
pub fn random_instance(
    seed: u64,
    num_demands: usize,
    num_facilities: usize,
    density: f64,
    num_already_open: usize,
) -> RandomInstance {
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut rows = Vec::new();
    for facility in 0..num_facilities {
        for demand in 0..num_demands {
            if rng.random_bool(density) {
                let distance = rng.random_range(0.0..1000.0);
                rows.push(TravelDistanceRow::new(demand, facility, distance));
            }
        }
    }

    let weights = (0..num_demands)
        .map(|_| {
            if rng.random_bool(0.1) {
                0.0
            } else {
                f64::from(rng.random_range(1..20u32))
            }
        })
        .collect();

    RandomInstance {
        table: TravelDistanceTable::new(rows),
        weights: DemandWeights::new(weights).unwrap(),
        already_open: (0..num_already_open)
            .map(|_| FacilityId::new(rng.random_range(0..num_facilities)))
            .collect(),
    }
}

pub fn create_index(threshold: f64, coverage: &[(usize, &[usize])]) -> CoverageIndex {
    CoverageIndex::from_coverage(
        threshold,
        coverage.iter().map(|&(facility, demands)| {
            (
                FacilityId::new(facility),
                demands.iter().copied().map(DemandId::new).collect::<Vec<_>>(),
            )
        }),
    )
}

/// Best weighted coverage over every facility subset of size at most
/// `budget` that contains the already open facilities.
pub fn brute_force_optimum(
    index: &CoverageIndex,
    weights: &DemandWeights,
    already_open: &AlreadyOpen,
    budget: usize,
) -> f64 {
    let candidates: Vec<FacilityId> = index
        .facilities()
        .iter()
        .copied()
        .filter(|&facility| !already_open.contains(facility))
        .collect();

    let slots = budget.saturating_sub(already_open.len());
    let mut best = 0.0_f64;
    let mut chosen: Vec<FacilityId> = already_open.iter().collect();

    fn search(
        index: &CoverageIndex,
        weights: &DemandWeights,
        candidates: &[FacilityId],
        slots: usize,
        chosen: &mut Vec<FacilityId>,
        best: &mut f64,
    ) {
        let covered = pisa_optimizer::solver::verifier::covered_demands(index, chosen.as_slice());
        *best = best.max(weights.sum_of(&covered));

        if slots == 0 {
            return;
        }

        for (position, &facility) in candidates.iter().enumerate() {
            chosen.push(facility);
            search(index, weights, &candidates[position + 1..], slots - 1, chosen, best);
            chosen.pop();
        }
    }

    search(index, weights, &candidates, slots, &mut chosen, &mut best);
    best
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}
