use crate::problem::{
    coverage_index::CoverageIndex,
    demand::{DemandId, DemandWeights},
    facility::FacilityId,
};

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

/// Facility 0 covers {0, 1}, facility 1 covers {2}.
pub fn scenario_index() -> CoverageIndex {
    create_index(1.0, &[(0, &[0, 1]), (1, &[2])])
}

/// Weights {0: 10, 1: 5, 2: 1}.
pub fn scenario_weights() -> DemandWeights {
    DemandWeights::new(vec![10.0, 5.0, 1.0]).unwrap()
}

pub fn unit_weights(count: usize) -> DemandWeights {
    DemandWeights::new(vec![1.0; count]).unwrap()
}

pub fn overlapping_index() -> CoverageIndex {
    create_index(1.0, &[(0, &[0, 1, 2]), (1, &[2, 3, 4]), (2, &[4, 5])])
}

/// The middle facility has the largest coverage set but the two outer
/// facilities together cover everything.
pub fn greedy_trap_index() -> CoverageIndex {
    create_index(1.0, &[(0, &[0, 1, 2]), (1, &[1, 2, 3, 4]), (2, &[3, 4, 5])])
}

pub fn duplicate_facility_index() -> CoverageIndex {
    create_index(1.0, &[(0, &[0, 1]), (1, &[0, 1])])
}
