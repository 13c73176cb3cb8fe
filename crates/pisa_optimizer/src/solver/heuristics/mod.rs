use crate::{
    error::SolverError,
    problem::{coverage_index::CoverageIndex, demand::DemandWeights, facility::AlreadyOpen},
};

use super::{
    backend::branch_and_bound::BranchAndBoundBackend,
    solution_record::SolutionRecord,
    solver::{Algorithm, CoverageSolver},
    solver_params::SolverParams,
};

pub(crate) mod greedy;
pub(crate) mod local_search;

/// Greedy addition over increasing total budgets, each budget extending the
/// previous selection.
pub fn greedy_sweep(
    index: &CoverageIndex,
    weights: &DemandWeights,
    already_open: &AlreadyOpen,
    budgets: &[usize],
    params: &SolverParams,
) -> Result<Vec<SolutionRecord>, SolverError> {
    CoverageSolver::<BranchAndBoundBackend>::new(params.clone())
        .with_algorithm(Algorithm::Greedy)
        .solve_budgets(index, weights, already_open, budgets)
}

/// Greedy addition followed by swap local search at every budget.
pub fn greedy_local_search_sweep(
    index: &CoverageIndex,
    weights: &DemandWeights,
    already_open: &AlreadyOpen,
    budgets: &[usize],
    params: &SolverParams,
) -> Result<Vec<SolutionRecord>, SolverError> {
    CoverageSolver::<BranchAndBoundBackend>::new(params.clone())
        .with_algorithm(Algorithm::GreedyLocalSearch)
        .solve_budgets(index, weights, already_open, budgets)
}
