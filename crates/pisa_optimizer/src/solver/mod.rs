pub mod backend;
pub mod budget_sweep;
mod cover_state;
pub mod covering_model;
pub mod formulation;
pub mod heuristics;
pub mod solution_record;
#[allow(clippy::module_inception)]
pub mod solver;
pub mod solver_params;
pub mod verifier;

#[cfg(feature = "highs")]
pub type DefaultBackend = backend::highs_backend::HighsBackend;

#[cfg(not(feature = "highs"))]
pub type DefaultBackend = backend::branch_and_bound::BranchAndBoundBackend;
