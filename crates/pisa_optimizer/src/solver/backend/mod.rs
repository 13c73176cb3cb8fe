use fixedbitset::FixedBitSet;

use crate::error::SolverError;

use super::{formulation::CoveringFormulation, solver_params::SolverParams};

pub mod branch_and_bound;
#[cfg(feature = "highs")]
pub mod highs_backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendTermination {
    /// Optimal within the configured gap.
    Optimal,
    /// Incumbent returned when the time limit was reached.
    TimeLimit,
}

#[derive(Debug, Clone)]
pub struct BackendSolution {
    pub termination: BackendTermination,
    /// One bit per open column of the formulation.
    pub open: FixedBitSet,
    /// One bit per covered column of the formulation.
    pub covered: FixedBitSet,
    /// Solver objective, parsimony cost included.
    pub objective: f64,
    /// Best known upper bound on the objective, when the backend exposes one.
    pub bound: Option<f64>,
    pub gap: f64,
}

/// A MIP engine able to hold one covering model and re-solve it after the
/// budget row has been swapped.
///
/// The formulation passed to `replace_budget` and `solve` is always the one
/// given to `load`.
pub trait CoveringBackend {
    fn name(&self) -> &'static str;

    fn load(
        &mut self,
        formulation: &CoveringFormulation,
        budget: usize,
        params: &SolverParams,
    ) -> Result<(), SolverError>;

    fn replace_budget(
        &mut self,
        formulation: &CoveringFormulation,
        budget: usize,
    ) -> Result<(), SolverError>;

    fn solve(&mut self, formulation: &CoveringFormulation) -> Result<BackendSolution, SolverError>;
}

pub(crate) fn relative_gap(objective: f64, bound: f64) -> f64 {
    let difference = bound - objective;
    if difference <= 0.0 {
        0.0
    } else if bound.abs() > f64::EPSILON {
        difference / bound.abs()
    } else {
        f64::INFINITY
    }
}
