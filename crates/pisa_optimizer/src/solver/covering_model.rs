use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::{error::SolverError, problem::demand::Weight};

use super::{
    backend::{BackendTermination, CoveringBackend},
    formulation::CoveringFormulation,
    solution_record::Termination,
    solver_params::SolverParams,
    verifier,
};

/// Solver output mapped back onto the formulation.
#[derive(Debug, Clone)]
pub struct ModelSolution {
    pub termination: Termination,
    pub open: FixedBitSet,
    pub covered: FixedBitSet,
    pub coverage: Weight,
    /// Upper bound on the weighted coverage, when the backend has one.
    pub upper_bound: Option<Weight>,
    pub gap: Option<f64>,
}

/// The covering model of one threshold. Loaded into the backend at the
/// first budget; later budgets only replace the budget row.
pub struct CoveringModel<'a, B> {
    formulation: &'a CoveringFormulation,
    backend: B,
    budget: Option<usize>,
    /// Relative gap allowed when checking backend output, `None` when the
    /// check is disabled.
    check_gap: Option<f64>,
}

impl<'a, B> CoveringModel<'a, B>
where
    B: CoveringBackend,
{
    pub fn new(formulation: &'a CoveringFormulation, backend: B) -> Self {
        Self {
            formulation,
            backend,
            budget: None,
            check_gap: None,
        }
    }

    pub fn formulation(&self) -> &'a CoveringFormulation {
        self.formulation
    }

    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    pub fn set_budget(&mut self, budget: usize, params: &SolverParams) -> Result<(), SolverError> {
        let already_open = self.formulation.num_forced();
        if budget < already_open {
            return Err(SolverError::InvalidBudget {
                budget,
                already_open,
            });
        }

        if !self.formulation.is_empty() {
            match self.budget {
                None => self.backend.load(self.formulation, budget, params)?,
                Some(current) if current == budget => {}
                Some(_) => self.backend.replace_budget(self.formulation, budget)?,
            }
        }

        self.budget = Some(budget);
        self.check_gap = params.verify.then_some(params.optimality_gap);
        Ok(())
    }

    pub fn solve(&mut self) -> Result<ModelSolution, SolverError> {
        let budget = self.budget.ok_or(SolverError::NotLoaded)?;

        if self.formulation.is_empty() {
            debug!(budget, "Empty covering model, nothing to solve");
            return Ok(ModelSolution {
                termination: Termination::Optimal,
                open: FixedBitSet::new(),
                covered: FixedBitSet::new(),
                coverage: 0.0,
                upper_bound: Some(0.0),
                gap: Some(0.0),
            });
        }

        let solution = self.backend.solve(self.formulation)?;

        if let Some(gap) = self.check_gap {
            let gap = if solution.gap.is_finite() {
                gap.max(solution.gap)
            } else {
                gap
            };
            verifier::verify_backend_solution(self.formulation, budget, &solution, gap)?;
        }

        // Demand points reached by an open facility count as covered even if
        // the solver left their column at 0 within the gap.
        let mut covered = solution.covered;
        let reached = self.formulation.covered_by(&solution.open);
        let lifted = reached.difference(&covered).count();
        if lifted > 0 {
            debug!(lifted, budget, "Completed covered columns of the incumbent");
        }
        covered.union_with(&reached);

        let coverage = self.formulation.coverage(&covered);
        let parsimony_slack = self.formulation.parsimony() * budget as f64;

        let termination = match solution.termination {
            BackendTermination::Optimal => Termination::Optimal,
            BackendTermination::TimeLimit => Termination::TimeLimit,
        };

        Ok(ModelSolution {
            termination,
            open: solution.open,
            covered,
            coverage,
            upper_bound: solution.bound.map(|bound| bound + parsimony_slack),
            gap: Some(solution.gap),
        })
    }
}
