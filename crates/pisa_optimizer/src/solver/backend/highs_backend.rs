use fixedbitset::FixedBitSet;
use highs::{Col, HighsModelStatus, Model, RowProblem, Sense};
use highs_sys::{Highs_changeRowBounds, HighsInt, STATUS_ERROR};
use tracing::{debug, warn};

use crate::{
    error::SolverError,
    solver::{formulation::CoveringFormulation, solver_params::SolverParams},
};

use super::{BackendSolution, BackendTermination, CoveringBackend};

const ROUNDING_THRESHOLD: f64 = 0.5;

/// HiGHS MIP solver. The budget row is the last row of the model; replacing
/// the budget moves the upper bound of that row and keeps its terms.
#[derive(Default)]
pub struct HighsBackend {
    model: Option<Model>,
    open_columns: Vec<Col>,
    budget_row: Option<HighsInt>,
    budget: usize,
}

impl HighsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn budget_terms(&self) -> Vec<(Col, f64)> {
        self.open_columns.iter().map(|&col| (col, 1.0)).collect()
    }
}

impl CoveringBackend for HighsBackend {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn load(
        &mut self,
        formulation: &CoveringFormulation,
        budget: usize,
        params: &SolverParams,
    ) -> Result<(), SolverError> {
        let mut problem = RowProblem::new();

        let open_cost = -formulation.parsimony();
        self.open_columns = (0..formulation.num_open_columns())
            .map(|column| {
                let lower = if formulation.is_forced(column) { 1.0 } else { 0.0 };
                problem.add_column_with_integrality(open_cost, lower..=1.0, true)
            })
            .collect();

        let covered_columns: Vec<Col> = (0..formulation.num_covered_columns())
            .map(|column| {
                problem.add_column_with_integrality(formulation.weight(column), 0.0..=1.0, true)
            })
            .collect();

        // covered[i] - sum(open[j] reaching i) <= 0
        for (row, &covered) in covered_columns.iter().enumerate() {
            let terms: Vec<(Col, f64)> = std::iter::once((covered, 1.0))
                .chain(
                    formulation
                        .reaching(row)
                        .iter()
                        .map(|&column| (self.open_columns[column], -1.0)),
                )
                .collect();
            problem.add_row(..=0.0, terms);
        }

        // Reachability rows come first, the budget row gets the next index.
        let budget_row = HighsInt::try_from(covered_columns.len())
            .map_err(|_| SolverError::Backend(String::from("Too many rows for HiGHS")))?;

        let mut model = problem
            .try_optimise(Sense::Maximise)
            .map_err(|status| SolverError::Backend(format!("{status:?}")))?;
        model.set_option("output_flag", params.trace);
        model.set_option("mip_rel_gap", params.optimality_gap);
        model.set_option("time_limit", params.time_limit_seconds());
        model.set_option("threads", params.threads.number_of_threads() as i32);

        model
            .try_add_row(..=budget as f64, self.budget_terms())
            .map_err(|status| SolverError::Backend(format!("{status:?}")))?;

        self.budget = budget;
        self.budget_row = Some(budget_row);
        self.model = Some(model);

        debug!(
            open_columns = self.open_columns.len(),
            covered_columns = covered_columns.len(),
            budget,
            "Loaded HiGHS model"
        );

        Ok(())
    }

    fn replace_budget(
        &mut self,
        _formulation: &CoveringFormulation,
        budget: usize,
    ) -> Result<(), SolverError> {
        let model = self.model.as_mut().ok_or(SolverError::NotLoaded)?;
        let row = self.budget_row.ok_or(SolverError::NotLoaded)?;

        // SAFETY: the pointer comes from a live model and `row` was assigned
        // when the budget row was added to it.
        let status = unsafe {
            Highs_changeRowBounds(model.as_mut_ptr(), row, f64::NEG_INFINITY, budget as f64)
        };
        if status == STATUS_ERROR {
            return Err(SolverError::Backend(format!(
                "Could not move the budget row to {budget}"
            )));
        }

        debug!(from = self.budget, to = budget, "Replaced budget row");
        self.budget = budget;

        Ok(())
    }

    fn solve(&mut self, formulation: &CoveringFormulation) -> Result<BackendSolution, SolverError> {
        let model = self.model.take().ok_or(SolverError::NotLoaded)?;

        let solved = model
            .try_solve()
            .map_err(|status| SolverError::Backend(format!("{status:?}")))?;

        let status = solved.status();
        let termination = match status {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => BackendTermination::Optimal,
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                BackendTermination::TimeLimit
            }
            HighsModelStatus::Infeasible => {
                return Err(SolverError::Infeasible {
                    budget: self.budget,
                });
            }
            other => return Err(SolverError::Backend(format!("{other:?}"))),
        };

        let objective = solved.objective_value();
        let gap = if status == HighsModelStatus::ModelEmpty {
            0.0
        } else {
            solved.mip_gap()
        };

        if termination == BackendTermination::TimeLimit && !(objective.is_finite() && gap.is_finite())
        {
            return Err(SolverError::NoIncumbent {
                budget: self.budget,
                status: format!("{status:?}"),
            });
        }

        let num_open = formulation.num_open_columns();
        let num_covered = formulation.num_covered_columns();

        let mut open = FixedBitSet::with_capacity(num_open);
        let mut covered = FixedBitSet::with_capacity(num_covered);
        {
            let solution = solved.get_solution();
            let values = solution.columns();

            for (column, value) in values.iter().take(num_open).enumerate() {
                open.set(column, *value > ROUNDING_THRESHOLD);
            }
            for (column, value) in values.iter().skip(num_open).take(num_covered).enumerate() {
                covered.set(column, *value > ROUNDING_THRESHOLD);
            }
        }

        if termination == BackendTermination::TimeLimit {
            warn!(
                budget = self.budget,
                gap, "HiGHS reached the time limit, accepting the incumbent"
            );
        }

        self.model = Some(Model::from(solved));

        Ok(BackendSolution {
            termination,
            open,
            covered,
            objective,
            bound: None,
            gap,
        })
    }
}
