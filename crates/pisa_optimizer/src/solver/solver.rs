use std::marker::PhantomData;

use fixedbitset::FixedBitSet;
use fxhash::FxHashSet;
use jiff::SignedDuration;
use pisa_matrix_providers::travel_distances::{Distance, TravelDistanceTable};
use tracing::{info, instrument, warn};

use crate::{
    error::SolverError,
    problem::{
        coverage_index::CoverageIndex,
        demand::{DemandId, DemandWeights},
        facility::AlreadyOpen,
    },
    utils::time::timed,
};

use super::{
    DefaultBackend,
    backend::{CoveringBackend, relative_gap},
    budget_sweep::{parsimony_cost, sorted_thresholds, total_budgets, validate_budgets},
    cover_state::CoverState,
    covering_model::{CoveringModel, ModelSolution},
    formulation::CoveringFormulation,
    heuristics::{greedy::GreedyAddition, local_search::swap_local_search},
    solution_record::{SolutionRecord, Termination},
    solver_params::SolverParams,
    verifier,
};

const MONOTONICITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Solve the covering model with the backend.
    #[default]
    Exact,
    /// Greedy addition.
    Greedy,
    /// Greedy addition followed by swap local search.
    GreedyLocalSearch,
}

type ProgressCallback = Box<dyn FnMut(&SolutionRecord) + Send>;

/// Drives budget sweeps over one or more thresholds and hands out one
/// verified record per (threshold, budget).
pub struct CoverageSolver<B = DefaultBackend> {
    params: SolverParams,
    algorithm: Algorithm,
    pre_covered: FxHashSet<DemandId>,
    on_progress: Option<ProgressCallback>,
    _backend: PhantomData<fn() -> B>,
}

struct SweepInput<'a> {
    index: &'a CoverageIndex,
    weights: &'a DemandWeights,
    already_open: &'a AlreadyOpen,
}

impl<B> CoverageSolver<B>
where
    B: CoveringBackend + Default,
{
    pub fn new(params: SolverParams) -> Self {
        Self {
            params,
            algorithm: Algorithm::Exact,
            pre_covered: FxHashSet::default(),
            on_progress: None,
            _backend: PhantomData,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Demand points already served by other means. They are dropped from
    /// every index built by `solve_thresholds`.
    pub fn with_pre_covered(mut self, demands: impl IntoIterator<Item = DemandId>) -> Self {
        self.pre_covered = demands.into_iter().collect();
        self
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Called once per completed record, in order.
    pub fn on_progress<F>(&mut self, callback: F)
    where
        F: FnMut(&SolutionRecord) + Send + 'static,
    {
        self.on_progress = Some(Box::new(callback));
    }

    /// Sweeps strictly increasing total budgets (already open facilities
    /// included) over a single coverage index.
    pub fn solve_budgets(
        &mut self,
        index: &CoverageIndex,
        weights: &DemandWeights,
        already_open: &AlreadyOpen,
        budgets: &[usize],
    ) -> Result<Vec<SolutionRecord>, SolverError> {
        let input = SweepInput {
            index,
            weights,
            already_open,
        };
        self.sweep(&input, budgets, None)
    }

    /// Sweeps every threshold in ascending order. Budgets count the
    /// facilities added beyond the already open ones.
    #[instrument(skip_all, fields(thresholds = thresholds.len(), budgets = additional_budgets.len()))]
    pub fn solve_thresholds(
        &mut self,
        table: &TravelDistanceTable,
        weights: &DemandWeights,
        already_open: &AlreadyOpen,
        thresholds: &[Distance],
        additional_budgets: &[usize],
    ) -> Result<Vec<SolutionRecord>, SolverError> {
        let thresholds = sorted_thresholds(thresholds)?;
        let budgets = total_budgets(additional_budgets, already_open.len());
        validate_budgets(&budgets, already_open.len())?;

        let mut records = Vec::with_capacity(thresholds.len() * budgets.len());
        let mut previous: Option<Vec<SolutionRecord>> = None;

        for threshold in thresholds {
            let index = self.build_index(table, threshold)?;
            let input = SweepInput {
                index: &index,
                weights,
                already_open,
            };

            let threshold_records = self.sweep(&input, &budgets, previous.as_deref())?;
            records.extend_from_slice(&threshold_records);
            previous = Some(threshold_records);
        }

        Ok(records)
    }

    fn build_index(
        &self,
        table: &TravelDistanceTable,
        threshold: Distance,
    ) -> Result<CoverageIndex, SolverError> {
        let index = CoverageIndex::build(table, threshold);
        let index = if self.pre_covered.is_empty() {
            index
        } else {
            index.excluding_demands(&self.pre_covered)
        };

        index.check_consistency()?;
        Ok(index)
    }

    #[instrument(skip_all, fields(threshold = input.index.threshold(), algorithm = ?self.algorithm))]
    fn sweep(
        &mut self,
        input: &SweepInput,
        budgets: &[usize],
        previous_threshold: Option<&[SolutionRecord]>,
    ) -> Result<Vec<SolutionRecord>, SolverError> {
        validate_budgets(budgets, input.already_open.len())?;

        let parsimony = if self.params.parsimonious {
            parsimony_cost(budgets)
        } else {
            0.0
        };

        let (formulation, formulation_time) = timed(|| {
            CoveringFormulation::new(input.index, input.weights, input.already_open, parsimony)
        });

        let params = self.params.clone();

        match self.algorithm {
            Algorithm::Exact => {
                let mut model = CoveringModel::new(&formulation, B::default());

                self.run_budgets(
                    input,
                    &formulation,
                    budgets,
                    previous_threshold,
                    formulation_time,
                    |budget| {
                        let (loaded, modeling_time) = timed(|| model.set_budget(budget, &params));
                        loaded?;
                        let (solution, solving_time) = timed(|| model.solve());
                        Ok((solution?, modeling_time, solving_time))
                    },
                )
            }
            Algorithm::Greedy | Algorithm::GreedyLocalSearch => {
                let local_search = self.algorithm == Algorithm::GreedyLocalSearch;
                let mut greedy = GreedyAddition::new(CoverState::with_forced(&formulation));

                self.run_budgets(
                    input,
                    &formulation,
                    budgets,
                    previous_threshold,
                    formulation_time,
                    |budget| {
                        let (state, solving_time) = timed(|| {
                            greedy.extend_to(budget);
                            let mut state = greedy.state().clone();
                            if local_search {
                                swap_local_search(&mut state);
                            }
                            state
                        });

                        let solution = ModelSolution {
                            termination: Termination::Heuristic,
                            open: state.open_columns().clone(),
                            covered: state.covered(),
                            coverage: state.coverage(),
                            upper_bound: None,
                            gap: None,
                        };

                        Ok((solution, SignedDuration::ZERO, solving_time))
                    },
                )
            }
        }
    }

    fn run_budgets<F>(
        &mut self,
        input: &SweepInput,
        formulation: &CoveringFormulation,
        budgets: &[usize],
        previous_threshold: Option<&[SolutionRecord]>,
        formulation_time: SignedDuration,
        mut solve_budget: F,
    ) -> Result<Vec<SolutionRecord>, SolverError>
    where
        F: FnMut(usize) -> Result<(ModelSolution, SignedDuration, SignedDuration), SolverError>,
    {
        let threshold = input.index.threshold();
        let mut records: Vec<SolutionRecord> = Vec::with_capacity(budgets.len());
        let mut previous_budget: Option<FixedBitSet> = None;

        for (position, &budget) in budgets.iter().enumerate() {
            let (mut solution, mut modeling_time, solving_time) = solve_budget(budget)?;
            if position == 0 {
                modeling_time += formulation_time;
            }

            let same_budget_lower_threshold = previous_threshold
                .and_then(|records| records.iter().find(|record| record.budget() == budget))
                .map(|record| formulation.columns_of(record.open_facility_ids()));

            for known in [previous_budget.take(), same_budget_lower_threshold]
                .into_iter()
                .flatten()
            {
                carry_forward_if_better(formulation, &mut solution, known, threshold, budget);
            }

            previous_budget = Some(solution.open.clone());

            let record = SolutionRecord::new(
                threshold,
                budget,
                budget - input.already_open.len(),
                solution.coverage,
                formulation.facilities_of(&solution.open),
                formulation.demands_of(&solution.open, &solution.covered),
                solution.termination,
                solution.gap,
                solution.upper_bound,
            )
            .with_times(modeling_time, solving_time);

            if self.params.verify {
                verifier::verify(input.index, input.weights, input.already_open, &record)?;
            }

            info!(
                threshold,
                budget,
                objective = record.objective_value(),
                open = record.open_facility_ids().len(),
                covered = record.covered_demand_ids().len(),
                termination = ?record.termination(),
                "Solved budget"
            );

            if let Some(callback) = self.on_progress.as_mut() {
                callback(&record);
            }

            records.push(record);
        }

        Ok(records)
    }
}

/// Replaces `solution` by the known feasible open set when that one covers
/// strictly more weight.
fn carry_forward_if_better(
    formulation: &CoveringFormulation,
    solution: &mut ModelSolution,
    known: FixedBitSet,
    threshold: Distance,
    budget: usize,
) {
    if known.count_ones(..) > budget {
        return;
    }

    let covered = formulation.covered_by(&known);
    let coverage = formulation.coverage(&covered);
    let tolerance = MONOTONICITY_EPSILON * solution.coverage.abs().max(1.0);

    if coverage > solution.coverage + tolerance {
        warn!(
            threshold,
            budget,
            solved = solution.coverage,
            known = coverage,
            "Solver returned less coverage than a known solution, carrying it forward"
        );

        solution.open = known;
        solution.covered = covered;
        solution.coverage = coverage;
        solution.gap = solution
            .upper_bound
            .map(|bound| relative_gap(coverage, bound));
        solution.termination = Termination::CarriedForward;
    }
}
