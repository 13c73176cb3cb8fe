use fixedbitset::FixedBitSet;
use jiff::{SignedDuration, Timestamp};
use tracing::{debug, warn};

use crate::{
    error::SolverError,
    solver::{
        cover_state::CoverState, formulation::CoveringFormulation,
        heuristics::greedy::GreedyAddition, solver_params::SolverParams,
    },
};

use super::{BackendSolution, BackendTermination, CoveringBackend, relative_gap};

const TIME_CHECK_INTERVAL: u64 = 1024;
const PRUNE_EPSILON: f64 = 1e-9;

/// Exact depth first branch and bound for the covering model.
///
/// Columns are branched on in decreasing order of their initial marginal
/// gain, opening first. A node is bounded by its value plus the best
/// marginal gains that still fit in the budget, which is valid because
/// coverage is submodular. Nodes whose bound is within the relative gap of
/// the incumbent are pruned.
#[derive(Debug, Clone)]
pub struct BranchAndBoundBackend {
    budget: usize,
    optimality_gap: f64,
    time_limit: SignedDuration,
    incumbent: Option<FixedBitSet>,
    loaded: bool,
}

impl Default for BranchAndBoundBackend {
    fn default() -> Self {
        Self {
            budget: 0,
            optimality_gap: 0.0,
            time_limit: SignedDuration::MAX,
            incumbent: None,
            loaded: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Visit(usize),
    Close(usize),
}

#[derive(Debug, Default)]
struct SearchStatistics {
    nodes: u64,
    pruned: u64,
    improvements: u64,
}

impl BranchAndBoundBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous incumbent if it still fits in the budget.
    fn warm_start(&self, formulation: &CoveringFormulation) -> Option<FixedBitSet> {
        self.incumbent
            .as_ref()
            .filter(|open| {
                open.len() == formulation.num_open_columns() && open.count_ones(..) <= self.budget
            })
            .cloned()
    }

    fn bound(
        state: &CoverState,
        order: &[usize],
        position: usize,
        slots: usize,
        scratch: &mut Vec<f64>,
    ) -> f64 {
        let parsimony = state.formulation().parsimony();

        scratch.clear();
        scratch.extend(
            order[position..]
                .iter()
                .map(|&column| state.gain(column) - parsimony)
                .filter(|&gain| gain > 0.0),
        );

        if scratch.len() > slots {
            scratch.select_nth_unstable_by(slots, |a, b| b.total_cmp(a));
            scratch.truncate(slots);
        }

        state.objective() + scratch.iter().sum::<f64>()
    }
}

impl CoveringBackend for BranchAndBoundBackend {
    fn name(&self) -> &'static str {
        "branch_and_bound"
    }

    fn load(
        &mut self,
        _formulation: &CoveringFormulation,
        budget: usize,
        params: &SolverParams,
    ) -> Result<(), SolverError> {
        self.budget = budget;
        self.optimality_gap = params.optimality_gap.max(0.0);
        self.time_limit = params.max_time_per_solve;
        self.incumbent = None;
        self.loaded = true;
        Ok(())
    }

    fn replace_budget(
        &mut self,
        _formulation: &CoveringFormulation,
        budget: usize,
    ) -> Result<(), SolverError> {
        if !self.loaded {
            return Err(SolverError::NotLoaded);
        }
        debug!(from = self.budget, to = budget, "Replaced budget");
        self.budget = budget;
        Ok(())
    }

    fn solve(&mut self, formulation: &CoveringFormulation) -> Result<BackendSolution, SolverError> {
        if !self.loaded {
            return Err(SolverError::NotLoaded);
        }

        let start = Timestamp::now();
        let parsimony = formulation.parsimony();

        let mut state = CoverState::with_forced(formulation);
        if state.num_open() > self.budget {
            return Err(SolverError::Infeasible {
                budget: self.budget,
            });
        }
        let slots = self.budget - state.num_open();

        let mut order: Vec<(usize, f64)> = (0..formulation.num_open_columns())
            .filter(|&column| !state.is_open(column))
            .map(|column| (column, state.gain(column)))
            .filter(|&(_, gain)| gain > parsimony)
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let order: Vec<usize> = order.into_iter().map(|(column, _)| column).collect();

        let mut greedy = GreedyAddition::new(state.clone());
        greedy.extend_to(self.budget);
        let mut best_open = greedy.state().open_columns().clone();
        let mut best_value = greedy.state().objective();

        if let Some(open) = self.warm_start(formulation) {
            let warm = CoverState::from_open(formulation, &open);
            if warm.num_open() <= self.budget && warm.objective() > best_value {
                best_value = warm.objective();
                best_open = warm.open_columns().clone();
            }
        }

        let mut statistics = SearchStatistics::default();
        let mut unexplored_bound = f64::NEG_INFINITY;
        let mut timed_out = false;
        let mut scratch: Vec<f64> = Vec::with_capacity(order.len());
        let mut stack: Vec<Step> = vec![Step::Visit(0)];
        let forced = state.num_open();

        while let Some(step) = stack.pop() {
            let position = match step {
                Step::Close(column) => {
                    state.close(column);
                    continue;
                }
                Step::Visit(position) => position,
            };

            statistics.nodes += 1;

            let value = state.objective();
            if value > best_value + PRUNE_EPSILON {
                best_value = value;
                best_open = state.open_columns().clone();
                statistics.improvements += 1;
            }

            let slots_left = slots - (state.num_open() - forced);
            if slots_left == 0 || position >= order.len() {
                continue;
            }

            let bound = Self::bound(&state, &order, position, slots_left, &mut scratch);

            if !timed_out
                && statistics.nodes % TIME_CHECK_INTERVAL == 0
                && Timestamp::now().duration_since(start) > self.time_limit
            {
                timed_out = true;
            }

            if timed_out {
                unexplored_bound = unexplored_bound.max(bound);
                continue;
            }

            let tolerance = (self.optimality_gap * bound.abs()).max(PRUNE_EPSILON);
            if bound <= best_value + tolerance {
                statistics.pruned += 1;
                unexplored_bound = unexplored_bound.max(bound);
                continue;
            }

            // Columns skipped here add nothing in this subtree either.
            let Some(next) =
                (position..order.len()).find(|&p| state.gain(order[p]) > parsimony)
            else {
                continue;
            };

            let column = order[next];
            stack.push(Step::Visit(next + 1));
            stack.push(Step::Close(column));
            state.open(column);
            stack.push(Step::Visit(next + 1));
        }

        let bound = best_value.max(unexplored_bound);
        let gap = relative_gap(best_value, bound);
        let termination = if timed_out {
            warn!(
                budget = self.budget,
                gap, "Branch and bound reached the time limit, accepting the incumbent"
            );
            BackendTermination::TimeLimit
        } else {
            BackendTermination::Optimal
        };

        debug!(
            budget = self.budget,
            nodes = statistics.nodes,
            pruned = statistics.pruned,
            improvements = statistics.improvements,
            "Branch and bound finished"
        );

        let covered = formulation.covered_by(&best_open);
        self.incumbent = Some(best_open.clone());

        Ok(BackendSolution {
            termination,
            open: best_open,
            covered,
            objective: best_value,
            bound: Some(bound),
            gap,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::facility::{AlreadyOpen, FacilityId},
        test_utils,
    };

    use super::*;

    fn solve(
        formulation: &CoveringFormulation,
        budgets: &[usize],
        params: &SolverParams,
    ) -> Vec<BackendSolution> {
        let mut backend = BranchAndBoundBackend::new();
        backend.load(formulation, budgets[0], params).unwrap();

        budgets
            .iter()
            .enumerate()
            .map(|(i, &budget)| {
                if i > 0 {
                    backend.replace_budget(formulation, budget).unwrap();
                }
                backend.solve(formulation).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_branch_and_bound_scenarios() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();
        let formulation = CoveringFormulation::new(&index, &weights, &AlreadyOpen::none(), 0.0);

        let solutions = solve(&formulation, &[1, 2], &SolverParams::default());

        assert_eq!(solutions[0].objective, 15.0);
        assert_eq!(formulation.facilities_of(&solutions[0].open), vec![FacilityId::new(0)]);
        assert_eq!(solutions[1].objective, 16.0);
        assert_eq!(solutions[1].termination, BackendTermination::Optimal);
        assert_eq!(solutions[1].gap, 0.0);
    }

    #[test]
    fn test_branch_and_bound_beats_greedy() {
        // Greedy opens the big middle facility first and ends at 5, the two
        // outer facilities cover 6.
        let index = test_utils::greedy_trap_index();
        let weights = test_utils::unit_weights(6);
        let formulation = CoveringFormulation::new(&index, &weights, &AlreadyOpen::none(), 0.0);
        let params = SolverParams {
            optimality_gap: 0.0,
            ..SolverParams::default()
        };

        let solutions = solve(&formulation, &[2], &params);

        assert_eq!(solutions[0].objective, 6.0);
        assert_eq!(
            formulation.facilities_of(&solutions[0].open),
            vec![FacilityId::new(0), FacilityId::new(2)]
        );
    }

    #[test]
    fn test_branch_and_bound_keeps_forced_open() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();
        let formulation =
            CoveringFormulation::new(&index, &weights, &AlreadyOpen::new([FacilityId::new(1)]), 0.0);

        let solutions = solve(&formulation, &[1, 2], &SolverParams::default());

        assert_eq!(formulation.facilities_of(&solutions[0].open), vec![FacilityId::new(1)]);
        assert_eq!(solutions[0].objective, 1.0);
        assert_eq!(solutions[1].objective, 16.0);
    }

    #[test]
    fn test_branch_and_bound_parsimony_prefers_fewer_facilities() {
        // Facility 1 duplicates facility 0, with parsimony it stays closed.
        let index = test_utils::duplicate_facility_index();
        let weights = test_utils::unit_weights(2);
        let formulation = CoveringFormulation::new(&index, &weights, &AlreadyOpen::none(), 1.0 / 3.0);

        let solutions = solve(&formulation, &[2], &SolverParams::default());

        assert_eq!(solutions[0].open.count_ones(..), 1);
        assert_eq!(formulation.coverage(&solutions[0].covered), 2.0);
    }
}
