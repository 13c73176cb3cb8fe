use jiff::SignedDuration;
use pisa_matrix_providers::travel_distances::Distance;
use schemars::JsonSchema;
use serde::Serialize;

use crate::problem::{
    demand::{DemandId, Weight},
    facility::FacilityId,
};

#[derive(Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Optimal within the optimality gap.
    Optimal,
    /// Incumbent accepted when the time limit ran out.
    TimeLimit,
    /// The solver returned something worse than a solution already known to
    /// be feasible, which was kept instead.
    CarriedForward,
    /// Produced by a heuristic, no optimality claim.
    Heuristic,
}

/// Outcome of one (threshold, budget) solve.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SolutionRecord {
    threshold: Distance,
    budget: usize,
    additional_budget: usize,
    objective_value: Weight,
    open_facility_ids: Vec<FacilityId>,
    covered_demand_ids: Vec<DemandId>,
    modeling_time: SignedDuration,
    solving_time: SignedDuration,
    termination: Termination,
    #[serde(skip_serializing_if = "Option::is_none")]
    gap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upper_bound: Option<Weight>,
}

impl SolutionRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        threshold: Distance,
        budget: usize,
        additional_budget: usize,
        objective_value: Weight,
        open_facility_ids: Vec<FacilityId>,
        covered_demand_ids: Vec<DemandId>,
        termination: Termination,
        gap: Option<f64>,
        upper_bound: Option<Weight>,
    ) -> Self {
        Self {
            threshold,
            budget,
            additional_budget,
            objective_value,
            open_facility_ids,
            covered_demand_ids,
            modeling_time: SignedDuration::ZERO,
            solving_time: SignedDuration::ZERO,
            termination,
            gap,
            upper_bound,
        }
    }

    pub(crate) fn with_times(
        mut self,
        modeling_time: SignedDuration,
        solving_time: SignedDuration,
    ) -> Self {
        self.modeling_time = modeling_time;
        self.solving_time = solving_time;
        self
    }

    pub fn threshold(&self) -> Distance {
        self.threshold
    }

    /// Total number of open facilities allowed, already open ones included.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Facilities allowed beyond the already open ones.
    pub fn additional_budget(&self) -> usize {
        self.additional_budget
    }

    /// Weighted coverage of `covered_demand_ids`.
    pub fn objective_value(&self) -> Weight {
        self.objective_value
    }

    pub fn open_facility_ids(&self) -> &[FacilityId] {
        &self.open_facility_ids
    }

    pub fn covered_demand_ids(&self) -> &[DemandId] {
        &self.covered_demand_ids
    }

    pub fn modeling_time(&self) -> SignedDuration {
        self.modeling_time
    }

    pub fn solving_time(&self) -> SignedDuration {
        self.solving_time
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Realized relative gap, absent for heuristic records.
    pub fn gap(&self) -> Option<f64> {
        self.gap
    }

    pub fn upper_bound(&self) -> Option<Weight> {
        self.upper_bound
    }
}
