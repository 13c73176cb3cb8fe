use pisa_matrix_providers::travel_distances::Distance;
use thiserror::Error;

use crate::problem::{
    demand::{DemandId, Weight},
    facility::FacilityId,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Invalid weight {weight} for demand point {demand}")]
    InvalidWeight { demand: DemandId, weight: Weight },

    #[error("Demand point {0} has more than one weight")]
    DuplicateWeight(DemandId),

    #[error("Inconsistent coverage index: {0}")]
    InconsistentIndex(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
    #[error(
        "Covered set mismatch at threshold {threshold} and budget {budget}: {} missing, {} unexpected",
        missing.len(),
        unexpected.len()
    )]
    CoveredSetMismatch {
        threshold: Distance,
        budget: usize,
        missing: Vec<DemandId>,
        unexpected: Vec<DemandId>,
    },

    #[error(
        "Objective mismatch at threshold {threshold} and budget {budget}: reported {reported}, recomputed {recomputed}"
    )]
    ObjectiveMismatch {
        threshold: Distance,
        budget: usize,
        reported: Weight,
        recomputed: Weight,
    },

    #[error("Already open facility {facility} is closed at threshold {threshold} and budget {budget}")]
    ForcedOpenMissing {
        threshold: Distance,
        budget: usize,
        facility: FacilityId,
    },

    #[error("{open} facilities open at threshold {threshold} but the budget is {budget}")]
    BudgetExceeded {
        threshold: Distance,
        budget: usize,
        open: usize,
    },
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Budget {budget} is smaller than the {already_open} already open facilities")]
    InvalidBudget { budget: usize, already_open: usize },

    #[error("Budgets must be strictly increasing, got {next} after {previous}")]
    UnorderedBudgets { previous: usize, next: usize },

    #[error("Invalid distance threshold {0}")]
    InvalidThreshold(Distance),

    #[error("Covering model is infeasible at budget {budget}")]
    Infeasible { budget: usize },

    #[error("Solver stopped without a feasible solution at budget {budget} ({status})")]
    NoIncumbent { budget: usize, status: String },

    #[error("Solver backend failed: {0}")]
    Backend(String),

    #[error("The covering model has not been loaded")]
    NotLoaded,

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Problem(#[from] ProblemError),
}
