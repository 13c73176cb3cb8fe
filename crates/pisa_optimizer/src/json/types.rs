use jiff::{SignedDuration, Timestamp};
use pisa_matrix_providers::{
    distance_correction::{StraightLineBelow, apply_correction},
    travel_distance_provider::TravelDistanceProvider,
    travel_distances::Distance,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    problem::{
        coverage_problem::CoverageProblem,
        demand::{DemandId, DemandWeights, Weight},
        facility::{AlreadyOpen, FacilityId},
    },
    solver::{
        solution_record::{SolutionRecord, Termination},
        solver::Algorithm,
    },
};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields, rename = "CoverageProblem")]
pub struct JsonCoverageProblem {
    pub id: Option<String>,
    pub distances: TravelDistanceProvider,
    pub weights: JsonWeights,

    #[serde(default)]
    pub already_open: Vec<FacilityId>,

    /// Facilities to add beyond the already open ones, strictly increasing.
    pub budgets: Vec<usize>,

    /// Distance thresholds in the unit of the distance table.
    pub thresholds: Vec<Distance>,

    /// Demand points served by other means, left out of the optimization.
    #[serde(default)]
    pub pre_covered: Vec<DemandId>,

    pub correction: Option<JsonDistanceCorrection>,
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(untagged, rename = "Weights")]
pub enum JsonWeights {
    /// Weight of demand point `i` at position `i`.
    Dense(Vec<Weight>),
    Sparse(Vec<JsonDemandWeight>),
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy)]
#[serde(deny_unknown_fields, rename = "DemandWeight")]
pub struct JsonDemandWeight {
    pub demand_id: DemandId,
    pub weight: Weight,
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "snake_case", tag = "type", rename = "DistanceCorrection")]
pub enum JsonDistanceCorrection {
    /// Use the straight-line distance whenever it is below `cutoff`.
    StraightLineBelow {
        cutoff: Distance,
        demands: Vec<[f64; 2]>,
        facilities: Vec<[f64; 2]>,
    },
}

impl JsonCoverageProblem {
    #[instrument(skip_all, level = "debug")]
    pub fn build_problem(self) -> Result<CoverageProblem, anyhow::Error> {
        let table = self.distances.load()?;

        let table = match &self.correction {
            Some(JsonDistanceCorrection::StraightLineBelow {
                cutoff,
                demands,
                facilities,
            }) => {
                let correction = StraightLineBelow::new(
                    *cutoff,
                    demands.iter().copied().enumerate(),
                    facilities.iter().copied().enumerate(),
                )?;
                apply_correction(&table, &correction)?
            }
            None => table,
        };

        let weights = match self.weights {
            JsonWeights::Dense(weights) => DemandWeights::new(weights)?,
            JsonWeights::Sparse(weights) => DemandWeights::from_sparse(
                weights.into_iter().map(|entry| (entry.demand_id, entry.weight)),
            )?,
        };

        Ok(CoverageProblem {
            id: self.id,
            table,
            weights,
            already_open: AlreadyOpen::new(self.already_open),
            thresholds: self.thresholds,
            budgets: self.budgets,
            pre_covered: self.pre_covered,
        })
    }
}

#[derive(Serialize, Debug)]
#[serde(rename = "SweepResult")]
pub struct JsonSweepResult {
    pub id: Option<String>,
    pub created_at: Timestamp,
    pub algorithm: String,
    pub backend: String,
    pub summary: JsonSweepSummary,
    pub records: Vec<SolutionRecord>,
}

#[derive(Serialize, Debug)]
#[serde(rename = "SweepSummary")]
pub struct JsonSweepSummary {
    pub records: usize,
    pub total_weight: Weight,
    pub best_objective: Weight,
    pub best_coverage_ratio: f64,
    pub total_modeling_time: SignedDuration,
    pub total_solving_time: SignedDuration,
    pub time_limited: usize,
    pub carried_forward: usize,
}

impl JsonSweepResult {
    pub fn new(
        problem: &CoverageProblem,
        algorithm: Algorithm,
        backend: &str,
        records: Vec<SolutionRecord>,
    ) -> Self {
        let total_weight = problem.total_weight();
        let best_objective = records
            .iter()
            .map(SolutionRecord::objective_value)
            .fold(0.0, f64::max);

        let summary = JsonSweepSummary {
            records: records.len(),
            total_weight,
            best_objective,
            best_coverage_ratio: if total_weight > 0.0 {
                best_objective / total_weight
            } else {
                0.0
            },
            total_modeling_time: records
                .iter()
                .map(SolutionRecord::modeling_time)
                .fold(SignedDuration::ZERO, |total, time| total + time),
            total_solving_time: records
                .iter()
                .map(SolutionRecord::solving_time)
                .fold(SignedDuration::ZERO, |total, time| total + time),
            time_limited: records
                .iter()
                .filter(|record| record.termination() == Termination::TimeLimit)
                .count(),
            carried_forward: records
                .iter()
                .filter(|record| record.termination() == Termination::CarriedForward)
                .count(),
        };

        Self {
            id: problem.id.clone(),
            created_at: Timestamp::now(),
            algorithm: format!("{algorithm:?}"),
            backend: backend.to_owned(),
            summary,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_problem_from_json() {
        let json = r#"{
            "id": "district",
            "distances": {
                "type": "rows",
                "rows": [
                    { "demand_id": 0, "facility_id": 0, "distance": 100.0 },
                    { "demand_id": 1, "facility_id": 0, "distance": 300.0 },
                    { "demand_id": 2, "facility_id": 1, "distance": 200.0 }
                ]
            },
            "weights": [10.0, 5.0, 1.0],
            "already_open": [1],
            "budgets": [0, 1],
            "thresholds": [500.0]
        }"#;

        let problem: JsonCoverageProblem = serde_json::from_str(json).unwrap();
        let problem = problem.build_problem().unwrap();

        assert_eq!(problem.id.as_deref(), Some("district"));
        assert_eq!(problem.table.len(), 3);
        assert_eq!(problem.weights.total(), 16.0);
        assert!(problem.already_open.contains(FacilityId::new(1)));
        assert!(problem.pre_covered.is_empty());
    }

    #[test]
    fn test_build_problem_sparse_weights_and_correction() {
        let json = r#"{
            "distances": {
                "type": "columns",
                "demand_ids": [0, 1],
                "facility_ids": [0, 0],
                "distances": [5000.0, 5000.0]
            },
            "weights": [
                { "demand_id": 1, "weight": 2.0 },
                { "demand_id": 0, "weight": 3.0 }
            ],
            "budgets": [1],
            "thresholds": [1000.0],
            "correction": {
                "type": "straight_line_below",
                "cutoff": 60.0,
                "demands": [[0.0, 0.0], [100.0, 0.0]],
                "facilities": [[30.0, 40.0]]
            }
        }"#;

        let problem: JsonCoverageProblem = serde_json::from_str(json).unwrap();
        let problem = problem.build_problem().unwrap();

        assert_eq!(problem.weights.weight(DemandId::new(0)), 3.0);
        assert_eq!(problem.table.rows()[0].distance, 50.0);
        assert_eq!(problem.table.rows()[1].distance, 5000.0);
    }

    #[test]
    fn test_build_problem_rejects_negative_weight() {
        let json = r#"{
            "distances": { "type": "rows", "rows": [] },
            "weights": [1.0, -1.0],
            "budgets": [1],
            "thresholds": [1.0]
        }"#;

        let problem: JsonCoverageProblem = serde_json::from_str(json).unwrap();

        assert!(problem.build_problem().is_err());
    }
}
