use pisa_matrix_providers::travel_distances::{Distance, TravelDistanceTable};

use super::{
    demand::{DemandId, DemandWeights},
    facility::AlreadyOpen,
};

/// Everything a sweep needs: the distance table, weights, the already open
/// facilities and the (threshold, budget) grid. Budgets count facilities added
/// beyond the already open ones.
#[derive(Debug, Clone)]
pub struct CoverageProblem {
    pub id: Option<String>,
    pub table: TravelDistanceTable,
    pub weights: DemandWeights,
    pub already_open: AlreadyOpen,
    pub thresholds: Vec<Distance>,
    pub budgets: Vec<usize>,
    pub pre_covered: Vec<DemandId>,
}

impl CoverageProblem {
    pub fn total_weight(&self) -> f64 {
        self.weights.total()
    }

    pub fn num_records(&self) -> usize {
        let mut thresholds = self.thresholds.clone();
        thresholds.sort_by(|a, b| a.total_cmp(b));
        thresholds.dedup();
        thresholds.len() * self.budgets.len()
    }
}
