use fixedbitset::FixedBitSet;
use pisa_matrix_providers::travel_distances::Distance;
use tracing::debug;

use crate::problem::{
    coverage_index::CoverageIndex,
    demand::{DemandId, DemandWeights, Weight},
    facility::{AlreadyOpen, FacilityId, FacilityStatus},
};

/// Backend neutral covering model for one threshold.
///
/// Open columns are the facilities of J plus the already open ones (sorted by
/// id), covered columns are the demand points of I with a positive weight.
/// Both directions of the reachability relation are stored by column
/// position so backends never touch ids. Zero-weight demand points never
/// change the objective; they are kept per open column and only come back
/// when a covered set is reported.
#[derive(Debug, Clone)]
pub struct CoveringFormulation {
    threshold: Distance,

    open_columns: Vec<FacilityId>,
    forced: FixedBitSet,
    covering: Vec<Vec<usize>>,
    unweighted: Vec<Vec<DemandId>>,

    covered_columns: Vec<DemandId>,
    weights: Vec<Weight>,
    reaching: Vec<Vec<usize>>,

    parsimony: f64,
}

impl CoveringFormulation {
    pub fn new(
        index: &CoverageIndex,
        weights: &DemandWeights,
        already_open: &AlreadyOpen,
        parsimony: f64,
    ) -> Self {
        let mut open_columns: Vec<FacilityId> = index
            .facilities()
            .iter()
            .copied()
            .chain(already_open.iter())
            .collect();
        open_columns.sort_unstable();
        open_columns.dedup();

        let mut forced = FixedBitSet::with_capacity(open_columns.len());
        for (column, &facility) in open_columns.iter().enumerate() {
            forced.set(
                column,
                already_open.status(facility) == FacilityStatus::AlreadyOpen,
            );
        }

        let covered_columns: Vec<DemandId> = index
            .demands()
            .iter()
            .copied()
            .filter(|&demand| weights.weight(demand) > 0.0)
            .collect();

        let covered_weights = covered_columns
            .iter()
            .map(|&demand| weights.weight(demand))
            .collect();

        let covering = open_columns
            .iter()
            .map(|&facility| {
                index
                    .covered_by(facility)
                    .iter()
                    .filter_map(|demand| covered_columns.binary_search(demand).ok())
                    .collect()
            })
            .collect();

        let unweighted = open_columns
            .iter()
            .map(|&facility| {
                index
                    .covered_by(facility)
                    .iter()
                    .copied()
                    .filter(|&demand| weights.weight(demand) <= 0.0)
                    .collect()
            })
            .collect();

        let reaching = covered_columns
            .iter()
            .map(|&demand| {
                index
                    .reachable_from(demand)
                    .iter()
                    .filter_map(|facility| open_columns.binary_search(facility).ok())
                    .collect()
            })
            .collect();

        debug!(
            threshold = index.threshold(),
            open_columns = open_columns.len(),
            covered_columns = covered_columns.len(),
            "Formulated covering model"
        );

        Self {
            threshold: index.threshold(),
            open_columns,
            forced,
            covering,
            unweighted,
            covered_columns,
            weights: covered_weights,
            reaching,
            parsimony,
        }
    }

    pub fn threshold(&self) -> Distance {
        self.threshold
    }

    pub fn open_columns(&self) -> &[FacilityId] {
        &self.open_columns
    }

    pub fn covered_columns(&self) -> &[DemandId] {
        &self.covered_columns
    }

    pub fn num_open_columns(&self) -> usize {
        self.open_columns.len()
    }

    pub fn num_covered_columns(&self) -> usize {
        self.covered_columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_columns.is_empty() && self.covered_columns.is_empty()
    }

    pub fn is_forced(&self, column: usize) -> bool {
        self.forced.contains(column)
    }

    pub fn forced_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.forced.ones()
    }

    pub fn num_forced(&self) -> usize {
        self.forced.count_ones(..)
    }

    /// Covered columns reached by an open column.
    pub fn covering(&self, column: usize) -> &[usize] {
        &self.covering[column]
    }

    /// Open columns reaching a covered column.
    pub fn reaching(&self, column: usize) -> &[usize] {
        &self.reaching[column]
    }

    pub fn weight(&self, column: usize) -> Weight {
        self.weights[column]
    }

    pub fn total_weight(&self) -> Weight {
        self.weights.iter().sum()
    }

    /// Cost of one open facility in the objective, 0 when parsimony is off.
    pub fn parsimony(&self) -> f64 {
        self.parsimony
    }

    /// Open column set for the given facilities. Facilities without a column
    /// are ignored.
    pub fn columns_of(&self, facilities: &[FacilityId]) -> FixedBitSet {
        let mut open = FixedBitSet::with_capacity(self.open_columns.len());
        for facility in facilities {
            if let Ok(column) = self.open_columns.binary_search(facility) {
                open.insert(column);
            }
        }
        open
    }

    pub fn facilities_of(&self, open: &FixedBitSet) -> Vec<FacilityId> {
        open.ones().map(|column| self.open_columns[column]).collect()
    }

    /// Demand ids of the covered columns plus the zero-weight demand points
    /// reached by the open columns. Sorted.
    pub fn demands_of(&self, open: &FixedBitSet, covered: &FixedBitSet) -> Vec<DemandId> {
        let mut demands: Vec<DemandId> = covered
            .ones()
            .map(|column| self.covered_columns[column])
            .chain(
                open.ones()
                    .flat_map(|column| self.unweighted[column].iter().copied()),
            )
            .collect();
        demands.sort_unstable();
        demands.dedup();
        demands
    }

    /// Covered columns implied by an open column set.
    pub fn covered_by(&self, open: &FixedBitSet) -> FixedBitSet {
        let mut covered = FixedBitSet::with_capacity(self.covered_columns.len());
        for column in open.ones() {
            for &row in &self.covering[column] {
                covered.insert(row);
            }
        }
        covered
    }

    pub fn coverage(&self, covered: &FixedBitSet) -> Weight {
        covered.ones().map(|column| self.weights[column]).sum()
    }

    /// Value of the solver objective: weighted coverage minus the parsimony
    /// cost of the open columns.
    pub fn objective(&self, open: &FixedBitSet, covered: &FixedBitSet) -> f64 {
        self.coverage(covered) - self.parsimony * open.count_ones(..) as f64
    }
}
