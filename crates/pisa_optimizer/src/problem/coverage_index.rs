use fxhash::{FxHashMap, FxHashSet};
use pisa_matrix_providers::travel_distances::{Distance, TravelDistanceRow, TravelDistanceTable};
use tracing::{debug, instrument};

use crate::error::ProblemError;

use super::{demand::DemandId, facility::FacilityId};

/// Who reaches whom within one distance threshold.
///
/// Both directions are stored as sorted, duplicate-free adjacency lists:
/// `facilities()` (the universe J) aligned with their coverage sets, and
/// `demands()` (the universe I) aligned with the facilities reaching them.
/// The index is immutable once built and rebuilt per threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageIndex {
    threshold: Distance,

    facilities: Vec<FacilityId>,
    coverage: Vec<Vec<DemandId>>,

    demands: Vec<DemandId>,
    reach: Vec<Vec<FacilityId>>,

    facility_positions: FxHashMap<FacilityId, usize>,
    demand_positions: FxHashMap<DemandId, usize>,
}

impl CoverageIndex {
    /// Keeps the rows with `distance <= threshold` and groups them by facility.
    #[instrument(skip(table), level = "debug")]
    pub fn build(table: &TravelDistanceTable, threshold: Distance) -> Self {
        Self::from_rows(table.iter(), threshold)
    }

    pub fn from_rows<'a>(
        rows: impl IntoIterator<Item = &'a TravelDistanceRow>,
        threshold: Distance,
    ) -> Self {
        let pairs = rows
            .into_iter()
            .filter(|row| row.distance <= threshold)
            .map(|row| {
                (
                    FacilityId::new(row.facility_id),
                    DemandId::new(row.demand_id),
                )
            })
            .collect();

        Self::from_pairs(threshold, pairs)
    }

    /// Builds an index from coverage sets that are already known, e.g. from
    /// isochrones computed upstream.
    pub fn from_coverage<D>(
        threshold: Distance,
        coverage: impl IntoIterator<Item = (FacilityId, D)>,
    ) -> Self
    where
        D: IntoIterator<Item = DemandId>,
    {
        let pairs = coverage
            .into_iter()
            .flat_map(|(facility, demands)| {
                demands.into_iter().map(move |demand| (facility, demand))
            })
            .collect();

        Self::from_pairs(threshold, pairs)
    }

    pub fn empty(threshold: Distance) -> Self {
        Self::from_pairs(threshold, Vec::new())
    }

    fn from_pairs(threshold: Distance, mut pairs: Vec<(FacilityId, DemandId)>) -> Self {
        pairs.sort_unstable();
        pairs.dedup();

        let (facilities, coverage) = group_sorted_pairs(pairs.iter().copied());

        let mut reversed: Vec<(DemandId, FacilityId)> = pairs
            .into_iter()
            .map(|(facility, demand)| (demand, facility))
            .collect();
        reversed.sort_unstable();

        let (demands, reach) = group_sorted_pairs(reversed.into_iter());

        debug!(
            threshold,
            facilities = facilities.len(),
            demands = demands.len(),
            "Built coverage index"
        );

        Self {
            threshold,
            facility_positions: positions(&facilities),
            demand_positions: positions(&demands),
            facilities,
            coverage,
            demands,
            reach,
        }
    }

    /// Index over the demand points not in `covered`. Facilities left without
    /// any demand point drop out of J.
    pub fn excluding_demands(&self, covered: &FxHashSet<DemandId>) -> Self {
        let pairs = self
            .pairs()
            .filter(|(_, demand)| !covered.contains(demand))
            .collect();

        Self::from_pairs(self.threshold, pairs)
    }

    pub fn threshold(&self) -> Distance {
        self.threshold
    }

    /// The universe J.
    pub fn facilities(&self) -> &[FacilityId] {
        &self.facilities
    }

    /// The universe I.
    pub fn demands(&self) -> &[DemandId] {
        &self.demands
    }

    pub fn covered_by(&self, facility: FacilityId) -> &[DemandId] {
        self.facility_positions
            .get(&facility)
            .map_or(&[], |&position| &self.coverage[position])
    }

    pub fn reachable_from(&self, demand: DemandId) -> &[FacilityId] {
        self.demand_positions
            .get(&demand)
            .map_or(&[], |&position| &self.reach[position])
    }

    pub fn contains_facility(&self, facility: FacilityId) -> bool {
        self.facility_positions.contains_key(&facility)
    }

    pub fn contains_demand(&self, demand: DemandId) -> bool {
        self.demand_positions.contains_key(&demand)
    }

    pub fn coverage_sets(&self) -> impl Iterator<Item = (FacilityId, &[DemandId])> {
        self.facilities
            .iter()
            .zip(self.coverage.iter())
            .map(|(&facility, demands)| (facility, demands.as_slice()))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (FacilityId, DemandId)> + '_ {
        self.coverage_sets()
            .flat_map(|(facility, demands)| demands.iter().map(move |&demand| (facility, demand)))
    }

    pub fn num_pairs(&self) -> usize {
        self.coverage.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    /// Checks that both directions describe the same pairs and that the
    /// universes are exactly the keys of their maps.
    pub fn check_consistency(&self) -> Result<(), ProblemError> {
        if self.facilities.len() != self.coverage.len() || self.demands.len() != self.reach.len() {
            return Err(ProblemError::InconsistentIndex(String::from(
                "universe and adjacency lengths differ",
            )));
        }

        if !is_strictly_sorted(&self.facilities) || !is_strictly_sorted(&self.demands) {
            return Err(ProblemError::InconsistentIndex(String::from(
                "universes are not sorted and unique",
            )));
        }

        let reverse_pairs: usize = self.reach.iter().map(Vec::len).sum();
        if reverse_pairs != self.num_pairs() {
            return Err(ProblemError::InconsistentIndex(format!(
                "{} facility to demand pairs but {} demand to facility pairs",
                self.num_pairs(),
                reverse_pairs
            )));
        }

        for (facility, demands) in self.coverage_sets() {
            if demands.is_empty() || !is_strictly_sorted(demands) {
                return Err(ProblemError::InconsistentIndex(format!(
                    "coverage set of facility {facility} is empty or unsorted"
                )));
            }

            for &demand in demands {
                if self.reachable_from(demand).binary_search(&facility).is_err() {
                    return Err(ProblemError::InconsistentIndex(format!(
                        "demand {demand} is covered by facility {facility} but the reverse entry is missing"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn group_sorted_pairs<K, V>(pairs: impl Iterator<Item = (K, V)>) -> (Vec<K>, Vec<Vec<V>>)
where
    K: Copy + PartialEq,
{
    let mut keys: Vec<K> = Vec::new();
    let mut groups: Vec<Vec<V>> = Vec::new();

    for (key, value) in pairs {
        match (keys.last(), groups.last_mut()) {
            (Some(last), Some(group)) if *last == key => group.push(value),
            _ => {
                keys.push(key);
                groups.push(vec![value]);
            }
        }
    }

    (keys, groups)
}

fn positions<K>(keys: &[K]) -> FxHashMap<K, usize>
where
    K: Copy + Eq + std::hash::Hash,
{
    keys.iter()
        .enumerate()
        .map(|(position, &key)| (key, position))
        .collect()
}

fn is_strictly_sorted<T: Ord>(values: &[T]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}
