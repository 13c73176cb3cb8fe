use serde::Serialize;

use crate::{define_index_newtype, error::ProblemError};

pub type Weight = f64;

define_index_newtype!(DemandId, Weight);

/// Weight (e.g. headcount) of every demand point, stored densely by id.
/// Ids beyond the stored range weigh 0.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct DemandWeights {
    weights: Vec<Weight>,
}

impl DemandWeights {
    pub fn new(weights: Vec<Weight>) -> Result<Self, ProblemError> {
        if let Some((index, &weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, weight)| !is_valid_weight(**weight))
        {
            return Err(ProblemError::InvalidWeight {
                demand: DemandId::new(index),
                weight,
            });
        }

        Ok(Self { weights })
    }

    pub fn from_sparse(
        weights: impl IntoIterator<Item = (DemandId, Weight)>,
    ) -> Result<Self, ProblemError> {
        let mut dense: Vec<Weight> = Vec::new();
        let mut assigned: Vec<bool> = Vec::new();

        for (demand, weight) in weights {
            if !is_valid_weight(weight) {
                return Err(ProblemError::InvalidWeight { demand, weight });
            }

            if demand.get() >= dense.len() {
                dense.resize(demand.get() + 1, 0.0);
                assigned.resize(demand.get() + 1, false);
            }

            if assigned[demand.get()] {
                return Err(ProblemError::DuplicateWeight(demand));
            }

            assigned[demand.get()] = true;
            dense[demand] = weight;
        }

        Ok(Self { weights: dense })
    }

    #[inline(always)]
    pub fn weight(&self, demand: DemandId) -> Weight {
        self.weights.get(demand.get()).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> Weight {
        self.weights.iter().sum()
    }

    pub fn sum_of<'a>(&self, demands: impl IntoIterator<Item = &'a DemandId>) -> Weight {
        demands.into_iter().map(|&demand| self.weight(demand)).sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

fn is_valid_weight(weight: Weight) -> bool {
    weight.is_finite() && weight >= 0.0
}
