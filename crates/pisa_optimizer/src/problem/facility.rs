use serde::Serialize;

use crate::define_index_newtype;

define_index_newtype!(FacilityId);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FacilityStatus {
    AlreadyOpen,
    Candidate,
}

/// Facilities that exist today. The model can never close them and they
/// count against the budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlreadyOpen {
    facilities: Vec<FacilityId>,
}

impl AlreadyOpen {
    pub fn new(facilities: impl IntoIterator<Item = FacilityId>) -> Self {
        let mut facilities: Vec<FacilityId> = facilities.into_iter().collect();
        facilities.sort_unstable();
        facilities.dedup();

        Self { facilities }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, facility: FacilityId) -> bool {
        self.facilities.binary_search(&facility).is_ok()
    }

    pub fn status(&self, facility: FacilityId) -> FacilityStatus {
        if self.contains(facility) {
            FacilityStatus::AlreadyOpen
        } else {
            FacilityStatus::Candidate
        }
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FacilityId> + '_ {
        self.facilities.iter().copied()
    }

    pub fn as_slice(&self) -> &[FacilityId] {
        &self.facilities
    }
}

impl FromIterator<FacilityId> for AlreadyOpen {
    fn from_iter<T: IntoIterator<Item = FacilityId>>(iter: T) -> Self {
        Self::new(iter)
    }
}
