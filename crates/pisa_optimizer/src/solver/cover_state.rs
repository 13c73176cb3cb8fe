use fixedbitset::FixedBitSet;

use crate::problem::demand::Weight;

use super::formulation::CoveringFormulation;

/// Open column set together with how many open columns reach every covered
/// column, so opening or closing a column is incremental.
#[derive(Debug, Clone)]
pub(crate) struct CoverState<'a> {
    formulation: &'a CoveringFormulation,
    counts: Vec<u32>,
    open: FixedBitSet,
    num_open: usize,
    coverage: Weight,
}

impl<'a> CoverState<'a> {
    pub fn new(formulation: &'a CoveringFormulation) -> Self {
        Self {
            formulation,
            counts: vec![0; formulation.num_covered_columns()],
            open: FixedBitSet::with_capacity(formulation.num_open_columns()),
            num_open: 0,
            coverage: 0.0,
        }
    }

    /// State with every already open facility opened.
    pub fn with_forced(formulation: &'a CoveringFormulation) -> Self {
        let mut state = Self::new(formulation);
        for column in formulation.forced_columns() {
            state.open(column);
        }
        state
    }

    pub fn from_open(formulation: &'a CoveringFormulation, open: &FixedBitSet) -> Self {
        let mut state = Self::with_forced(formulation);
        for column in open.ones() {
            if column < formulation.num_open_columns() && !state.is_open(column) {
                state.open(column);
            }
        }
        state
    }

    pub fn formulation(&self) -> &'a CoveringFormulation {
        self.formulation
    }

    pub fn is_open(&self, column: usize) -> bool {
        self.open.contains(column)
    }

    pub fn num_open(&self) -> usize {
        self.num_open
    }

    pub fn open_columns(&self) -> &FixedBitSet {
        &self.open
    }

    pub fn coverage(&self) -> Weight {
        self.coverage
    }

    pub fn objective(&self) -> f64 {
        self.coverage - self.formulation.parsimony() * self.num_open as f64
    }

    /// Weight that opening `column` would add.
    pub fn gain(&self, column: usize) -> Weight {
        self.formulation
            .covering(column)
            .iter()
            .filter(|&&row| self.counts[row] == 0)
            .map(|&row| self.formulation.weight(row))
            .sum()
    }

    /// Weight that closing `column` would lose.
    pub fn loss(&self, column: usize) -> Weight {
        self.formulation
            .covering(column)
            .iter()
            .filter(|&&row| self.counts[row] == 1)
            .map(|&row| self.formulation.weight(row))
            .sum()
    }

    /// Covered columns that opening `column` would cover for the first time.
    pub fn newly_covered(&self, column: usize) -> impl Iterator<Item = usize> + '_ {
        self.formulation
            .covering(column)
            .iter()
            .copied()
            .filter(|&row| self.counts[row] == 0)
    }

    pub fn open(&mut self, column: usize) {
        debug_assert!(!self.is_open(column));

        for &row in self.formulation.covering(column) {
            if self.counts[row] == 0 {
                self.coverage += self.formulation.weight(row);
            }
            self.counts[row] += 1;
        }

        self.open.insert(column);
        self.num_open += 1;
    }

    pub fn close(&mut self, column: usize) {
        debug_assert!(self.is_open(column));

        for &row in self.formulation.covering(column) {
            self.counts[row] -= 1;
            if self.counts[row] == 0 {
                self.coverage -= self.formulation.weight(row);
            }
        }

        self.open.set(column, false);
        self.num_open -= 1;
    }

    pub fn covered(&self) -> FixedBitSet {
        let mut covered = FixedBitSet::with_capacity(self.counts.len());
        for (row, &count) in self.counts.iter().enumerate() {
            covered.set(row, count > 0);
        }
        covered
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::facility::{AlreadyOpen, FacilityId},
        test_utils,
    };

    use super::*;

    #[test]
    fn test_open_and_close_are_inverse() {
        let index = test_utils::overlapping_index();
        let weights = test_utils::unit_weights(6);
        let formulation = CoveringFormulation::new(&index, &weights, &AlreadyOpen::none(), 0.0);

        let mut state = CoverState::new(&formulation);
        state.open(0);
        assert_eq!(state.coverage(), 3.0);
        assert_eq!(state.gain(1), 2.0);

        state.open(1);
        assert_eq!(state.coverage(), 5.0);
        assert_eq!(state.loss(0), 2.0);

        state.close(0);
        assert_eq!(state.coverage(), 3.0);
        assert_eq!(state.num_open(), 1);
        assert!(!state.is_open(0));
    }

    #[test]
    fn test_with_forced_opens_already_open() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();
        let formulation =
            CoveringFormulation::new(&index, &weights, &AlreadyOpen::new([FacilityId::new(1)]), 0.0);

        let state = CoverState::with_forced(&formulation);

        assert!(state.is_open(1));
        assert_eq!(state.coverage(), 1.0);
        assert_eq!(state.gain(0), 15.0);
    }
}
