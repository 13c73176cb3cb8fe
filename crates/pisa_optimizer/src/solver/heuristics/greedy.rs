use crate::problem::demand::Weight;

use crate::solver::cover_state::CoverState;

const GAIN_EPSILON: f64 = 1e-9;

/// Greedy addition: repeatedly open the column with the largest marginal
/// gain. Gains are kept up to date incrementally, only columns sharing a
/// demand point with the last pick change.
#[derive(Debug, Clone)]
pub(crate) struct GreedyAddition<'a> {
    state: CoverState<'a>,
    gains: Vec<Weight>,
}

impl<'a> GreedyAddition<'a> {
    pub fn new(state: CoverState<'a>) -> Self {
        let gains = (0..state.formulation().num_open_columns())
            .map(|column| {
                if state.is_open(column) {
                    0.0
                } else {
                    state.gain(column)
                }
            })
            .collect();

        Self { state, gains }
    }

    /// Opens columns until `budget` are open or no column improves the
    /// objective. Returns the columns opened by this call.
    pub fn extend_to(&mut self, budget: usize) -> Vec<usize> {
        let parsimony = self.state.formulation().parsimony();
        let mut picked = Vec::new();

        while self.state.num_open() < budget {
            let Some((column, gain)) = self.best_candidate() else {
                break;
            };

            if gain <= parsimony + GAIN_EPSILON {
                break;
            }

            self.open(column);
            picked.push(column);
        }

        picked
    }

    fn best_candidate(&self) -> Option<(usize, Weight)> {
        self.gains
            .iter()
            .enumerate()
            .filter(|(column, _)| !self.state.is_open(*column))
            .fold(None, |best: Option<(usize, Weight)>, (column, &gain)| match best {
                Some((_, best_gain)) if best_gain >= gain => best,
                _ => Some((column, gain)),
            })
    }

    fn open(&mut self, column: usize) {
        let formulation = self.state.formulation();
        let newly_covered: Vec<usize> = self.state.newly_covered(column).collect();

        for row in newly_covered {
            let weight = formulation.weight(row);
            for &other in formulation.reaching(row) {
                self.gains[other] -= weight;
            }
        }

        self.gains[column] = 0.0;
        self.state.open(column);
    }

    pub fn state(&self) -> &CoverState<'a> {
        &self.state
    }
}
