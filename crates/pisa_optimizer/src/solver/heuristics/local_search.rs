use tracing::trace;

use crate::solver::cover_state::CoverState;

const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Swap local search: close one open column, open the best closed one, keep
/// the move if coverage strictly improves. Runs until no swap improves.
/// Already open facilities are never swapped out.
pub(crate) fn swap_local_search(state: &mut CoverState) -> usize {
    let formulation = state.formulation();
    let num_columns = formulation.num_open_columns();
    let mut swaps = 0;

    loop {
        let mut improved = false;

        for out in 0..num_columns {
            if !state.is_open(out) || formulation.is_forced(out) {
                continue;
            }

            let loss = state.loss(out);
            state.close(out);

            let best_in = (0..num_columns)
                .filter(|&column| column != out && !state.is_open(column))
                .map(|column| (column, state.gain(column)))
                .fold(None, |best: Option<(usize, f64)>, (column, gain)| match best {
                    Some((_, best_gain)) if best_gain >= gain => best,
                    _ => Some((column, gain)),
                });

            match best_in {
                Some((column, gain)) if gain > loss + IMPROVEMENT_EPSILON => {
                    trace!(out, column, gain, loss, "Swapped facility");
                    state.open(column);
                    swaps += 1;
                    improved = true;
                }
                _ => state.open(out),
            }
        }

        if !improved {
            break;
        }
    }

    swaps
}
