use pisa_matrix_providers::travel_distances::Distance;

use crate::error::SolverError;

/// Checks that total budgets are strictly increasing and never below the
/// number of already open facilities.
pub fn validate_budgets(budgets: &[usize], already_open: usize) -> Result<(), SolverError> {
    if let Some(&budget) = budgets.iter().find(|&&budget| budget < already_open) {
        return Err(SolverError::InvalidBudget {
            budget,
            already_open,
        });
    }

    if let Some(pair) = budgets.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(SolverError::UnorderedBudgets {
            previous: pair[0],
            next: pair[1],
        });
    }

    Ok(())
}

/// Total budgets for budgets counted beyond the already open facilities.
pub fn total_budgets(additional_budgets: &[usize], already_open: usize) -> Vec<usize> {
    additional_budgets
        .iter()
        .map(|&budget| budget + already_open)
        .collect()
}

/// Thresholds in ascending order without duplicates.
pub fn sorted_thresholds(thresholds: &[Distance]) -> Result<Vec<Distance>, SolverError> {
    if let Some(&threshold) = thresholds
        .iter()
        .find(|threshold| threshold.is_nan() || **threshold < 0.0)
    {
        return Err(SolverError::InvalidThreshold(threshold));
    }

    let mut sorted = thresholds.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    Ok(sorted)
}

/// Cost of one open facility under the parsimonious objective.
pub fn parsimony_cost(budgets: &[usize]) -> f64 {
    let max_budget = budgets.iter().copied().max().unwrap_or(0);
    1.0 / (max_budget as f64 + 1.0)
}
