use fxhash::FxHashSet;

use crate::{
    error::VerificationError,
    problem::{
        coverage_index::CoverageIndex,
        demand::{DemandId, DemandWeights},
        facility::{AlreadyOpen, FacilityId},
    },
};

use super::{
    backend::BackendSolution, formulation::CoveringFormulation, solution_record::SolutionRecord,
};

const OBJECTIVE_TOLERANCE: f64 = 1e-6;

/// Union of the coverage sets of the open facilities that are keys of the
/// index. Sorted.
pub fn covered_demands(index: &CoverageIndex, open: &[FacilityId]) -> Vec<DemandId> {
    let covered: FxHashSet<DemandId> = open
        .iter()
        .filter(|&&facility| index.contains_facility(facility))
        .flat_map(|&facility| index.covered_by(facility).iter().copied())
        .collect();

    let mut covered: Vec<DemandId> = covered.into_iter().collect();
    covered.sort_unstable();
    covered
}

/// Checks raw backend output before its covered columns are completed.
///
/// Every covered column must be reached by an open column, and the solver
/// objective with the parsimony cost added back must be within `gap` of the
/// weight the open columns actually reach.
pub fn verify_backend_solution(
    formulation: &CoveringFormulation,
    budget: usize,
    solution: &BackendSolution,
    gap: f64,
) -> Result<(), VerificationError> {
    let threshold = formulation.threshold();
    let open = solution.open.count_ones(..);

    if open > budget {
        return Err(VerificationError::BudgetExceeded {
            threshold,
            budget,
            open,
        });
    }

    if let Some(column) = formulation
        .forced_columns()
        .find(|&column| !solution.open.contains(column))
    {
        return Err(VerificationError::ForcedOpenMissing {
            threshold,
            budget,
            facility: formulation.open_columns()[column],
        });
    }

    let reached = formulation.covered_by(&solution.open);
    let unexpected: Vec<DemandId> = solution
        .covered
        .difference(&reached)
        .filter_map(|column| formulation.covered_columns().get(column).copied())
        .collect();
    if !unexpected.is_empty() {
        return Err(VerificationError::CoveredSetMismatch {
            threshold,
            budget,
            missing: Vec::new(),
            unexpected,
        });
    }

    let recomputed = formulation.coverage(&reached);
    let reported = solution.objective + formulation.parsimony() * open as f64;
    let tolerance = (gap.max(0.0) * recomputed.abs())
        .max(OBJECTIVE_TOLERANCE * recomputed.abs().max(1.0));
    if !reported.is_finite() || (reported - recomputed).abs() > tolerance {
        return Err(VerificationError::ObjectiveMismatch {
            threshold,
            budget,
            reported,
            recomputed,
        });
    }

    Ok(())
}

/// Recomputes a record from its open facilities and the index alone and
/// checks it against what the solver reported.
pub fn verify(
    index: &CoverageIndex,
    weights: &DemandWeights,
    already_open: &AlreadyOpen,
    record: &SolutionRecord,
) -> Result<(), VerificationError> {
    let threshold = record.threshold();
    let budget = record.budget();

    if record.open_facility_ids().len() > budget {
        return Err(VerificationError::BudgetExceeded {
            threshold,
            budget,
            open: record.open_facility_ids().len(),
        });
    }

    let open: FxHashSet<FacilityId> = record.open_facility_ids().iter().copied().collect();
    if let Some(facility) = already_open.iter().find(|facility| !open.contains(facility)) {
        return Err(VerificationError::ForcedOpenMissing {
            threshold,
            budget,
            facility,
        });
    }

    let recomputed = covered_demands(index, record.open_facility_ids());
    let recomputed_set: FxHashSet<DemandId> = recomputed.iter().copied().collect();
    let reported: FxHashSet<DemandId> = record.covered_demand_ids().iter().copied().collect();

    if recomputed_set != reported {
        let mut missing: Vec<DemandId> = recomputed_set.difference(&reported).copied().collect();
        let mut unexpected: Vec<DemandId> = reported.difference(&recomputed_set).copied().collect();
        missing.sort_unstable();
        unexpected.sort_unstable();

        return Err(VerificationError::CoveredSetMismatch {
            threshold,
            budget,
            missing,
            unexpected,
        });
    }

    let recomputed_objective = weights.sum_of(&recomputed);
    let tolerance = OBJECTIVE_TOLERANCE * recomputed_objective.abs().max(1.0);
    if (recomputed_objective - record.objective_value()).abs() > tolerance {
        return Err(VerificationError::ObjectiveMismatch {
            threshold,
            budget,
            reported: record.objective_value(),
            recomputed: recomputed_objective,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use fixedbitset::FixedBitSet;

    use crate::{
        solver::{backend::BackendTermination, solution_record::Termination},
        test_utils,
    };

    use super::*;

    fn record(open: &[usize], covered: &[usize], objective: f64, budget: usize) -> SolutionRecord {
        SolutionRecord::new(
            1.0,
            budget,
            budget,
            objective,
            open.iter().copied().map(FacilityId::new).collect(),
            covered.iter().copied().map(DemandId::new).collect(),
            Termination::Optimal,
            Some(0.0),
            None,
        )
    }

    #[test]
    fn test_covered_demands_ignores_unknown_facilities() {
        let index = test_utils::scenario_index();

        let covered = covered_demands(&index, &[FacilityId::new(9), FacilityId::new(1)]);

        assert_eq!(covered, vec![DemandId::new(2)]);
    }

    #[test]
    fn test_verify_accepts_consistent_record() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();

        let result = verify(
            &index,
            &weights,
            &AlreadyOpen::none(),
            &record(&[0], &[0, 1], 15.0, 1),
        );

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_verify_reports_set_mismatch() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();

        let result = verify(
            &index,
            &weights,
            &AlreadyOpen::none(),
            &record(&[0], &[0, 2], 11.0, 1),
        );

        assert_eq!(
            result,
            Err(VerificationError::CoveredSetMismatch {
                threshold: 1.0,
                budget: 1,
                missing: vec![DemandId::new(1)],
                unexpected: vec![DemandId::new(2)],
            })
        );
    }

    #[test]
    fn test_verify_checks_forced_open_budget_and_objective() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();
        let already_open = AlreadyOpen::new([FacilityId::new(1)]);

        assert!(matches!(
            verify(&index, &weights, &already_open, &record(&[0], &[0, 1], 15.0, 1)),
            Err(VerificationError::ForcedOpenMissing { .. })
        ));
        assert!(matches!(
            verify(&index, &weights, &AlreadyOpen::none(), &record(&[0, 1], &[0, 1, 2], 16.0, 1)),
            Err(VerificationError::BudgetExceeded { open: 2, .. })
        ));
        assert!(matches!(
            verify(&index, &weights, &AlreadyOpen::none(), &record(&[0], &[0, 1], 14.0, 1)),
            Err(VerificationError::ObjectiveMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_keeps_zero_weight_demands() {
        let index = test_utils::create_index(1.0, &[(0, &[0, 1, 5])]);
        let weights = DemandWeights::from_sparse([(DemandId::new(0), 3.0)]).unwrap();

        assert_eq!(
            covered_demands(&index, &[FacilityId::new(0)]),
            vec![DemandId::new(0), DemandId::new(1), DemandId::new(5)]
        );
        assert_eq!(
            verify(&index, &weights, &AlreadyOpen::none(), &record(&[0], &[0, 1, 5], 3.0, 1)),
            Ok(())
        );
        assert!(matches!(
            verify(&index, &weights, &AlreadyOpen::none(), &record(&[0], &[0], 3.0, 1)),
            Err(VerificationError::CoveredSetMismatch { .. })
        ));
    }

    fn backend_solution(
        formulation: &CoveringFormulation,
        open: &[usize],
        covered: &[usize],
        objective: f64,
    ) -> BackendSolution {
        let mut open_columns = FixedBitSet::with_capacity(formulation.num_open_columns());
        open.iter().for_each(|&column| open_columns.insert(column));
        let mut covered_columns = FixedBitSet::with_capacity(formulation.num_covered_columns());
        covered.iter().for_each(|&column| covered_columns.insert(column));

        BackendSolution {
            termination: BackendTermination::Optimal,
            open: open_columns,
            covered: covered_columns,
            objective,
            bound: None,
            gap: 0.0,
        }
    }

    #[test]
    fn test_verify_backend_solution() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();
        let formulation = CoveringFormulation::new(&index, &weights, &AlreadyOpen::none(), 0.0);

        let consistent = backend_solution(&formulation, &[0], &[0, 1], 15.0);
        assert_eq!(verify_backend_solution(&formulation, 1, &consistent, 0.0), Ok(()));

        let inflated = backend_solution(&formulation, &[0], &[], 999.0);
        assert_eq!(
            verify_backend_solution(&formulation, 1, &inflated, 0.001),
            Err(VerificationError::ObjectiveMismatch {
                threshold: 1.0,
                budget: 1,
                reported: 999.0,
                recomputed: 15.0,
            })
        );

        let unreachable = backend_solution(&formulation, &[0], &[0, 1, 2], 16.0);
        assert_eq!(
            verify_backend_solution(&formulation, 1, &unreachable, 0.001),
            Err(VerificationError::CoveredSetMismatch {
                threshold: 1.0,
                budget: 1,
                missing: Vec::new(),
                unexpected: vec![DemandId::new(2)],
            })
        );
    }

    #[test]
    fn test_verify_backend_solution_tolerates_the_gap() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();
        let formulation = CoveringFormulation::new(&index, &weights, &AlreadyOpen::none(), 0.0);

        // Column of demand point 1 left at 0 by the solver.
        let within_gap = backend_solution(&formulation, &[0], &[0], 10.0);

        assert!(verify_backend_solution(&formulation, 1, &within_gap, 0.5).is_ok());
        assert!(verify_backend_solution(&formulation, 1, &within_gap, 0.1).is_err());
    }

    #[test]
    fn test_verify_backend_solution_with_parsimony() {
        let index = test_utils::scenario_index();
        let weights = test_utils::scenario_weights();
        let formulation = CoveringFormulation::new(&index, &weights, &AlreadyOpen::none(), 0.25);

        let solution = backend_solution(&formulation, &[0, 1], &[0, 1, 2], 15.5);

        assert_eq!(verify_backend_solution(&formulation, 2, &solution, 0.0), Ok(()));
    }
}
