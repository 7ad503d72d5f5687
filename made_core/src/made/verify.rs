//! Rounding, verification and match statistics of a solved transition
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::configuration::Solver as SolverKind;
use crate::made::error::MadeError;
use crate::made::expression::{Direction, ExpressionRecord};
use crate::made::gene_mapper::gene_variable_id;
use crate::made::milp::{required_objective, solve_flux_balance};
use crate::made::transition::Transition;
use crate::metabolic_model::model::Model;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// A gene state the solver left away from 0 and 1, an integrality leak
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundingWarning {
    pub transition: usize,
    pub condition: usize,
    pub gene: String,
    /// Value reported by the solver
    pub value: f64,
    /// State it was rounded to
    pub state: bool,
}

/// Turn a relaxed state value into a binary state
///
/// Returns the state and whether the value was further than `tolerance` from both 0 and 1.
pub fn round_state(value: f64, tolerance: f64) -> (bool, bool) {
    if value.abs() <= tolerance {
        (false, false)
    } else if (value - 1f64).abs() <= tolerance {
        (true, false)
    } else {
        (value >= 0.5, true)
    }
}

/// Gene values and states of one condition of a transition
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneStates {
    /// Values as reported by the solver
    pub values: IndexMap<String, f64>,
    /// Binary states after rounding
    pub states: IndexMap<String, bool>,
    pub warnings: Vec<RoundingWarning>,
}

/// Read the states of `genes` in `condition` from the MILP solution
///
/// With `round_states` values within `tolerance` of 0 or 1 are snapped and all other values
/// are rounded with a [`RoundingWarning`]. Without it values are thresholded at 0.5 silently.
pub fn extract_gene_states(
    solution: &ProblemSolution,
    genes: &[String],
    transition: usize,
    condition: usize,
    round_states: bool,
    tolerance: f64,
) -> GeneStates {
    let mut values = IndexMap::with_capacity(genes.len());
    let mut states = IndexMap::with_capacity(genes.len());
    let mut warnings = Vec::new();
    for gene in genes {
        let value = solution
            .value(&gene_variable_id(gene, condition))
            .unwrap_or(0f64);
        let state = if round_states {
            let (state, leaked) = round_state(value, tolerance);
            if leaked {
                warnings.push(RoundingWarning {
                    transition,
                    condition,
                    gene: gene.clone(),
                    value,
                    state,
                });
            }
            state
        } else {
            value >= 0.5
        };
        values.insert(gene.clone(), value);
        states.insert(gene.clone(), state);
    }
    GeneStates {
        values,
        states,
        warnings,
    }
}

/// What is needed to re-check a condition against its objective fraction
#[derive(Clone, Copy, Debug)]
pub struct VerificationTarget {
    pub transition: usize,
    pub condition: usize,
    pub obj_frac: f64,
    /// Maximum objective flux of the bound model
    pub vmax: f64,
    /// Slack on the required objective, see [`verification_tolerance`]
    pub tolerance: f64,
}

/// Slack allowed when re-checking the objective fraction
///
/// The integrality tolerance given to the MILP solver, but never tighter than the general
/// numerical tolerance the flux balance solve works to.
pub fn verification_tolerance(set_int_feas_tol: Option<f64>, tolerance: f64) -> f64 {
    set_int_feas_tol.map_or(tolerance, |int_tol| int_tol.max(tolerance))
}

/// Apply `states` to a copy of `model` and check that flux balance still reaches the
/// required fraction of the maximum objective
///
/// Returns the objective value reached.
///
/// # Errors
/// [`MadeError::Verification`] when the objective falls short (an infeasible model counts as
/// negative infinity).
pub fn verify_condition(
    model: &Model,
    states: &IndexMap<String, bool>,
    target: VerificationTarget,
    solver: SolverKind,
    timeout: Option<Duration>,
) -> Result<f64, MadeError> {
    let mut adjusted = model.clone();
    adjusted.apply_gene_states(states);
    let solution = solve_flux_balance(&adjusted, target.condition, solver, timeout)?;
    let objective = match (solution.is_optimal(), solution.objective_value) {
        (true, Some(value)) => value,
        _ => f64::NEG_INFINITY,
    };
    let required = required_objective(target.obj_frac, target.vmax, target.tolerance);
    if objective < required {
        return Err(MadeError::Verification {
            transition: target.transition,
            condition: target.condition,
            objective,
            required,
        });
    }
    Ok(objective)
}

/// Agreement between gene states and expression evidence for one transition
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MatchCount {
    /// Weighted genes whose states agree with their direction
    pub observed: usize,
    /// Weighted genes, all of which could agree if the network were ignored
    pub theoretical: usize,
    /// All genes of the transition
    pub total: usize,
}

impl MatchCount {
    /// Observed matches in percent, relative to the theoretical matches or to all genes
    pub fn percentage(&self, theoretical_match: bool) -> f64 {
        let denominator = if theoretical_match {
            self.theoretical
        } else {
            self.total
        };
        if denominator == 0 {
            0f64
        } else {
            100f64 * self.observed as f64 / denominator as f64
        }
    }
}

/// Count the weighted genes whose states follow the expression evidence
///
/// Increase matches a switch from off in `source` to on in `target`, Decrease a switch from
/// on to off and Constant an unchanged state.
pub fn count_matches(
    records: &[ExpressionRecord],
    source: &IndexMap<String, bool>,
    target: &IndexMap<String, bool>,
) -> MatchCount {
    let mut count = MatchCount {
        total: records.len(),
        ..MatchCount::default()
    };
    for record in records.iter().filter(|r| r.is_weighted()) {
        count.theoretical += 1;
        let (Some(&before), Some(&after)) = (source.get(&record.gene), target.get(&record.gene))
        else {
            continue;
        };
        let matched = match record.direction {
            Direction::Increase => !before && after,
            Direction::Decrease => before && !after,
            Direction::Constant => before == after,
        };
        if matched {
            count.observed += 1;
        }
    }
    count
}

/// Result of one condition within a solved transition
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConditionSolution {
    pub condition: usize,
    /// Net flux per reaction
    pub fluxes: IndexMap<String, f64>,
    /// Gene state values reported by the solver
    pub gene_values: IndexMap<String, f64>,
    /// Gene states after rounding
    pub gene_states: IndexMap<String, bool>,
    /// Objective reached by the model with the states applied, when verified
    pub verified_objective: Option<f64>,
}

/// Everything known about a solved transition
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolutionResult {
    pub transition: Transition,
    pub status: OptimizationStatus,
    /// Weighted mismatch between gene states and expression evidence
    pub objective_value: f64,
    /// Source condition first, then target
    pub conditions: Vec<ConditionSolution>,
    pub records: Vec<ExpressionRecord>,
    pub rounding_warnings: Vec<RoundingWarning>,
    pub matches: MatchCount,
}

impl SolutionResult {
    /// Solution of `condition`, if it is part of this transition
    pub fn condition(&self, condition: usize) -> Option<&ConditionSolution> {
        self.conditions.iter().find(|c| c.condition == condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(gene: &str, direction: Direction, weight: f64) -> ExpressionRecord {
        ExpressionRecord {
            gene: gene.to_string(),
            fold_change: 0.,
            direction,
            magnitude: 0.,
            weight,
        }
    }

    fn states(pairs: &[(&str, bool)]) -> IndexMap<String, bool> {
        pairs.iter().map(|(g, s)| (g.to_string(), *s)).collect()
    }

    #[test]
    fn rounding() {
        assert_eq!(round_state(1e-12, 1e-10), (false, false));
        assert_eq!(round_state(1. - 1e-12, 1e-10), (true, false));
        assert_eq!(round_state(0.7, 1e-10), (true, true));
        assert_eq!(round_state(0.3, 1e-10), (false, true));
        assert_eq!(round_state(0.3, 0.4), (false, false));
    }

    #[test]
    fn states_from_solution() {
        let mut values = IndexMap::new();
        values.insert("gene__g1__c1".to_string(), 1.0);
        values.insert("gene__g2__c1".to_string(), 0.6);
        values.insert("gene__g3__c1".to_string(), 1e-14);
        let solution = ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(0.),
            variable_values: Some(values),
        };
        let genes: Vec<String> = ["g1", "g2", "g3"].iter().map(|g| g.to_string()).collect();
        let extracted = extract_gene_states(&solution, &genes, 4, 1, true, 1e-10);
        assert_eq!(extracted.states, states(&[("g1", true), ("g2", true), ("g3", false)]));
        assert_eq!(extracted.warnings.len(), 1);
        assert_eq!(extracted.warnings[0].gene, "g2");
        assert_eq!(extracted.warnings[0].transition, 4);

        let unrounded = extract_gene_states(&solution, &genes, 4, 1, false, 1e-10);
        assert!(unrounded.warnings.is_empty());
        assert_eq!(unrounded.states, extracted.states);
    }

    #[test]
    fn matches() {
        let records = vec![
            record("up", Direction::Increase, 1.),
            record("down", Direction::Decrease, 1.),
            record("same", Direction::Constant, 0.5),
            record("ignored", Direction::Increase, 0.),
        ];
        let source = states(&[("up", false), ("down", true), ("same", true), ("ignored", false)]);
        let target = states(&[("up", true), ("down", true), ("same", true), ("ignored", false)]);
        let count = count_matches(&records, &source, &target);
        assert_eq!(
            count,
            MatchCount {
                observed: 2,
                theoretical: 3,
                total: 4
            }
        );
        assert!(count.theoretical >= count.observed);
        assert!((count.percentage(true) - 200. / 3.).abs() < 1e-9);
        assert!((count.percentage(false) - 50.).abs() < 1e-9);
        assert_eq!(MatchCount::default().percentage(true), 0.);
    }

    #[test]
    fn unchanged_states_do_not_match_a_change() {
        let records = vec![
            record("g1", Direction::Decrease, 1.),
            record("g2", Direction::Decrease, 1.),
            record("g3", Direction::Increase, 1.),
            record("g4", Direction::Increase, 1.),
        ];
        // Off in both conditions is no decrease, on in both is no increase
        let source = states(&[("g1", false), ("g2", true), ("g3", true), ("g4", true)]);
        let target = states(&[("g1", false), ("g2", false), ("g3", true), ("g4", false)]);
        let count = count_matches(&records, &source, &target);
        assert_eq!(count.observed, 1);
        assert_eq!(count.theoretical, 4);
    }

    #[test]
    fn verification_slack() {
        assert_eq!(verification_tolerance(None, 1e-7), 1e-7);
        assert_eq!(verification_tolerance(Some(1e-10), 1e-7), 1e-7);
        assert_eq!(verification_tolerance(Some(1e-4), 1e-7), 1e-4);
    }

    fn toy_branch() -> Model {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join("toy_branch.json");
        Model::read_json(path).unwrap()
    }

    #[test]
    fn verification_against_objective_fraction() {
        let model = toy_branch();
        // g1 off closes EX_A, the alternative uptake still feeds half the maximum
        let gene_states = states(&[("g1", false), ("g2", true)]);
        let target = VerificationTarget {
            transition: 0,
            condition: 1,
            obj_frac: 0.5,
            vmax: 20.,
            tolerance: 1e-6,
        };
        let objective =
            verify_condition(&model, &gene_states, target, SolverKind::Clarabel, None).unwrap();
        assert!((objective - 10.).abs() < 1e-4);

        let too_demanding = VerificationTarget {
            obj_frac: 0.6,
            ..target
        };
        assert!(matches!(
            verify_condition(&model, &gene_states, too_demanding, SolverKind::Clarabel, None),
            Err(MadeError::Verification { condition: 1, .. })
        ));

        // A fraction of zero is met even with every gene off
        let all_off = states(&[("g1", false), ("g2", false)]);
        let zero = VerificationTarget {
            obj_frac: 0.,
            ..target
        };
        assert!(verify_condition(&model, &all_off, zero, SolverKind::Clarabel, None).is_ok());
    }
}
