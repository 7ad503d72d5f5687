//! Summary table of a run and the adjusted models
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::made::binder::Condition;
use crate::made::error::MadeError;
use crate::made::transition::Transition;
use crate::made::verify::SolutionResult;
use crate::metabolic_model::model::Model;

/// Outcome of a transition
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TransitionStatus {
    Solved,
    Failed(String),
}

impl Display for TransitionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionStatus::Solved => write!(f, "solved"),
            TransitionStatus::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

/// One line of the match table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchRow {
    pub transition: usize,
    pub source: usize,
    pub target: usize,
    pub column: usize,
    pub observed: usize,
    pub theoretical: usize,
    /// Observed matches in percent
    pub percentage: f64,
    /// Weighted mismatch, absent for failed transitions
    pub objective: Option<f64>,
    pub status: TransitionStatus,
    pub rounding_warnings: usize,
}

impl MatchRow {
    fn solved(solution: &SolutionResult, theoretical_match: bool) -> Self {
        let t = &solution.transition;
        MatchRow {
            transition: t.index,
            source: t.source,
            target: t.target,
            column: t.column,
            observed: solution.matches.observed,
            theoretical: solution.matches.theoretical,
            percentage: solution.matches.percentage(theoretical_match),
            objective: Some(solution.objective_value),
            status: TransitionStatus::Solved,
            rounding_warnings: solution.rounding_warnings.len(),
        }
    }

    fn failed(transition: &Transition, error: &MadeError) -> Self {
        MatchRow {
            transition: transition.index,
            source: transition.source,
            target: transition.target,
            column: transition.column,
            observed: 0,
            theoretical: 0,
            percentage: 0f64,
            objective: None,
            status: TransitionStatus::Failed(error.to_string()),
            rounding_warnings: 0,
        }
    }
}

/// Match statistics of every transition, in transition order
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MatchTable {
    pub rows: Vec<MatchRow>,
}

impl MatchTable {
    /// Build the table from the outcome of every transition
    pub fn from_outcomes(
        outcomes: &[(Transition, Result<SolutionResult, MadeError>)],
        theoretical_match: bool,
    ) -> Self {
        let rows = outcomes
            .iter()
            .map(|(transition, outcome)| match outcome {
                Ok(solution) => MatchRow::solved(solution, theoretical_match),
                Err(err) => MatchRow::failed(transition, err),
            })
            .collect();
        MatchTable { rows }
    }

    /// Rows of transitions which failed
    pub fn failures(&self) -> impl Iterator<Item = &MatchRow> {
        self.rows
            .iter()
            .filter(|row| matches!(row.status, TransitionStatus::Failed(_)))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Display for MatchTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>10} {:>6} {:>6} {:>6} {:>8} {:>11} {:>10} {:>12} {:>8}  status",
            "transition",
            "source",
            "target",
            "column",
            "observed",
            "theoretical",
            "percentage",
            "objective",
            "warnings"
        )?;
        for row in &self.rows {
            let objective = match row.objective {
                Some(value) => format!("{value:.4}"),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "{:>10} {:>6} {:>6} {:>6} {:>8} {:>11} {:>10.2} {:>12} {:>8}  {}",
                row.transition,
                row.source,
                row.target,
                row.column,
                row.observed,
                row.theoretical,
                row.percentage,
                objective,
                row.rounding_warnings,
                row.status
            )?;
        }
        Ok(())
    }
}

/// One model per condition with the gene states found for it applied
///
/// A condition takes its states from the first solved transition ending in it, then from
/// the first solved transition starting from it. Conditions no transition solved for are
/// returned as bound.
pub fn adjusted_models(conditions: &[Condition], solutions: &[SolutionResult]) -> Vec<Model> {
    conditions
        .iter()
        .map(|condition| {
            let index = condition.index();
            let states = solutions
                .iter()
                .find(|s| s.transition.target == index)
                .or_else(|| solutions.iter().find(|s| s.transition.source == index))
                .and_then(|s| s.condition(index));
            let mut model = condition.model().clone();
            if let Some(solution) = states {
                model.apply_gene_states(&solution.gene_states);
            }
            model
        })
        .collect()
}
