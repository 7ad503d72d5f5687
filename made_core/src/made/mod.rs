//! Metabolic Adjustment by Differential Expression
//!
//! Given fold changes (and optionally p-values) of genes between conditions and a metabolic
//! model, MADE finds binary gene states for every condition which agree as much as possible
//! with the direction of the observed changes, while every condition keeps a fraction of its
//! maximum objective flux. Each transition between two conditions is solved as its own MILP.
//!
//! The entry point is [`run_made`].
use indexmap::IndexSet;
use rayon::prelude::*;

use crate::configuration::Configuration;
use crate::made::binder::{bind_conditions, Condition, ModelInput};
use crate::made::config::MadeConfig;
use crate::made::error::MadeError;
use crate::made::expression::ExpressionMatrix;
use crate::made::milp::{net_fluxes, required_objective, solve_flux_balance, MilpBuilder};
use crate::made::report::{adjusted_models, MatchTable};
use crate::made::transition::{Transition, TransitionGraph};
use crate::made::verify::{
    count_matches, extract_gene_states, verification_tolerance, verify_condition,
    ConditionSolution, SolutionResult, VerificationTarget,
};
use crate::made::weighting::{ExpressionWeights, RunNote};
use crate::metabolic_model::model::Model;
use crate::optimize::solvers::{new_solver, solve_with_timeout, SolverError};

pub mod binder;
pub mod config;
pub mod error;
pub mod expression;
pub mod gene_mapper;
pub mod milp;
pub mod report;
pub mod transition;
pub mod verify;
pub mod weighting;

/// Output of [`run_made`]
#[derive(Clone, Debug)]
pub struct MadeResult {
    /// One row per transition, failed transitions included
    pub table: MatchTable,
    /// Adjusted model per condition, when requested
    pub models: Option<Vec<Model>>,
    /// Solutions of the transitions which solved, in transition order
    pub solutions: Vec<SolutionResult>,
    /// Things about the run worth knowing which aren't errors
    pub notes: Vec<RunNote>,
}

/// Run MADE
///
/// # Parameters
/// - `fold_change`: Genes by columns table of fold changes
/// - `pvals`: p-values with the same layout, when missing every gene weighs 1
/// - `models`: A single model used for every condition, or one model per condition
/// - `config`: Options of the run
///
/// # Errors
/// Invalid inputs and options are reported before any solver runs. Problems with single
/// transitions (infeasibility, failed verification, solver failures) don't fail the run,
/// they are recorded in [`MadeResult::table`].
///
/// # Examples
/// ```rust,no_run
/// use made_core::made::binder::ModelInput;
/// use made_core::made::config::MadeConfigBuilder;
/// use made_core::made::expression::ExpressionMatrix;
/// use made_core::made::run_made;
/// use made_core::metabolic_model::model::Model;
///
/// let model = Model::read_json("model.json").unwrap();
/// let fold_change = ExpressionMatrix::from_rows(
///     vec!["b0001".to_string()],
///     vec![vec![2.0]],
/// ).unwrap();
/// let config = MadeConfigBuilder::default().obj_frac(0.5).build().unwrap();
/// let result = run_made(&fold_change, None, &ModelInput::Single(model), &config).unwrap();
/// println!("{}", result.table);
/// ```
pub fn run_made(
    fold_change: &ExpressionMatrix,
    pvals: Option<&ExpressionMatrix>,
    models: &ModelInput,
    config: &MadeConfig,
) -> Result<MadeResult, MadeError> {
    config.validate()?;
    let graph = TransitionGraph::build(config.transition_matrix.as_ref(), fold_change.ncols())?;
    let weights = ExpressionWeights::compute(fold_change, pvals, config)?;
    config.obj_frac.check_conditions(graph.num_conditions())?;
    let conditions = bind_conditions(
        models,
        graph.num_conditions(),
        config.bounds.as_deref(),
        config.objs.as_deref(),
    )?;

    let global = Configuration::snapshot();
    let milp_solver = new_solver(global.milp_solver)?;
    if !milp_solver.integer_variable_capable() {
        return Err(SolverError::UnsupportedVariableType {
            solver: milp_solver.name(),
            variable_type: "Binary".to_string(),
        }
        .into());
    }

    tracing::info!(
        transitions = graph.num_transitions(),
        conditions = graph.num_conditions(),
        genes = fold_change.nrows(),
        weighting = %weights.scheme(),
        "Running MADE"
    );

    let threads = config.threads.unwrap_or(global.processes as usize).max(1);
    let outcomes = solve_all(graph.transitions(), threads, |t| {
        solve_transition(t, &conditions, &weights, config, &global)
    })?;

    let table = MatchTable::from_outcomes(&outcomes, config.theoretical_match);
    let mut solutions = Vec::with_capacity(outcomes.len());
    for (transition, outcome) in outcomes {
        match outcome {
            Ok(solution) => {
                for warning in &solution.rounding_warnings {
                    tracing::warn!(
                        transition = warning.transition,
                        condition = warning.condition,
                        gene = %warning.gene,
                        value = warning.value,
                        "Gene state was not integral and had to be rounded"
                    );
                }
                solutions.push(solution);
            }
            Err(err) => tracing::warn!(
                transition = transition.index,
                source = transition.source,
                target = transition.target,
                "Transition failed: {err}"
            ),
        }
    }

    let models = if config.return_models {
        Some(adjusted_models(&conditions, &solutions))
    } else {
        None
    };
    if config.verbose {
        tracing::info!("MADE results\n{table}");
    }

    Ok(MadeResult {
        table,
        models,
        solutions,
        notes: weights.note().cloned().into_iter().collect(),
    })
}

/// Outcome of every transition, in transition order
type Outcomes = Vec<(Transition, Result<SolutionResult, MadeError>)>;

/// Solve the transitions on a pool of `threads` workers
///
/// A failing transition only fails its own outcome.
fn solve_all<F>(
    transitions: &[Transition],
    threads: usize,
    solve: F,
) -> Result<Outcomes, MadeError>
where
    F: Fn(Transition) -> Result<SolutionResult, MadeError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("made-worker-{i}"))
        .build()?;
    Ok(pool.install(|| transitions.par_iter().map(|t| (*t, solve(*t))).collect()))
}

/// Genes given a state in a condition: the model's genes followed by those only in the data
fn condition_genes(model: &Model, weights: &ExpressionWeights, column: usize) -> Vec<String> {
    let mut genes: IndexSet<String> = model.genes.keys().cloned().collect();
    genes.extend(weights.column(column).iter().map(|r| r.gene.clone()));
    genes.into_iter().collect()
}

/// Maximum objective flux of a condition, failing the transition when there is none
fn max_objective(
    transition: &Transition,
    condition: &Condition,
    config: &MadeConfig,
    global: &Configuration,
) -> Result<f64, MadeError> {
    let solution = solve_flux_balance(
        condition.model(),
        condition.index(),
        global.lp_solver,
        config.solve_timeout,
    )?;
    match (solution.is_optimal(), solution.objective_value) {
        (true, Some(vmax)) => Ok(vmax),
        _ => Err(MadeError::Infeasible {
            transition: transition.index,
            message: format!(
                "flux balance of condition {} returned {:?}",
                condition.index(),
                solution.status
            ),
        }),
    }
}

/// Build, solve and check the MILP of a single transition
fn solve_transition(
    transition: Transition,
    conditions: &[Condition],
    weights: &ExpressionWeights,
    config: &MadeConfig,
    global: &Configuration,
) -> Result<SolutionResult, MadeError> {
    let pair = [
        &conditions[transition.source],
        &conditions[transition.target],
    ];
    let records = weights.column(transition.column);

    let mut vmax = [0f64; 2];
    for (slot, condition) in pair.iter().enumerate() {
        vmax[slot] = max_objective(&transition, condition, config, global)?;
    }
    let required = |slot: usize| {
        required_objective(
            config.obj_frac.for_condition(pair[slot].index()),
            vmax[slot],
            global.tolerance,
        )
    };

    let problem = MilpBuilder {
        transition,
        source: pair[0].model(),
        target: pair[1].model(),
        records,
        required_objective: (required(0), required(1)),
        remove_rev: config.remove_rev,
        big_m: global.big_m(),
    }
    .build()?;
    let solution = solve_with_timeout(
        new_solver(global.milp_solver)?,
        problem,
        config.set_int_feas_tol,
        config.solve_timeout,
    )?;
    if !solution.is_optimal() {
        return Err(MadeError::Infeasible {
            transition: transition.index,
            message: format!("MILP solver returned {:?}", solution.status),
        });
    }

    let tolerance = config.set_int_feas_tol.unwrap_or(global.tolerance);
    let mut condition_solutions = Vec::with_capacity(2);
    let mut rounding_warnings = Vec::new();
    for (slot, condition) in pair.iter().enumerate() {
        let genes = condition_genes(condition.model(), weights, transition.column);
        let states = extract_gene_states(
            &solution,
            &genes,
            transition.index,
            condition.index(),
            config.round_states,
            tolerance,
        );
        let verified_objective = if config.verify {
            let target = VerificationTarget {
                transition: transition.index,
                condition: condition.index(),
                obj_frac: config.obj_frac.for_condition(condition.index()),
                vmax: vmax[slot],
                tolerance: verification_tolerance(config.set_int_feas_tol, global.tolerance),
            };
            Some(verify_condition(
                condition.model(),
                &states.states,
                target,
                global.lp_solver,
                config.solve_timeout,
            )?)
        } else {
            None
        };
        rounding_warnings.extend(states.warnings);
        condition_solutions.push(ConditionSolution {
            condition: condition.index(),
            fluxes: net_fluxes(
                condition.model(),
                &solution,
                condition.index(),
                global.tolerance,
            ),
            gene_values: states.values,
            gene_states: states.states,
            verified_objective,
        });
    }

    let matches = count_matches(
        records,
        &condition_solutions[0].gene_states,
        &condition_solutions[1].gene_states,
    );
    Ok(SolutionResult {
        transition,
        status: solution.status,
        objective_value: solution.objective_value.unwrap_or(f64::NAN),
        conditions: condition_solutions,
        records: records.to_vec(),
        rounding_warnings,
        matches,
    })
}
