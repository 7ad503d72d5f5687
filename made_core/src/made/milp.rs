//! Flux balance problems and the per transition MILP
use std::time::Duration;

use indexmap::IndexMap;

use crate::configuration::Solver as SolverKind;
use crate::made::error::MadeError;
use crate::made::expression::{Direction, ExpressionRecord};
use crate::made::gene_mapper::{add_gene_variable, link_flux, link_gpr};
use crate::made::transition::Transition;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{new_solver, solve_with_timeout};
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;

/// Flux variables of one reaction in one condition
#[derive(Clone, Debug, PartialEq)]
pub struct FluxVariables {
    pub reaction: String,
    pub forward: String,
    /// Only present when the reaction can run backwards
    pub reverse: Option<String>,
}

/// Id of the forward flux variable of `reaction` in `condition`
pub fn forward_variable_id(reaction: &Reaction, condition: usize) -> String {
    format!("{}__c{condition}", reaction.get_forward_id())
}

/// Id of the reverse flux variable of `reaction` in `condition`
pub fn reverse_variable_id(reaction: &Reaction, condition: usize) -> String {
    format!("{}__c{condition}", reaction.get_reverse_id())
}

/// Add split flux variables and mass balance constraints for `model` in `condition`
fn add_flux_block(
    problem: &mut Problem,
    model: &Model,
    condition: usize,
) -> Result<Vec<FluxVariables>, ProblemError> {
    let mut fluxes = Vec::with_capacity(model.reactions.len());
    for reaction in model.reactions.values() {
        let forward = forward_variable_id(reaction, condition);
        problem.add_new_variable(
            &forward,
            Some(&reaction.id),
            VariableType::Continuous,
            reaction.get_forward_lower_bound(),
            reaction.get_forward_upper_bound(),
        )?;
        let reverse = if reaction.get_reverse_upper_bound() > 0f64 {
            let id = reverse_variable_id(reaction, condition);
            problem.add_new_variable(
                &id,
                Some(&reaction.id),
                VariableType::Continuous,
                reaction.get_reverse_lower_bound(),
                reaction.get_reverse_upper_bound(),
            )?;
            Some(id)
        } else {
            None
        };
        fluxes.push(FluxVariables {
            reaction: reaction.id.clone(),
            forward,
            reverse,
        });
    }

    let stoichiometry = model.stoichiometric_matrix();
    for (row, met_id) in model.metabolites.keys().enumerate() {
        let row = stoichiometry.row(row);
        if row.nnz() == 0 {
            continue;
        }
        let mut vars: Vec<&str> = Vec::with_capacity(2 * row.nnz());
        let mut coefs: Vec<f64> = Vec::with_capacity(2 * row.nnz());
        for (col, coef) in row.col_indices().iter().zip(row.values()) {
            let flux = &fluxes[*col];
            vars.push(&flux.forward);
            coefs.push(*coef);
            if let Some(reverse) = &flux.reverse {
                vars.push(reverse);
                coefs.push(-coef);
            }
        }
        problem.add_new_equality_constraint(
            &format!("mass_balance__{met_id}__c{condition}"),
            &vars,
            &coefs,
            0f64,
        )?;
    }
    Ok(fluxes)
}

/// Terms of the model objective written on split fluxes
fn objective_terms<'f>(model: &Model, fluxes: &'f [FluxVariables]) -> (Vec<&'f str>, Vec<f64>) {
    let mut vars = Vec::new();
    let mut coefs = Vec::new();
    for (reaction_id, coef) in &model.objective {
        let Some(index) = model.reactions.get_index_of(reaction_id) else {
            continue;
        };
        let flux = &fluxes[index];
        vars.push(flux.forward.as_str());
        coefs.push(*coef);
        if let Some(reverse) = &flux.reverse {
            vars.push(reverse.as_str());
            coefs.push(-coef);
        }
    }
    (vars, coefs)
}

/// Flux balance problem maximizing the objective of `model`
pub fn build_flux_balance_problem(model: &Model, condition: usize) -> Result<Problem, ProblemError> {
    let mut problem = Problem::new_maximization();
    let fluxes = add_flux_block(&mut problem, model, condition)?;
    let (vars, coefs) = objective_terms(model, &fluxes);
    for (var, coef) in vars.iter().zip(coefs) {
        problem.add_new_linear_objective_term(var, coef)?;
    }
    Ok(problem)
}

/// Maximize the objective of `model` with the given LP solver
///
/// Infeasible and unbounded models come back through the solution status.
pub fn solve_flux_balance(
    model: &Model,
    condition: usize,
    solver: SolverKind,
    timeout: Option<Duration>,
) -> Result<ProblemSolution, MadeError> {
    let problem = build_flux_balance_problem(model, condition)?;
    Ok(solve_with_timeout(new_solver(solver)?, problem, None, timeout)?)
}

/// Net flux of every reaction of `model` in `condition`, values within `tolerance` of zero
/// are reported as zero
pub fn net_fluxes(
    model: &Model,
    solution: &ProblemSolution,
    condition: usize,
    tolerance: f64,
) -> IndexMap<String, f64> {
    model
        .reactions
        .values()
        .map(|reaction| {
            let forward = solution
                .value(&forward_variable_id(reaction, condition))
                .unwrap_or(0f64);
            let reverse = solution
                .value(&reverse_variable_id(reaction, condition))
                .unwrap_or(0f64);
            let net = forward - reverse;
            let net = if net.abs() <= tolerance { 0f64 } else { net };
            (reaction.id.clone(), net)
        })
        .collect()
}

/// Smallest objective flux accepted for a condition
///
/// The slack of `tolerance * max(1, |vmax|)` absorbs solver noise, so a fraction of zero
/// can always be met.
pub fn required_objective(obj_frac: f64, vmax: f64, tolerance: f64) -> f64 {
    obj_frac * vmax - tolerance * vmax.abs().max(1f64)
}

/// Builds the MILP of one transition
///
/// Both conditions get split flux variables with their own bounds and mass balances, an
/// objective fraction constraint, binary gene states and the GPR links tying genes to
/// fluxes. The objective is the weighted mismatch between the gene states and the
/// expression evidence, to be minimized.
#[derive(Clone, Debug)]
pub struct MilpBuilder<'a> {
    pub transition: Transition,
    pub source: &'a Model,
    pub target: &'a Model,
    /// Evidence for the transition, in gene order
    pub records: &'a [ExpressionRecord],
    /// Required objective flux for (source, target)
    pub required_objective: (f64, f64),
    /// Leave out the binaries forbidding simultaneous forward and reverse flux
    pub remove_rev: bool,
    /// Replaces infinite bounds in big-M constraints
    pub big_m: f64,
}

impl MilpBuilder<'_> {
    pub fn build(&self) -> Result<Problem, ProblemError> {
        let mut problem = Problem::new_minimization();
        let conditions = [
            (self.source, self.transition.source, self.required_objective.0),
            (self.target, self.transition.target, self.required_objective.1),
        ];
        for (model, condition, required) in conditions {
            self.add_condition(&mut problem, model, condition, required)?;
        }
        self.add_mismatch_objective(&mut problem)?;
        tracing::debug!(
            transition = self.transition.index,
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "Built transition problem"
        );
        Ok(problem)
    }

    fn add_condition(
        &self,
        problem: &mut Problem,
        model: &Model,
        condition: usize,
        required: f64,
    ) -> Result<(), ProblemError> {
        let fluxes = add_flux_block(problem, model, condition)?;

        let (vars, coefs) = objective_terms(model, &fluxes);
        if !vars.is_empty() {
            problem.add_new_inequality_constraint(
                &format!("objective_fraction__c{condition}"),
                &vars,
                &coefs,
                required,
                f64::INFINITY,
            )?;
        }

        for gene in model.genes.keys() {
            add_gene_variable(problem, gene, condition)?;
        }
        for record in self.records {
            add_gene_variable(problem, &record.gene, condition)?;
        }

        for (reaction, flux) in model.reactions.values().zip(&fluxes) {
            if let (Some(reverse), false) = (&flux.reverse, self.remove_rev) {
                self.add_direction_binary(problem, reaction, condition, &flux.forward, reverse)?;
            }
            let Some(gpr) = &reaction.gpr else {
                continue;
            };
            let active = link_gpr(problem, gpr, &reaction.id, condition)?;
            link_flux(
                problem,
                &flux.forward,
                &active,
                reaction.get_forward_lower_bound(),
                reaction.get_forward_upper_bound(),
                self.big_m,
            )?;
            if let Some(reverse) = &flux.reverse {
                link_flux(
                    problem,
                    reverse,
                    &active,
                    reaction.get_reverse_lower_bound(),
                    reaction.get_reverse_upper_bound(),
                    self.big_m,
                )?;
            }
        }
        Ok(())
    }

    /// `d = 1` allows forward flux only, `d = 0` reverse flux only
    fn add_direction_binary(
        &self,
        problem: &mut Problem,
        reaction: &Reaction,
        condition: usize,
        forward: &str,
        reverse: &str,
    ) -> Result<(), ProblemError> {
        let d = format!("dir__{}__c{condition}", reaction.id);
        problem.add_new_binary_variable(&d)?;
        let m_forward = self.finite_or_big_m(reaction.get_forward_upper_bound());
        let m_reverse = self.finite_or_big_m(reaction.get_reverse_upper_bound());
        problem.add_new_inequality_constraint(
            &format!("{d}__forward"),
            &[forward, d.as_str()],
            &[1f64, -m_forward],
            f64::NEG_INFINITY,
            0f64,
        )?;
        problem.add_new_inequality_constraint(
            &format!("{d}__reverse"),
            &[reverse, d.as_str()],
            &[1f64, m_reverse],
            f64::NEG_INFINITY,
            m_reverse,
        )?;
        Ok(())
    }

    /// Weighted mismatch between the gene state switches and the evidence
    ///
    /// A gene costs nothing when its states follow its direction: off to on for an increase,
    /// on to off for a decrease, unchanged for a constant. An increase or decrease costs `w`
    /// when the state stays put and `2w` when it switches the wrong way, a constant costs
    /// `w` for any switch.
    fn add_mismatch_objective(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        let source = self.transition.source;
        let target = self.transition.target;
        for record in self.records.iter().filter(|r| r.is_weighted()) {
            let x_source = add_gene_variable(problem, &record.gene, source)?;
            let x_target = add_gene_variable(problem, &record.gene, target)?;
            let w = record.weight;
            match record.direction {
                Direction::Increase => {
                    // w * (1 - x_target + x_source)
                    problem.add_objective_offset(w);
                    problem.add_new_linear_objective_term(&x_target, -w)?;
                    problem.add_new_linear_objective_term(&x_source, w)?;
                }
                Direction::Decrease => {
                    // w * (1 - x_source + x_target)
                    problem.add_objective_offset(w);
                    problem.add_new_linear_objective_term(&x_source, -w)?;
                    problem.add_new_linear_objective_term(&x_target, w)?;
                }
                Direction::Constant => {
                    let change = format!("change__{}", record.gene);
                    problem.add_new_variable(
                        &change,
                        None,
                        VariableType::Continuous,
                        0f64,
                        1f64,
                    )?;
                    problem.add_new_inequality_constraint(
                        &format!("{change}__up"),
                        &[change.as_str(), x_target.as_str(), x_source.as_str()],
                        &[1f64, -1f64, 1f64],
                        0f64,
                        f64::INFINITY,
                    )?;
                    problem.add_new_inequality_constraint(
                        &format!("{change}__down"),
                        &[change.as_str(), x_target.as_str(), x_source.as_str()],
                        &[1f64, 1f64, -1f64],
                        0f64,
                        f64::INFINITY,
                    )?;
                    problem.add_new_linear_objective_term(&change, w)?;
                }
            }
        }
        Ok(())
    }

    fn finite_or_big_m(&self, bound: f64) -> f64 {
        if bound.is_finite() {
            bound
        } else {
            self.big_m
        }
    }
}
