//! Solver interface for the pure rust microlp solver, supports binary and integer variables
use indexmap::IndexMap;
use microlp::{ComparisonOp, Error as LpError, LinearExpr, OptimizationDirection};

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Simplex with branch and bound for mixed integer problems
#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver {
    /// Requested integrality tolerance
    ///
    /// microlp has no tunable integrality tolerance, the value is only stored so callers can
    /// scope it uniformly across backends.
    integrality_tolerance: Option<f64>,
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn integrality_tolerance(&self) -> Option<f64> {
        self.integrality_tolerance
    }

    fn set_integrality_tolerance(&mut self, tolerance: Option<f64>) -> Option<f64> {
        std::mem::replace(&mut self.integrality_tolerance, tolerance)
    }

    fn solve(&mut self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let direction = match problem.sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut lp = microlp::Problem::new(direction);
        let objective = problem.objective().coefficient_vector(problem.variables());

        let mut columns = Vec::with_capacity(problem.num_variables());
        for (var, obj) in problem.variables().values().zip(objective) {
            let column = match var.variable_type {
                VariableType::Continuous => lp.add_var(obj, (var.lower_bound, var.upper_bound)),
                VariableType::Binary => lp.add_binary_var(obj),
                VariableType::Integer => {
                    lp.add_integer_var(obj, (to_i32(var.lower_bound.ceil()), to_i32(var.upper_bound.floor())))
                }
            };
            columns.push(column);
        }

        for constraint in problem.constraints().values() {
            let (lower, upper) = constraint.bounds();
            if constraint.terms().is_empty() {
                // An empty row only constrains the constant 0
                if lower > 0f64 || upper < 0f64 {
                    return Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible));
                }
                continue;
            }
            let mut expr = LinearExpr::empty();
            for term in constraint.terms() {
                if let Some(idx) = problem.variables().get_index_of(&term.variable) {
                    expr.add(columns[idx], term.coefficient);
                }
            }
            if lower == upper {
                lp.add_constraint(expr, ComparisonOp::Eq, lower);
                continue;
            }
            if lower.is_finite() && upper.is_finite() {
                lp.add_constraint(expr.clone(), ComparisonOp::Ge, lower);
                lp.add_constraint(expr, ComparisonOp::Le, upper);
            } else if lower.is_finite() {
                lp.add_constraint(expr, ComparisonOp::Ge, lower);
            } else if upper.is_finite() {
                lp.add_constraint(expr, ComparisonOp::Le, upper);
            }
        }

        let solution = match lp.solve() {
            Ok(solution) => solution,
            Err(LpError::Infeasible) => {
                return Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible))
            }
            Err(LpError::Unbounded) => {
                return Ok(ProblemSolution::without_values(OptimizationStatus::Unbounded))
            }
            Err(err) => return Err(SolverError::Backend(err.to_string())),
        };
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .keys()
            .cloned()
            .zip(columns.iter().map(|col| solution[*col]))
            .collect();
        Ok(ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(problem.objective().evaluate(&variable_values)),
            variable_values: Some(variable_values),
        })
    }
}

/// Clamp a bound into the range of integer variable bounds microlp accepts
fn to_i32(value: f64) -> i32 {
    value.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}
