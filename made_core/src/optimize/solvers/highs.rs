//! Solver interface for HiGHS
use highs::{HighsModelStatus, RowProblem, Sense};
use indexmap::IndexMap;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// HiGHS dual simplex and branch and cut solver
#[derive(Clone, Debug, Default)]
pub struct HighsSolver {
    /// Passed to HiGHS as `mip_feasibility_tolerance`
    integrality_tolerance: Option<f64>,
}

impl Solver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
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
        let mut pb = RowProblem::default();
        let objective = problem.objective().coefficient_vector(problem.variables());
        let columns: Vec<_> = problem
            .variables()
            .values()
            .zip(objective)
            .map(|(var, obj)| {
                if var.is_integral() {
                    pb.add_integer_column(obj, var.lower_bound..=var.upper_bound)
                } else {
                    pb.add_column(obj, var.lower_bound..=var.upper_bound)
                }
            })
            .collect();
        for constraint in problem.constraints().values() {
            let (lower, upper) = constraint.bounds();
            let factors: Vec<_> = constraint
                .terms()
                .iter()
                .filter_map(|t| {
                    problem
                        .variables()
                        .get_index_of(&t.variable)
                        .map(|idx| (columns[idx], t.coefficient))
                })
                .collect();
            pb.add_row(lower..=upper, factors);
        }

        let sense = match problem.sense() {
            ObjectiveSense::Minimize => Sense::Minimise,
            ObjectiveSense::Maximize => Sense::Maximise,
        };
        let mut model = pb.optimise(sense);
        model.make_quiet();
        if let Some(tolerance) = self.integrality_tolerance {
            model.set_option("mip_feasibility_tolerance", tolerance);
        }
        let solved = model
            .try_solve()
            .map_err(|status| SolverError::Backend(format!("HiGHS returned {status:?}")))?;

        let status = match solved.status() {
            HighsModelStatus::Optimal => OptimizationStatus::Optimal,
            HighsModelStatus::Infeasible => OptimizationStatus::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                OptimizationStatus::Unbounded
            }
            _ => OptimizationStatus::SolverHalted,
        };
        if status != OptimizationStatus::Optimal {
            return Ok(ProblemSolution::without_values(status));
        }
        let solution = solved.get_solution();
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .keys()
            .cloned()
            .zip(solution.columns().iter().copied())
            .collect();
        Ok(ProblemSolution {
            status,
            objective_value: Some(problem.objective().evaluate(&variable_values)),
            variable_values: Some(variable_values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;

    #[test]
    fn small_milp() {
        let mut problem = Problem::new_maximization();
        problem.add_new_binary_variable("on").unwrap();
        problem
            .add_new_variable("v", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        // v <= 10 * on
        problem
            .add_new_inequality_constraint("link", &["v", "on"], &[1., -10.], f64::NEG_INFINITY, 0.)
            .unwrap();
        problem.add_new_linear_objective_term("v", 1.).unwrap();
        problem.add_new_linear_objective_term("on", -1.).unwrap();

        let mut solver = HighsSolver::default();
        solver.set_integrality_tolerance(Some(1e-9));
        let solution = solver.solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.value("on").unwrap() - 1.).abs() < 1e-6);
        assert!((solution.objective_value.unwrap() - 9.).abs() < 1e-6);
    }
}
