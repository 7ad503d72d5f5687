//! Implements a solver interface for Clarabel
//!
//! Clarabel solves `min 1/2 x'Px + q'x` subject to `Ax + s = b` with `s` in a cone, so
//! equality rows go into a zero cone and every finite inequality side (including variable
//! bounds) becomes a row of a nonnegative cone.
use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra_sparse::{CooMatrix, CscMatrix as SparseCsc};

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Interior point solver for continuous problems
#[derive(Clone, Debug, Default)]
pub struct ClarabelSolver {}

/// Rows of the conic problem before assembly
struct ConicRows {
    /// (row, column, value) for the zero cone rows
    equality: Vec<(usize, usize, f64)>,
    equality_rhs: Vec<f64>,
    /// (row, column, value) for the nonnegative cone rows
    inequality: Vec<(usize, usize, f64)>,
    inequality_rhs: Vec<f64>,
}

impl ConicRows {
    fn new() -> Self {
        ConicRows {
            equality: Vec::new(),
            equality_rhs: Vec::new(),
            inequality: Vec::new(),
            inequality_rhs: Vec::new(),
        }
    }

    fn push_equality(&mut self, terms: &[(usize, f64)], rhs: f64) {
        let row = self.equality_rhs.len();
        self.equality
            .extend(terms.iter().map(|(col, coef)| (row, *col, *coef)));
        self.equality_rhs.push(rhs);
    }

    /// Add `terms <= rhs`
    fn push_upper(&mut self, terms: &[(usize, f64)], rhs: f64) {
        let row = self.inequality_rhs.len();
        self.inequality
            .extend(terms.iter().map(|(col, coef)| (row, *col, *coef)));
        self.inequality_rhs.push(rhs);
    }

    /// Add `terms >= rhs`, stored as `-terms <= -rhs`
    fn push_lower(&mut self, terms: &[(usize, f64)], rhs: f64) {
        let negated: Vec<(usize, f64)> = terms.iter().map(|(col, coef)| (*col, -coef)).collect();
        self.push_upper(&negated, -rhs);
    }

    fn push_range(&mut self, terms: &[(usize, f64)], lower: f64, upper: f64) {
        if lower == upper {
            self.push_equality(terms, lower);
            return;
        }
        if lower.is_finite() {
            self.push_lower(terms, lower);
        }
        if upper.is_finite() {
            self.push_upper(terms, upper);
        }
    }

    /// Stack the equality rows on top of the inequality rows
    fn assemble(self, num_variables: usize) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        let num_equality = self.equality_rhs.len();
        let num_rows = num_equality + self.inequality_rhs.len();
        let mut coo = CooMatrix::new(num_rows, num_variables);
        for (row, col, val) in self.equality {
            coo.push(row, col, val);
        }
        for (row, col, val) in self.inequality {
            coo.push(row + num_equality, col, val);
        }
        let (col_offsets, row_indices, values) = SparseCsc::from(&coo).disassemble();
        let a = CscMatrix::new(num_rows, num_variables, col_offsets, row_indices, values);

        let mut b = self.equality_rhs;
        b.extend(self.inequality_rhs);

        let mut cones = Vec::new();
        if num_equality > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_equality));
        }
        if num_rows > num_equality {
            cones.push(SupportedConeT::NonnegativeConeT(num_rows - num_equality));
        }
        (a, b, cones)
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn integrality_tolerance(&self) -> Option<f64> {
        None
    }

    fn set_integrality_tolerance(&mut self, _tolerance: Option<f64>) -> Option<f64> {
        // Continuous only, nothing to apply
        None
    }

    fn solve(&mut self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        if let Some(var) = problem.variables().values().find(|v| v.is_integral()) {
            return Err(SolverError::UnsupportedVariableType {
                solver: self.name(),
                variable_type: var.variable_type.to_string(),
            });
        }
        let num_variables = problem.num_variables();

        let mut rows = ConicRows::new();
        for var in problem.variables().values() {
            rows.push_range(&[(var.index(), 1f64)], var.lower_bound, var.upper_bound);
        }
        for constraint in problem.constraints().values() {
            let terms: Vec<(usize, f64)> = constraint
                .terms()
                .iter()
                .filter_map(|t| {
                    problem
                        .variables()
                        .get_index_of(&t.variable)
                        .map(|idx| (idx, t.coefficient))
                })
                .collect();
            let (lower, upper) = constraint.bounds();
            rows.push_range(&terms, lower, upper);
        }
        let (a, b, cones) = rows.assemble(num_variables);

        // Clarabel always minimizes
        let sign = match problem.sense() {
            ObjectiveSense::Minimize => 1f64,
            ObjectiveSense::Maximize => -1f64,
        };
        let q: Vec<f64> = problem
            .objective()
            .coefficient_vector(problem.variables())
            .into_iter()
            .map(|c| sign * c)
            .collect();
        let p = CscMatrix::<f64>::zeros((num_variables, num_variables));

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|err| SolverError::Backend(format!("invalid clarabel settings: {err}")))?;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            _ => OptimizationStatus::SolverHalted,
        };
        if !matches!(
            status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        ) {
            return Ok(ProblemSolution::without_values(status));
        }
        let variable_values = problem
            .variables()
            .keys()
            .cloned()
            .zip(solver.solution.x.iter().copied())
            .collect();
        Ok(ProblemSolution {
            status,
            objective_value: Some(sign * solver.solution.obj_val + problem.objective_offset()),
            variable_values: Some(variable_values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;

    #[test]
    fn small_lp() {
        // max x + 2y s.t. x + y <= 4, x - y = 1, 0 <= x, y <= 10
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem
            .add_new_inequality_constraint("cap", &["x", "y"], &[1., 1.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem
            .add_new_equality_constraint("diff", &["x", "y"], &[1., -1.], 1.)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.).unwrap();
        problem.add_new_linear_objective_term("y", 2.).unwrap();
        problem.add_objective_offset(1.);

        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.value("x").unwrap() - 2.5).abs() < 1e-5);
        assert!((solution.value("y").unwrap() - 1.5).abs() < 1e-5);
        assert!((solution.objective_value.unwrap() - 6.5).abs() < 1e-5);
    }

    #[test]
    fn infeasible_lp() {
        let mut problem = Problem::new_minimization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_inequality_constraint("too_big", &["x"], &[1.], 5., f64::INFINITY)
            .unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.variable_values.is_none());
    }

    #[test]
    fn rejects_binaries() {
        let mut problem = Problem::new_minimization();
        problem.add_new_binary_variable("b").unwrap();
        assert!(matches!(
            ClarabelSolver::default().solve(&problem),
            Err(SolverError::UnsupportedVariableType { .. })
        ));
    }
}
