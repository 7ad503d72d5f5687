//! Solver interface shared by the optimization backends
use std::ops::{Deref, DerefMut};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::configuration::Solver as SolverKind;
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

pub mod clarabel;
#[cfg(feature = "highs")]
pub mod highs;
#[cfg(feature = "microlp")]
pub mod microlp;

/// A backend able to solve a [`Problem`]
///
/// Backends translate the problem into their own representation on every call to
/// [`Solver::solve`], so a single solver can be reused for many problems.
pub trait Solver: Send {
    /// Name of the backend, used in log messages
    fn name(&self) -> &'static str;

    /// Whether the backend handles integer and binary variables
    fn integer_variable_capable(&self) -> bool;

    /// Current integrality tolerance, None when the backend uses its own default
    fn integrality_tolerance(&self) -> Option<f64>;

    /// Set the integrality tolerance, returning the previous value
    fn set_integrality_tolerance(&mut self, tolerance: Option<f64>) -> Option<f64>;

    /// Solve the problem
    ///
    /// Infeasible and unbounded problems are reported through
    /// [`ProblemSolution::status`], errors are reserved for problems the backend can't
    /// handle at all.
    fn solve(&mut self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Create a solver of the given kind
pub fn new_solver(kind: SolverKind) -> Result<Box<dyn Solver>, SolverError> {
    match kind {
        SolverKind::Clarabel => Ok(Box::new(clarabel::ClarabelSolver::default())),
        #[cfg(feature = "microlp")]
        SolverKind::Microlp => Ok(Box::new(microlp::MicrolpSolver::default())),
        #[cfg(feature = "highs")]
        SolverKind::Highs => Ok(Box::new(highs::HighsSolver::default())),
        #[allow(unreachable_patterns)]
        other => Err(SolverError::UnavailableSolver(other)),
    }
}

/// Sets an integrality tolerance on a solver for as long as the guard lives
///
/// The previous tolerance is put back when the guard is dropped, whether or not the solve
/// succeeded.
pub struct ScopedIntegralityTolerance<'s> {
    solver: &'s mut dyn Solver,
    previous: Option<f64>,
}

impl<'s> ScopedIntegralityTolerance<'s> {
    /// Apply `tolerance` to `solver`, None leaves the solver's tolerance untouched
    pub fn new(solver: &'s mut dyn Solver, tolerance: Option<f64>) -> Self {
        let previous = solver.integrality_tolerance();
        if tolerance.is_some() {
            solver.set_integrality_tolerance(tolerance);
        }
        ScopedIntegralityTolerance { solver, previous }
    }
}

impl<'s> Deref for ScopedIntegralityTolerance<'s> {
    type Target = dyn Solver + 's;

    fn deref(&self) -> &Self::Target {
        self.solver
    }
}

impl<'s> DerefMut for ScopedIntegralityTolerance<'s> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.solver
    }
}

impl Drop for ScopedIntegralityTolerance<'_> {
    fn drop(&mut self) {
        self.solver.set_integrality_tolerance(self.previous);
    }
}

/// Solve `problem` with `solver` under a scoped integrality tolerance
///
/// With a `timeout` the solve runs on its own thread and the caller stops waiting once the
/// timeout expires. The abandoned solve keeps its thread until the backend returns, its
/// result is discarded.
pub fn solve_with_timeout(
    mut solver: Box<dyn Solver>,
    problem: Problem,
    integrality_tolerance: Option<f64>,
    timeout: Option<Duration>,
) -> Result<ProblemSolution, SolverError> {
    let Some(timeout) = timeout else {
        let mut scoped = ScopedIntegralityTolerance::new(solver.as_mut(), integrality_tolerance);
        return scoped.solve(&problem);
    };
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(format!("{}-solve", solver.name()))
        .spawn(move || {
            let mut scoped =
                ScopedIntegralityTolerance::new(solver.as_mut(), integrality_tolerance);
            let result = scoped.solve(&problem);
            // The receiver is gone when the caller already timed out
            let _ = sender.send(result);
        })
        .map_err(|err| SolverError::Backend(format!("unable to spawn solver thread: {err}")))?;
    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(SolverError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(SolverError::Backend(
            "solver thread stopped without a result".to_string(),
        )),
    }
}

/// Errors raised by the solver backends
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    /// The solve did not finish in time
    #[error("Solve did not finish within {0:?}")]
    Timeout(Duration),
    /// The backend can't handle a variable type present in the problem
    #[error("Solver {solver} does not support {variable_type} variables")]
    UnsupportedVariableType {
        solver: &'static str,
        variable_type: String,
    },
    /// The requested backend was not compiled in
    #[error("Solver {0:?} is not available, enable the matching feature")]
    UnavailableSolver(SolverKind),
    /// Any other failure reported by the backend
    #[error("Solver backend failed: {0}")]
    Backend(String),
}
