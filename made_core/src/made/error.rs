//! Errors raised while running MADE
use thiserror::Error;

use crate::io::json::JsonError;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;

/// Errors raised by the MADE pipeline
///
/// Input validation errors (`Shape`, `Config`, `Numeric`) abort the whole run before any
/// solver is called. `Infeasible` and `Verification` are raised per transition and end up
/// in the match table instead.
#[derive(Error, Debug)]
pub enum MadeError {
    /// Dimension or count mismatch between inputs
    #[error("Shape mismatch: {0}")]
    Shape(String),
    /// Malformed configuration, e.g. a transition matrix which is not a square integer table
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Invalid weighting parameters or values
    #[error("Invalid numeric input: {0}")]
    Numeric(String),
    /// No flux distribution satisfies the constraints of a transition
    #[error("Transition {transition} is infeasible: {message}")]
    Infeasible { transition: usize, message: String },
    /// The rounded gene states no longer reach the required objective flux
    #[error(
        "Verification failed for transition {transition}, condition {condition}: \
         objective {objective} is below the required {required}"
    )]
    Verification {
        transition: usize,
        condition: usize,
        objective: f64,
        required: f64,
    },
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error("Unable to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
