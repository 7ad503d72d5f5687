//! Global configuration shared by models and solvers
use std::sync::{LazyLock, RwLock};

use serde::{Deserialize, Serialize};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Lower bound given to reactions which don't specify one
    pub lower_bound: f64,
    /// Upper bound given to reactions which don't specify one
    pub upper_bound: f64,
    /// Feasibility tolerance used when comparing fluxes and objective values
    pub tolerance: f64,
    /// Solver used for continuous (flux balance) problems
    pub lp_solver: Solver,
    /// Solver used for mixed integer problems
    pub milp_solver: Solver,
    /// Number of worker threads used when solving transitions
    pub processes: u32,
}

impl Configuration {
    /// Get a copy of the current global configuration
    ///
    /// A poisoned lock still holds a usable configuration, so it is read anyway.
    pub fn snapshot() -> Configuration {
        match CONFIGURATION.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Magnitude used in place of an infinite bound when building big-M constraints
    pub fn big_m(&self) -> f64 {
        self.lower_bound.abs().max(self.upper_bound.abs())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            lp_solver: Solver::Clarabel,
            milp_solver: Solver::default_milp(),
            processes: 1,
        }
    }
}

/// Default lower bound for newly built reactions
pub(crate) fn default_lower_bound() -> f64 {
    Configuration::snapshot().lower_bound
}

/// Default upper bound for newly built reactions
pub(crate) fn default_upper_bound() -> f64 {
    Configuration::snapshot().upper_bound
}

/// Enum used to specify which solver to use
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solver {
    /// Use the Clarabel interior point solver, continuous problems only
    Clarabel,
    /// Use the microlp simplex/branch and bound solver, requires the microlp feature
    Microlp,
    /// Use the HiGHS solver, requires the highs feature
    Highs,
}

impl Solver {
    /// Pick the mixed integer solver based on the enabled features
    pub fn default_milp() -> Solver {
        cfg_if::cfg_if! {
            if #[cfg(feature = "microlp")] {
                let solver = Solver::Microlp;
            } else if #[cfg(feature = "highs")] {
                let solver = Solver::Highs;
            } else {
                // Will report an unsupported variable type when handed a MILP
                let solver = Solver::Clarabel;
            }
        }
        solver
    }
}
