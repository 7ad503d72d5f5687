//! Options for a single MADE run
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use derive_builder::Builder;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::made::error::MadeError;

/// Options of a MADE run
///
/// Build with [`MadeConfigBuilder`], every field not set falls back to
/// [`MadeConfig::default`].
///
/// # Examples
/// ```rust
/// use made_core::made::config::{MadeConfigBuilder, Weighting};
/// let config = MadeConfigBuilder::default()
///     .obj_frac(0.5)
///     .weighting(Weighting::Linear)
///     .build()
///     .unwrap();
/// assert!(config.theoretical_match);
/// ```
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(default, setter(into))]
pub struct MadeConfig {
    /// Fraction of the maximum objective flux each condition must keep
    pub obj_frac: ObjFrac,
    /// How p-values are turned into weights
    pub weighting: Weighting,
    /// Per condition, per reaction (lower, upper) bounds overriding the model
    #[builder(setter(into, strip_option))]
    pub bounds: Option<Vec<Vec<(f64, f64)>>>,
    /// Per condition, per reaction objective coefficients overriding the model
    #[builder(setter(into, strip_option))]
    pub objs: Option<Vec<Vec<f64>>>,
    /// p-values above this are treated as evidence for a constant state
    pub p_thresh: f64,
    /// Smallest p-value used by log weighting
    pub p_eps: f64,
    /// Square matrix of transitions, entry (i, j) = k compares condition i to condition j
    /// using fold change column k (1 based)
    #[builder(setter(into, strip_option))]
    pub transition_matrix: Option<DMatrix<f64>>,
    /// Leave out the binaries that keep reversible reactions from running both ways
    pub remove_rev: bool,
    /// Report matches relative to the number of weighted genes rather than all genes
    pub theoretical_match: bool,
    /// Fold changes are already log ratios
    pub log_fold_change: bool,
    /// Return one adjusted model per condition
    pub return_models: bool,
    /// Log the match table at info level
    pub verbose: bool,
    /// Integrality tolerance applied to the MILP solver for each solve, None keeps the
    /// solver default
    pub set_int_feas_tol: Option<f64>,
    /// Weights below this are set to zero
    pub weight_thresh: f64,
    /// Re-check the objective fraction with the rounded gene states
    pub verify: bool,
    /// Snap near integral gene states, flagging values which had to be rounded
    pub round_states: bool,
    /// Upper limit on the time each solve may take
    #[builder(setter(into, strip_option))]
    pub solve_timeout: Option<Duration>,
    /// Worker threads for solving transitions, defaults to the global configuration
    #[builder(setter(into, strip_option))]
    pub threads: Option<usize>,
}

impl Default for MadeConfig {
    fn default() -> Self {
        MadeConfig {
            obj_frac: ObjFrac::Scalar(0.3),
            weighting: Weighting::Log,
            bounds: None,
            objs: None,
            p_thresh: 0.5,
            p_eps: 1e-10,
            transition_matrix: None,
            remove_rev: false,
            theoretical_match: true,
            log_fold_change: false,
            return_models: true,
            verbose: true,
            set_int_feas_tol: Some(1e-10),
            weight_thresh: 1e-8,
            verify: true,
            round_states: true,
            solve_timeout: None,
            threads: None,
        }
    }
}

impl MadeConfig {
    /// Check the options which don't depend on the inputs
    ///
    /// Checks against the number of conditions happen once the transitions are known.
    pub fn validate(&self) -> Result<(), MadeError> {
        self.obj_frac.validate()?;
        if !(0f64..=1f64).contains(&self.p_thresh) {
            return Err(MadeError::Config(format!(
                "p_thresh must lie in [0, 1], got {}",
                self.p_thresh
            )));
        }
        if self.weighting == Weighting::Log && !(self.p_eps > 0f64) {
            return Err(MadeError::Numeric(format!(
                "log weighting needs p_eps > 0, got {}",
                self.p_eps
            )));
        }
        if !self.weight_thresh.is_finite() || self.weight_thresh < 0f64 {
            return Err(MadeError::Config(format!(
                "weight_thresh must be finite and non-negative, got {}",
                self.weight_thresh
            )));
        }
        if let Some(tol) = self.set_int_feas_tol {
            if !(tol > 0f64 && tol < 0.5) {
                return Err(MadeError::Config(format!(
                    "set_int_feas_tol must lie in (0, 0.5), got {tol}"
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(MadeError::Config("threads must be at least 1".to_string()));
        }
        if self.solve_timeout == Some(Duration::ZERO) {
            return Err(MadeError::Config("solve_timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Required fraction of the maximum objective flux
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjFrac {
    /// Same fraction for every condition
    Scalar(f64),
    /// One fraction per condition
    PerCondition(Vec<f64>),
}

impl ObjFrac {
    /// Fraction required for `condition`
    pub fn for_condition(&self, condition: usize) -> f64 {
        match self {
            ObjFrac::Scalar(frac) => *frac,
            ObjFrac::PerCondition(fracs) => fracs.get(condition).copied().unwrap_or(0f64),
        }
    }

    /// Check that a per condition list covers exactly `num_conditions` conditions
    pub fn check_conditions(&self, num_conditions: usize) -> Result<(), MadeError> {
        match self {
            ObjFrac::PerCondition(fracs) if fracs.len() != num_conditions => {
                Err(MadeError::Shape(format!(
                    "obj_frac has {} entries for {} conditions",
                    fracs.len(),
                    num_conditions
                )))
            }
            _ => Ok(()),
        }
    }

    fn validate(&self) -> Result<(), MadeError> {
        let fracs: &[f64] = match self {
            ObjFrac::Scalar(frac) => std::slice::from_ref(frac),
            ObjFrac::PerCondition(fracs) => fracs,
        };
        match fracs.iter().find(|f| !(0f64..=1f64).contains(*f)) {
            Some(bad) => Err(MadeError::Config(format!(
                "obj_frac values must lie in [0, 1], got {bad}"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for ObjFrac {
    fn default() -> Self {
        ObjFrac::Scalar(0.3)
    }
}

impl From<f64> for ObjFrac {
    fn from(value: f64) -> Self {
        ObjFrac::Scalar(value)
    }
}

impl From<Vec<f64>> for ObjFrac {
    fn from(value: Vec<f64>) -> Self {
        ObjFrac::PerCondition(value)
    }
}

/// Scheme turning p-values into weights
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    /// -ln(p), with p clamped to [p_eps, 1]
    #[default]
    Log,
    /// 1 - p
    Linear,
    /// Every gene weighs 1
    Unit,
    /// The supplied values are used as weights directly
    None,
}

impl FromStr for Weighting {
    type Err = MadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(Weighting::Log),
            "linear" => Ok(Weighting::Linear),
            "unit" => Ok(Weighting::Unit),
            "none" => Ok(Weighting::None),
            other => Err(MadeError::Config(format!(
                "unknown weighting {other:?}, expected one of log, linear, unit, none"
            ))),
        }
    }
}

impl Display for Weighting {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Weighting::Log => write!(f, "log"),
            Weighting::Linear => write!(f, "linear"),
            Weighting::Unit => write!(f, "unit"),
            Weighting::None => write!(f, "none"),
        }
    }
}
