//! Provides struct for representing an optimization problem's objective

use indexmap::IndexMap;

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    pub(crate) sense: ObjectiveSense,
    /// Constant added to the objective value
    offset: f64,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
            offset: 0f64,
        }
    }

    /// Sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Add a constant to the objective
    pub fn add_offset(&mut self, offset: f64) {
        self.offset += offset;
    }

    /// Constant part of the objective
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Terms of the objective
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Dense coefficient vector indexed by variable position, repeated terms are summed
    pub fn coefficient_vector<V>(&self, variables: &IndexMap<String, V>) -> Vec<f64> {
        let mut coefficients = vec![0f64; variables.len()];
        for term in &self.terms {
            if let Some(idx) = variables.get_index_of(&term.variable) {
                coefficients[idx] += term.coefficient;
            }
        }
        coefficients
    }

    /// Evaluate the objective (including the offset) for the given variable values
    pub fn evaluate(&self, values: &IndexMap<String, f64>) -> f64 {
        self.offset
            + self
                .terms
                .iter()
                .map(|t| t.coefficient * values.get(&t.variable).copied().unwrap_or(0f64))
                .sum::<f64>()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

// region Objective Terms
/// A linear term in the objective
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveTerm {
    /// Id of the variable in the objective term
    pub variable: String,
    /// Coefficient for the term
    pub coefficient: f64,
}

impl ObjectiveTerm {
    /// Create a new linear objective term
    pub fn new_linear(variable_id: &str, coefficient: f64) -> Self {
        ObjectiveTerm {
            variable: variable_id.to_string(),
            coefficient,
        }
    }
}

// endregion Objective Terms
