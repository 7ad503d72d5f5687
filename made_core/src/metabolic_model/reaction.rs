//! This module provides a struct for representing reactions
use super::model::Gpr;
use crate::configuration::{default_lower_bound, default_upper_bound};
use crate::utils::hashing::hash_as_hex_string;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone)]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule to determine if reaction is active
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Lower flux bound
    #[builder(default = "default_lower_bound()")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "default_upper_bound()")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
    /// Reaction Activity
    #[builder(default = "ReactionActivity::Active")]
    pub activity: ReactionActivity,
}

impl Reaction {
    /// Determine the id to be associated with the forward reaction in the optimization problem
    ///
    /// # Note:
    /// The forward id is "{reaction_id}_forward"
    pub fn get_forward_id(&self) -> String {
        format!("{}_forward", &self.id)
    }

    /// Determine the id to be associated with the reverse reaction in the optimization problem
    ///
    /// # Note:
    /// The reverse id is "{reaction_id}_reverse_{hexidecimal hash of reaction_id}"
    pub fn get_reverse_id(&self) -> String {
        format!("{}_reverse_{}", &self.id, hash_as_hex_string(&self.id))
    }

    /// Set both flux bounds at once
    pub fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) {
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
    }

    /// Determine the upper bound of the variable associated with the forward reaction
    pub(crate) fn get_forward_upper_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => {
                if self.upper_bound > 0f64 {
                    self.upper_bound
                } else {
                    0f64
                }
            }
            ReactionActivity::Inactive => 0f64,
        }
    }

    /// Determine the lower bound of the variable associated with the forward reaction
    pub(crate) fn get_forward_lower_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => {
                if self.lower_bound > 0f64 {
                    self.lower_bound
                } else {
                    0f64
                }
            }
            ReactionActivity::Inactive => 0f64,
        }
    }

    /// Determine the upper bound of the variable associated with the reverse reaction
    pub(crate) fn get_reverse_upper_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => {
                if self.lower_bound < 0f64 {
                    -self.lower_bound
                } else {
                    0f64
                }
            }
            ReactionActivity::Inactive => 0f64,
        }
    }

    /// Determine the lower bound of the variable associated with the reverse reaction
    pub(crate) fn get_reverse_lower_bound(&self) -> f64 {
        match self.activity {
            ReactionActivity::Active => {
                if self.upper_bound < 0f64 {
                    -self.upper_bound
                } else {
                    0f64
                }
            }
            ReactionActivity::Inactive => 0f64,
        }
    }
}

/// Whether a Reaction is active or inactive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionActivity {
    /// The Reaction is active and can carry flux
    Active,
    /// The Reaction is inactive and can't carry flux
    Inactive,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(lb: f64, ub: f64) -> Reaction {
        ReactionBuilder::default()
            .id("PGI".to_string())
            .lower_bound(lb)
            .upper_bound(ub)
            .build()
            .unwrap()
    }

    #[test]
    fn split_bounds_reversible() {
        let rxn = reaction(-10., 20.);
        assert!((rxn.get_forward_upper_bound() - 20.).abs() < 1e-25);
        assert!((rxn.get_forward_lower_bound() - 0.).abs() < 1e-25);
        assert!((rxn.get_reverse_upper_bound() - 10.).abs() < 1e-25);
        assert!((rxn.get_reverse_lower_bound() - 0.).abs() < 1e-25);
    }

    #[test]
    fn split_bounds_forced() {
        // Forced forward flux
        let rxn = reaction(5., 20.);
        assert!(rxn.get_reverse_upper_bound().abs() < 1e-25);
        assert!((rxn.get_forward_lower_bound() - 5.).abs() < 1e-25);
        // Forced reverse flux
        let rxn = reaction(-20., -5.);
        assert!(rxn.get_forward_upper_bound().abs() < 1e-25);
        assert!((rxn.get_reverse_lower_bound() - 5.).abs() < 1e-25);
        assert!((rxn.get_reverse_upper_bound() - 20.).abs() < 1e-25);
    }

    #[test]
    fn inactive_reaction_has_no_flux() {
        let mut rxn = reaction(-10., 20.);
        rxn.activity = ReactionActivity::Inactive;
        assert!((rxn.get_forward_upper_bound()).abs() < 1e-25);
        assert!((rxn.get_reverse_upper_bound()).abs() < 1e-25);
    }

    #[test]
    fn distinct_directional_ids() {
        let rxn = reaction(-10., 20.);
        assert_eq!(rxn.get_forward_id(), "PGI_forward");
        assert!(rxn.get_reverse_id().starts_with("PGI_reverse_"));
    }
}
