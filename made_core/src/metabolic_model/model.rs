//! This module provides the Model struct for representing an entire metabolic model
use std::fmt::{Display, Formatter};

use crate::metabolic_model::gene::{Gene, GeneActivity};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::{Reaction, ReactionActivity};

use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use thiserror::Error;

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Gene Objects
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// Metabolites in the reaction's stoichiometry and genes in its GPR which are not yet part
    /// of the model are added as well.
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use made_core::metabolic_model::model::Model;
    /// use made_core::metabolic_model::reaction::{Reaction, ReactionBuilder};
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction".to_string()).build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        for met_id in reaction.metabolites.keys() {
            if !self.metabolites.contains_key(met_id) {
                self.add_metabolite(Metabolite::with_id(met_id));
            }
        }
        if let Some(gpr) = &reaction.gpr {
            for gene_id in gpr.gene_ids() {
                if !self.genes.contains_key(gene_id) {
                    self.add_gene(Gene::with_id(gene_id));
                }
            }
        }
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    ///
    /// # Parameters
    /// - gene: Gene to add
    ///
    /// # Examples
    /// ```rust
    /// use made_core::metabolic_model::gene::GeneBuilder;
    /// use made_core::metabolic_model::model::Model;
    /// let mut model=Model::new_empty();
    /// let new_gene = GeneBuilder::default().id("new_gene".to_string()).build().unwrap();
    /// model.add_gene(new_gene);
    /// ```
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Set the objective coefficient of a reaction, a coefficient of zero removes it
    pub fn set_objective_coefficient(&mut self, reaction_id: &str, coefficient: f64) {
        if coefficient == 0f64 {
            self.objective.shift_remove(reaction_id);
        } else {
            self.objective.insert(reaction_id.to_string(), coefficient);
        }
    }

    /// Objective coefficients in reaction order, zero for reactions outside the objective
    pub fn objective_coefficients(&self) -> Vec<f64> {
        self.reactions
            .keys()
            .map(|id| self.objective.get(id).copied().unwrap_or(0f64))
            .collect()
    }

    /// Build the stoichiometric matrix (metabolites x reactions) in CSR format
    ///
    /// Rows follow the order of [`Model::metabolites`] and columns the order of
    /// [`Model::reactions`], so that each row is one mass balance.
    pub fn stoichiometric_matrix(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.metabolites.len(), self.reactions.len());
        for (col, reaction) in self.reactions.values().enumerate() {
            for (met_id, coef) in &reaction.metabolites {
                if let Some(row) = self.metabolites.get_index_of(met_id) {
                    coo.push(row, col, *coef);
                }
            }
        }
        CsrMatrix::from(&coo)
    }

    /// Binary state of a gene, None for genes outside the model
    pub fn gene_state(&self, gene_id: &str) -> Option<bool> {
        self.genes.get(gene_id).map(|gene| gene.activity.into())
    }

    /// Activity of every reaction when `states` take precedence over the gene activities of
    /// the model
    ///
    /// Reactions without a GPR are always active, genes unknown to both count as active.
    pub fn reaction_states(&self, states: &IndexMap<String, bool>) -> IndexMap<String, bool> {
        self.reactions
            .iter()
            .map(|(id, reaction)| {
                let active = match &reaction.gpr {
                    Some(gpr) => gpr.eval_states(&|gene: &str| {
                        states.get(gene).copied().or_else(|| self.gene_state(gene))
                    }),
                    None => true,
                };
                (id.clone(), active)
            })
            .collect()
    }

    /// Apply a gene activity assignment to the model
    ///
    /// Genes in `states` get their activity updated; every reaction whose GPR then evaluates
    /// to inactive is marked inactive and has its bounds set to zero.
    pub fn apply_gene_states(&mut self, states: &IndexMap<String, bool>) {
        for (gene_id, active) in states {
            if let Some(gene) = self.genes.get_mut(gene_id) {
                gene.activity = GeneActivity::from(*active);
            }
        }
        for (id, active) in self.reaction_states(states) {
            if active {
                continue;
            }
            if let Some(reaction) = self.reactions.get_mut(&id) {
                reaction.activity = ReactionActivity::Inactive;
                reaction.set_bounds(0f64, 0f64);
            }
        }
    }
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
#[derive(Clone, Debug)]
pub enum Gpr {
    /// Operation on two genes (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene Node (see [`Gene`])
    GeneNode(String),
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

impl Gpr {
    /// Create a new binary operation node
    pub fn new_binary_operation(
        left: Gpr,
        operator: GprOperatorType,
        right: Gpr,
    ) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Or => GprOperation::Or {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::And => GprOperation::And {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::Not => return Err(GprError::InvalidBinaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new unary operation node
    pub fn new_unary_operation(operator: GprOperatorType, operand: Gpr) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Not => GprOperation::Not {
                val: Box::new(operand),
            },
            _ => return Err(GprError::InvalidUnaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::GeneNode(gene.to_string())
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    format!("({} or {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::And { left, right } => {
                    format!("({} and {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::Not { val } => {
                    format!("(not {})", val)
                }
            },
            Gpr::GeneNode(gene_ref) => gene_ref.to_string(),
        }
    }

    /// Ids of all genes appearing in the GPR, in order of first appearance
    pub fn gene_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        self.collect_gene_ids(&mut ids);
        ids
    }

    fn collect_gene_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.collect_gene_ids(ids);
                right.collect_gene_ids(ids);
            }
            Gpr::Operation(GprOperation::Not { val }) => val.collect_gene_ids(ids),
            Gpr::GeneNode(id) => {
                if !ids.contains(&id.as_str()) {
                    ids.push(id.as_str());
                }
            }
        }
    }

    /// Evaluate the GPR against a binary gene state assignment
    ///
    /// AND takes the minimum of its operands, OR the maximum. Genes for which `state`
    /// returns `None` are considered active.
    pub fn eval_states<F>(&self, state: &F) -> bool
    where
        F: Fn(&str) -> Option<bool>,
    {
        match self {
            Gpr::Operation(GprOperation::And { left, right }) => {
                left.eval_states(state) && right.eval_states(state)
            }
            Gpr::Operation(GprOperation::Or { left, right }) => {
                left.eval_states(state) || right.eval_states(state)
            }
            Gpr::Operation(GprOperation::Not { val }) => !val.eval_states(state),
            Gpr::GeneNode(id) => state(id.as_str()).unwrap_or(true),
        }
    }
}

/// Possible operations on genes
#[derive(Clone, Debug)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

/// Types of Allowed GPR Operations
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
    /// Not, results in active if val is inactive
    Not,
}

#[derive(Clone, Debug, Error)]
pub enum GprError {
    #[error("Invalid Binary Operation")]
    InvalidBinaryOp,
    #[error("Invalid Unary Operation")]
    InvalidUnaryOp,
}

// endregion GPR Functionality

#[cfg(test)]
mod gpr_tests {
    use super::*;
    use crate::metabolic_model::gene::GeneBuilder;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use indexmap::IndexMap;

    fn setup_model() -> Model {
        let mut model = Model::new_empty();
        // This model only needs to hold genes for these tests
        // Create some active genes
        let active_gene1 = GeneBuilder::default()
            .id("active_gene1".to_string())
            .activity(GeneActivity::Active)
            .build()
            .unwrap();
        let active_gene2 = GeneBuilder::default()
            .id("active_gene2".to_string())
            .activity(GeneActivity::Active)
            .build()
            .unwrap();
        // Create some inactive genes
        let inactive_gene1 = GeneBuilder::default()
            .id("inactive_gene1".to_string())
            .activity(GeneActivity::Inactive)
            .build()
            .unwrap();
        let inactive_gene2 = GeneBuilder::default()
            .id("inactive_gene2".to_string())
            .activity(GeneActivity::Inactive)
            .build()
            .unwrap();
        model.add_gene(active_gene1);
        model.add_gene(active_gene2);
        model.add_gene(inactive_gene1);
        model.add_gene(inactive_gene2);

        model
    }

    fn and_node(left: &str, right: &str) -> Gpr {
        Gpr::Operation(GprOperation::And {
            left: Box::new(Gpr::new_gene_node(left)),
            right: Box::new(Gpr::new_gene_node(right)),
        })
    }

    fn or_node(left: &str, right: &str) -> Gpr {
        Gpr::Operation(GprOperation::Or {
            left: Box::new(Gpr::new_gene_node(left)),
            right: Box::new(Gpr::new_gene_node(right)),
        })
    }

    /// Evaluate a GPR against the gene activities stored in the model
    fn eval(model: &Model, gpr: &Gpr) -> bool {
        gpr.eval_states(&|gene: &str| model.gene_state(gene))
    }

    #[test]
    fn gene_node() {
        let model = setup_model();
        assert!(eval(&model, &Gpr::new_gene_node("active_gene1")));
        assert!(!eval(&model, &Gpr::new_gene_node("inactive_gene1")));
        // Genes outside the model count as active
        assert!(eval(&model, &Gpr::new_gene_node("missing")));
        assert_eq!(model.gene_state("inactive_gene2"), Some(false));
        assert_eq!(model.gene_state("missing"), None);
    }

    #[test]
    fn and_node_eval() {
        let model = setup_model();
        assert!(eval(&model, &and_node("active_gene1", "active_gene2")));
        assert!(!eval(&model, &and_node("active_gene1", "inactive_gene1")));
        assert!(!eval(&model, &and_node("inactive_gene1", "inactive_gene2")));
    }

    #[test]
    fn or_node_eval() {
        let model = setup_model();
        assert!(eval(&model, &or_node("active_gene1", "active_gene2")));
        assert!(eval(&model, &or_node("active_gene1", "inactive_gene1")));
        assert!(!eval(&model, &or_node("inactive_gene1", "inactive_gene2")));
    }

    #[test]
    fn not_node() {
        let model = setup_model();
        let not_active = Gpr::Operation(GprOperation::Not {
            val: Box::new(Gpr::new_gene_node("active_gene1")),
        });
        assert!(!eval(&model, &not_active));
        let not_inactive = Gpr::Operation(GprOperation::Not {
            val: Box::new(Gpr::new_gene_node("inactive_gene1")),
        });
        assert!(eval(&model, &not_inactive));
    }

    #[test]
    fn eval_states_min_max() {
        // (g1 and g2) or g3
        let gpr = Gpr::Operation(GprOperation::Or {
            left: Box::new(and_node("g1", "g2")),
            right: Box::new(Gpr::new_gene_node("g3")),
        });
        let mut states: IndexMap<String, bool> = IndexMap::new();
        states.insert("g1".to_string(), true);
        states.insert("g2".to_string(), false);
        states.insert("g3".to_string(), false);
        assert!(!gpr.eval_states(&|id: &str| states.get(id).copied()));
        states.insert("g2".to_string(), true);
        assert!(gpr.eval_states(&|id: &str| states.get(id).copied()));
        states.insert("g1".to_string(), false);
        states.insert("g3".to_string(), true);
        assert!(gpr.eval_states(&|id: &str| states.get(id).copied()));
        // Genes without a state count as active
        assert!(gpr.eval_states(&|_: &str| None));
    }

    #[test]
    fn gene_ids_are_unique() {
        let gpr = Gpr::Operation(GprOperation::Or {
            left: Box::new(and_node("g1", "g2")),
            right: Box::new(and_node("g2", "g3")),
        });
        assert_eq!(gpr.gene_ids(), vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn display() {
        let active_gene_node = Gpr::GeneNode("ActiveGene1".to_string());
        assert_eq!(format!("{}", active_gene_node), "ActiveGene1");
        assert_eq!(format!("{}", or_node("Active1", "Active2")), "(Active1 or Active2)");

        use crate::io::gpr_parse::parse_gpr;
        let mut gene_map = IndexMap::new();
        let gpr = parse_gpr("Rv0001 and Rv0002 or Rv0003", &mut gene_map).unwrap();
        // Because of how the display works, it will be very explicit with parenthesis
        assert_eq!(format!("{}", gpr), "((Rv0001 and Rv0002) or Rv0003)");

        let gpr = parse_gpr("(Rv0001 and not Rv0002) or not Rv0003", &mut gene_map).unwrap();
        assert_eq!(
            format!("{}", gpr),
            "((Rv0001 and (not Rv0002)) or (not Rv0003))"
        );
    }

    #[test]
    fn apply_states_closes_reactions() {
        let mut model = Model::new_empty();
        let mut gene_map = IndexMap::new();
        let gpr = crate::io::gpr_parse::parse_gpr("g1 and g2", &mut gene_map).unwrap();
        model.add_reaction(
            ReactionBuilder::default()
                .id("R1".to_string())
                .gpr(Some(gpr))
                .lower_bound(-5.)
                .upper_bound(5.)
                .build()
                .unwrap(),
        );
        assert_eq!(model.genes.len(), 2);
        let mut states = IndexMap::new();
        states.insert("g1".to_string(), true);
        states.insert("g2".to_string(), false);
        model.apply_gene_states(&states);
        let r1 = model.reactions.get("R1").unwrap();
        assert_eq!(r1.activity, ReactionActivity::Inactive);
        assert!(r1.lower_bound.abs() < 1e-25);
        assert!(r1.upper_bound.abs() < 1e-25);
    }

    #[test]
    fn reaction_states_prefer_given_states() {
        let mut model = setup_model();
        let mut gene_map = IndexMap::new();
        let gpr =
            crate::io::gpr_parse::parse_gpr("active_gene1 and g_new", &mut gene_map).unwrap();
        model.add_reaction(
            ReactionBuilder::default()
                .id("R1".to_string())
                .gpr(Some(gpr))
                .build()
                .unwrap(),
        );
        let gpr = crate::io::gpr_parse::parse_gpr("inactive_gene1", &mut gene_map).unwrap();
        model.add_reaction(
            ReactionBuilder::default()
                .id("R2".to_string())
                .gpr(Some(gpr))
                .build()
                .unwrap(),
        );
        model.add_reaction(ReactionBuilder::default().id("R3".to_string()).build().unwrap());

        // The model's own activities apply when no state is given
        let active = model.reaction_states(&IndexMap::new());
        assert!(active["R1"]);
        assert!(!active["R2"]);
        assert!(active["R3"]);

        let mut states = IndexMap::new();
        states.insert("g_new".to_string(), false);
        states.insert("inactive_gene1".to_string(), true);
        // Genes nobody knows about count as active
        states.insert("unrelated".to_string(), false);
        let active = model.reaction_states(&states);
        assert!(!active["R1"]);
        assert!(active["R2"]);
        assert!(active["R3"]);
    }

    #[test]
    fn stoichiometric_matrix_layout() {
        let mut model = Model::new_empty();
        let mut mets = IndexMap::new();
        mets.insert("A".to_string(), 1.0);
        model.add_reaction(
            ReactionBuilder::default()
                .id("EX_A".to_string())
                .metabolites(mets)
                .build()
                .unwrap(),
        );
        let mut mets = IndexMap::new();
        mets.insert("A".to_string(), -1.0);
        mets.insert("B".to_string(), 2.0);
        model.add_reaction(
            ReactionBuilder::default()
                .id("A_to_B".to_string())
                .metabolites(mets)
                .build()
                .unwrap(),
        );
        let s = model.stoichiometric_matrix();
        assert_eq!(s.nrows(), 2);
        assert_eq!(s.ncols(), 2);
        let row_a = s.row(0);
        assert_eq!(row_a.col_indices(), &[0, 1]);
        assert_eq!(row_a.values(), &[1.0, -1.0]);
        let row_b = s.row(1);
        assert_eq!(row_b.col_indices(), &[1]);
        assert_eq!(row_b.values(), &[2.0]);
    }
}
