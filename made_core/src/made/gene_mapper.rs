//! Links gene states to reaction fluxes inside the MILP
use crate::metabolic_model::model::{Gpr, GprOperation};
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::variable::VariableType;

/// Id of the binary state variable of `gene` in `condition`
pub fn gene_variable_id(gene: &str, condition: usize) -> String {
    format!("gene__{gene}__c{condition}")
}

/// Id of the activity flag of `reaction` in `condition`
pub fn reaction_activity_id(reaction: &str, condition: usize) -> String {
    format!("rxn_active__{reaction}__c{condition}")
}

/// Add the state variable for `gene` in `condition` unless it already exists, returning its id
pub fn add_gene_variable(
    problem: &mut Problem,
    gene: &str,
    condition: usize,
) -> Result<String, ProblemError> {
    let id = gene_variable_id(gene, condition);
    if problem.variable(&id).is_none() {
        problem.add_new_variable(&id, Some(gene), VariableType::Binary, 0f64, 1f64)?;
    }
    Ok(id)
}

/// Encode `gpr` into `problem` for `reaction_id` in `condition`
///
/// Nested operations of the same kind are merged first, so `a and b and c` becomes a
/// single three way AND. Each operation gets a continuous variable `y` in \[0, 1\]:
///
/// - AND over x1..xn: `y <= xk` and `y >= sum(xk) - (n - 1)`
/// - OR over x1..xn: `y >= xk` and `y <= sum(xk)`
/// - NOT x: `y = 1 - x`
///
/// With binary gene states every `y` is forced to 0 or 1. Returns the id of the variable
/// which is 1 exactly when the reaction is allowed to carry flux. This is the gene
/// variable itself when the rule is a single gene.
pub fn link_gpr(
    problem: &mut Problem,
    gpr: &Gpr,
    reaction_id: &str,
    condition: usize,
) -> Result<String, ProblemError> {
    let mut linker = GprLinker {
        problem,
        reaction_id,
        condition,
        next_node: 0,
    };
    linker.link(gpr, true)
}

struct GprLinker<'p> {
    problem: &'p mut Problem,
    reaction_id: &'p str,
    condition: usize,
    next_node: usize,
}

impl GprLinker<'_> {
    fn link(&mut self, gpr: &Gpr, root: bool) -> Result<String, ProblemError> {
        match gpr {
            Gpr::GeneNode(gene) => add_gene_variable(self.problem, gene, self.condition),
            Gpr::Operation(GprOperation::Not { val }) => {
                let operand = self.link(val, false)?;
                let y = self.node_variable(root)?;
                self.problem.add_new_equality_constraint(
                    &format!("{y}__not"),
                    &[y.as_str(), operand.as_str()],
                    &[1f64, 1f64],
                    1f64,
                )?;
                Ok(y)
            }
            Gpr::Operation(GprOperation::And { .. }) => {
                let mut operands = Vec::new();
                flatten(gpr, true, &mut operands);
                let ids = self.link_all(&operands)?;
                let y = self.node_variable(root)?;
                for (k, x) in ids.iter().enumerate() {
                    self.problem.add_new_inequality_constraint(
                        &format!("{y}__and__{k}"),
                        &[y.as_str(), x.as_str()],
                        &[1f64, -1f64],
                        f64::NEG_INFINITY,
                        0f64,
                    )?;
                }
                let (vars, coefs) = sum_terms(&y, &ids);
                self.problem.add_new_inequality_constraint(
                    &format!("{y}__and"),
                    &vars,
                    &coefs,
                    -((ids.len() - 1) as f64),
                    f64::INFINITY,
                )?;
                Ok(y)
            }
            Gpr::Operation(GprOperation::Or { .. }) => {
                let mut operands = Vec::new();
                flatten(gpr, false, &mut operands);
                let ids = self.link_all(&operands)?;
                let y = self.node_variable(root)?;
                for (k, x) in ids.iter().enumerate() {
                    self.problem.add_new_inequality_constraint(
                        &format!("{y}__or__{k}"),
                        &[y.as_str(), x.as_str()],
                        &[1f64, -1f64],
                        0f64,
                        f64::INFINITY,
                    )?;
                }
                let (vars, coefs) = sum_terms(&y, &ids);
                self.problem.add_new_inequality_constraint(
                    &format!("{y}__or"),
                    &vars,
                    &coefs,
                    f64::NEG_INFINITY,
                    0f64,
                )?;
                Ok(y)
            }
        }
    }

    fn link_all(&mut self, operands: &[&Gpr]) -> Result<Vec<String>, ProblemError> {
        operands.iter().map(|op| self.link(op, false)).collect()
    }

    fn node_variable(&mut self, root: bool) -> Result<String, ProblemError> {
        let id = if root {
            reaction_activity_id(self.reaction_id, self.condition)
        } else {
            let id = format!(
                "gpr__{}__c{}__n{}",
                self.reaction_id, self.condition, self.next_node
            );
            self.next_node += 1;
            id
        };
        self.problem
            .add_new_variable(&id, None, VariableType::Continuous, 0f64, 1f64)?;
        Ok(id)
    }
}

/// Collect the operands of a chain of ANDs (or ORs)
fn flatten<'a>(gpr: &'a Gpr, and: bool, operands: &mut Vec<&'a Gpr>) {
    match (gpr, and) {
        (Gpr::Operation(GprOperation::And { left, right }), true)
        | (Gpr::Operation(GprOperation::Or { left, right }), false) => {
            flatten(left, and, operands);
            flatten(right, and, operands);
        }
        _ => operands.push(gpr),
    }
}

/// Terms of `y - sum(x)`
fn sum_terms<'a>(y: &'a str, xs: &'a [String]) -> (Vec<&'a str>, Vec<f64>) {
    let mut vars = vec![y];
    vars.extend(xs.iter().map(|x| x.as_str()));
    let mut coefs = vec![1f64];
    coefs.extend(std::iter::repeat(-1f64).take(xs.len()));
    (vars, coefs)
}

/// Tie a directional flux variable to an activity variable with big-M constraints
///
/// Adds `v <= ub * y`, using `big_m` for an infinite `ub`. When `lb` is positive the
/// variable's own lower bound is relaxed to 0 and `v >= lb * y` is added instead, so a
/// closed reaction can still reach zero flux.
pub fn link_flux(
    problem: &mut Problem,
    flux_id: &str,
    activity_id: &str,
    lb: f64,
    ub: f64,
    big_m: f64,
) -> Result<(), ProblemError> {
    let ub = if ub.is_finite() { ub } else { big_m };
    problem.add_new_inequality_constraint(
        &format!("{flux_id}__gate_ub"),
        &[flux_id, activity_id],
        &[1f64, -ub],
        f64::NEG_INFINITY,
        0f64,
    )?;
    if lb > 0f64 {
        let upper = problem
            .variable(flux_id)
            .map(|v| v.upper_bound)
            .ok_or(ProblemError::NonExistentVariable)?;
        problem.update_variable_bounds(flux_id, 0f64, upper)?;
        let lb = if lb.is_finite() { lb } else { big_m };
        problem.add_new_inequality_constraint(
            &format!("{flux_id}__gate_lb"),
            &[flux_id, activity_id],
            &[1f64, -lb],
            0f64,
            f64::INFINITY,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gpr_parse::parse_gpr;
    use crate::optimize::constraint::Constraint;
    use crate::optimize::problem::ProblemType;
    use indexmap::IndexMap;

    fn parse(rule: &str) -> Gpr {
        let mut gene_map = IndexMap::new();
        parse_gpr(rule, &mut gene_map).unwrap()
    }

    fn satisfied(constraint: &Constraint, values: &IndexMap<String, f64>) -> bool {
        let total: f64 = constraint
            .terms()
            .iter()
            .map(|t| t.coefficient * values[&t.variable])
            .sum();
        let (lower, upper) = constraint.bounds();
        total >= lower - 1e-9 && total <= upper + 1e-9
    }

    /// Every 0/1 assignment of the auxiliary variables that satisfies the constraints
    /// gives the root the value of the rule
    fn check_encoding(rule: &str) {
        let gpr = parse(rule);
        let mut problem = Problem::new_minimization();
        let root = link_gpr(&mut problem, &gpr, "R", 0).unwrap();
        let genes: Vec<String> = gpr.gene_ids().iter().map(|g| g.to_string()).collect();
        let aux: Vec<String> = problem
            .variables()
            .values()
            .filter(|v| v.variable_type == VariableType::Continuous)
            .map(|v| v.id.clone())
            .collect();
        for gene_mask in 0..(1usize << genes.len()) {
            let states: IndexMap<String, bool> = genes
                .iter()
                .enumerate()
                .map(|(i, g)| (g.clone(), gene_mask & (1 << i) != 0))
                .collect();
            let expected = gpr.eval_states(&|g: &str| states.get(g).copied());
            let mut feasible = 0;
            for aux_mask in 0..(1usize << aux.len()) {
                let mut values: IndexMap<String, f64> = IndexMap::new();
                for (g, on) in &states {
                    values.insert(gene_variable_id(g, 0), if *on { 1. } else { 0. });
                }
                for (i, a) in aux.iter().enumerate() {
                    values.insert(a.clone(), if aux_mask & (1 << i) != 0 { 1. } else { 0. });
                }
                if problem.constraints().values().all(|c| satisfied(c, &values)) {
                    feasible += 1;
                    assert_eq!(values[&root] == 1., expected, "{rule} with {states:?}");
                }
            }
            assert_eq!(feasible, 1, "{rule} with {states:?}");
        }
    }

    #[test]
    fn encodings_follow_rules() {
        check_encoding("g1 and g2");
        check_encoding("g1 or g2 or g3");
        check_encoding("(g1 and g2) or g3");
        check_encoding("g1 and not g2");
        check_encoding("not (g1 or g2)");
        check_encoding("(g1 or g2) and (g3 or g4)");
    }

    #[test]
    fn same_kind_operations_are_merged() {
        let mut problem = Problem::new_minimization();
        let root = link_gpr(&mut problem, &parse("g1 and g2 and g3"), "PFK", 1).unwrap();
        assert_eq!(root, "rxn_active__PFK__c1");
        // Three gene binaries and the single AND node
        assert_eq!(problem.num_variables(), 4);
        assert_eq!(problem.num_constraints(), 4);
        let (lower, upper) = problem.constraints()["rxn_active__PFK__c1__and"].bounds();
        assert_eq!(lower, -2.);
        assert_eq!(upper, f64::INFINITY);
    }

    #[test]
    fn single_gene_rule_uses_gene_variable() {
        let mut problem = Problem::new_minimization();
        let root = link_gpr(&mut problem, &parse("b0001"), "R1", 0).unwrap();
        assert_eq!(root, gene_variable_id("b0001", 0));
        assert_eq!(problem.num_constraints(), 0);
        // A second reaction sharing the gene reuses its variable
        let root = link_gpr(&mut problem, &parse("b0001 or b0002"), "R2", 0).unwrap();
        assert_eq!(root, "rxn_active__R2__c0");
        assert_eq!(problem.num_variables(), 3);
        assert_eq!(problem.problem_type(), ProblemType::LinearMixedInteger);
    }

    #[test]
    fn flux_gates() {
        let mut problem = Problem::new_minimization();
        problem
            .add_new_variable("v", None, VariableType::Continuous, 2., f64::INFINITY)
            .unwrap();
        let y = add_gene_variable(&mut problem, "g1", 0).unwrap();
        link_flux(&mut problem, "v", &y, 2., f64::INFINITY, 1000.).unwrap();
        let v = problem.variable("v").unwrap();
        assert_eq!(v.lower_bound, 0.);
        let gate_ub = &problem.constraints()["v__gate_ub"];
        assert_eq!(gate_ub.terms()[1].coefficient, -1000.);
        let gate_lb = &problem.constraints()["v__gate_lb"];
        assert_eq!(gate_lb.terms()[1].coefficient, -2.);
        assert_eq!(gate_lb.bounds(), (0., f64::INFINITY));
    }
}
