//! Per condition copies of the metabolic model
use crate::made::error::MadeError;
use crate::metabolic_model::model::Model;

/// The model(s) a run starts from
#[derive(Clone, Debug)]
pub enum ModelInput {
    /// One model copied for every condition
    Single(Model),
    /// One model per condition, in condition order
    PerCondition(Vec<Model>),
}

impl From<Model> for ModelInput {
    fn from(value: Model) -> Self {
        ModelInput::Single(value)
    }
}

impl From<Vec<Model>> for ModelInput {
    fn from(value: Vec<Model>) -> Self {
        ModelInput::PerCondition(value)
    }
}

/// A condition together with its bound model
///
/// The model can only be read once the condition is built.
#[derive(Clone, Debug)]
pub struct Condition {
    index: usize,
    model: Model,
}

impl Condition {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// (lower, upper) bound of every reaction, in reaction order
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.model
            .reactions
            .values()
            .map(|r| (r.lower_bound, r.upper_bound))
            .collect()
    }

    /// Objective coefficient of every reaction, in reaction order
    pub fn objective_coefficients(&self) -> Vec<f64> {
        self.model.objective_coefficients()
    }
}

/// Build one [`Condition`] per condition index, applying the bound and objective overrides
///
/// # Errors
/// - [`MadeError::Shape`] if the number of models, or the outer or inner length of
///   `bounds`/`objs`, doesn't match the conditions and their reactions
/// - [`MadeError::Config`] if a lower bound exceeds its upper bound, or a value is NaN
pub fn bind_conditions(
    models: &ModelInput,
    num_conditions: usize,
    bounds: Option<&[Vec<(f64, f64)>]>,
    objs: Option<&[Vec<f64>]>,
) -> Result<Vec<Condition>, MadeError> {
    let mut bound_models: Vec<Model> = match models {
        ModelInput::Single(model) => vec![model.clone(); num_conditions],
        ModelInput::PerCondition(models) => {
            if models.len() != num_conditions {
                return Err(MadeError::Shape(format!(
                    "{} models given for {} conditions",
                    models.len(),
                    num_conditions
                )));
            }
            models.clone()
        }
    };

    if let Some(bounds) = bounds {
        check_outer_len("bounds", bounds.len(), num_conditions)?;
        for (condition, (model, condition_bounds)) in
            bound_models.iter_mut().zip(bounds).enumerate()
        {
            check_inner_len("bounds", condition, condition_bounds.len(), model)?;
            for (reaction, (lb, ub)) in model.reactions.values_mut().zip(condition_bounds) {
                if lb.is_nan() || ub.is_nan() || lb > ub {
                    return Err(MadeError::Config(format!(
                        "invalid bounds ({lb}, {ub}) for reaction {} in condition {condition}",
                        reaction.id
                    )));
                }
                reaction.set_bounds(*lb, *ub);
            }
        }
    }

    if let Some(objs) = objs {
        check_outer_len("objs", objs.len(), num_conditions)?;
        for (condition, (model, coefficients)) in bound_models.iter_mut().zip(objs).enumerate() {
            check_inner_len("objs", condition, coefficients.len(), model)?;
            if let Some(bad) = coefficients.iter().find(|c| c.is_nan()) {
                return Err(MadeError::Config(format!(
                    "objective coefficient {bad} in condition {condition} is not a number"
                )));
            }
            let ids: Vec<String> = model.reactions.keys().cloned().collect();
            for (id, coefficient) in ids.iter().zip(coefficients) {
                model.set_objective_coefficient(id, *coefficient);
            }
        }
    }

    Ok(bound_models
        .into_iter()
        .enumerate()
        .map(|(index, model)| Condition { index, model })
        .collect())
}

fn check_outer_len(name: &str, len: usize, num_conditions: usize) -> Result<(), MadeError> {
    if len != num_conditions {
        return Err(MadeError::Shape(format!(
            "{name} has {len} entries for {num_conditions} conditions"
        )));
    }
    Ok(())
}

fn check_inner_len(
    name: &str,
    condition: usize,
    len: usize,
    model: &Model,
) -> Result<(), MadeError> {
    if len != model.reactions.len() {
        return Err(MadeError::Shape(format!(
            "{name} for condition {condition} has {len} entries, the model has {} reactions",
            model.reactions.len()
        )));
    }
    Ok(())
}
