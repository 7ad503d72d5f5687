//! Turning p-values into per gene weights and directions
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::made::config::{MadeConfig, Weighting};
use crate::made::error::MadeError;
use crate::made::expression::{Direction, ExpressionMatrix, ExpressionRecord, FoldChangeScale};

/// Something about a run the caller should know, without being an error
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RunNote {
    /// No p-values were given, so every gene weighs 1 and weighting was switched to `none`
    UnitWeighting { requested: Weighting },
}

impl Display for RunNote {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RunNote::UnitWeighting { requested } => write!(
                f,
                "no p-values given: using unit weights (weighting {requested} replaced by none)"
            ),
        }
    }
}

/// Weight of a single value under a scheme, without the p_thresh rule
pub fn scheme_weight(scheme: Weighting, p: f64, p_eps: f64) -> Result<f64, MadeError> {
    match scheme {
        Weighting::Log => {
            if !(p_eps > 0f64) {
                return Err(MadeError::Numeric(format!(
                    "log weighting needs p_eps > 0, got {p_eps}"
                )));
            }
            Ok(-p.clamp(p_eps.min(1f64), 1f64).ln())
        }
        Weighting::Linear => Ok(1f64 - p),
        Weighting::Unit => Ok(1f64),
        Weighting::None => Ok(p),
    }
}

/// Weight of a gene and whether the p_thresh rule turned it into evidence for a constant state
///
/// For `log`, `linear` and `unit`, p-values above `p_thresh` are weighted as `1 - p`. With
/// `none` the supplied value is the weight.
pub fn gene_weight(
    scheme: Weighting,
    p: f64,
    p_thresh: f64,
    p_eps: f64,
) -> Result<(f64, bool), MadeError> {
    if scheme == Weighting::None {
        if !p.is_finite() || p < 0f64 {
            return Err(MadeError::Numeric(format!(
                "weights must be finite and non-negative, got {p}"
            )));
        }
        return Ok((p, false));
    }
    if !(0f64..=1f64).contains(&p) {
        return Err(MadeError::Numeric(format!("p-value {p} is outside [0, 1]")));
    }
    if p > p_thresh {
        Ok((scheme_weight(scheme, 1f64 - p, p_eps)?, true))
    } else {
        Ok((scheme_weight(scheme, p, p_eps)?, false))
    }
}

/// Weighted evidence for every column of the fold change table
#[derive(Clone, Debug)]
pub struct ExpressionWeights {
    /// Records per column, in gene order
    columns: Vec<Vec<ExpressionRecord>>,
    /// Scheme actually used
    scheme: Weighting,
    note: Option<RunNote>,
}

impl ExpressionWeights {
    /// Weigh every gene in every column of `fold_change`
    ///
    /// Without `pvals` a table of ones is weighed with the `none` scheme and a
    /// [`RunNote::UnitWeighting`] is attached. Under `none` the fold changes only give
    /// directions, otherwise they are ratios unless `log_fold_change` is set.
    pub fn compute(
        fold_change: &ExpressionMatrix,
        pvals: Option<&ExpressionMatrix>,
        config: &MadeConfig,
    ) -> Result<Self, MadeError> {
        let ones;
        let (pvals, scheme, note) = match pvals {
            Some(pvals) => {
                fold_change.check_same_layout(pvals)?;
                (pvals, config.weighting, None)
            }
            None => {
                ones = fold_change.ones_like();
                tracing::info!(
                    requested = %config.weighting,
                    "No p-values given, using unit weights"
                );
                (
                    &ones,
                    Weighting::None,
                    Some(RunNote::UnitWeighting {
                        requested: config.weighting,
                    }),
                )
            }
        };

        let scale = if scheme == Weighting::None {
            FoldChangeScale::Direction
        } else if config.log_fold_change {
            FoldChangeScale::Log
        } else {
            FoldChangeScale::Ratio
        };

        let mut columns = Vec::with_capacity(fold_change.ncols());
        for column in 0..fold_change.ncols() {
            let mut records = Vec::with_capacity(fold_change.nrows());
            for (row, gene) in fold_change.genes().iter().enumerate() {
                let fc = fold_change.values()[(row, column)];
                let p = pvals.values()[(row, column)];
                let (mut weight, flipped) =
                    gene_weight(scheme, p, config.p_thresh, config.p_eps)?;
                if weight < config.weight_thresh {
                    weight = 0f64;
                }
                let (direction, magnitude) = scale.read(fc)?;
                records.push(ExpressionRecord {
                    gene: gene.clone(),
                    fold_change: fc,
                    direction: if flipped {
                        Direction::Constant
                    } else {
                        direction
                    },
                    magnitude,
                    weight,
                });
            }
            columns.push(records);
        }
        Ok(ExpressionWeights {
            columns,
            scheme,
            note,
        })
    }

    /// Records for one fold change column
    pub fn column(&self, column: usize) -> &[ExpressionRecord] {
        self.columns.get(column).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn scheme(&self) -> Weighting {
        self.scheme
    }

    pub fn note(&self) -> Option<&RunNote> {
        self.note.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::made::config::MadeConfigBuilder;

    #[test]
    fn weights_non_negative_and_non_increasing() {
        let ps = [0., 1e-12, 1e-3, 0.01, 0.2, 0.5, 0.9, 1.];
        for scheme in [Weighting::Log, Weighting::Linear, Weighting::Unit] {
            let weights: Vec<f64> = ps
                .iter()
                .map(|p| gene_weight(scheme, *p, 1., 1e-10).unwrap().0)
                .collect();
            assert!(weights.iter().all(|w| *w >= 0.));
            assert!(weights.windows(2).all(|w| w[1] <= w[0]));
        }
        let unit: Vec<f64> = ps
            .iter()
            .map(|p| gene_weight(Weighting::Unit, *p, 1., 1e-10).unwrap().0)
            .collect();
        assert!(unit.iter().all(|w| *w == 1.));
    }

    #[test]
    fn log_clamps_to_p_eps() {
        let at_eps = scheme_weight(Weighting::Log, 1e-10, 1e-10).unwrap();
        for p in [0., 1e-300, 1e-20, 1e-11] {
            assert_eq!(scheme_weight(Weighting::Log, p, 1e-10).unwrap(), at_eps);
        }
        assert!((at_eps - 23.025850929940457).abs() < 1e-9);
        assert!(matches!(
            scheme_weight(Weighting::Log, 0.1, 0.),
            Err(MadeError::Numeric(_))
        ));
    }

    #[test]
    fn none_is_identity() {
        for w in [0., 0.3, 2., 17.5] {
            assert_eq!(gene_weight(Weighting::None, w, 0.5, 1e-10).unwrap(), (w, false));
        }
        assert!(gene_weight(Weighting::None, -1., 0.5, 1e-10).is_err());
        assert!(gene_weight(Weighting::Linear, 1.2, 0.5, 1e-10).is_err());
    }

    #[test]
    fn p_thresh_flips_to_constant() {
        let (w, flipped) = gene_weight(Weighting::Linear, 0.8, 0.5, 1e-10).unwrap();
        assert!(flipped);
        assert!((w - 0.8).abs() < 1e-12);
        let (w, flipped) = gene_weight(Weighting::Log, 0.8, 0.5, 1e-10).unwrap();
        assert!(flipped);
        assert!((w - -(0.2f64).ln()).abs() < 1e-12);
    }

    fn table(values: Vec<Vec<f64>>) -> ExpressionMatrix {
        let genes = (0..values.len()).map(|i| format!("g{i}")).collect();
        ExpressionMatrix::from_rows(genes, values).unwrap()
    }

    #[test]
    fn records_from_tables() {
        let fc = table(vec![vec![2.0], vec![0.25], vec![3.0], vec![1.0]]);
        let p = table(vec![vec![0.01], vec![0.01], vec![0.9], vec![1.0]]);
        let config = MadeConfigBuilder::default()
            .weighting(Weighting::Linear)
            .build()
            .unwrap();
        let weights = ExpressionWeights::compute(&fc, Some(&p), &config).unwrap();
        let records = weights.column(0);
        assert_eq!(records[0].direction, Direction::Increase);
        assert!((records[0].weight - 0.99).abs() < 1e-12);
        assert!((records[0].magnitude - 1.0).abs() < 1e-12);
        // Ratios below one are decreases
        assert_eq!(records[1].direction, Direction::Decrease);
        assert!((records[1].magnitude + 2.0).abs() < 1e-12);
        assert_eq!(records[2].direction, Direction::Constant);
        assert!((records[2].weight - 0.9).abs() < 1e-12);
        // p = 1 flips to weight 1 - (1 - 1) under linear weighting, a confident constant
        assert_eq!(records[3].direction, Direction::Constant);
        assert!(weights.note().is_none());
        assert!(weights.column(5).is_empty());
    }

    #[test]
    fn log_fold_changes() {
        let fc = table(vec![vec![0.25], vec![-1.0]]);
        let p = table(vec![vec![0.01], vec![0.01]]);
        let config = MadeConfigBuilder::default()
            .log_fold_change(true)
            .build()
            .unwrap();
        let weights = ExpressionWeights::compute(&fc, Some(&p), &config).unwrap();
        assert_eq!(weights.column(0)[0].direction, Direction::Increase);
        assert_eq!(weights.column(0)[0].magnitude, 0.25);
        assert_eq!(weights.column(0)[1].direction, Direction::Decrease);

        // The same table read as ratios has a negative ratio in it
        assert!(matches!(
            ExpressionWeights::compute(&fc, Some(&p), &MadeConfig::default()),
            Err(MadeError::Numeric(_))
        ));
    }

    #[test]
    fn small_weights_are_zeroed() {
        let fc = table(vec![vec![2.0]]);
        let p = table(vec![vec![0.5]]);
        let config = MadeConfigBuilder::default()
            .weighting(Weighting::Linear)
            .p_thresh(0.5)
            .weight_thresh(0.6)
            .build()
            .unwrap();
        let weights = ExpressionWeights::compute(&fc, Some(&p), &config).unwrap();
        assert_eq!(weights.column(0)[0].weight, 0.);
        assert!(!weights.column(0)[0].is_weighted());
    }

    #[test]
    fn missing_pvals_force_unit_weights() {
        let fc = table(vec![vec![2.0, -1.0]]);
        let config = MadeConfig::default();
        let weights = ExpressionWeights::compute(&fc, None, &config).unwrap();
        assert_eq!(weights.scheme(), Weighting::None);
        assert_eq!(
            weights.note(),
            Some(&RunNote::UnitWeighting {
                requested: Weighting::Log
            })
        );
        assert_eq!(weights.column(1)[0].weight, 1.);
        assert_eq!(weights.column(1)[0].direction, Direction::Decrease);
    }

    #[test]
    fn mismatched_pvals_rejected() {
        let fc = table(vec![vec![2.0, -1.0]]);
        let p = table(vec![vec![0.1]]);
        assert!(matches!(
            ExpressionWeights::compute(&fc, Some(&p), &MadeConfig::default()),
            Err(MadeError::Shape(_))
        ));
    }
}
