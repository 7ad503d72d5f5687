//! Transitions between conditions and the fold change columns they use
use nalgebra::DMatrix;
use serde::Serialize;

use crate::made::error::MadeError;

/// A comparison of condition `source` to condition `target` using fold change `column`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Position of the transition in the ordered list
    pub index: usize,
    pub source: usize,
    pub target: usize,
    /// Column of the fold change and p-value tables (0 based)
    pub column: usize,
}

/// Ordered transitions together with the number of conditions they connect
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionGraph {
    transitions: Vec<Transition>,
    num_conditions: usize,
    num_columns: usize,
}

impl TransitionGraph {
    /// Build the transitions from an optional explicit matrix, see
    /// [`TransitionGraph::implicit`] and [`TransitionGraph::from_matrix`]
    pub fn build(
        transition_matrix: Option<&DMatrix<f64>>,
        num_columns: usize,
    ) -> Result<Self, MadeError> {
        match transition_matrix {
            Some(matrix) => TransitionGraph::from_matrix(matrix, num_columns),
            None => TransitionGraph::implicit(num_columns),
        }
    }

    /// Chain of conditions where column i compares condition i to condition i + 1
    pub fn implicit(num_columns: usize) -> Result<Self, MadeError> {
        if num_columns == 0 {
            return Err(MadeError::Shape(
                "the fold change table has no columns".to_string(),
            ));
        }
        let transitions = (0..num_columns)
            .map(|i| Transition {
                index: i,
                source: i,
                target: i + 1,
                column: i,
            })
            .collect();
        Ok(TransitionGraph {
            transitions,
            num_conditions: num_columns + 1,
            num_columns,
        })
    }

    /// Transitions read from a square matrix where entry (i, j) = k adds the transition
    /// i -> j using column k - 1
    ///
    /// # Errors
    /// - [`MadeError::Config`] if the matrix is not square, holds anything other than
    ///   non-negative integers, has a nonzero diagonal, or holds no transition at all
    /// - [`MadeError::Shape`] if an entry points past the last fold change column
    pub fn from_matrix(matrix: &DMatrix<f64>, num_columns: usize) -> Result<Self, MadeError> {
        if matrix.nrows() != matrix.ncols() || matrix.nrows() == 0 {
            return Err(MadeError::Config(format!(
                "the transition matrix must be square and non-empty, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        let mut transitions = Vec::new();
        let mut max_entry = 0usize;
        for source in 0..matrix.nrows() {
            for target in 0..matrix.ncols() {
                let entry = matrix[(source, target)];
                if !entry.is_finite() || entry < 0f64 || entry.fract() != 0f64 {
                    return Err(MadeError::Config(format!(
                        "transition matrix entry ({source}, {target}) = {entry} is not a \
                         non-negative integer"
                    )));
                }
                let k = entry as usize;
                if k == 0 {
                    continue;
                }
                if source == target {
                    return Err(MadeError::Config(format!(
                        "condition {source} can't transition to itself"
                    )));
                }
                if k > num_columns {
                    return Err(MadeError::Shape(format!(
                        "transition ({source}, {target}) uses column {k} but the fold change \
                         table has {num_columns} columns"
                    )));
                }
                max_entry = max_entry.max(k);
                transitions.push(Transition {
                    index: 0,
                    source,
                    target,
                    column: k - 1,
                });
            }
        }
        if transitions.is_empty() {
            return Err(MadeError::Config(
                "the transition matrix holds no transitions".to_string(),
            ));
        }
        transitions.sort_by_key(|t| (t.column, t.source, t.target));
        transitions
            .iter_mut()
            .enumerate()
            .for_each(|(i, t)| t.index = i);
        Ok(TransitionGraph {
            transitions,
            num_conditions: matrix.nrows(),
            num_columns: max_entry,
        })
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn num_conditions(&self) -> usize {
        self.num_conditions
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Number of fold change columns referenced (the largest matrix entry)
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_chain() {
        let graph = TransitionGraph::implicit(3).unwrap();
        assert_eq!(graph.num_conditions(), 4);
        assert_eq!(graph.num_transitions(), 3);
        for (i, t) in graph.transitions().iter().enumerate() {
            assert_eq!((t.index, t.source, t.target, t.column), (i, i, i + 1, i));
        }
        assert!(matches!(
            TransitionGraph::implicit(0),
            Err(MadeError::Shape(_))
        ));
    }

    #[test]
    fn explicit_matrix() {
        // Condition 0 is compared to both 1 (column 2) and 2 (column 1)
        let matrix = DMatrix::from_row_slice(3, 3, &[0., 2., 1., 0., 0., 0., 0., 0., 0.]);
        let graph = TransitionGraph::build(Some(&matrix), 2).unwrap();
        assert_eq!(graph.num_conditions(), 3);
        assert_eq!(graph.num_transitions(), 2);
        assert_eq!(graph.num_columns(), 2);
        let t = graph.transitions();
        assert_eq!((t[0].source, t[0].target, t[0].column), (0, 2, 0));
        assert_eq!((t[1].source, t[1].target, t[1].column), (0, 1, 1));
        assert_eq!(t[1].index, 1);
    }

    #[test]
    fn invalid_matrices() {
        let not_square = DMatrix::from_element(2, 3, 0.);
        assert!(matches!(
            TransitionGraph::from_matrix(&not_square, 1),
            Err(MadeError::Config(_))
        ));
        let fractional = DMatrix::from_row_slice(2, 2, &[0., 1.5, 0., 0.]);
        assert!(matches!(
            TransitionGraph::from_matrix(&fractional, 2),
            Err(MadeError::Config(_))
        ));
        let negative = DMatrix::from_row_slice(2, 2, &[0., -1., 0., 0.]);
        assert!(matches!(
            TransitionGraph::from_matrix(&negative, 2),
            Err(MadeError::Config(_))
        ));
        let self_loop = DMatrix::from_row_slice(2, 2, &[1., 0., 0., 0.]);
        assert!(matches!(
            TransitionGraph::from_matrix(&self_loop, 2),
            Err(MadeError::Config(_))
        ));
        let empty = DMatrix::from_element(2, 2, 0.);
        assert!(matches!(
            TransitionGraph::from_matrix(&empty, 2),
            Err(MadeError::Config(_))
        ));
        let too_far = DMatrix::from_row_slice(2, 2, &[0., 3., 0., 0.]);
        assert!(matches!(
            TransitionGraph::from_matrix(&too_far, 2),
            Err(MadeError::Shape(_))
        ));
    }
}
