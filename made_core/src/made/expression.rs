//! Gene by column expression tables and the per gene records derived from them
use std::fmt::{Display, Formatter};

use indexmap::IndexSet;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::made::error::MadeError;

/// Numeric table with named rows (genes) and columns (transitions)
///
/// Shape and values are checked once, on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionMatrix {
    genes: Vec<String>,
    columns: Vec<String>,
    values: DMatrix<f64>,
}

impl ExpressionMatrix {
    /// Create a new table
    ///
    /// # Errors
    /// [`MadeError::Shape`] when the key counts don't match the matrix, gene ids repeat, or a
    /// value isn't finite.
    pub fn new(
        genes: Vec<String>,
        columns: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self, MadeError> {
        if genes.len() != values.nrows() || columns.len() != values.ncols() {
            return Err(MadeError::Shape(format!(
                "{} genes and {} columns given for a {}x{} matrix",
                genes.len(),
                columns.len(),
                values.nrows(),
                values.ncols()
            )));
        }
        let unique: IndexSet<&String> = genes.iter().collect();
        if unique.len() != genes.len() {
            return Err(MadeError::Shape("gene identifiers must be unique".to_string()));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(MadeError::Shape(format!(
                "expression values must be finite, found {bad}"
            )));
        }
        Ok(ExpressionMatrix {
            genes,
            columns,
            values,
        })
    }

    /// Create a table from one row of values per gene, columns are labelled by position
    ///
    /// # Examples
    /// ```rust
    /// use made_core::made::expression::ExpressionMatrix;
    /// let fold_change = ExpressionMatrix::from_rows(
    ///     vec!["b0001".to_string(), "b0002".to_string()],
    ///     vec![vec![1.5, -2.0], vec![0.0, 3.0]],
    /// ).unwrap();
    /// assert_eq!(fold_change.ncols(), 2);
    /// assert_eq!(fold_change.columns()[1], "1");
    /// ```
    pub fn from_rows(genes: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, MadeError> {
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != ncols) {
            return Err(MadeError::Shape("rows must all have the same length".to_string()));
        }
        let values = DMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c]);
        let columns = (0..ncols).map(|c| c.to_string()).collect();
        ExpressionMatrix::new(genes, columns, values)
    }

    /// Table of ones with the same keys as `self`
    pub fn ones_like(&self) -> Self {
        ExpressionMatrix {
            genes: self.genes.clone(),
            columns: self.columns.clone(),
            values: DMatrix::from_element(self.nrows(), self.ncols(), 1f64),
        }
    }

    /// Check that `other` has the same shape and gene keys as `self`
    pub fn check_same_layout(&self, other: &ExpressionMatrix) -> Result<(), MadeError> {
        if self.values.shape() != other.values.shape() {
            return Err(MadeError::Shape(format!(
                "expected a {:?} table, got {:?}",
                self.values.shape(),
                other.values.shape()
            )));
        }
        if self.genes != other.genes {
            return Err(MadeError::Shape(
                "tables must list the same genes in the same order".to_string(),
            ));
        }
        Ok(())
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Value for the gene at `row` in `column`
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.values.get((row, column)).copied()
    }
}

/// Direction of a change in expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increase,
    Decrease,
    Constant,
}

impl Direction {
    /// Direction given by the sign of a fold change
    pub fn from_fold_change(fold_change: f64) -> Direction {
        if fold_change > 0f64 {
            Direction::Increase
        } else if fold_change < 0f64 {
            Direction::Decrease
        } else {
            Direction::Constant
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Increase => write!(f, "increase"),
            Direction::Decrease => write!(f, "decrease"),
            Direction::Constant => write!(f, "constant"),
        }
    }
}

/// Evidence for one gene in one transition
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpressionRecord {
    /// Gene identifier
    pub gene: String,
    /// Fold change as supplied
    pub fold_change: f64,
    /// Direction the gene is pushed towards
    pub direction: Direction,
    /// Signed size of the change on a log scale
    pub magnitude: f64,
    /// Confidence in the direction, zero excludes the gene
    pub weight: f64,
}

impl ExpressionRecord {
    /// Whether the gene takes part in the mismatch objective
    pub fn is_weighted(&self) -> bool {
        self.weight > 0f64
    }
}

/// How the values of a fold change table are read
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FoldChangeScale {
    /// Expression ratios, 1 is no change
    Ratio,
    /// Log ratios, 0 is no change
    Log,
    /// Only the sign matters, used when the weights are supplied as is
    Direction,
}

impl FoldChangeScale {
    /// Direction and signed log magnitude of a fold change
    ///
    /// Ratios are converted to log2, log ratios and direction values are taken as given.
    ///
    /// # Errors
    /// [`MadeError::Numeric`] for a ratio which is not positive.
    pub fn read(self, fold_change: f64) -> Result<(Direction, f64), MadeError> {
        let magnitude = match self {
            FoldChangeScale::Ratio => {
                if !(fold_change > 0f64) {
                    return Err(MadeError::Numeric(format!(
                        "fold change ratios must be positive, got {fold_change} \
                         (set log_fold_change for log ratios)"
                    )));
                }
                fold_change.log2()
            }
            FoldChangeScale::Log | FoldChangeScale::Direction => fold_change,
        };
        Ok((Direction::from_fold_change(magnitude), magnitude))
    }
}
