//! Host table value: insertion-ordered named columns of equal length.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::vector::HostVector;
use super::ArithOp;
use crate::error::{Error, Result};

/// The host engine's 2-D table value.
///
/// Columns are dense `f64` buffers keyed by name, all of equal length.
/// Insertion order is preserved and gives columns a stable position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostTable {
    columns: IndexMap<String, Vec<f64>>,
    nrows: usize,
}

impl HostTable {
    /// Reserved constructor-parameter names of the host table type.
    pub const RESERVED_PARAMS: &'static [&'static str] =
        &["data", "index", "columns", "dtype", "copy"];

    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from a column mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the columns differ in length.
    pub fn from_columns(columns: IndexMap<String, Vec<f64>>) -> Result<Self> {
        let mut table = Self::new();
        for (name, values) in columns {
            table.set_column(&name, values)?;
        }
        Ok(table)
    }

    /// Creates a table from a row-major matrix.
    ///
    /// Column names default to `c0..cN` when not provided.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if `data` is not `rows * cols` long
    /// or `names` has the wrong arity.
    pub fn from_matrix(
        rows: usize,
        cols: usize,
        data: &[f64],
        names: Option<Vec<String>>,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::LengthMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        let names = match names {
            Some(names) if names.len() == cols => names,
            Some(names) => {
                return Err(Error::LengthMismatch {
                    expected: cols,
                    actual: names.len(),
                })
            }
            None => (0..cols).map(|c| format!("c{c}")).collect(),
        };
        let mut columns = IndexMap::with_capacity(cols);
        for (c, name) in names.into_iter().enumerate() {
            let values = (0..rows).map(|r| data[r * cols + c]).collect();
            columns.insert(name, values);
        }
        Ok(Self {
            columns,
            nrows: rows,
        })
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table holds no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in insertion order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Returns true if the column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Returns a column's raw buffer.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Returns a column as a host vector named after its key.
    ///
    /// A column's identity name always matches its key.
    #[must_use]
    pub fn column_vector(&self, name: &str) -> Option<HostVector> {
        self.columns
            .get(name)
            .map(|values| HostVector::named(name, values.clone()))
    }

    /// Cell access by row and column position.
    ///
    /// Out-of-range positions read as NaN.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> f64 {
        self.columns
            .get_index(col)
            .and_then(|(_, values)| values.get(row))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Inserts or replaces a column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the buffer length does not match
    /// the table's row count (the first column fixes the row count).
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if self.columns.is_empty() {
            self.nrows = values.len();
        } else if values.len() != self.nrows {
            return Err(Error::LengthMismatch {
                expected: self.nrows,
                actual: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Inserts a column by broadcasting a scalar over the current row count.
    pub fn set_scalar_column(&mut self, name: &str, value: f64) {
        let values = vec![value; self.nrows];
        self.columns.insert(name.to_string(), values);
    }

    /// Removes a column, returning its buffer.
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<f64>> {
        let removed = self.columns.shift_remove(name);
        if self.columns.is_empty() {
            self.nrows = 0;
        }
        removed
    }

    fn map_columns(&self, mut f: impl FnMut(&str, &[f64]) -> Vec<f64>) -> Self {
        let columns: IndexMap<String, Vec<f64>> = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), f(name, values)))
            .collect();
        let nrows = columns.first().map_or(0, |(_, v)| v.len());
        Self { columns, nrows }
    }

    /// First `n` rows.
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.nrows);
        self.map_columns(|_, values| values[..n].to_vec())
    }

    /// Last `n` rows.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let start = self.nrows.saturating_sub(n);
        self.map_columns(|_, values| values[start..].to_vec())
    }

    /// Half-open row slice `[start, end)`, clamped to the row count.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.nrows);
        let start = start.min(end);
        self.map_columns(|_, values| values[start..end].to_vec())
    }

    /// Elementwise arithmetic against a scalar, column by column.
    #[must_use]
    pub fn arith_scalar(&self, op: ArithOp, rhs: f64) -> Self {
        self.map_columns(|_, values| values.iter().map(|&v| op.apply(v, rhs)).collect())
    }

    /// Elementwise arithmetic against another table of the same shape.
    ///
    /// Columns pair up by position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Eval`] on a shape mismatch.
    pub fn arith_table(&self, op: ArithOp, rhs: &Self) -> Result<Self> {
        if self.nrows != rhs.nrows || self.ncols() != rhs.ncols() {
            return Err(Error::Eval(format!(
                "shape mismatch: {}x{} vs {}x{}",
                self.nrows,
                self.ncols(),
                rhs.nrows,
                rhs.ncols()
            )));
        }
        let columns: IndexMap<String, Vec<f64>> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, (name, values))| {
                let other = rhs
                    .columns
                    .get_index(c)
                    .map(|(_, v)| v.as_slice())
                    .unwrap_or(&[]);
                let combined = values
                    .iter()
                    .zip(other)
                    .map(|(&a, &b)| op.apply(a, b))
                    .collect();
                (name.clone(), combined)
            })
            .collect();
        Ok(Self {
            columns,
            nrows: self.nrows,
        })
    }

    /// Elementwise absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        self.map_columns(|_, values| values.iter().map(|v| v.abs()).collect())
    }

    /// Rolling window sum per column; positions before a full window are NaN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the window is zero.
    pub fn rolling_sum(&self, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(Error::InvalidOperation(
                "rolling window must be positive".to_string(),
            ));
        }
        Ok(self.map_columns(|_, values| {
            (0..values.len())
                .map(|i| {
                    if i + 1 < window {
                        f64::NAN
                    } else {
                        values[i + 1 - window..=i].iter().sum()
                    }
                })
                .collect()
        }))
    }

    /// Keeps rows where the mask is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the mask length differs from the
    /// row count.
    pub fn filter_rows(&self, mask: &HostVector) -> Result<Self> {
        if mask.len() != self.nrows {
            return Err(Error::LengthMismatch {
                expected: self.nrows,
                actual: mask.len(),
            });
        }
        Ok(self.map_columns(|_, values| {
            values
                .iter()
                .zip(mask.values())
                .filter(|(_, &m)| m != 0.0)
                .map(|(&v, _)| v)
                .collect()
        }))
    }

    /// Per-column sums in column order.
    #[must_use]
    pub fn column_sums(&self) -> IndexMap<String, f64> {
        self.columns
            .iter()
            .map(|(name, values)| (name.clone(), values.iter().sum()))
            .collect()
    }

    /// Serializes the table into the host engine's opaque payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on encoding failure.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Restores a table from opaque payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on decoding failure.
    pub fn from_payload(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}
