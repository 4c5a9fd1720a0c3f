//! Host vector value: a named 1-D `f64` buffer with elementwise kernels.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{ArithOp, CmpOp};
use crate::error::{Error, Result};

/// The host engine's 1-D vector value.
///
/// Carries an optional identity `name` (a table column's vector always has
/// its column key as name) and a dense `f64` buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostVector {
    name: Option<String>,
    values: Vec<f64>,
}

impl HostVector {
    /// Reserved constructor-parameter names of the host vector type.
    ///
    /// Metadata keys on a derived vector must never collide with these.
    pub const RESERVED_PARAMS: &'static [&'static str] =
        &["data", "index", "name", "dtype", "copy"];

    /// Creates an unnamed vector from a raw buffer.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { name: None, values }
    }

    /// Creates a named vector from a raw buffer.
    #[must_use]
    pub fn named(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: Some(name.into()),
            values,
        }
    }

    /// Creates a vector from a raw buffer plus named constructor parameters.
    ///
    /// Only names from [`Self::RESERVED_PARAMS`] are recognized; `name` sets
    /// the identity name, the remaining reserved parameters are accepted for
    /// interface compatibility and ignored by this reference host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFieldValue`] if `name` is not a string.
    pub fn with_params(values: Vec<f64>, params: &IndexMap<String, JsonValue>) -> Result<Self> {
        let mut vector = Self::new(values);
        if let Some(value) = params.get("name") {
            vector.write_name(value)?;
        }
        Ok(vector)
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the vector holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw buffer.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consumes the vector, returning the raw buffer.
    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Returns the identity name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Sets the identity name.
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Reads a host-exposed field by name.
    ///
    /// The reference host exposes a single named slot, `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<JsonValue> {
        match name {
            "name" => Some(
                self.name
                    .as_ref()
                    .map_or(JsonValue::Null, |n| JsonValue::String(n.clone())),
            ),
            _ => None,
        }
    }

    /// Writes a host-exposed field by name.
    ///
    /// Returns `true` if the host recognized (and consumed) the write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFieldValue`] if the value has the wrong shape
    /// for the slot.
    pub fn set_field(&mut self, name: &str, value: &JsonValue) -> Result<bool> {
        match name {
            "name" => {
                self.write_name(value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn write_name(&mut self, value: &JsonValue) -> Result<()> {
        match value {
            JsonValue::Null => {
                self.name = None;
                Ok(())
            }
            JsonValue::String(s) => {
                self.name = Some(s.clone());
                Ok(())
            }
            _ => Err(Error::InvalidFieldValue {
                field: "name".to_string(),
                expected: "string or null",
            }),
        }
    }

    fn like(&self, values: Vec<f64>) -> Self {
        Self {
            name: self.name.clone(),
            values,
        }
    }

    /// First `n` elements.
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.values.len());
        self.like(self.values[..n].to_vec())
    }

    /// Last `n` elements.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let start = self.values.len().saturating_sub(n);
        self.like(self.values[start..].to_vec())
    }

    /// Half-open slice `[start, end)`, clamped to the buffer bounds.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.values.len());
        let start = start.min(end);
        self.like(self.values[start..end].to_vec())
    }

    /// Elementwise arithmetic against a scalar.
    #[must_use]
    pub fn arith_scalar(&self, op: ArithOp, rhs: f64) -> Self {
        self.like(self.values.iter().map(|&v| op.apply(v, rhs)).collect())
    }

    /// Elementwise arithmetic against another vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the buffers differ in length.
    pub fn arith_vector(&self, op: ArithOp, rhs: &Self) -> Result<Self> {
        if self.values.len() != rhs.values.len() {
            return Err(Error::LengthMismatch {
                expected: self.values.len(),
                actual: rhs.values.len(),
            });
        }
        Ok(self.like(
            self.values
                .iter()
                .zip(&rhs.values)
                .map(|(&a, &b)| op.apply(a, b))
                .collect(),
        ))
    }

    /// Elementwise comparison against a scalar, producing a 0/1 mask vector.
    #[must_use]
    pub fn compare_scalar(&self, op: CmpOp, rhs: f64) -> Self {
        self.like(
            self.values
                .iter()
                .map(|&v| if op.apply(v, rhs) { 1.0 } else { 0.0 })
                .collect(),
        )
    }

    /// Keeps elements where the mask is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the mask length differs.
    pub fn filter(&self, mask: &Self) -> Result<Self> {
        if self.values.len() != mask.values.len() {
            return Err(Error::LengthMismatch {
                expected: self.values.len(),
                actual: mask.values.len(),
            });
        }
        Ok(self.like(
            self.values
                .iter()
                .zip(&mask.values)
                .filter(|(_, &m)| m != 0.0)
                .map(|(&v, _)| v)
                .collect(),
        ))
    }

    /// Elementwise selection: `on_true` where the mask is non-zero,
    /// `on_false` elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the three buffers differ in
    /// length.
    pub fn select(mask: &Self, on_true: &Self, on_false: &Self) -> Result<Self> {
        if on_true.len() != mask.len() {
            return Err(Error::LengthMismatch {
                expected: mask.len(),
                actual: on_true.len(),
            });
        }
        if on_false.len() != mask.len() {
            return Err(Error::LengthMismatch {
                expected: mask.len(),
                actual: on_false.len(),
            });
        }
        Ok(mask.like(
            mask.values
                .iter()
                .enumerate()
                .map(|(i, &m)| {
                    if m != 0.0 {
                        on_true.values[i]
                    } else {
                        on_false.values[i]
                    }
                })
                .collect(),
        ))
    }

    /// Elementwise absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        self.like(self.values.iter().map(|v| v.abs()).collect())
    }

    /// Cumulative sum.
    #[must_use]
    pub fn cumsum(&self) -> Self {
        let mut acc = 0.0;
        self.like(
            self.values
                .iter()
                .map(|&v| {
                    acc += v;
                    acc
                })
                .collect(),
        )
    }

    /// First difference; the first element has no predecessor and becomes NaN.
    #[must_use]
    pub fn diff(&self) -> Self {
        self.like(
            self.values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    if i == 0 {
                        f64::NAN
                    } else {
                        v - self.values[i - 1]
                    }
                })
                .collect(),
        )
    }

    /// Shifts elements by `periods` positions, filling vacated slots with NaN.
    #[must_use]
    pub fn shift(&self, periods: i64) -> Self {
        let len = self.values.len() as i64;
        self.like(
            (0..len)
                .map(|i| {
                    let src = i - periods;
                    if src < 0 || src >= len {
                        f64::NAN
                    } else {
                        self.values[src as usize]
                    }
                })
                .collect(),
        )
    }

    /// Relative change against the previous element; first element is NaN.
    #[must_use]
    pub fn pct_change(&self) -> Self {
        self.like(
            self.values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    if i == 0 {
                        f64::NAN
                    } else {
                        v / self.values[i - 1] - 1.0
                    }
                })
                .collect(),
        )
    }

    /// Rolling window sum; positions before a full window are NaN.
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
        Ok(self.like(
            (0..self.values.len())
                .map(|i| {
                    if i + 1 < window {
                        f64::NAN
                    } else {
                        self.values[i + 1 - window..=i].iter().sum()
                    }
                })
                .collect(),
        ))
    }

    /// Sum of all elements.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Arithmetic mean; NaN for an empty vector.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            f64::NAN
        } else {
            self.sum() / self.values.len() as f64
        }
    }

    /// Minimum element; NaN for an empty vector.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::NAN, f64::min)
    }

    /// Maximum element; NaN for an empty vector.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NAN, f64::max)
    }

    /// Serializes the vector into the host engine's opaque payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on encoding failure.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Restores a vector from opaque payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on decoding failure.
    pub fn from_payload(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}
