//! Host-engine capability surface.
//!
//! The wrapper layer consumes the host numeric engine only through this
//! boundary: a named 1-D vector value ([`vector::HostVector`]), an
//! equal-length named-column table value ([`table::HostTable`]), and a fused
//! textual-expression evaluator ([`eval`]). The engine's computational
//! kernels are deliberately minimal; everything above this module is
//! host-agnostic delegation and metadata bookkeeping.

pub mod eval;
pub mod table;
pub mod vector;

#[cfg(test)]
mod table_tests;

use serde::{Deserialize, Serialize};

/// Elementwise binary arithmetic operators supported by the host kernels and
/// the fused-expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Exponentiation.
    Pow,
}

impl ArithOp {
    /// Textual form used by the fused-expression language.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
        }
    }

    /// Applies the operator to a pair of scalars.
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
            Self::Pow => lhs.powf(rhs),
        }
    }
}

/// Elementwise comparison operators.
///
/// Comparisons produce 0/1 mask vectors so their results flow through the
/// same boxing path as arithmetic results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
}

impl CmpOp {
    /// Applies the comparison to a pair of scalars.
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Self::Ne => (lhs - rhs).abs() >= f64::EPSILON,
        }
    }
}
