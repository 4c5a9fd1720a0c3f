//! Fused-expression evaluator.
//!
//! Accepts a textual arithmetic expression plus a name → value binding
//! environment and produces a raw scalar, 1-D, or 2-D numeric result in a
//! single pass over memory. This is the host capability the lazy engine
//! compiles deferred expression stacks into: one fused evaluation instead of
//! one intermediate buffer per operator.

mod error;
mod parser;


pub use error::{ParseError, ParseErrorKind};
pub use parser::{parse, Expr};

use std::sync::Arc;

use indexmap::IndexMap;

use super::table::HostTable;
use super::vector::HostVector;
use crate::error::{Error, Result};
use crate::host::ArithOp;

/// A single bound operand in the evaluation environment.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Scalar operand.
    Scalar(f64),
    /// 1-D operand.
    Vector(Arc<HostVector>),
    /// 2-D operand.
    Table(Arc<HostTable>),
}

/// Name → operand binding environment for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalEnv {
    bindings: IndexMap<String, Binding>,
}

impl EvalEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a scalar operand.
    pub fn bind_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.bindings.insert(name.into(), Binding::Scalar(value));
    }

    /// Binds a 1-D operand.
    pub fn bind_vector(&mut self, name: impl Into<String>, vector: Arc<HostVector>) {
        self.bindings.insert(name.into(), Binding::Vector(vector));
    }

    /// Binds a 2-D operand.
    pub fn bind_table(&mut self, name: impl Into<String>, table: Arc<HostTable>) {
        self.bindings.insert(name.into(), Binding::Table(table));
    }

    /// Looks up a binding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Returns true if the name is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no names are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Raw result of a fused evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// All operands were scalars.
    Scalar(f64),
    /// 1-D result.
    Vector(Vec<f64>),
    /// 2-D row-major result.
    Matrix {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
        /// Row-major cell data, `rows * cols` long.
        data: Vec<f64>,
    },
}

/// Expression tree with placeholders resolved against an environment.
enum Bound {
    Const(f64),
    Vector(Arc<HostVector>),
    Table(Arc<HostTable>),
    Binary {
        op: ArithOp,
        lhs: Box<Bound>,
        rhs: Box<Bound>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Scalar,
    Vector(usize),
    Matrix { rows: usize, cols: usize },
}

/// Evaluates a fused arithmetic expression against a binding environment.
///
/// All non-scalar operands must agree in shape; scalars broadcast. The
/// result is produced in one pass, evaluating the whole tree per output
/// cell.
///
/// # Errors
///
/// Returns [`Error::Eval`] for syntax errors, unbound placeholders, and
/// shape mismatches.
pub fn evaluate(input: &str, env: &EvalEnv) -> Result<EvalResult> {
    tracing::debug!(expr = %input, bindings = env.len(), "evaluating fused expression");

    let ast = parse(input)?;
    let bound = bind(&ast, env)?;
    let shape = infer_shape(&bound)?;

    match shape {
        Shape::Scalar => Ok(EvalResult::Scalar(cell(&bound, 0, 0))),
        Shape::Vector(len) => {
            let data = (0..len).map(|i| cell(&bound, i, 0)).collect();
            Ok(EvalResult::Vector(data))
        }
        Shape::Matrix { rows, cols } => {
            let mut data = Vec::with_capacity(rows * cols);
            for r in 0..rows {
                for c in 0..cols {
                    data.push(cell(&bound, r, c));
                }
            }
            Ok(EvalResult::Matrix { rows, cols, data })
        }
    }
}

fn bind(expr: &Expr, env: &EvalEnv) -> Result<Bound> {
    match expr {
        Expr::Number(v) => Ok(Bound::Const(*v)),
        Expr::Ident(name) => match env.get(name) {
            Some(Binding::Scalar(v)) => Ok(Bound::Const(*v)),
            Some(Binding::Vector(v)) => Ok(Bound::Vector(Arc::clone(v))),
            Some(Binding::Table(t)) => Ok(Bound::Table(Arc::clone(t))),
            None => Err(Error::Eval(format!("unbound placeholder '{name}'"))),
        },
        Expr::Binary { op, lhs, rhs } => Ok(Bound::Binary {
            op: *op,
            lhs: Box::new(bind(lhs, env)?),
            rhs: Box::new(bind(rhs, env)?),
        }),
    }
}

fn infer_shape(bound: &Bound) -> Result<Shape> {
    match bound {
        Bound::Const(_) => Ok(Shape::Scalar),
        Bound::Vector(v) => Ok(Shape::Vector(v.len())),
        Bound::Table(t) => Ok(Shape::Matrix {
            rows: t.nrows(),
            cols: t.ncols(),
        }),
        Bound::Binary { lhs, rhs, .. } => {
            let left = infer_shape(lhs)?;
            let right = infer_shape(rhs)?;
            merge_shapes(left, right)
        }
    }
}

fn merge_shapes(left: Shape, right: Shape) -> Result<Shape> {
    match (left, right) {
        (Shape::Scalar, other) | (other, Shape::Scalar) => Ok(other),
        (a, b) if a == b => Ok(a),
        (a, b) => Err(Error::Eval(format!(
            "operand shape mismatch: {a:?} vs {b:?}"
        ))),
    }
}

fn cell(bound: &Bound, row: usize, col: usize) -> f64 {
    match bound {
        Bound::Const(v) => *v,
        Bound::Vector(v) => v.values().get(row).copied().unwrap_or(f64::NAN),
        Bound::Table(t) => t.cell(row, col),
        Bound::Binary { op, lhs, rhs } => op.apply(cell(lhs, row, col), cell(rhs, row, col)),
    }
}
