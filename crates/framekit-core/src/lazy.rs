//! Deferred-evaluation expression engine.
//!
//! Arithmetic on a [`LazyFrame`] records operations instead of running
//! them. Forcing compiles the recorded stack into one textual expression,
//! binds every table operand to a generated placeholder, and hands the
//! whole thing to the fused evaluator in a single pass, so a chain of N
//! operators costs one evaluation instead of N intermediate tables.

use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::frame::{FrameType, UserFrame};
use crate::host::eval::{self, EvalEnv, EvalResult};
use crate::host::table::HostTable;
use crate::host::ArithOp;
use crate::meta::MetadataStore;

/// One recorded operand of a deferred expression.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Scalar literal.
    Scalar(f64),
    /// A concrete table, shared rather than copied into the record.
    Table(Arc<HostTable>),
    /// Another deferred expression, compiled inline at force time.
    Expr(ExpressionStack),
}

/// A deferred operator, distinguishing which side the recorded operand
/// takes.
///
/// Right-form variants record an expression whose recorded operand is the
/// LEFT side of the operator, which is what a scalar-on-the-left expression
/// like `2.0 - lazy` needs to compile correctly for the non-commutative
/// operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredOp {
    /// Addition, recorded operand on the right.
    Add,
    /// Subtraction, recorded operand on the right.
    Sub,
    /// Multiplication, recorded operand on the right.
    Mul,
    /// Division, recorded operand on the right.
    Div,
    /// Exponentiation, recorded operand on the right.
    Pow,
    /// Addition, recorded operand on the left.
    RAdd,
    /// Subtraction, recorded operand on the left.
    RSub,
    /// Multiplication, recorded operand on the left.
    RMul,
    /// Division, recorded operand on the left.
    RDiv,
    /// Exponentiation, recorded operand on the left.
    RPow,
}

impl DeferredOp {
    /// The underlying arithmetic operator.
    #[must_use]
    pub const fn arith(self) -> ArithOp {
        match self {
            Self::Add | Self::RAdd => ArithOp::Add,
            Self::Sub | Self::RSub => ArithOp::Sub,
            Self::Mul | Self::RMul => ArithOp::Mul,
            Self::Div | Self::RDiv => ArithOp::Div,
            Self::Pow | Self::RPow => ArithOp::Pow,
        }
    }

    /// True if the recorded operand takes the left side.
    #[must_use]
    pub const fn is_right(self) -> bool {
        matches!(
            self,
            Self::RAdd | Self::RSub | Self::RMul | Self::RDiv | Self::RPow
        )
    }
}

#[derive(Debug, Clone)]
struct ExpressionNode {
    operand: Operand,
    /// `None` only on the seed node.
    operator: Option<DeferredOp>,
}

/// An ordered record of operands and operators, compiled left to right with
/// explicit parenthesization at each step.
#[derive(Debug, Clone, Default)]
pub struct ExpressionStack {
    nodes: Vec<ExpressionNode>,
}

impl ExpressionStack {
    fn seed(operand: Operand) -> Self {
        Self {
            nodes: vec![ExpressionNode {
                operand,
                operator: None,
            }],
        }
    }

    fn append(&mut self, op: DeferredOp, operand: Operand) {
        self.nodes.push(ExpressionNode {
            operand,
            operator: Some(op),
        });
    }

    /// Number of recorded nodes, seed included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A deferred table expression with a force cache.
///
/// Every deferred operation returns a new `LazyFrame` holding an extended
/// copy of the stack; the receiver is never mutated, so intermediate
/// expressions can be reused as operands of later ones. Forcing caches the
/// evaluated table and is idempotent.
#[derive(Debug, Clone)]
pub struct LazyFrame {
    stack: ExpressionStack,
    host: Option<HostTable>,
    metadata: MetadataStore,
}

impl LazyFrame {
    /// Starts a deferred expression over a host table.
    #[must_use]
    pub fn over(host: HostTable) -> Self {
        Self {
            stack: ExpressionStack::seed(Operand::Table(Arc::new(host))),
            host: None,
            metadata: MetadataStore::for_table(),
        }
    }

    /// Starts a deferred expression over a derived frame's host table,
    /// carrying the frame's metadata.
    #[must_use]
    pub fn from_frame<F: FrameType>(frame: &F) -> Self {
        Self {
            stack: ExpressionStack::seed(Operand::Table(Arc::new(frame.core().host.clone()))),
            host: None,
            metadata: frame.core().metadata.clone(),
        }
    }

    /// True if the expression has been forced.
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.host.is_some()
    }

    /// The cached forced table, if any.
    #[must_use]
    pub fn host(&self) -> Option<&HostTable> {
        self.host.as_ref()
    }

    /// The metadata the forced frame will carry.
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// The recorded expression stack.
    #[must_use]
    pub fn stack(&self) -> &ExpressionStack {
        &self.stack
    }

    /// Records one more operation, returning a new deferred expression.
    #[must_use]
    pub fn defer(&self, op: DeferredOp, operand: Operand) -> Self {
        let mut stack = self.stack.clone();
        stack.append(op, operand);
        Self {
            stack,
            host: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Compiles the recorded stack into a fused expression and its binding
    /// environment.
    ///
    /// Table operands bind to generated `_tN` placeholders. Compilation
    /// parenthesizes each step explicitly, so operator precedence in the
    /// text cannot reorder the recorded left-to-right application.
    #[must_use]
    pub fn compile(&self) -> (String, EvalEnv) {
        let mut env = EvalEnv::new();
        let mut counter = 0usize;
        let text = compile_stack(&self.stack, &mut env, &mut counter);
        (text, env)
    }

    fn evaluate(&self) -> Result<HostTable> {
        check_finite(&self.stack)?;
        let (text, env) = self.compile();
        tracing::debug!(expr = %text, operands = env.len(), "forcing deferred expression");
        match eval::evaluate(&text, &env)? {
            EvalResult::Matrix { rows, cols, data } => {
                let names = first_table_names(&self.stack).filter(|names| names.len() == cols);
                HostTable::from_matrix(rows, cols, &data, names)
            }
            EvalResult::Vector(values) => HostTable::from_matrix(values.len(), 1, &values, None),
            EvalResult::Scalar(_) => Err(Error::Eval(
                "deferred expression reduced to a scalar".to_string(),
            )),
        }
    }

    /// Forces the expression, caching and returning the evaluated table.
    /// Idempotent: a second call returns the cache without re-evaluating.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Eval`] for shape mismatches between recorded
    /// operands and for non-finite scalar operands, which have no textual
    /// form in the fused expression language.
    pub fn force(&mut self) -> Result<&HostTable> {
        if self.host.is_none() {
            let computed = self.evaluate()?;
            self.host = Some(computed);
        }
        self.host
            .as_ref()
            .ok_or_else(|| Error::Eval("force cache missing".to_string()))
    }

    /// Forces the expression and wraps the result as a derived frame
    /// carrying this expression's metadata.
    ///
    /// # Errors
    ///
    /// See [`Self::force`].
    pub fn into_frame(mut self) -> Result<UserFrame> {
        self.force()?;
        let host = self
            .host
            .take()
            .ok_or_else(|| Error::Eval("force cache missing".to_string()))?;
        Ok(UserFrame::from_parts(host, self.metadata))
    }

    /// Forces the expression and returns the first `n` rows.
    ///
    /// # Errors
    ///
    /// See [`Self::force`].
    pub fn head(&mut self, n: usize) -> Result<HostTable> {
        Ok(self.force()?.head(n))
    }

    /// Forces the expression and returns the last `n` rows.
    ///
    /// # Errors
    ///
    /// See [`Self::force`].
    pub fn tail(&mut self, n: usize) -> Result<HostTable> {
        Ok(self.force()?.tail(n))
    }

    /// Defers elementwise exponentiation by a scalar.
    #[must_use]
    pub fn pow(&self, exponent: f64) -> Self {
        self.defer(DeferredOp::Pow, Operand::Scalar(exponent))
    }

    fn as_operand(&self) -> Operand {
        match &self.host {
            Some(host) => Operand::Table(Arc::new(host.clone())),
            None => Operand::Expr(self.stack.clone()),
        }
    }
}

fn compile_stack(stack: &ExpressionStack, env: &mut EvalEnv, counter: &mut usize) -> String {
    let mut acc = String::new();
    for (i, node) in stack.nodes.iter().enumerate() {
        let text = operand_text(&node.operand, env, counter);
        if i == 0 {
            acc = text;
            continue;
        }
        let Some(op) = node.operator else {
            debug_assert!(false, "non-seed node without operator");
            continue;
        };
        let sym = op.arith().symbol();
        acc = if op.is_right() {
            format!("({text} {sym} {acc})")
        } else {
            format!("({acc} {sym} {text})")
        };
    }
    acc
}

fn operand_text(operand: &Operand, env: &mut EvalEnv, counter: &mut usize) -> String {
    match operand {
        Operand::Scalar(v) => format!("{v:?}"),
        Operand::Table(table) => {
            let name = format!("_t{counter}");
            *counter += 1;
            env.bind_table(&name, Arc::clone(table));
            name
        }
        Operand::Expr(stack) => format!("({})", compile_stack(stack, env, counter)),
    }
}

/// Non-finite scalars compile to text the expression grammar reads as an
/// identifier, so they are rejected before compilation with a clear error.
fn check_finite(stack: &ExpressionStack) -> Result<()> {
    for node in &stack.nodes {
        match &node.operand {
            Operand::Scalar(v) if !v.is_finite() => {
                return Err(Error::Eval(format!("non-finite scalar operand {v}")));
            }
            Operand::Expr(sub) => check_finite(sub)?,
            Operand::Scalar(_) | Operand::Table(_) => {}
        }
    }
    Ok(())
}

fn first_table_names(stack: &ExpressionStack) -> Option<Vec<String>> {
    for node in &stack.nodes {
        match &node.operand {
            Operand::Table(table) => return Some(table.column_names()),
            Operand::Expr(sub) => {
                if let Some(names) = first_table_names(sub) {
                    return Some(names);
                }
            }
            Operand::Scalar(_) => {}
        }
    }
    None
}

macro_rules! lazy_scalar_op {
    ($trait:ident, $method:ident, $op:expr, $rop:expr) => {
        impl $trait<f64> for &LazyFrame {
            type Output = LazyFrame;

            fn $method(self, rhs: f64) -> LazyFrame {
                self.defer($op, Operand::Scalar(rhs))
            }
        }

        impl $trait<f64> for LazyFrame {
            type Output = LazyFrame;

            fn $method(self, rhs: f64) -> LazyFrame {
                (&self).$method(rhs)
            }
        }

        impl $trait<&LazyFrame> for f64 {
            type Output = LazyFrame;

            fn $method(self, rhs: &LazyFrame) -> LazyFrame {
                rhs.defer($rop, Operand::Scalar(self))
            }
        }

        impl $trait<&LazyFrame> for &LazyFrame {
            type Output = LazyFrame;

            fn $method(self, rhs: &LazyFrame) -> LazyFrame {
                self.defer($op, rhs.as_operand())
            }
        }
    };
}

lazy_scalar_op!(Add, add, DeferredOp::Add, DeferredOp::RAdd);
lazy_scalar_op!(Sub, sub, DeferredOp::Sub, DeferredOp::RSub);
lazy_scalar_op!(Mul, mul, DeferredOp::Mul, DeferredOp::RMul);
lazy_scalar_op!(Div, div, DeferredOp::Div, DeferredOp::RDiv);
