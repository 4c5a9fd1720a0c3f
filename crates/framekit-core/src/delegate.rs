//! Delegation-core vocabulary shared by derived vector and table types.
//!
//! Instead of intercepting the host surface by reflection, derived types
//! delegate through symbolic operation tags: [`VectorOp`] and [`TableOp`]
//! enumerate the host kernels the wrapper forwards to, and dispatch is
//! compile-time-checked `match` arms, not runtime name lookup. The dynamic
//! by-name surface ([`Resolved`], [`Intercept`]) covers the parts that are
//! genuinely name-keyed: columns, host fields, and metadata entries.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::frame::Column;
use crate::host::table::HostTable;
use crate::host::vector::HostVector;
use crate::host::{ArithOp, CmpOp};

/// Right-hand operand of a delegated vector arithmetic operation.
#[derive(Debug, Clone)]
pub enum ArithOperand {
    /// Scalar broadcast.
    Scalar(f64),
    /// Elementwise against another vector.
    Vector(HostVector),
}

/// Right-hand operand of a delegated table arithmetic operation.
#[derive(Debug, Clone)]
pub enum TableOperand {
    /// Scalar broadcast.
    Scalar(f64),
    /// Elementwise against another table of the same shape.
    Table(HostTable),
}

/// Symbolic tags for delegated vector operations that produce a boxed
/// vector result.
///
/// Scalar reductions are not listed here; they return bare scalars through
/// their own typed accessors and never re-box.
#[derive(Debug, Clone)]
pub enum VectorOp {
    /// First `n` elements.
    Head(usize),
    /// Last `n` elements.
    Tail(usize),
    /// Half-open element slice.
    Slice {
        /// Start index (inclusive).
        start: usize,
        /// End index (exclusive).
        end: usize,
    },
    /// Elementwise absolute value.
    Abs,
    /// Cumulative sum.
    CumSum,
    /// First difference.
    Diff,
    /// Shift by a signed number of positions.
    Shift(i64),
    /// Relative change against the previous element.
    PctChange,
    /// Rolling window sum.
    RollingSum(usize),
    /// Elementwise arithmetic.
    Arith {
        /// Operator.
        op: ArithOp,
        /// Right-hand operand.
        rhs: ArithOperand,
    },
    /// Elementwise comparison producing a 0/1 mask.
    Compare {
        /// Operator.
        op: CmpOp,
        /// Scalar to compare against.
        rhs: f64,
    },
    /// Keep elements where the mask is non-zero.
    Filter(HostVector),
}

/// Symbolic tags for delegated table operations that produce a boxed table
/// result.
#[derive(Debug, Clone)]
pub enum TableOp {
    /// First `n` rows.
    Head(usize),
    /// Last `n` rows.
    Tail(usize),
    /// Half-open row slice.
    Slice {
        /// Start row (inclusive).
        start: usize,
        /// End row (exclusive).
        end: usize,
    },
    /// Elementwise absolute value.
    Abs,
    /// Rolling window sum per column.
    RollingSum(usize),
    /// Elementwise arithmetic.
    Arith {
        /// Operator.
        op: ArithOp,
        /// Right-hand operand.
        rhs: TableOperand,
    },
    /// Keep rows where the mask is non-zero.
    FilterRows(HostVector),
}

/// Forwards a vector operation tag to the matching host kernel.
pub(crate) fn apply_vector(host: &HostVector, op: &VectorOp) -> Result<HostVector> {
    match op {
        VectorOp::Head(n) => Ok(host.head(*n)),
        VectorOp::Tail(n) => Ok(host.tail(*n)),
        VectorOp::Slice { start, end } => Ok(host.slice(*start, *end)),
        VectorOp::Abs => Ok(host.abs()),
        VectorOp::CumSum => Ok(host.cumsum()),
        VectorOp::Diff => Ok(host.diff()),
        VectorOp::Shift(periods) => Ok(host.shift(*periods)),
        VectorOp::PctChange => Ok(host.pct_change()),
        VectorOp::RollingSum(window) => host.rolling_sum(*window),
        VectorOp::Arith { op, rhs } => match rhs {
            ArithOperand::Scalar(v) => Ok(host.arith_scalar(*op, *v)),
            ArithOperand::Vector(other) => host.arith_vector(*op, other),
        },
        VectorOp::Compare { op, rhs } => Ok(host.compare_scalar(*op, *rhs)),
        VectorOp::Filter(mask) => host.filter(mask),
    }
}

/// Forwards a table operation tag to the matching host kernel.
pub(crate) fn apply_table(host: &HostTable, op: &TableOp) -> Result<HostTable> {
    match op {
        TableOp::Head(n) => Ok(host.head(*n)),
        TableOp::Tail(n) => Ok(host.tail(*n)),
        TableOp::Slice { start, end } => Ok(host.slice(*start, *end)),
        TableOp::Abs => Ok(host.abs()),
        TableOp::RollingSum(window) => host.rolling_sum(*window),
        TableOp::Arith { op, rhs } => match rhs {
            TableOperand::Scalar(v) => Ok(host.arith_scalar(*op, *v)),
            TableOperand::Table(other) => host.arith_table(*op, other),
        },
        TableOp::FilterRows(mask) => host.filter_rows(mask),
    }
}

/// Outcome of resolving a dynamic by-name access.
#[derive(Debug)]
pub enum Resolved {
    /// A plain value: metadata entry, host field, or locally declared
    /// attribute.
    Value(JsonValue),
    /// A table column, reconstructed as its registered derived type (or
    /// boxed by the default rule).
    Column(Column),
}

/// Result of the overridable pre-intercept hook (resolution step 2).
///
/// Implementations that override the hook with fallible lookup logic own the
/// obligation to give up promptly for genuinely-absent names: return
/// [`Intercept::Miss`] (or an error) instead of retrying indefinitely, or
/// name resolution would never reach its fail-fast `NameNotFound` outcome.
#[derive(Debug)]
pub enum Intercept {
    /// The hook claimed the name.
    Hit(Resolved),
    /// Not applicable; resolution continues with the next step.
    Miss,
}

/// Splits named constructor parameters into host-reserved parameters and
/// metadata entries.
///
/// Keys found in `reserved` are forwarded to the host constructor; all other
/// keys become metadata.
#[must_use]
pub fn split_reserved(
    params: IndexMap<String, JsonValue>,
    reserved: &[&str],
) -> (IndexMap<String, JsonValue>, IndexMap<String, JsonValue>) {
    let mut host_params = IndexMap::new();
    let mut metadata = IndexMap::new();
    for (key, value) in params {
        if reserved.contains(&key.as_str()) {
            host_params.insert(key, value);
        } else {
            metadata.insert(key, value);
        }
    }
    (host_params, metadata)
}
