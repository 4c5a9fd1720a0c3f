//! # `framekit` Core
//!
//! Identity-preserving wrapper layer over a host numeric engine.
//!
//! `framekit` lets user-defined vector and table types ride on top of the
//! host engine's values: operations delegate to the host, results come back
//! boxed as the user's type, and per-instance metadata propagates by value
//! through every delegated operation. A deferred-evaluation engine records
//! arithmetic chains and forces them through a fused expression evaluator in
//! a single pass.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use framekit_core::{SeriesDelegate, UserFrame, UserSeries};
//! use serde_json::json;
//!
//! // A derived vector that keeps its type and metadata through operations.
//! let mut prices = UserSeries::named("price", vec![10.0, 11.0, 9.5]);
//! prices.set_attr("venue", json!("NYSE"))?;
//! let changes = prices.pct_change()?;
//! assert_eq!(changes.get_attr("venue")?, json!("NYSE"));
//!
//! // A frame that remembers each typed column's class and metadata.
//! let mut frame = UserFrame::new();
//! frame.insert_column("price", prices)?;
//! let back: UserSeries = frame.column("price")?;
//!
//! // Deferred arithmetic: one fused evaluation for the whole chain.
//! let lazy = frame.lazy();
//! let mut expr = &(&lazy * &lazy) + 1.0;
//! let result = expr.force()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // len -> f64 for means and masks
#![allow(clippy::cast_possible_wrap)] // len -> i64 for signed shifts
#![allow(clippy::cast_sign_loss)] // bounds-checked i64 -> usize indexing
#![allow(clippy::cast_possible_truncation)]

pub mod boxer;
pub mod delegate;
pub mod error;
pub mod frame;
pub mod host;
pub mod lazy;
pub mod meta;
pub mod registry;
pub mod series;
pub mod snapshot;

#[cfg(test)]
mod lazy_tests;
#[cfg(test)]
mod series_tests;
#[cfg(test)]
mod snapshot_tests;

pub use boxer::BoxerRule;
pub use delegate::{ArithOperand, Intercept, Resolved, TableOp, TableOperand, VectorOp};
pub use error::{Error, Result};
pub use frame::{
    default_column_intercept, read_column, Column, FrameBuilder, FrameCore, FrameDelegate,
    FrameType, UserFrame,
};
pub use host::eval::{evaluate, EvalEnv, EvalResult};
pub use host::table::HostTable;
pub use host::vector::HostVector;
pub use host::{ArithOp, CmpOp};
pub use lazy::{DeferredOp, ExpressionStack, LazyFrame, Operand};
pub use meta::MetadataStore;
pub use registry::{ColumnRegistry, SeriesRegistry};
pub use series::{
    where_select, ErasedSeries, SeriesClass, SeriesDelegate, SeriesType, UserSeries,
};
pub use snapshot::{
    read_snapshot, restore_frame, restore_series, save_frame, save_series, write_snapshot,
    ColumnSnapshot, FrameSnapshot, SeriesSnapshot, SCHEMA_VERSION,
};
