//! Default boxing rule for untyped column reads.
//!
//! When a frame serves a column that was never inserted as a derived value,
//! the frame's [`BoxerRule`] decides how the raw host column comes back. The
//! rule is scoped to the frame that carries it, set through the frame
//! builder; there is no global registration.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::frame::Column;
use crate::host::vector::HostVector;
use crate::meta::MetadataStore;
use crate::series::{ErasedSeries, SeriesClass};

/// How a frame boxes columns with no registered derived class.
///
/// The rule never applies to typed columns; those reconstruct through the
/// column registry regardless of the frame's rule.
#[derive(Clone, Default)]
pub enum BoxerRule {
    /// Serve the bare host column unboxed.
    #[default]
    Identity,
    /// Box into the tagged derived class with empty metadata.
    Class(SeriesClass),
    /// Box through an arbitrary closure.
    Custom(Arc<dyn Fn(HostVector) -> Result<Box<dyn ErasedSeries>> + Send + Sync>),
}

impl fmt::Debug for BoxerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "BoxerRule::Identity"),
            Self::Class(class) => write!(f, "BoxerRule::Class({})", class.name()),
            Self::Custom(_) => write!(f, "BoxerRule::Custom(..)"),
        }
    }
}

impl BoxerRule {
    /// Applies the rule to an untyped host column.
    ///
    /// A misconfigured rule surfaces here, at the first column read that
    /// exercises it, as [`Error::BoxerConfiguration`] naming the column.
    pub(crate) fn apply(&self, column: &str, host: HostVector) -> Result<Column> {
        match self {
            Self::Identity => Ok(Column::Bare(host)),
            Self::Class(class) => match class.construct(host, MetadataStore::for_vector()) {
                Ok(boxed) => Ok(Column::Derived(boxed)),
                Err(err) => {
                    tracing::warn!(column, class = class.name(), %err, "default boxer failed");
                    Err(Error::BoxerConfiguration {
                        column: column.to_string(),
                        message: err.to_string(),
                    })
                }
            },
            Self::Custom(f) => match f(host) {
                Ok(boxed) => Ok(Column::Derived(boxed)),
                Err(err) => {
                    tracing::warn!(column, %err, "custom default boxer failed");
                    Err(Error::BoxerConfiguration {
                        column: column.to_string(),
                        message: err.to_string(),
                    })
                }
            },
        }
    }
}
