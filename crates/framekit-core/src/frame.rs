//! Derived table types: identity-preserving delegation over a host table,
//! plus the typed-column machinery.
//!
//! A derived table implements [`FrameType`]; the blanket [`FrameDelegate`]
//! extension provides the delegated host surface, column reads that
//! reconstruct each column's recorded derived type, and by-value metadata
//! propagation. [`FrameBuilder`] assembles a frame from mixed column kinds
//! and scopes a default boxing rule to the built frame.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::boxer::BoxerRule;
use crate::delegate::{self, Intercept, Resolved, TableOp, TableOperand};
use crate::error::{Error, Result};
use crate::host::table::HostTable;
use crate::host::vector::HostVector;
use crate::host::ArithOp;
use crate::lazy::LazyFrame;
use crate::meta::MetadataStore;
use crate::registry::ColumnRegistry;
use crate::series::{ErasedSeries, SeriesClass, SeriesType};

/// Shared state of every derived table: the wrapped host table, frame
/// metadata, the typed-column registry, and the frame-scoped default boxing
/// rule.
#[derive(Debug, Clone)]
pub struct FrameCore {
    /// Wrapped host table.
    pub host: HostTable,
    /// Frame-level metadata.
    pub metadata: MetadataStore,
    /// Record of typed columns.
    pub registry: ColumnRegistry,
    /// Boxing rule for untyped column reads.
    pub boxer: BoxerRule,
}

impl FrameCore {
    /// Creates an empty core with identity boxing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: HostTable::new(),
            metadata: MetadataStore::for_table(),
            registry: ColumnRegistry::new(),
            boxer: BoxerRule::Identity,
        }
    }
}

impl Default for FrameCore {
    fn default() -> Self {
        Self::new()
    }
}

/// A derived table type over a [`HostTable`].
pub trait FrameType: Sized + 'static {
    /// Stable class name used by snapshots.
    const CLASS_NAME: &'static str;

    /// Reconstructs an instance from a core.
    ///
    /// # Errors
    ///
    /// Implementations may reject cores they cannot represent.
    fn from_core(core: FrameCore) -> Result<Self>;

    /// The shared frame state.
    fn core(&self) -> &FrameCore;

    /// Mutable access to the shared frame state.
    fn core_mut(&mut self) -> &mut FrameCore;

    /// Pre-intercept hook: may claim a dynamic name before any other
    /// resolution step. The default serves columns; an overriding hook with
    /// fallible lookup logic owns the obligation to give up promptly for
    /// genuinely-absent names (see [`Intercept`]).
    ///
    /// # Errors
    ///
    /// Propagates column reconstruction failures.
    fn intercept(&self, name: &str) -> Result<Intercept> {
        default_column_intercept(self.core(), name)
    }

    /// Locally declared dynamic attributes (resolution step 3).
    fn local_attr(&self, _name: &str) -> Option<JsonValue> {
        None
    }
}

/// A column served by a frame: either the bare host vector or a
/// reconstructed derived value.
pub enum Column {
    /// Untyped column under identity boxing.
    Bare(HostVector),
    /// Column reconstructed as its recorded (or default-boxed) derived type.
    Derived(Box<dyn ErasedSeries>),
}

impl Column {
    /// The column's host vector, named after its key.
    #[must_use]
    pub fn host(&self) -> &HostVector {
        match self {
            Self::Bare(host) => host,
            Self::Derived(series) => series.host(),
        }
    }

    /// Class name of the served value; bare columns report the host type.
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Bare(_) => "HostVector",
            Self::Derived(series) => series.class_name(),
        }
    }

    /// The column's metadata, if it carries a derived value.
    #[must_use]
    pub fn metadata(&self) -> Option<&MetadataStore> {
        match self {
            Self::Bare(_) => None,
            Self::Derived(series) => Some(series.metadata()),
        }
    }

    /// Downcasts the column to a concrete derived type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassMismatch`] naming the stored class if the
    /// column holds anything else.
    pub fn into_typed<T: SeriesType>(self, name: &str) -> Result<T> {
        match self {
            Self::Bare(_) => Err(Error::ClassMismatch {
                name: name.to_string(),
                requested: T::CLASS_NAME,
                actual: "HostVector".to_string(),
            }),
            Self::Derived(series) => {
                let actual = series.class_name();
                series
                    .into_any()
                    .downcast::<T>()
                    .map(|boxed| *boxed)
                    .map_err(|_| Error::ClassMismatch {
                        name: name.to_string(),
                        requested: T::CLASS_NAME,
                        actual: actual.to_string(),
                    })
            }
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(host) => f.debug_tuple("Column::Bare").field(host).finish(),
            Self::Derived(series) => f
                .debug_struct("Column::Derived")
                .field("class", &series.class_name())
                .field("host", series.host())
                .finish(),
        }
    }
}

/// Reads a column out of a core, reconstructing its recorded derived type.
///
/// A typed column rebuilds from its registered class with the metadata
/// snapshot taken at insertion (entries a custom constructor consumed are
/// re-applied afterwards). An untyped column goes through the frame's
/// default boxing rule.
///
/// # Errors
///
/// Returns [`Error::NameNotFound`] for a missing column and propagates
/// reconstruction and boxing failures.
pub fn read_column(core: &FrameCore, name: &str) -> Result<Column> {
    let host = core
        .host
        .column_vector(name)
        .ok_or_else(|| Error::NameNotFound(name.to_string()))?;

    if let Some(class) = core.registry.class(name) {
        let snapshot = core
            .registry
            .metadata(name)
            .cloned()
            .unwrap_or_else(MetadataStore::for_vector);
        let mut series = class.construct(host, snapshot.clone())?;
        for (key, value) in snapshot.iter() {
            if !series.metadata().contains(key) && series.local_attr(key).is_none() {
                series.metadata_mut().insert(key.clone(), value.clone())?;
            }
        }
        return Ok(Column::Derived(series));
    }

    core.boxer.apply(name, host)
}

/// Default pre-intercept hook for frames: serves columns, misses otherwise.
///
/// Misses fast when the name is neither a registered nor a stored column, so
/// resolution falls through to the remaining steps instead of erroring here.
///
/// # Errors
///
/// Propagates column reconstruction failures.
pub fn default_column_intercept(core: &FrameCore, name: &str) -> Result<Intercept> {
    if !core.registry.contains(name) && !core.host.has_column(name) {
        return Ok(Intercept::Miss);
    }
    Ok(Intercept::Hit(Resolved::Column(read_column(core, name)?)))
}

/// Delegated operations for every [`FrameType`].
///
/// Blanket extension; an inherent method of the same name on the
/// implementing type shadows the delegated one.
pub trait FrameDelegate: FrameType {
    /// The wrapped host table.
    fn host(&self) -> &HostTable {
        &self.core().host
    }

    /// The frame's metadata store.
    fn metadata(&self) -> &MetadataStore {
        &self.core().metadata
    }

    /// Mutable access to the frame's metadata store.
    fn metadata_mut(&mut self) -> &mut MetadataStore {
        &mut self.core_mut().metadata
    }

    /// The frame's typed-column registry.
    fn registry(&self) -> &ColumnRegistry {
        &self.core().registry
    }

    /// Delegates an operation to the host kernel and boxes the result back
    /// into the declared type with the source's metadata, registry, and
    /// boxing rule.
    ///
    /// # Errors
    ///
    /// Propagates host kernel and reconstruction failures.
    fn delegate(&self, op: &TableOp) -> Result<Self> {
        let result = delegate::apply_table(&self.core().host, op)?;
        self.rebox(result)
    }

    /// Boxes a bare host result into the declared type, carrying the frame
    /// state across by value.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn rebox(&self, host: HostTable) -> Result<Self> {
        let mut core = self.core().clone();
        core.host = host;
        let source_meta = self.core().metadata.clone();
        let mut rebuilt = Self::from_core(core)?;
        for (key, value) in source_meta.iter() {
            if !rebuilt.core().metadata.contains(key) {
                rebuilt
                    .core_mut()
                    .metadata
                    .insert(key.clone(), value.clone())?;
            }
        }
        Ok(rebuilt)
    }

    /// Reads a column without committing to a concrete derived type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameNotFound`] for a missing column.
    fn column_dyn(&self, name: &str) -> Result<Column> {
        read_column(self.core(), name)
    }

    /// Reads a column as a concrete derived type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassMismatch`] if the column holds another class.
    fn column<T: SeriesType>(&self, name: &str) -> Result<T> {
        self.column_dyn(name)?.into_typed(name)
    }

    /// Inserts a derived value as a typed column.
    ///
    /// The column's identity name becomes the key regardless of what the
    /// value was named before. The registry records the value's exported
    /// metadata (see [`SeriesType::export_meta`]), so keys a custom
    /// constructor consumed are captured too. Validation runs before any
    /// mutation; a failed insert leaves the frame unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the value's length does not
    /// match the frame's row count.
    fn insert_column<S: SeriesType>(&mut self, name: &str, series: S) -> Result<()> {
        let metadata = series.export_meta()?;
        let values = series.host().values().to_vec();
        self.core_mut().host.set_column(name, values)?;
        self.core_mut()
            .registry
            .record(name, SeriesClass::of::<S>(), metadata);
        Ok(())
    }

    /// Inserts a raw buffer as an untyped column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] on a row-count mismatch.
    fn insert_values(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.core_mut().host.set_column(name, values)?;
        self.core_mut().registry.remove(name);
        Ok(())
    }

    /// Inserts a scalar broadcast over the frame's row count as an untyped
    /// column.
    fn insert_scalar(&mut self, name: &str, value: f64) {
        self.core_mut().host.set_scalar_column(name, value);
        self.core_mut().registry.remove(name);
    }

    /// Removes a column and its typed-column record together.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameNotFound`] if the column does not exist.
    fn remove_column(&mut self, name: &str) -> Result<()> {
        if self.core_mut().host.remove_column(name).is_none() {
            return Err(Error::NameNotFound(name.to_string()));
        }
        self.core_mut().registry.remove(name);
        Ok(())
    }

    /// Resolves a dynamic by-name read.
    ///
    /// Resolution order: pre-intercept hook (columns, by default), locally
    /// declared attributes, frame metadata. Bookkeeping members (the host
    /// reference, the registry, the delegation entry points) are plain
    /// accessors and never enter this path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameNotFound`] if nothing claims the name.
    fn resolve(&self, name: &str) -> Result<Resolved> {
        match self.intercept(name)? {
            Intercept::Hit(resolved) => return Ok(resolved),
            Intercept::Miss => {}
        }
        if let Some(value) = self.local_attr(name) {
            return Ok(Resolved::Value(value));
        }
        if let Some(value) = self.core().metadata.get(name) {
            return Ok(Resolved::Value(value.clone()));
        }
        Err(Error::NameNotFound(name.to_string()))
    }

    /// Resolves a dynamic by-name read that must be a plain value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the name resolves to a column.
    fn get_attr(&self, name: &str) -> Result<JsonValue> {
        match self.resolve(name)? {
            Resolved::Value(value) => Ok(value),
            Resolved::Column(_) => Err(Error::InvalidOperation(format!(
                "'{name}' is a column; read it through column()"
            ))),
        }
    }

    /// Resolves a dynamic by-name write.
    ///
    /// An existing metadata key updates in place; otherwise the name becomes
    /// a new metadata entry, subject to the reserved-name check. Column
    /// names are rejected: resolution serves columns before metadata, so a
    /// metadata entry shadowed by a column could never be read back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] for a column name and
    /// [`Error::ReservedKey`] for reserved names.
    fn set_attr(&mut self, name: &str, value: JsonValue) -> Result<()> {
        if self.core().registry.contains(name) || self.core().host.has_column(name) {
            return Err(Error::InvalidOperation(format!(
                "'{name}' is a column; metadata cannot shadow it"
            )));
        }
        self.core_mut().metadata.insert(name, value)
    }

    /// First `n` rows.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn head(&self, n: usize) -> Result<Self> {
        self.delegate(&TableOp::Head(n))
    }

    /// Last `n` rows.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn tail(&self, n: usize) -> Result<Self> {
        self.delegate(&TableOp::Tail(n))
    }

    /// Half-open row slice.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn slice(&self, start: usize, end: usize) -> Result<Self> {
        self.delegate(&TableOp::Slice { start, end })
    }

    /// Elementwise absolute value.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn abs(&self) -> Result<Self> {
        self.delegate(&TableOp::Abs)
    }

    /// Rolling window sum per column.
    ///
    /// # Errors
    ///
    /// Fails for a zero window.
    fn rolling_sum(&self, window: usize) -> Result<Self> {
        self.delegate(&TableOp::RollingSum(window))
    }

    /// Keep rows where the mask is non-zero.
    ///
    /// # Errors
    ///
    /// Fails on mask length mismatch.
    fn filter_rows(&self, mask: &HostVector) -> Result<Self> {
        self.delegate(&TableOp::FilterRows(mask.clone()))
    }

    /// Elementwise arithmetic.
    ///
    /// # Errors
    ///
    /// Fails on operand shape mismatch.
    fn arith(&self, op: ArithOp, rhs: TableOperand) -> Result<Self> {
        self.delegate(&TableOp::Arith { op, rhs })
    }

    /// Per-column sums in column order.
    fn column_sums(&self) -> IndexMap<String, f64> {
        self.core().host.column_sums()
    }

    /// Number of rows.
    fn nrows(&self) -> usize {
        self.core().host.nrows()
    }

    /// Number of columns.
    fn ncols(&self) -> usize {
        self.core().host.ncols()
    }

    /// Starts a deferred-evaluation expression over this frame's host table.
    fn lazy(&self) -> LazyFrame {
        LazyFrame::from_frame(self)
    }
}

impl<T: FrameType> FrameDelegate for T {}

/// The base derived table type.
#[derive(Debug, Clone)]
pub struct UserFrame {
    core: FrameCore,
}

impl UserFrame {
    /// Creates an empty frame with identity boxing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: FrameCore::new(),
        }
    }

    /// Wraps an existing host table with empty metadata.
    #[must_use]
    pub fn from_host(host: HostTable) -> Self {
        let mut core = FrameCore::new();
        core.host = host;
        Self { core }
    }

    /// Wraps an existing host table with the given metadata.
    #[must_use]
    pub fn from_parts(host: HostTable, metadata: MetadataStore) -> Self {
        let mut core = FrameCore::new();
        core.host = host;
        core.metadata = metadata;
        Self { core }
    }

    /// Starts a frame builder.
    #[must_use]
    pub fn builder() -> FrameBuilder {
        FrameBuilder::new()
    }
}

impl Default for UserFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameType for UserFrame {
    const CLASS_NAME: &'static str = "UserFrame";

    fn from_core(core: FrameCore) -> Result<Self> {
        Ok(Self { core })
    }

    fn core(&self) -> &FrameCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FrameCore {
        &mut self.core
    }
}

macro_rules! user_frame_scalar_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<f64> for &UserFrame {
            type Output = UserFrame;

            fn $method(self, rhs: f64) -> UserFrame {
                let mut core = self.core.clone();
                core.host = self.core.host.arith_scalar($op, rhs);
                UserFrame { core }
            }
        }
    };
}

user_frame_scalar_op!(Add, add, ArithOp::Add);
user_frame_scalar_op!(Sub, sub, ArithOp::Sub);
user_frame_scalar_op!(Mul, mul, ArithOp::Mul);
user_frame_scalar_op!(Div, div, ArithOp::Div);

enum PendingColumn {
    Derived {
        name: String,
        class: SeriesClass,
        series: Box<dyn ErasedSeries>,
    },
    Values {
        name: String,
        values: Vec<f64>,
    },
    Scalar {
        name: String,
        value: f64,
    },
}

/// Assembles a frame from mixed column kinds.
///
/// Columns land in declaration order. Scalars broadcast over the row count
/// fixed by the first non-scalar column; a builder holding only scalars has
/// no row count and fails to build. The builder is also where a frame's
/// default boxing rule is chosen.
#[derive(Default)]
pub struct FrameBuilder {
    columns: Vec<PendingColumn>,
    metadata: Vec<(String, JsonValue)>,
    boxer: BoxerRule,
}

impl FrameBuilder {
    /// Creates an empty builder with identity boxing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a derived value as a typed column.
    #[must_use]
    pub fn column<S: SeriesType>(mut self, name: impl Into<String>, series: S) -> Self {
        self.columns.push(PendingColumn::Derived {
            name: name.into(),
            class: SeriesClass::of::<S>(),
            series: Box::new(series),
        });
        self
    }

    /// Adds a raw buffer as an untyped column.
    #[must_use]
    pub fn values(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.push(PendingColumn::Values {
            name: name.into(),
            values,
        });
        self
    }

    /// Adds a scalar column, broadcast over the frame's row count.
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.columns.push(PendingColumn::Scalar {
            name: name.into(),
            value,
        });
        self
    }

    /// Adds a frame metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.push((key.into(), value));
        self
    }

    /// Sets the frame's default boxing rule for untyped column reads.
    #[must_use]
    pub fn boxer(mut self, rule: BoxerRule) -> Self {
        self.boxer = rule;
        self
    }

    /// Builds the frame as the base derived table type.
    ///
    /// # Errors
    ///
    /// See [`Self::build_as`].
    pub fn build(self) -> Result<UserFrame> {
        self.build_as()
    }

    /// Builds the frame as any derived table type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] for a scalar-only builder,
    /// [`Error::LengthMismatch`] for columns of uneven length, and
    /// [`Error::ReservedKey`] for reserved metadata keys.
    pub fn build_as<F: FrameType>(self) -> Result<F> {
        let nrows = self.columns.iter().find_map(|pending| match pending {
            PendingColumn::Derived { series, .. } => Some(series.host().len()),
            PendingColumn::Values { values, .. } => Some(values.len()),
            PendingColumn::Scalar { .. } => None,
        });
        let nrows = match nrows {
            Some(n) => n,
            None if self.columns.is_empty() => 0,
            None => {
                return Err(Error::InvalidOperation(
                    "a frame of only scalar columns has no row count".to_string(),
                ))
            }
        };

        tracing::debug!(columns = self.columns.len(), nrows, "building frame");

        let mut core = FrameCore::new();
        core.boxer = self.boxer;
        for (key, value) in self.metadata {
            core.metadata.insert(key, value)?;
        }
        for pending in self.columns {
            match pending {
                PendingColumn::Derived {
                    name,
                    class,
                    series,
                } => {
                    core.host
                        .set_column(&name, series.host().values().to_vec())?;
                    core.registry.record(name, class, series.export_meta()?);
                }
                PendingColumn::Values { name, values } => {
                    core.host.set_column(&name, values)?;
                }
                PendingColumn::Scalar { name, value } => {
                    core.host.set_column(&name, vec![value; nrows])?;
                }
            }
        }
        F::from_core(core)
    }
}
