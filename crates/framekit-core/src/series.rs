//! Derived vector types: identity-preserving delegation over a host vector.
//!
//! A derived vector type implements [`SeriesType`]; the blanket
//! [`SeriesDelegate`] extension then provides every delegated operation with
//! boxing back into the declared type and by-value metadata propagation, so
//! `bob.tail(3)` on a `BobSeries` is a `BobSeries` carrying `bob`'s
//! metadata.

use std::any::{Any, TypeId};
use std::ops::{Add, Div, Mul, Sub};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::delegate::{self, ArithOperand, Intercept, Resolved, VectorOp};
use crate::error::{Error, Result};
use crate::host::vector::HostVector;
use crate::host::{ArithOp, CmpOp};
use crate::meta::MetadataStore;

/// A derived vector type over a [`HostVector`].
///
/// Implementations own a host vector and a metadata store and reconstruct
/// themselves from those two parts. `from_parts` receives the full metadata
/// of the source instance when a result is boxed, so a custom constructor
/// can consume the keys it recognizes; any key it drops from the store is
/// defensively re-applied by the boxing path.
pub trait SeriesType: Sized + 'static {
    /// Stable class name used by the column registry and snapshots.
    const CLASS_NAME: &'static str;

    /// Reconstructs an instance from a host vector and metadata.
    ///
    /// # Errors
    ///
    /// Implementations may reject metadata they require but cannot find.
    fn from_parts(host: HostVector, metadata: MetadataStore) -> Result<Self>;

    /// The wrapped host vector.
    fn host(&self) -> &HostVector;

    /// Mutable access to the wrapped host vector.
    fn host_mut(&mut self) -> &mut HostVector;

    /// The attached metadata store.
    fn metadata(&self) -> &MetadataStore;

    /// Mutable access to the attached metadata store.
    fn metadata_mut(&mut self) -> &mut MetadataStore;

    /// The metadata offered to the constructor whenever a result is boxed.
    ///
    /// Types whose `from_parts` consumes keys into typed fields override
    /// this to put those entries back, so consumed keys survive delegation,
    /// column insertion, and snapshots. The default exports the store as
    /// held.
    ///
    /// # Errors
    ///
    /// An overriding implementation may fail re-inserting an entry.
    fn export_meta(&self) -> Result<MetadataStore> {
        Ok(self.metadata().clone())
    }

    /// Pre-intercept hook: may claim a dynamic name before any other
    /// resolution step. See [`Intercept`] for the give-up obligation of
    /// fallible overrides.
    ///
    /// # Errors
    ///
    /// An overriding hook may fail resolution outright.
    fn intercept(&self, _name: &str) -> Result<Intercept> {
        Ok(Intercept::Miss)
    }

    /// Locally declared dynamic attributes (resolution step 3). Types that
    /// consume metadata keys into typed fields expose them here so the
    /// dynamic surface still sees them.
    fn local_attr(&self, _name: &str) -> Option<JsonValue> {
        None
    }
}

/// Delegated operations for every [`SeriesType`].
///
/// Provided as a blanket extension so a derived type gets the whole host
/// surface by implementing the five accessors; an inherent method of the
/// same name on the implementing type shadows the delegated one, which is
/// how user overrides take precedence over host behavior.
pub trait SeriesDelegate: SeriesType {
    /// Constructs an instance from a raw buffer plus named parameters.
    ///
    /// Parameter keys matching the host's reserved constructor parameters
    /// are forwarded to the host; all other keys become metadata.
    ///
    /// # Errors
    ///
    /// Fails if the host rejects a forwarded parameter or the custom
    /// constructor rejects the metadata.
    fn with_params(data: Vec<f64>, params: IndexMap<String, JsonValue>) -> Result<Self> {
        let (host_params, meta_entries) =
            delegate::split_reserved(params, HostVector::RESERVED_PARAMS);
        let host = HostVector::with_params(data, &host_params)?;
        let mut metadata = MetadataStore::for_vector();
        for (key, value) in meta_entries {
            metadata.insert(key, value)?;
        }
        Self::from_parts(host, metadata)
    }

    /// Reinterprets an existing bare host vector as this derived type
    /// without copying the buffer (ownership moves; no data copy).
    ///
    /// # Errors
    ///
    /// Fails if the custom constructor rejects an empty metadata store.
    fn view(host: HostVector) -> Result<Self> {
        Self::from_parts(host, MetadataStore::for_vector())
    }

    /// Delegates an operation to the host kernel and boxes the result back
    /// into the declared type with the source metadata.
    ///
    /// # Errors
    ///
    /// Propagates host kernel and reconstruction failures.
    fn delegate(&self, op: &VectorOp) -> Result<Self> {
        let result = delegate::apply_vector(self.host(), op)?;
        self.rebox(result)
    }

    /// Boxes a bare host result into the declared type, carrying every
    /// metadata entry across by value.
    ///
    /// The exported metadata (see [`SeriesType::export_meta`]) is handed to
    /// the constructor first; entries the constructor dropped without
    /// exposing them as local attributes are re-applied afterwards, so they
    /// survive regardless.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn rebox(&self, host: HostVector) -> Result<Self> {
        let exported = self.export_meta()?;
        let mut rebuilt = Self::from_parts(host, exported.clone())?;
        for (key, value) in exported.iter() {
            if !rebuilt.metadata().contains(key) && rebuilt.local_attr(key).is_none() {
                rebuilt.metadata_mut().insert(key.clone(), value.clone())?;
            }
        }
        Ok(rebuilt)
    }

    /// Resolves a dynamic by-name read.
    ///
    /// Resolution order: pre-intercept hook, locally declared attributes,
    /// host-exposed fields, metadata entries. Bookkeeping members (the host
    /// reference, the metadata store, the delegation entry points) are plain
    /// struct accessors and never enter this path, which is what prevents
    /// resolution from recursing into itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameNotFound`] if nothing claims the name.
    fn get_attr(&self, name: &str) -> Result<JsonValue> {
        match self.intercept(name)? {
            Intercept::Hit(Resolved::Value(value)) => return Ok(value),
            Intercept::Hit(Resolved::Column(_)) => {
                return Err(Error::NameNotFound(name.to_string()))
            }
            Intercept::Miss => {}
        }
        if let Some(value) = self.local_attr(name) {
            return Ok(value);
        }
        if let Some(value) = self.host().field(name) {
            return Ok(value);
        }
        if let Some(value) = self.metadata().get(name) {
            return Ok(value.clone());
        }
        Err(Error::NameNotFound(name.to_string()))
    }

    /// Resolves a dynamic by-name write.
    ///
    /// An existing metadata key updates in place; otherwise a same-named
    /// host field slot receives the write (host-recognized fields behave
    /// exactly as on the bare host type); otherwise the name becomes a new
    /// metadata entry, subject to the reserved-name check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedKey`] for reserved names without a host
    /// slot, and [`Error::InvalidFieldValue`] for ill-shaped host writes.
    fn set_attr(&mut self, name: &str, value: JsonValue) -> Result<()> {
        if self.metadata().contains(name) {
            return self.metadata_mut().insert(name, value);
        }
        if self.host_mut().set_field(name, &value)? {
            return Ok(());
        }
        self.metadata_mut().insert(name, value)
    }

    /// Number of elements.
    fn len(&self) -> usize {
        self.host().len()
    }

    /// True if the vector holds no elements.
    fn is_empty(&self) -> bool {
        self.host().is_empty()
    }

    /// Identity name of the wrapped vector.
    fn name(&self) -> Option<&str> {
        self.host().name()
    }

    /// First `n` elements.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn head(&self, n: usize) -> Result<Self> {
        self.delegate(&VectorOp::Head(n))
    }

    /// Last `n` elements.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn tail(&self, n: usize) -> Result<Self> {
        self.delegate(&VectorOp::Tail(n))
    }

    /// Half-open element slice.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn slice(&self, start: usize, end: usize) -> Result<Self> {
        self.delegate(&VectorOp::Slice { start, end })
    }

    /// Elementwise absolute value.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn abs(&self) -> Result<Self> {
        self.delegate(&VectorOp::Abs)
    }

    /// Cumulative sum.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn cumsum(&self) -> Result<Self> {
        self.delegate(&VectorOp::CumSum)
    }

    /// First difference.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn diff(&self) -> Result<Self> {
        self.delegate(&VectorOp::Diff)
    }

    /// Shift by a signed number of positions.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn shift(&self, periods: i64) -> Result<Self> {
        self.delegate(&VectorOp::Shift(periods))
    }

    /// Relative change against the previous element.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn pct_change(&self) -> Result<Self> {
        self.delegate(&VectorOp::PctChange)
    }

    /// Rolling window sum.
    ///
    /// # Errors
    ///
    /// Fails for a zero window.
    fn rolling_sum(&self, window: usize) -> Result<Self> {
        self.delegate(&VectorOp::RollingSum(window))
    }

    /// Elementwise arithmetic.
    ///
    /// # Errors
    ///
    /// Fails on operand length mismatch.
    fn arith(&self, op: ArithOp, rhs: ArithOperand) -> Result<Self> {
        self.delegate(&VectorOp::Arith { op, rhs })
    }

    /// Elementwise comparison producing a 0/1 mask of the same derived type.
    ///
    /// # Errors
    ///
    /// Propagates reconstruction failures.
    fn compare(&self, op: CmpOp, rhs: f64) -> Result<Self> {
        self.delegate(&VectorOp::Compare { op, rhs })
    }

    /// Keep elements where the mask is non-zero.
    ///
    /// # Errors
    ///
    /// Fails on mask length mismatch.
    fn filter(&self, mask: &HostVector) -> Result<Self> {
        self.delegate(&VectorOp::Filter(mask.clone()))
    }

    /// Sum of all elements.
    fn sum(&self) -> f64 {
        self.host().sum()
    }

    /// Arithmetic mean.
    fn mean(&self) -> f64 {
        self.host().mean()
    }

    /// Minimum element.
    fn min(&self) -> f64 {
        self.host().min()
    }

    /// Maximum element.
    fn max(&self) -> f64 {
        self.host().max()
    }
}

impl<T: SeriesType> SeriesDelegate for T {}

/// Object-safe view of a derived vector, used where column values of
/// different derived types share a container.
pub trait ErasedSeries: Any {
    /// Stable class name of the concrete type.
    fn class_name(&self) -> &'static str;

    /// The wrapped host vector.
    fn host(&self) -> &HostVector;

    /// The attached metadata store.
    fn metadata(&self) -> &MetadataStore;

    /// Mutable access to the attached metadata store.
    fn metadata_mut(&mut self) -> &mut MetadataStore;

    /// The metadata exported for boxing and registry records.
    ///
    /// # Errors
    ///
    /// Propagates the concrete type's export failure.
    fn export_meta(&self) -> Result<MetadataStore>;

    /// Locally declared dynamic attributes of the concrete type.
    fn local_attr(&self, name: &str) -> Option<JsonValue>;

    /// Upcast for concrete-type checks.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for concrete-type recovery.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: SeriesType> ErasedSeries for T {
    fn class_name(&self) -> &'static str {
        T::CLASS_NAME
    }

    fn host(&self) -> &HostVector {
        SeriesType::host(self)
    }

    fn metadata(&self) -> &MetadataStore {
        SeriesType::metadata(self)
    }

    fn metadata_mut(&mut self) -> &mut MetadataStore {
        SeriesType::metadata_mut(self)
    }

    fn export_meta(&self) -> Result<MetadataStore> {
        SeriesType::export_meta(self)
    }

    fn local_attr(&self, name: &str) -> Option<JsonValue> {
        SeriesType::local_attr(self, name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Runtime tag for a derived vector type: the declared type captured for
/// later reconstruction by the column registry and the default boxer.
#[derive(Debug, Clone, Copy)]
pub struct SeriesClass {
    name: &'static str,
    id: TypeId,
    construct: fn(HostVector, MetadataStore) -> Result<Box<dyn ErasedSeries>>,
}

impl SeriesClass {
    /// Captures the class of a derived vector type.
    #[must_use]
    pub fn of<T: SeriesType>() -> Self {
        fn build<T: SeriesType>(
            host: HostVector,
            metadata: MetadataStore,
        ) -> Result<Box<dyn ErasedSeries>> {
            Ok(Box::new(T::from_parts(host, metadata)?))
        }
        Self {
            name: T::CLASS_NAME,
            id: TypeId::of::<T>(),
            construct: build::<T>,
        }
    }

    /// Stable class name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True if this class tags the given derived type.
    #[must_use]
    pub fn is<T: SeriesType>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Reconstructs an instance of the tagged type.
    ///
    /// # Errors
    ///
    /// Propagates the type's constructor failure.
    pub fn construct(
        &self,
        host: HostVector,
        metadata: MetadataStore,
    ) -> Result<Box<dyn ErasedSeries>> {
        (self.construct)(host, metadata)
    }
}

impl PartialEq for SeriesClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SeriesClass {}

/// The base derived vector type.
///
/// Wraps a host vector with an empty metadata store; subtypes with custom
/// constructors or typed fields implement [`SeriesType`] themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSeries {
    host: HostVector,
    metadata: MetadataStore,
}

impl UserSeries {
    /// Creates an unnamed series from a raw buffer.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            host: HostVector::new(values),
            metadata: MetadataStore::for_vector(),
        }
    }

    /// Creates a named series from a raw buffer.
    #[must_use]
    pub fn named(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            host: HostVector::named(name, values),
            metadata: MetadataStore::for_vector(),
        }
    }
}

impl SeriesType for UserSeries {
    const CLASS_NAME: &'static str = "UserSeries";

    fn from_parts(host: HostVector, metadata: MetadataStore) -> Result<Self> {
        Ok(Self { host, metadata })
    }

    fn host(&self) -> &HostVector {
        &self.host
    }

    fn host_mut(&mut self) -> &mut HostVector {
        &mut self.host
    }

    fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut MetadataStore {
        &mut self.metadata
    }
}

macro_rules! user_series_scalar_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<f64> for &UserSeries {
            type Output = UserSeries;

            fn $method(self, rhs: f64) -> UserSeries {
                UserSeries {
                    host: self.host.arith_scalar($op, rhs),
                    metadata: self.metadata.clone(),
                }
            }
        }
    };
}

user_series_scalar_op!(Add, add, ArithOp::Add);
user_series_scalar_op!(Sub, sub, ArithOp::Sub);
user_series_scalar_op!(Mul, mul, ArithOp::Mul);
user_series_scalar_op!(Div, div, ArithOp::Div);

/// Elementwise selection that preserves the condition's derived type and
/// metadata: `on_true` where the condition mask is non-zero, `on_false`
/// elsewhere.
///
/// This is the module-exported wrapper for the host-library-level selection
/// function; callers opt in by calling it here instead of relying on global
/// interception of the host function.
///
/// # Errors
///
/// Fails on buffer length mismatch or reconstruction failure.
pub fn where_select<T: SeriesType>(
    cond: &T,
    on_true: &HostVector,
    on_false: &HostVector,
) -> Result<T> {
    let selected = HostVector::select(cond.host(), on_true, on_false)?;
    cond.rebox(selected)
}
