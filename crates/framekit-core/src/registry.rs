//! Column and series class registries.
//!
//! [`ColumnRegistry`] is the per-frame record of which derived type and
//! metadata each typed column carries. [`SeriesRegistry`] is a name to class
//! lookup used when restoring frames from snapshots, where only the class
//! name survives serialization.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::meta::MetadataStore;
use crate::series::{SeriesClass, SeriesType, UserSeries};

/// Per-frame record of typed columns.
///
/// The class and metadata maps are kept paired: a column is either recorded
/// in both or in neither. The registry only tracks columns inserted as
/// derived values; columns written as raw buffers or scalars stay out and
/// read back through the frame's default boxing rule.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    classes: IndexMap<String, SeriesClass>,
    metadata: IndexMap<String, MetadataStore>,
}

impl ColumnRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a column's derived class and a metadata snapshot taken at
    /// insertion time.
    pub fn record(&mut self, name: impl Into<String>, class: SeriesClass, metadata: MetadataStore) {
        let name = name.into();
        self.classes.insert(name.clone(), class);
        self.metadata.insert(name, metadata);
    }

    /// Removes a column's record, returning true if one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let had = self.classes.shift_remove(name).is_some();
        self.metadata.shift_remove(name);
        had
    }

    /// The recorded class of a column, if typed.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&SeriesClass> {
        self.classes.get(name)
    }

    /// The metadata snapshot recorded for a column, if typed.
    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<&MetadataStore> {
        self.metadata.get(name)
    }

    /// Returns true if the column is recorded as typed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Names of all typed columns, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.classes.keys()
    }

    /// Number of typed columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no typed columns are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Name to class lookup for snapshot restore.
///
/// Persisted frames record column classes by name only; the caller supplies
/// a registry mapping those names back to live constructors. There is no
/// process-wide registry, so two restores can resolve the same name to
/// different types without interfering.
#[derive(Debug, Clone, Default)]
pub struct SeriesRegistry {
    classes: FxHashMap<String, SeriesClass>,
}

impl SeriesRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the base series type.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<UserSeries>();
        registry
    }

    /// Registers a derived type under its declared class name.
    pub fn register<T: SeriesType>(&mut self) {
        self.classes
            .insert(T::CLASS_NAME.to_string(), SeriesClass::of::<T>());
    }

    /// Resolves a class name to its constructor tag.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&SeriesClass> {
        self.classes.get(name)
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no classes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
