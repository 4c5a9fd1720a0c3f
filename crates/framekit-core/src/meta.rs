//! Per-instance metadata attached to derived values.
//!
//! A [`MetadataStore`] is an insertion-ordered mapping of string keys to
//! arbitrary JSON values, disjoint from the host value type's constructor
//! parameters. Every boxed result carries a by-value clone of the store, so
//! mutating a result's metadata never affects the source (snapshot isolation,
//! not shared references).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::host::{table::HostTable, vector::HostVector};

/// User metadata attached to a single derived value.
///
/// Keys are unique; insertion order is preserved for deterministic iteration
/// and serialization. Writes are validated against the reserved
/// constructor-parameter names of the host value type the store was created
/// for. The check is a pure function over the captured reserved list, not
/// constructor introspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataStore {
    entries: IndexMap<String, JsonValue>,
    reserved: Vec<String>,
}

impl MetadataStore {
    /// Creates an empty store with an explicit reserved-name list.
    #[must_use]
    pub fn with_reserved(reserved: &[&str]) -> Self {
        Self {
            entries: IndexMap::new(),
            reserved: reserved.iter().map(ToString::to_string).collect(),
        }
    }

    /// Creates an empty store validated against the host vector type's
    /// reserved constructor parameters.
    #[must_use]
    pub fn for_vector() -> Self {
        Self::with_reserved(HostVector::RESERVED_PARAMS)
    }

    /// Creates an empty store validated against the host table type's
    /// reserved constructor parameters.
    #[must_use]
    pub fn for_table() -> Self {
        Self::with_reserved(HostTable::RESERVED_PARAMS)
    }

    /// Validates a key against the reserved-name list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedKey`] if the key is reserved.
    pub fn check_key(&self, key: &str) -> Result<()> {
        if self.reserved.iter().any(|r| r == key) {
            return Err(Error::ReservedKey(key.to_string()));
        }
        Ok(())
    }

    /// Inserts or replaces an entry.
    ///
    /// The write is rejected before any mutation happens, so a failed insert
    /// leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedKey`] if the key collides with a reserved
    /// host constructor parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) -> Result<()> {
        let key = key.into();
        self.check_key(&key)?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Relaxed write used only while replaying persisted state, where the
    /// reserved-key check is disabled around the single unsafe write.
    pub(crate) fn insert_unchecked(&mut self, key: impl Into<String>, value: JsonValue) {
        self.entries.insert(key.into(), value);
    }

    /// Gets an entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes and returns an entry.
    ///
    /// Custom constructors use this to consume the metadata keys they
    /// recognize.
    pub fn take(&mut self, key: &str) -> Option<JsonValue> {
        self.entries.shift_remove(key)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.entries.iter()
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the reserved-name list this store validates against.
    #[must_use]
    pub fn reserved(&self) -> &[String] {
        &self.reserved
    }
}
