//! Snapshot persistence for derived values.
//!
//! A snapshot separates the host payload (opaque bytes produced by the host
//! engine's own serializer) from the wrapper's class name and metadata, so
//! a restore can rebuild the exact derived type with its metadata intact.
//! Frame snapshots additionally record each typed column's class and
//! metadata by name; restoring a frame needs a [`SeriesRegistry`] mapping
//! those class names back to live constructors.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{FrameCore, FrameType};
use crate::host::table::HostTable;
use crate::host::vector::HostVector;
use crate::meta::MetadataStore;
use crate::registry::{ColumnRegistry, SeriesRegistry};
use crate::series::SeriesType;

/// Current snapshot schema version. Restores reject any other version.
pub const SCHEMA_VERSION: u32 = 1;

/// Persisted form of a derived vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    /// Schema version the snapshot was written with.
    pub schema_version: u32,
    /// Class name of the derived type.
    pub class: String,
    /// Host vector payload, serialized by the host engine.
    pub host_payload: Vec<u8>,
    /// Metadata carried by the value.
    pub metadata: MetadataStore,
}

/// Persisted record of one typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    /// Column key.
    pub name: String,
    /// Class name of the column's derived type.
    pub class: String,
    /// Column metadata recorded at insertion.
    pub metadata: MetadataStore,
}

/// Persisted form of a derived table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Schema version the snapshot was written with.
    pub schema_version: u32,
    /// Class name of the derived frame type.
    pub class: String,
    /// Host table payload, serialized by the host engine.
    pub host_payload: Vec<u8>,
    /// Frame metadata.
    pub metadata: MetadataStore,
    /// Typed-column records in registry order.
    pub columns: Vec<ColumnSnapshot>,
}

impl SeriesSnapshot {
    /// Serializes the snapshot to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on encoding failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a snapshot from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on decoding failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl FrameSnapshot {
    /// Serializes the snapshot to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on encoding failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a snapshot from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on decoding failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Captures a derived vector into a snapshot.
///
/// The snapshot records the value's exported metadata (see
/// [`SeriesType::export_meta`]), so keys a custom constructor consumed into
/// typed fields persist too.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the host payload cannot be encoded.
pub fn save_series<T: SeriesType>(series: &T) -> Result<SeriesSnapshot> {
    Ok(SeriesSnapshot {
        schema_version: SCHEMA_VERSION,
        class: T::CLASS_NAME.to_string(),
        host_payload: series.host().to_payload()?,
        metadata: series.export_meta()?,
    })
}

/// Restores a derived vector from a snapshot.
///
/// Metadata is handed to the type's constructor first; entries a custom
/// constructor consumed are replayed afterwards without re-validation, since
/// they passed the reserved-key check when originally written.
///
/// # Errors
///
/// Returns [`Error::SchemaVersion`] for an unsupported version and
/// [`Error::ClassMismatch`] when the snapshot holds a different class.
pub fn restore_series<T: SeriesType>(snapshot: &SeriesSnapshot) -> Result<T> {
    if snapshot.schema_version != SCHEMA_VERSION {
        return Err(Error::SchemaVersion(snapshot.schema_version));
    }
    if snapshot.class != T::CLASS_NAME {
        return Err(Error::ClassMismatch {
            name: "series snapshot".to_string(),
            requested: T::CLASS_NAME,
            actual: snapshot.class.clone(),
        });
    }
    let host = HostVector::from_payload(&snapshot.host_payload)?;
    let mut restored = T::from_parts(host, snapshot.metadata.clone())?;
    for (key, value) in snapshot.metadata.iter() {
        if !restored.metadata().contains(key) && restored.local_attr(key).is_none() {
            restored
                .metadata_mut()
                .insert_unchecked(key.clone(), value.clone());
        }
    }
    Ok(restored)
}

/// Captures a derived table into a snapshot.
///
/// Typed-column records come from the frame's registry; untyped columns
/// live only in the host payload and restore as untyped.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the host payload cannot be encoded.
pub fn save_frame<F: FrameType>(frame: &F) -> Result<FrameSnapshot> {
    let core = frame.core();
    let columns = core
        .registry
        .names()
        .map(|name| ColumnSnapshot {
            name: name.clone(),
            class: core
                .registry
                .class(name)
                .map_or_else(String::new, |c| c.name().to_string()),
            metadata: core
                .registry
                .metadata(name)
                .cloned()
                .unwrap_or_else(MetadataStore::for_vector),
        })
        .collect();
    Ok(FrameSnapshot {
        schema_version: SCHEMA_VERSION,
        class: F::CLASS_NAME.to_string(),
        host_payload: core.host.to_payload()?,
        metadata: core.metadata.clone(),
        columns,
    })
}

/// Restores a derived table from a snapshot.
///
/// Every typed-column class name must resolve through the supplied
/// registry. The restored frame gets identity boxing; boxing rules are
/// behavior, not state, and do not persist.
///
/// # Errors
///
/// Returns [`Error::SchemaVersion`] for an unsupported version,
/// [`Error::ClassMismatch`] when the snapshot holds a different frame
/// class, and [`Error::UnknownClass`] for an unresolved column class.
pub fn restore_frame<F: FrameType>(snapshot: &FrameSnapshot, series: &SeriesRegistry) -> Result<F> {
    if snapshot.schema_version != SCHEMA_VERSION {
        return Err(Error::SchemaVersion(snapshot.schema_version));
    }
    if snapshot.class != F::CLASS_NAME {
        return Err(Error::ClassMismatch {
            name: "frame snapshot".to_string(),
            requested: F::CLASS_NAME,
            actual: snapshot.class.clone(),
        });
    }

    tracing::debug!(
        class = %snapshot.class,
        columns = snapshot.columns.len(),
        "restoring frame snapshot"
    );

    let host = HostTable::from_payload(&snapshot.host_payload)?;
    let mut registry = ColumnRegistry::new();
    for column in &snapshot.columns {
        let class = series
            .resolve(&column.class)
            .ok_or_else(|| Error::UnknownClass(column.class.clone()))?;
        registry.record(&column.name, *class, column.metadata.clone());
    }

    let mut core = FrameCore::new();
    core.host = host;
    core.metadata = snapshot.metadata.clone();
    core.registry = registry;

    let mut restored = F::from_core(core)?;
    for (key, value) in snapshot.metadata.iter() {
        if !restored.core().metadata.contains(key) && restored.local_attr(key).is_none() {
            restored
                .core_mut()
                .metadata
                .insert_unchecked(key.clone(), value.clone());
        }
    }
    Ok(restored)
}

/// Writes a snapshot to a file.
///
/// # Errors
///
/// Returns [`Error::Serialization`] on encoding failure and [`Error::Io`]
/// on write failure.
pub fn write_snapshot<S: Serialize>(path: impl AsRef<Path>, snapshot: &S) -> Result<()> {
    let bytes = bincode::serialize(snapshot).map_err(|e| Error::Serialization(e.to_string()))?;
    tracing::debug!(path = %path.as_ref().display(), len = bytes.len(), "writing snapshot");
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Reads a snapshot from a file.
///
/// # Errors
///
/// Returns [`Error::Io`] on read failure and [`Error::Serialization`] on
/// decoding failure.
pub fn read_snapshot<S: DeserializeOwned>(path: impl AsRef<Path>) -> Result<S> {
    let bytes = std::fs::read(path)?;
    bincode::deserialize(&bytes).map_err(|e| Error::Serialization(e.to_string()))
}
