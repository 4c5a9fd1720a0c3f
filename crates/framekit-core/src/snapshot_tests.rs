//! Tests for snapshot persistence module

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::{json, Value as JsonValue};

    use crate::error::Result;
    use crate::frame::{FrameDelegate, UserFrame};
    use crate::host::vector::HostVector;
    use crate::meta::MetadataStore;
    use crate::registry::SeriesRegistry;
    use crate::series::{SeriesDelegate, SeriesType, UserSeries};
    use crate::snapshot::{
        read_snapshot, restore_frame, restore_series, save_frame, save_series, write_snapshot,
        FrameSnapshot, SeriesSnapshot, SCHEMA_VERSION,
    };

    #[derive(Debug, Clone, PartialEq)]
    struct BobSeries {
        host: HostVector,
        metadata: MetadataStore,
    }

    impl SeriesType for BobSeries {
        const CLASS_NAME: &'static str = "BobSeries";

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

    /// A derived type whose constructor consumes the "tag" metadata key
    /// into a typed field and exports it back when captured.
    #[derive(Debug, Clone, PartialEq)]
    struct TaggedSeries {
        host: HostVector,
        metadata: MetadataStore,
        tag: Option<JsonValue>,
    }

    impl SeriesType for TaggedSeries {
        const CLASS_NAME: &'static str = "TaggedSeries";

        fn from_parts(host: HostVector, mut metadata: MetadataStore) -> Result<Self> {
            let tag = metadata.take("tag");
            Ok(Self {
                host,
                metadata,
                tag,
            })
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

        fn export_meta(&self) -> Result<MetadataStore> {
            let mut meta = self.metadata.clone();
            if let Some(tag) = &self.tag {
                meta.insert("tag", tag.clone())?;
            }
            Ok(meta)
        }

        fn local_attr(&self, name: &str) -> Option<JsonValue> {
            if name == "tag" {
                self.tag.clone()
            } else {
                None
            }
        }
    }

    fn bob() -> BobSeries {
        let mut series =
            BobSeries::view(HostVector::named("bob", vec![1.0, 2.0, 3.0])).expect("view");
        series.set_attr("venue", json!("NYSE")).expect("meta");
        series
    }

    fn sample_frame() -> UserFrame {
        let mut frame = UserFrame::new();
        frame.insert_column("bob", bob()).expect("typed");
        frame.insert_values("raw", vec![7.0, 8.0, 9.0]).expect("raw");
        frame.set_attr("owner", json!("ops")).expect("meta");
        frame
    }

    #[test]
    fn test_series_round_trip() {
        let original = bob();
        let snapshot = save_series(&original).expect("save");

        assert_eq!(snapshot.schema_version, SCHEMA_VERSION);
        assert_eq!(snapshot.class, "BobSeries");

        let restored: BobSeries = restore_series(&snapshot).expect("restore");
        assert_eq!(restored, original);
        assert_eq!(restored.get_attr("venue").expect("meta"), json!("NYSE"));
    }

    #[test]
    fn test_consumed_metadata_survives_snapshot_round_trip() {
        let mut params = IndexMap::new();
        params.insert("tag".to_string(), json!("audit"));
        params.insert("venue".to_string(), json!("NYSE"));
        let original = TaggedSeries::with_params(vec![1.0, 2.0], params).expect("ctor");

        // The capture exports the consumed key alongside the store.
        let snapshot = save_series(&original).expect("save");
        assert_eq!(snapshot.metadata.get("tag"), Some(&json!("audit")));
        assert_eq!(snapshot.metadata.get("venue"), Some(&json!("NYSE")));

        // The restore consumes it back into the typed field.
        let restored: TaggedSeries = restore_series(&snapshot).expect("restore");
        assert_eq!(restored.get_attr("tag").expect("consumed key"), json!("audit"));
        assert!(!restored.metadata().contains("tag"));
        assert_eq!(restored, original);
    }

    #[test]
    fn test_series_restore_class_checked() {
        let snapshot = save_series(&bob()).expect("save");
        let err = restore_series::<UserSeries>(&snapshot).unwrap_err();

        assert_eq!(err.code(), "FRAME-005");
    }

    #[test]
    fn test_unsupported_schema_version_rejected() {
        let mut snapshot = save_series(&bob()).expect("save");
        snapshot.schema_version = SCHEMA_VERSION + 1;

        let err = restore_series::<BobSeries>(&snapshot).unwrap_err();
        assert_eq!(err.code(), "FRAME-004");
    }

    #[test]
    fn test_series_snapshot_bytes_round_trip() {
        let snapshot = save_series(&bob()).expect("save");
        let bytes = snapshot.to_bytes().expect("encode");
        let decoded = SeriesSnapshot::from_bytes(&bytes).expect("decode");

        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_frame_round_trip_with_typed_columns() {
        let original = sample_frame();
        let snapshot = save_frame(&original).expect("save");

        assert_eq!(snapshot.class, "UserFrame");
        assert_eq!(snapshot.columns.len(), 1);
        assert_eq!(snapshot.columns[0].name, "bob");
        assert_eq!(snapshot.columns[0].class, "BobSeries");

        let mut registry = SeriesRegistry::with_defaults();
        registry.register::<BobSeries>();
        let restored: UserFrame = restore_frame(&snapshot, &registry).expect("restore");

        // Frame metadata and host data survive.
        assert_eq!(restored.get_attr("owner").expect("meta"), json!("ops"));
        assert_eq!(restored.host().column("raw"), Some(&[7.0, 8.0, 9.0][..]));

        // The typed column reconstructs with class and metadata.
        let back: BobSeries = restored.column("bob").expect("column");
        assert_eq!(back.host().values(), &[1.0, 2.0, 3.0]);
        assert_eq!(back.get_attr("venue").expect("meta"), json!("NYSE"));

        // The untyped column stays bare: restored frames box by identity.
        let raw = restored.column_dyn("raw").expect("raw");
        assert_eq!(raw.class_name(), "HostVector");
    }

    #[test]
    fn test_frame_restore_unknown_class() {
        let snapshot = save_frame(&sample_frame()).expect("save");
        // A registry without BobSeries cannot resolve the column class.
        let registry = SeriesRegistry::with_defaults();

        let err = restore_frame::<UserFrame>(&snapshot, &registry).unwrap_err();
        assert_eq!(err.code(), "FRAME-006");
    }

    #[test]
    fn test_frame_restore_class_checked() {
        let frame_snapshot = FrameSnapshot {
            schema_version: SCHEMA_VERSION,
            class: "SomeOtherFrame".to_string(),
            host_payload: Vec::new(),
            metadata: MetadataStore::for_table(),
            columns: Vec::new(),
        };

        let registry = SeriesRegistry::with_defaults();
        let err = restore_frame::<UserFrame>(&frame_snapshot, &registry).unwrap_err();
        assert_eq!(err.code(), "FRAME-005");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.snap");

        let snapshot = save_frame(&sample_frame()).expect("save");
        write_snapshot(&path, &snapshot).expect("write");
        let loaded: FrameSnapshot = read_snapshot(&path).expect("read");

        assert_eq!(loaded, snapshot);
    }
}
