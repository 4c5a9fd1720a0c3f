//! Tests for derived vector module

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::{json, Value as JsonValue};

    use crate::error::Result;
    use crate::host::vector::HostVector;
    use crate::host::CmpOp;
    use crate::meta::MetadataStore;
    use crate::series::{where_select, SeriesDelegate, SeriesType, UserSeries};

    /// A derived type with a custom constructor that consumes the "bob"
    /// metadata key into a typed field.
    #[derive(Debug, Clone, PartialEq)]
    struct BobSeries {
        host: HostVector,
        metadata: MetadataStore,
        bob: Option<JsonValue>,
    }

    impl SeriesType for BobSeries {
        const CLASS_NAME: &'static str = "BobSeries";

        fn from_parts(host: HostVector, mut metadata: MetadataStore) -> Result<Self> {
            let bob = metadata.take("bob");
            Ok(Self {
                host,
                metadata,
                bob,
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
            if let Some(bob) = &self.bob {
                meta.insert("bob", bob.clone())?;
            }
            Ok(meta)
        }

        fn local_attr(&self, name: &str) -> Option<JsonValue> {
            if name == "bob" {
                self.bob.clone()
            } else {
                None
            }
        }
    }

    fn bob_series() -> BobSeries {
        let mut params = IndexMap::new();
        params.insert("name".to_string(), json!("bob"));
        params.insert("bob".to_string(), json!("bob"));
        params.insert("venue".to_string(), json!("NYSE"));
        BobSeries::with_params(vec![1.0, -2.0, 3.0, -4.0], params).expect("ctor")
    }

    #[test]
    fn test_with_params_splits_host_and_metadata() {
        let bob = bob_series();

        // "name" went to the host constructor.
        assert_eq!(bob.name(), Some("bob"));
        // "bob" was consumed by the custom constructor into a typed field.
        assert!(!bob.metadata().contains("bob"));
        assert_eq!(bob.get_attr("bob").expect("local"), json!("bob"));
        // "venue" landed in metadata.
        assert_eq!(bob.metadata().get("venue"), Some(&json!("NYSE")));
    }

    #[test]
    fn test_delegated_result_keeps_type_and_metadata() {
        let bob = bob_series();
        let tail: BobSeries = bob.tail(2).expect("tail");

        assert_eq!(tail.host().values(), &[3.0, -4.0]);
        assert_eq!(tail.get_attr("venue").expect("venue"), json!("NYSE"));
        assert_eq!(tail.name(), Some("bob"));
    }

    #[test]
    fn test_consumed_metadata_survives_boxing() {
        let bob = bob_series();
        let tail = bob.tail(2).expect("tail");

        // The consumed key came back as a typed field, not a store entry.
        assert_eq!(tail.get_attr("bob").expect("consumed key"), json!("bob"));
        assert!(!tail.metadata().contains("bob"));

        // It keeps surviving through further delegation.
        let chained = tail.abs().expect("abs").cumsum().expect("cumsum");
        assert_eq!(chained.get_attr("bob").expect("chained"), json!("bob"));
        assert_eq!(chained.get_attr("venue").expect("venue"), json!("NYSE"));
    }

    #[test]
    fn test_metadata_propagates_by_value() {
        let bob = bob_series();
        let mut abs = bob.abs().expect("abs");

        abs.set_attr("venue", json!("LSE")).expect("write");

        // The result changed; the source did not.
        assert_eq!(abs.get_attr("venue").expect("abs"), json!("LSE"));
        assert_eq!(bob.get_attr("venue").expect("source"), json!("NYSE"));
    }

    #[test]
    fn test_comparison_result_boxes_like_arithmetic() {
        let bob = bob_series();
        let mask: BobSeries = bob.compare(CmpOp::Gt, 0.0).expect("compare");

        assert_eq!(mask.host().values(), &[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(mask.get_attr("venue").expect("venue"), json!("NYSE"));
    }

    #[test]
    fn test_get_attr_resolution_order() {
        let mut bob = bob_series();

        // Host field before metadata.
        assert_eq!(bob.get_attr("name").expect("host field"), json!("bob"));
        // Metadata entry.
        assert_eq!(bob.get_attr("venue").expect("metadata"), json!("NYSE"));
        // Nothing claims the name.
        let err = bob.get_attr("phantom").unwrap_err();
        assert_eq!(err.code(), "FRAME-001");

        // Writing a host field goes to the host, not to metadata.
        bob.set_attr("name", json!("robert")).expect("rename");
        assert_eq!(bob.name(), Some("robert"));
        assert!(!bob.metadata().contains("name"));
    }

    #[test]
    fn test_set_attr_reserved_key_rejected() {
        let mut bob = bob_series();
        let err = bob.set_attr("dtype", json!("f64")).unwrap_err();

        assert_eq!(err.code(), "FRAME-002");
    }

    #[test]
    fn test_set_attr_updates_existing_metadata() {
        let mut bob = bob_series();
        bob.set_attr("venue", json!("LSE")).expect("update");

        assert_eq!(bob.metadata().get("venue"), Some(&json!("LSE")));
        assert_eq!(bob.metadata().len(), 1);
    }

    #[test]
    fn test_view_wraps_without_metadata() {
        let host = HostVector::named("px", vec![1.0, 2.0]);
        let series = UserSeries::view(host).expect("view");

        assert_eq!(series.name(), Some("px"));
        assert!(series.metadata().is_empty());
    }

    #[test]
    fn test_where_select_preserves_type() {
        let bob = bob_series();
        let cond = bob.compare(CmpOp::Gt, 0.0).expect("mask");
        let on_true = HostVector::new(vec![1.0; 4]);
        let on_false = HostVector::new(vec![0.0; 4]);

        let selected: BobSeries = where_select(&cond, &on_true, &on_false).expect("select");
        assert_eq!(selected.host().values(), &[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(selected.get_attr("venue").expect("venue"), json!("NYSE"));
    }

    #[test]
    fn test_where_select_length_checked() {
        let bob = bob_series();
        let short = HostVector::new(vec![1.0]);

        let err = where_select(&bob, &short, &short).unwrap_err();
        assert_eq!(err.code(), "FRAME-007");
    }

    #[test]
    fn test_user_series_operators() {
        let series = UserSeries::named("px", vec![1.0, 2.0]);
        let shifted = &series + 1.0;
        let scaled = &shifted * 2.0;

        assert_eq!(scaled.host().values(), &[4.0, 6.0]);
        assert_eq!(scaled.name(), Some("px"));
    }

    #[test]
    fn test_reductions_return_bare_scalars() {
        let bob = bob_series();

        assert_eq!(bob.sum(), -2.0);
        assert_eq!(bob.min(), -4.0);
        assert_eq!(bob.max(), 3.0);
        assert_eq!(bob.len(), 4);
        assert!(!bob.is_empty());
    }

    #[test]
    fn test_cumsum_and_rolling() {
        let series = UserSeries::new(vec![1.0, 2.0, 3.0]);

        assert_eq!(
            series.cumsum().expect("cumsum").host().values(),
            &[1.0, 3.0, 6.0]
        );
        let rolled = series.rolling_sum(2).expect("rolling");
        assert!(rolled.host().values()[0].is_nan());
        assert_eq!(&rolled.host().values()[1..], &[3.0, 5.0]);
    }
}
