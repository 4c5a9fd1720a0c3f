//! Tests for host table module

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::host::table::HostTable;
    use crate::host::vector::HostVector;
    use crate::host::ArithOp;

    fn sample() -> HostTable {
        let mut table = HostTable::new();
        table.set_column("a", vec![1.0, 2.0, 3.0]).expect("a");
        table.set_column("b", vec![10.0, 20.0, 30.0]).expect("b");
        table
    }

    #[test]
    fn test_first_column_fixes_row_count() {
        let mut table = HostTable::new();
        table.set_column("a", vec![1.0, 2.0]).expect("first");

        assert_eq!(table.nrows(), 2);
        let err = table.set_column("b", vec![1.0]).unwrap_err();
        assert_eq!(err.code(), "FRAME-007");
    }

    #[test]
    fn test_from_columns_rejects_uneven_lengths() {
        let mut columns = IndexMap::new();
        columns.insert("a".to_string(), vec![1.0, 2.0]);
        columns.insert("b".to_string(), vec![1.0]);

        assert!(HostTable::from_columns(columns).is_err());
    }

    #[test]
    fn test_from_matrix_default_names() {
        let table = HostTable::from_matrix(2, 2, &[1.0, 2.0, 3.0, 4.0], None).expect("matrix");

        assert_eq!(table.column_names(), ["c0", "c1"]);
        assert_eq!(table.column("c0"), Some(&[1.0, 3.0][..]));
        assert_eq!(table.column("c1"), Some(&[2.0, 4.0][..]));
    }

    #[test]
    fn test_from_matrix_length_checked() {
        assert!(HostTable::from_matrix(2, 2, &[1.0, 2.0, 3.0], None).is_err());
        assert!(
            HostTable::from_matrix(1, 2, &[1.0, 2.0], Some(vec!["only".to_string()])).is_err()
        );
    }

    #[test]
    fn test_column_vector_named_after_key() {
        let table = sample();
        let col = table.column_vector("b").expect("column");

        assert_eq!(col.name(), Some("b"));
        assert_eq!(col.values(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_cell_out_of_range_is_nan() {
        let table = sample();

        assert_eq!(table.cell(1, 1), 20.0);
        assert!(table.cell(5, 0).is_nan());
        assert!(table.cell(0, 5).is_nan());
    }

    #[test]
    fn test_scalar_column_broadcast() {
        let mut table = sample();
        table.set_scalar_column("flag", 7.0);

        assert_eq!(table.column("flag"), Some(&[7.0, 7.0, 7.0][..]));
    }

    #[test]
    fn test_remove_last_column_resets_rows() {
        let mut table = HostTable::new();
        table.set_column("a", vec![1.0, 2.0]).expect("a");

        assert_eq!(table.remove_column("a"), Some(vec![1.0, 2.0]));
        assert_eq!(table.nrows(), 0);
        // A fresh column may now fix a new row count.
        table.set_column("b", vec![1.0]).expect("b");
        assert_eq!(table.nrows(), 1);
    }

    #[test]
    fn test_head_tail_slice() {
        let table = sample();

        assert_eq!(table.head(2).column("a"), Some(&[1.0, 2.0][..]));
        assert_eq!(table.tail(1).column("b"), Some(&[30.0][..]));
        assert_eq!(table.slice(1, 2).column("a"), Some(&[2.0][..]));
    }

    #[test]
    fn test_arith_scalar_all_columns() {
        let table = sample().arith_scalar(ArithOp::Add, 1.0);

        assert_eq!(table.column("a"), Some(&[2.0, 3.0, 4.0][..]));
        assert_eq!(table.column("b"), Some(&[11.0, 21.0, 31.0][..]));
    }

    #[test]
    fn test_arith_table_pairs_by_position() {
        let left = sample();
        // Same shape, different column names: pairing is positional.
        let right = HostTable::from_matrix(
            3,
            2,
            &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            Some(vec!["x".to_string(), "y".to_string()]),
        )
        .expect("matrix");

        let sum = left.arith_table(ArithOp::Add, &right).expect("add");
        assert_eq!(sum.column_names(), ["a", "b"]);
        assert_eq!(sum.column("a"), Some(&[2.0, 3.0, 4.0][..]));
    }

    #[test]
    fn test_arith_table_shape_mismatch() {
        let left = sample();
        let right = left.head(2);

        let err = left.arith_table(ArithOp::Add, &right).unwrap_err();
        assert_eq!(err.code(), "FRAME-008");
    }

    #[test]
    fn test_rolling_sum_per_column() {
        let rolled = sample().rolling_sum(2).expect("rolling");

        assert!(rolled.column("a").expect("a")[0].is_nan());
        assert_eq!(&rolled.column("a").expect("a")[1..], &[3.0, 5.0]);
        assert_eq!(&rolled.column("b").expect("b")[1..], &[30.0, 50.0]);
    }

    #[test]
    fn test_filter_rows() {
        let table = sample();
        let mask = HostVector::new(vec![1.0, 0.0, 1.0]);

        let kept = table.filter_rows(&mask).expect("filter");
        assert_eq!(kept.nrows(), 2);
        assert_eq!(kept.column("a"), Some(&[1.0, 3.0][..]));
    }

    #[test]
    fn test_filter_rows_mask_length_checked() {
        let table = sample();
        let mask = HostVector::new(vec![1.0]);

        assert!(table.filter_rows(&mask).is_err());
    }

    #[test]
    fn test_column_sums() {
        let sums = sample().column_sums();

        assert_eq!(sums.get("a"), Some(&6.0));
        assert_eq!(sums.get("b"), Some(&60.0));
    }

    #[test]
    fn test_payload_round_trip() {
        let table = sample();
        let bytes = table.to_payload().expect("encode");
        let back = HostTable::from_payload(&bytes).expect("decode");

        assert_eq!(back, table);
    }
}
