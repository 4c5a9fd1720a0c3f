//! Tests for deferred-evaluation module

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    use crate::frame::{FrameDelegate, UserFrame};
    use crate::host::table::HostTable;
    use crate::host::ArithOp;
    use crate::lazy::LazyFrame;

    fn sample_table() -> HostTable {
        let mut table = HostTable::new();
        table.set_column("a", vec![1.0, 2.0, 3.0]).expect("a");
        table.set_column("b", vec![10.0, 20.0, 30.0]).expect("b");
        table
    }

    fn assert_tables_close(left: &HostTable, right: &HostTable) {
        assert_eq!(left.nrows(), right.nrows());
        assert_eq!(left.ncols(), right.ncols());
        for row in 0..left.nrows() {
            for col in 0..left.ncols() {
                let a = left.cell(row, col);
                let b = right.cell(row, col);
                assert!(
                    (a - b).abs() < 1e-9,
                    "cell ({row}, {col}): {a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_deferred_operation_does_not_force() {
        let lazy = LazyFrame::over(sample_table());
        let expr = &lazy + 1.0;

        assert!(!expr.is_forced());
        assert!(expr.host().is_none());
        // The receiver is untouched; it can seed further expressions.
        assert!(!lazy.is_forced());
        assert_eq!(expr.stack().len(), 2);
        assert_eq!(lazy.stack().len(), 1);
    }

    #[test]
    fn test_simple_chain_matches_eager() {
        let table = sample_table();
        let lazy = LazyFrame::over(table.clone());
        let mut expr = &(&lazy * 2.0) + 1.0;

        let eager = table
            .arith_scalar(ArithOp::Mul, 2.0)
            .arith_scalar(ArithOp::Add, 1.0);
        assert_tables_close(expr.force().expect("force"), &eager);
    }

    #[test]
    fn test_compile_text_and_placeholders() {
        let lazy = LazyFrame::over(sample_table());
        let expr = &(&lazy * &lazy) + 1.0;

        let (text, env) = expr.compile();
        assert_eq!(text, "((_t0 * (_t1)) + 1.0)");
        assert_eq!(env.len(), 2);
        assert!(env.contains("_t0"));
        assert!(env.contains("_t1"));
    }

    #[test]
    fn test_non_finite_scalar_operand_rejected() {
        let lazy = LazyFrame::over(sample_table());

        let mut expr = &lazy + f64::NAN;
        let err = expr.force().unwrap_err();
        assert_eq!(err.code(), "FRAME-008");
        assert!(err.to_string().contains("non-finite"));

        // Same for infinities buried in a sub-expression operand.
        let inner = &lazy * f64::INFINITY;
        let mut outer = &lazy + &inner;
        assert_eq!(outer.force().unwrap_err().code(), "FRAME-008");
    }

    #[test]
    fn test_right_form_subtraction() {
        let table = sample_table();
        let lazy = LazyFrame::over(table.clone());
        let mut expr = 2.0 - &lazy;

        let (text, _) = expr.compile();
        assert_eq!(text, "(2.0 - _t0)");

        let forced = expr.force().expect("force");
        assert_eq!(forced.column("a"), Some(&[1.0, 0.0, -1.0][..]));
    }

    #[test]
    fn test_right_form_division() {
        let mut table = HostTable::new();
        table.set_column("a", vec![1.0, 2.0, 4.0]).expect("a");
        let lazy = LazyFrame::over(table);
        let mut expr = 8.0 / &lazy;

        let forced = expr.force().expect("force");
        assert_eq!(forced.column("a"), Some(&[8.0, 4.0, 2.0][..]));
    }

    #[test]
    fn test_pow_chain() {
        let table = sample_table();
        let lazy = LazyFrame::over(table.clone());
        let mut expr = lazy.pow(2.0);

        let (text, _) = expr.compile();
        assert_eq!(text, "(_t0 ** 2.0)");

        let eager = table.arith_scalar(ArithOp::Pow, 2.0);
        assert_tables_close(expr.force().expect("force"), &eager);
    }

    #[test]
    fn test_complex_chain_with_lazy_operand() {
        let table = sample_table();
        let lazy = LazyFrame::over(table.clone());

        let squared = lazy.pow(2.0);
        let product = &lazy * &lazy;
        let mut expr = &(&squared + 1.0) + &product;

        let eager = table
            .arith_scalar(ArithOp::Pow, 2.0)
            .arith_scalar(ArithOp::Add, 1.0)
            .arith_table(
                ArithOp::Add,
                &table.arith_table(ArithOp::Mul, &table).expect("mul"),
            )
            .expect("add");
        assert_tables_close(expr.force().expect("force"), &eager);
    }

    #[test]
    fn test_forced_operand_binds_as_table() {
        let table = sample_table();
        let mut rhs = &LazyFrame::over(table.clone()) + 1.0;
        rhs.force().expect("force rhs");

        let lazy = LazyFrame::over(table);
        let mut expr = &lazy + &rhs;

        // The forced operand compiled to a placeholder, not an inline
        // sub-expression.
        let (text, env) = expr.compile();
        assert_eq!(text, "(_t0 + _t1)");
        assert_eq!(env.len(), 2);

        let forced = expr.force().expect("force");
        assert_eq!(forced.column("a"), Some(&[3.0, 5.0, 7.0][..]));
    }

    #[test]
    fn test_force_is_idempotent() {
        let lazy = LazyFrame::over(sample_table());
        let mut expr = &lazy + 1.0;

        let first = expr.force().expect("first").clone();
        assert!(expr.is_forced());
        let second = expr.force().expect("second").clone();

        assert_eq!(first, second);
    }

    #[test]
    fn test_forced_result_keeps_column_names() {
        let lazy = LazyFrame::over(sample_table());
        let mut expr = &lazy * 3.0;

        let forced = expr.force().expect("force");
        assert_eq!(forced.column_names(), ["a", "b"]);
    }

    #[test]
    fn test_metadata_rides_into_forced_frame() {
        let mut frame = UserFrame::from_host(sample_table());
        frame.set_attr("owner", json!("ops")).expect("meta");

        let expr = &frame.lazy() + 1.0;
        let forced = expr.into_frame().expect("into_frame");

        assert_eq!(forced.get_attr("owner").expect("meta"), json!("ops"));
        assert_eq!(forced.host().column("a"), Some(&[2.0, 3.0, 4.0][..]));
    }

    #[test]
    fn test_head_and_tail_force() {
        let lazy = LazyFrame::over(sample_table());
        let mut expr = &lazy + 1.0;

        assert_eq!(expr.head(1).expect("head").nrows(), 1);
        assert_eq!(expr.tail(2).expect("tail").nrows(), 2);
    }

    #[test]
    fn test_empty_table_forces_empty() {
        let lazy = LazyFrame::over(HostTable::new());
        let mut expr = &lazy + 1.0;

        let forced = expr.force().expect("force");
        assert_eq!(forced.nrows(), 0);
        assert_eq!(forced.ncols(), 0);
    }

    #[test]
    fn test_large_random_scenario() {
        let mut rng = StdRng::seed_from_u64(42);
        let rows = 10_000;
        let cols = 5;
        let data: Vec<f64> = (0..rows * cols).map(|_| rng.gen_range(-100.0..100.0)).collect();
        let table = HostTable::from_matrix(rows, cols, &data, None).expect("matrix");

        let lazy = LazyFrame::over(table.clone());
        let mut expr = &(&(&lazy * 2.0) - 3.0) + &lazy;

        let eager = table
            .arith_scalar(ArithOp::Mul, 2.0)
            .arith_scalar(ArithOp::Sub, 3.0)
            .arith_table(ArithOp::Add, &table)
            .expect("add");
        assert_tables_close(expr.force().expect("force"), &eager);
    }

    proptest! {
        #[test]
        fn prop_deferred_chain_matches_eager(
            ops in proptest::collection::vec((0..4u8, 0.5f64..2.0), 1..8)
        ) {
            let table = sample_table();
            let mut lazy = LazyFrame::over(table.clone());
            let mut eager = table;

            for (op, scalar) in ops {
                let (next, arith) = match op {
                    0 => (&lazy + scalar, ArithOp::Add),
                    1 => (&lazy - scalar, ArithOp::Sub),
                    2 => (&lazy * scalar, ArithOp::Mul),
                    _ => (&lazy / scalar, ArithOp::Div),
                };
                lazy = next;
                eager = eager.arith_scalar(arith, scalar);
            }

            let forced = lazy.force().expect("force");
            prop_assert_eq!(forced.nrows(), eager.nrows());
            for row in 0..eager.nrows() {
                for col in 0..eager.ncols() {
                    let a = forced.cell(row, col);
                    let b = eager.cell(row, col);
                    prop_assert!((a - b).abs() < 1e-9, "cell ({}, {}): {} vs {}", row, col, a, b);
                }
            }
        }
    }
}
