// crates/grimoire-core/tests/proptest_path.rs
// ============================================================================
// Module: Reference-Path Property Tests
// Description: Property tests for the reference-path resolver's read/write
//              round trip across arbitrary path shapes.
// Purpose: Detect panics and round-trip violations across a wide range of
//          path segments and JSON leaf values, not just the handful of
//          paths the unit tests happen to name.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use grimoire_core::path::{self, PathError};
use proptest::prelude::*;
use serde_json::{json, Value};

fn writable_root() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("outputs"), Just("variables")]
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,5}"
}

fn path_of(root: &'static str, segments: Vec<String>) -> String {
    let mut parts = vec![root.to_string()];
    parts.extend(segments);
    parts.join(".")
}

fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|v| json!(v)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

fn fresh_context() -> Value {
    json!({"inputs": {}, "outputs": {}, "variables": {}})
}

proptest! {
    #[test]
    fn write_then_read_round_trips_at_the_written_path(
        root in writable_root(),
        segments in prop::collection::vec(segment(), 1 .. 4),
        value in leaf_value(),
    ) {
        let mut ctx = fresh_context();
        let target = path_of(root, segments);
        path::write(&mut ctx, &target, value.clone()).expect("writing a fresh path never conflicts");
        let read_back = path::read(&ctx, &target).expect("just-written path resolves");
        prop_assert_eq!(read_back, &value);
    }

    #[test]
    fn writing_through_inputs_is_always_rejected(
        segments in prop::collection::vec(segment(), 1 .. 4),
        value in leaf_value(),
    ) {
        let mut ctx = fresh_context();
        let target = path_of("inputs", segments);
        let err = path::write(&mut ctx, &target, value).expect_err("inputs is read-only");
        prop_assert!(matches!(err, PathError::ReadOnlyRoot(_)));
    }

    #[test]
    fn read_and_write_never_panic_on_an_arbitrary_dotted_string(
        raw in "[a-z.]{0,20}",
        value in leaf_value(),
    ) {
        let ctx = fresh_context();
        let _ = path::read(&ctx, &raw);
        let mut ctx = fresh_context();
        let _ = path::write(&mut ctx, &raw, value);
    }
}
