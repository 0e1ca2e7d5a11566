// crates/grimoire-template/tests/proptest_adapter.rs
// ============================================================================
// Module: Template Adapter Property Tests
// Description: Property tests for rendering against arbitrary context trees.
// Purpose: Detect panics and type-preservation violations across a wide
//          range of context shapes and leaf values, not just the handful
//          the unit tests happen to name.
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

use grimoire_template::Adapter;
use proptest::prelude::*;
use serde_json::{json, Value};

/// A JSON leaf whose round trip through the template engine is exact:
/// floats are excluded since MiniJinja's numeric formatting does not
/// guarantee bit-for-bit round tripping through `render_value`.
fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|v| json!(v)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,5}"
}

fn json_value_strategy(max_depth: u32) -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(max_depth, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(key(), inner, 0..4).prop_map(|map| {
                let mut object = serde_json::Map::new();
                for (k, v) in map {
                    object.insert(k, v);
                }
                Value::Object(object)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn render_value_preserves_a_bound_leafs_type_and_value(name in key(), value in leaf_value()) {
        let adapter = Adapter::new();
        let mut outputs = serde_json::Map::new();
        outputs.insert(name.clone(), value.clone());
        let ctx = json!({"outputs": Value::Object(outputs)});
        let template = format!("{{{{ outputs.{name} }}}}");
        let rendered = adapter.render_value(&template, &ctx).expect("bound reference always resolves");
        prop_assert_eq!(rendered, value);
    }

    #[test]
    fn rendering_never_panics_on_an_arbitrary_context_tree(
        tree in json_value_strategy(3),
        template in "\\{\\{ ?outputs(\\.[a-z]{1,5}){0,3} ?\\}\\}",
    ) {
        let adapter = Adapter::new();
        let ctx = json!({"outputs": tree});
        let _ = adapter.render(&template, &ctx);
        let _ = adapter.render_value(&template, &ctx);
    }

    #[test]
    fn a_literal_string_with_no_braces_always_renders_unchanged(text in "[a-zA-Z0-9 ]{0,24}") {
        let adapter = Adapter::new();
        let ctx = json!({});
        prop_assume!(!text.contains("{{") && !text.contains("{%"));
        let rendered = adapter.render(&text, &ctx).expect("a literal has nothing to resolve");
        prop_assert_eq!(rendered, text);
    }
}
