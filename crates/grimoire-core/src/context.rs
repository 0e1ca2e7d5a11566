// grimoire-core/src/context.rs
// ============================================================================
// Module: Grimoire Execution Context
// Description: The mutable inputs/outputs/variables tree for one flow run.
// Purpose: Own the context state and expose the operations the action
//          evaluator and step dispatcher need, without leaking reference-path
//          mechanics to callers.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! One [`ExecutionContext`] exists per flow invocation (including each
//! sub-flow call, which gets a fresh, isolated context per the sub-flow
//! runtime's contract). It owns `inputs`, `outputs`, and `variables`, plus
//! the transient `result`, `item`, `key`, and `value` bindings used while a
//! step or an iteration within a step is running.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::identifiers::CorrelationId;
use crate::path::{self, PathError};

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// The mutable state a single flow (or sub-flow) run operates on.
///
/// Internally `inputs`/`outputs`/`variables` live as three keys of one
/// [`Value::Object`] tree (`root`) rather than three separate fields: the
/// reference-path resolver in [`crate::path`] walks a path's root segment as
/// part of the same traversal as the rest of the path, so the value it is
/// handed must already contain that segment.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    root: Value,
    result: Option<Value>,
    item: Option<Value>,
    key: Option<Value>,
    value: Option<Value>,
    correlation_id: Option<CorrelationId>,
    deadline: Option<Duration>,
}

impl ExecutionContext {
    /// Builds a fresh context from caller-supplied inputs. `outputs` and
    /// `variables` start empty; they are populated as paths are written.
    #[must_use]
    pub fn new(inputs: Value) -> Self {
        let mut root = Map::new();
        root.insert("inputs".to_string(), inputs);
        root.insert("outputs".to_string(), Value::Object(Map::new()));
        root.insert("variables".to_string(), Value::Object(Map::new()));
        Self { root: Value::Object(root), result: None, item: None, key: None, value: None, correlation_id: None, deadline: None }
    }

    /// Sets the correlation id and collaborator deadline budget for this
    /// run, carried from the caller's `RunConfig`. Propagates automatically
    /// to clones (parallel units) but not to a fresh sub-flow context,
    /// which must have it set explicitly from the parent's values.
    pub fn set_run_meta(&mut self, correlation_id: Option<CorrelationId>, deadline: Option<Duration>) {
        self.correlation_id = correlation_id;
        self.deadline = deadline;
    }

    /// Returns the run's correlation id, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Returns the run's per-collaborator-call deadline budget, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Reads the value at `path` (rooted at `inputs`, `outputs`, or
    /// `variables`).
    ///
    /// # Errors
    /// Propagates [`PathError`] from the underlying resolver.
    pub fn get(&self, path: &str) -> Result<&Value, PathError> {
        path::read(&self.root, path)
    }

    /// Writes `value` at `path`, creating intermediate mapping nodes.
    ///
    /// # Errors
    /// Propagates [`PathError`] from the underlying resolver, including
    /// [`PathError::ReadOnlyRoot`] for any attempt to write through
    /// `inputs`.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), PathError> {
        path::write(&mut self.root, path, value)
    }

    /// Atomically exchanges the values at `path1` and `path2`. Both sides
    /// may be rooted at `outputs` or `variables` in any combination, but
    /// neither may be rooted at `inputs`.
    ///
    /// # Errors
    /// Propagates [`PathError`] from the underlying resolver.
    pub fn swap(&mut self, path1: &str, path2: &str) -> Result<(), PathError> {
        path::swap(&mut self.root, path1, path2)
    }

    /// Binds the transient `result` value produced by the step that just
    /// ran. Cleared implicitly by the next call to [`Self::bind_result`].
    pub fn bind_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    /// Binds the transient `item` value for the current `dice_sequence`
    /// iteration.
    pub fn bind_item(&mut self, value: Value) {
        self.item = Some(value);
    }

    /// Clears the `item` binding once a `dice_sequence` step finishes.
    pub fn clear_item(&mut self) {
        self.item = None;
    }

    /// Binds the transient `key`/`value` pair for the current
    /// `table_from_values` iteration.
    pub fn bind_key_value(&mut self, key: Value, value: Value) {
        self.key = Some(key);
        self.value = Some(value);
    }

    /// Clears the `key`/`value` bindings once a `table_from_values` choice
    /// source finishes iterating.
    pub fn clear_key_value(&mut self) {
        self.key = None;
        self.value = None;
    }

    /// Binds only the transient `value` binding, used by a `table`-sourced
    /// choice (which has no `key` counterpart).
    pub fn bind_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    /// Clears the `value` binding.
    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Returns the most recently bound `result`, if any.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the final `outputs` tree, to project as a sub-flow's return
    /// value or the top-level run's result.
    #[must_use]
    pub fn outputs(&self) -> &Value {
        &self.root["outputs"]
    }

    /// Returns the current `variables` tree.
    #[must_use]
    pub fn variables(&self) -> &Value {
        &self.root["variables"]
    }

    /// Projects the context as a single JSON object suitable for template
    /// rendering: `inputs`, `outputs`, `variables`, plus whichever of
    /// `result`/`item`/`key`/`value` are currently bound. Unbound transient
    /// bindings are omitted entirely (not set to `null`) so strict template
    /// rendering can tell "unbound" apart from "bound to null".
    #[must_use]
    pub fn template_view(&self) -> Value {
        let mut map = match &self.root {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if let Some(result) = &self.result {
            map.insert("result".to_string(), result.clone());
        }
        if let Some(item) = &self.item {
            map.insert("item".to_string(), item.clone());
        }
        if let Some(key) = &self.key {
            map.insert("key".to_string(), key.clone());
        }
        if let Some(value) = &self.value {
            map.insert("value".to_string(), value.clone());
        }
        Value::Object(map)
    }

    /// Takes a deep snapshot of the durable state (`inputs`, `outputs`,
    /// `variables`) sufficient to resume at a later resume point. Transient
    /// bindings (`result`/`item`/`key`/`value`) are not part of the
    /// snapshot: a resume point only ever lands between steps, where they
    /// are unset.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            inputs: self.root["inputs"].clone(),
            outputs: self.root["outputs"].clone(),
            variables: self.root["variables"].clone(),
        }
    }

    /// Restores durable state from a snapshot, clearing any transient
    /// bindings.
    pub fn restore(&mut self, snapshot: ContextSnapshot) {
        let mut root = Map::new();
        root.insert("inputs".to_string(), snapshot.inputs);
        root.insert("outputs".to_string(), snapshot.outputs);
        root.insert("variables".to_string(), snapshot.variables);
        self.root = Value::Object(root);
        self.result = None;
        self.item = None;
        self.key = None;
        self.value = None;
    }
}

/// A deep, lossless copy of a context's durable state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContextSnapshot {
    /// The inputs tree at the time of the snapshot.
    pub inputs: Value,
    /// The outputs tree at the time of the snapshot.
    pub outputs: Value,
    /// The variables tree at the time of the snapshot.
    pub variables: Value,
}

#[cfg(test)]
mod tests {
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
        reason = "Test-only output and panic-based assertions are permitted."
    )]
    use super::*;
    use serde_json::json;

    #[test]
    fn inputs_are_read_only() {
        let mut ctx = ExecutionContext::new(json!({"name": "Kael"}));
        assert!(ctx.set("inputs.name", json!("Other")).is_err());
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.set("outputs.character.name", json!("Kael")).expect("set");
        assert_eq!(ctx.get("outputs.character.name").expect("get"), &json!("Kael"));
    }

    #[test]
    fn snapshot_round_trips_durable_state() {
        let mut ctx = ExecutionContext::new(json!({"a": 1}));
        ctx.set("variables.x", json!(10)).expect("set");
        ctx.bind_result(json!("transient"));
        let snap = ctx.snapshot();

        let mut restored = ExecutionContext::new(json!({}));
        restored.restore(snap);
        assert_eq!(restored.get("inputs.a").expect("get"), &json!(1));
        assert_eq!(restored.get("variables.x").expect("get"), &json!(10));
        assert!(restored.result().is_none());
    }

    #[test]
    fn template_view_omits_unbound_transients() {
        let ctx = ExecutionContext::new(json!({}));
        let view = ctx.template_view();
        assert!(view.get("result").is_none());
        assert!(view.get("item").is_none());
    }

    #[test]
    fn outputs_projects_a_flat_tree() {
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.set("outputs.x", json!(1)).expect("set");
        ctx.set("outputs.character.name", json!("Kael")).expect("set");
        assert_eq!(ctx.outputs(), &json!({"x": 1, "character": {"name": "Kael"}}));
    }

    #[test]
    fn template_view_exposes_outputs_without_double_nesting() {
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.set("outputs.x", json!(42)).expect("set");
        let view = ctx.template_view();
        assert_eq!(view.get("outputs").and_then(|o| o.get("x")), Some(&json!(42)));
    }

    #[test]
    fn run_meta_defaults_to_unset_and_is_cloned_with_the_context() {
        let mut ctx = ExecutionContext::new(json!({}));
        assert!(ctx.correlation_id().is_none());
        assert!(ctx.deadline().is_none());
        ctx.set_run_meta(Some(CorrelationId::new("req-1")), Some(Duration::from_millis(50)));
        let clone = ctx.clone();
        assert_eq!(clone.correlation_id(), Some(&CorrelationId::new("req-1")));
        assert_eq!(clone.deadline(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn restore_preserves_run_meta() {
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.set_run_meta(Some(CorrelationId::new("req-2")), Some(Duration::from_millis(25)));
        let snap = ctx.snapshot();
        ctx.restore(snap);
        assert_eq!(ctx.correlation_id(), Some(&CorrelationId::new("req-2")));
        assert_eq!(ctx.deadline(), Some(Duration::from_millis(25)));
    }
}
