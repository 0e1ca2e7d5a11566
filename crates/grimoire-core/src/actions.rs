// grimoire-core/src/actions.rs
// ============================================================================
// Module: Grimoire Action Evaluator
// Description: Executes an ordered action list against the execution context.
// Purpose: Give every step kind one shared mutation/side-effect vocabulary,
//          so flow authors never reach past the action language into the
//          context directly.
// Dependencies: grimoire-template, serde_json
// ============================================================================

//! ## Overview
//! [`run_action_list`] runs a `pre_actions` or `actions` list in document
//! order, aborting on the first failure and reporting which action (by
//! index and kind) failed. `flow_call` is the one action that recurses back
//! into [`crate::interpreter::execute`]; every other action is a direct,
//! synchronous operation on the [`ExecutionContext`] or a `host` sink.

use std::sync::Arc;

use grimoire_template::Adapter;
use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::error::{InterpretError, RunError};
use crate::host::{call_with_deadline, Host};
use crate::identifiers::{FlowId, StepId};
use crate::model::Action;
use crate::registry::FlowRegistry;

/// Runs `actions` in order against `ctx`, aborting on the first failure.
///
/// # Errors
/// Returns the first action's error, wrapped with its index and kind via
/// [`RunError::in_action`].
pub fn run_action_list(
    actions: &[Action],
    ctx: &mut ExecutionContext,
    adapter: &Adapter,
    registry: &FlowRegistry,
    host: &Host,
    flow_id: &FlowId,
    step_id: &StepId,
) -> Result<(), RunError> {
    for (index, action) in actions.iter().enumerate() {
        run_one(action, ctx, adapter, registry, host, flow_id, step_id)
            .map_err(|source| RunError::new(flow_id.clone(), step_id.clone(), source).in_action(index, action_kind(action)))?;
    }
    Ok(())
}

fn action_kind(action: &Action) -> &'static str {
    match action {
        Action::SetValue { .. } => "set_value",
        Action::SwapValues { .. } => "swap_values",
        Action::DisplayValue { .. } => "display_value",
        Action::ValidateValue { .. } => "validate_value",
        Action::LogEvent { .. } => "log_event",
        Action::LogMessage { .. } => "log_message",
        Action::FlowCall { .. } => "flow_call",
    }
}

fn run_one(
    action: &Action,
    ctx: &mut ExecutionContext,
    adapter: &Adapter,
    registry: &FlowRegistry,
    host: &Host,
    flow_id: &FlowId,
    step_id: &StepId,
) -> Result<(), InterpretError> {
    match action {
        Action::SetValue { path, value } => {
            let path = render_path(path, ctx, adapter)?;
            let rendered = render_leaf(value, ctx, adapter)?;
            ctx.set(&path, rendered)?;
            Ok(())
        }
        Action::SwapValues { path1, path2 } => {
            let path1 = render_path(path1, ctx, adapter)?;
            let path2 = render_path(path2, ctx, adapter)?;
            ctx.swap(&path1, &path2)?;
            Ok(())
        }
        Action::DisplayValue { path } => {
            let path = render_path(path, ctx, adapter)?;
            let value = ctx.get(&path)?.clone();
            host.display.display(&value);
            Ok(())
        }
        Action::ValidateValue { path, type_name } => {
            let path = render_path(path, ctx, adapter)?;
            let value = ctx.get(&path)?.clone();
            let validator = Arc::clone(&host.validator);
            let type_name = type_name.clone();
            let outcome = call_with_deadline(ctx.deadline(), move || validator.validate(&type_name, &value))?;
            match outcome {
                crate::host::ValidationOutcome::Valid => Ok(()),
                crate::host::ValidationOutcome::Invalid(errors) => {
                    Err(InterpretError::ValidationError { path: path.clone(), errors })
                }
            }
        }
        Action::LogEvent { event_type, data } => {
            let rendered = render_tree(data, ctx, adapter)?;
            let rendered = with_correlation_id(rendered, ctx.correlation_id());
            host.events.log_event(event_type, &rendered);
            Ok(())
        }
        Action::LogMessage { message } => {
            let rendered = adapter.render(message, &ctx.template_view())?;
            host.events.log_message(&rendered);
            Ok(())
        }
        Action::FlowCall { flow, inputs, actions } => {
            let rendered_inputs = render_tree(inputs, ctx, adapter)?;
            let outcome = crate::interpreter::invoke_subflow(flow, rendered_inputs, registry, host, adapter, ctx)?;
            match outcome {
                crate::interpreter::FlowOutcome::Completed(outputs) => {
                    ctx.bind_result(outputs);
                    run_action_list(actions, ctx, adapter, registry, host, flow_id, step_id)?;
                    Ok(())
                }
                crate::interpreter::FlowOutcome::Paused { .. } => {
                    Err(InterpretError::ActionFlowCallPaused(flow.clone()))
                }
            }
        }
    }
}

/// Merges the run's correlation id into a rendered `log_event` payload, so a
/// host's observability stack can tie every event from one run together
/// without the flow author having to reference it explicitly. Only merges
/// into an object payload, and never overwrites a `correlation_id` key the
/// flow author already set.
fn with_correlation_id(data: Value, correlation_id: Option<&crate::identifiers::CorrelationId>) -> Value {
    match (data, correlation_id) {
        (Value::Object(mut map), Some(correlation_id)) => {
            map.entry("correlation_id").or_insert_with(|| Value::String(correlation_id.as_str().to_string()));
            Value::Object(map)
        }
        (data, _) => data,
    }
}

/// Renders a reference path as a template, so a dynamic segment such as
/// `outputs.m.{{ item }}` resolves against the currently bound `item`/`key`/
/// `value` before the path resolver ever sees it. A path with no `{{ ... }}`
/// in it renders to itself unchanged.
fn render_path(path: &str, ctx: &ExecutionContext, adapter: &Adapter) -> Result<String, InterpretError> {
    Ok(adapter.render(path, &ctx.template_view())?)
}

/// Renders a top-level action value: a `String` is rendered (type-preserving
/// for a sole `{{ ... }}` expression); any other JSON value passes through
/// verbatim, per §4.4's `set_value` semantics.
fn render_leaf(value: &Value, ctx: &ExecutionContext, adapter: &Adapter) -> Result<Value, InterpretError> {
    match value {
        Value::String(template) => Ok(adapter.render_value(template, &ctx.template_view())?),
        other => Ok(other.clone()),
    }
}

/// Recursively renders every string leaf of a JSON tree (used for
/// `log_event.data`, `flow_call.inputs`, and `llm_generation.prompt_data`,
/// all of which are documented as "rendered as a template" over a
/// structured payload rather than a single scalar).
pub(crate) fn render_tree(value: &Value, ctx: &ExecutionContext, adapter: &Adapter) -> Result<Value, InterpretError> {
    match value {
        Value::String(template) => Ok(adapter.render_value(template, &ctx.template_view())?),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                out.insert(key.clone(), render_tree(val, ctx, adapter)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(render_tree(item, ctx, adapter)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
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
    fn render_path_resolves_a_dynamic_segment_against_a_bound_item() {
        let adapter = Adapter::new();
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.bind_item(json!("strength"));
        let path = render_path("outputs.abilities.{{ item }}.bonus", &ctx, &adapter).expect("item is bound");
        assert_eq!(path, "outputs.abilities.strength.bonus");
    }

    #[test]
    fn render_path_passes_through_a_literal_path_unchanged() {
        let adapter = Adapter::new();
        let ctx = ExecutionContext::new(json!({}));
        let path = render_path("outputs.character.name", &ctx, &adapter).expect("no template to resolve");
        assert_eq!(path, "outputs.character.name");
    }

    #[test]
    fn render_leaf_preserves_the_json_type_of_a_sole_expression() {
        let adapter = Adapter::new();
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.bind_result(json!({"total": 7}));
        let value = render_leaf(&json!("{{ result.total }}"), &ctx, &adapter).expect("result is bound");
        assert_eq!(value, json!(7));
    }

    #[test]
    fn render_leaf_passes_non_string_values_through_verbatim() {
        let adapter = Adapter::new();
        let ctx = ExecutionContext::new(json!({}));
        let value = render_leaf(&json!(["a", "b"]), &ctx, &adapter).expect("non-string values do not render");
        assert_eq!(value, json!(["a", "b"]));
    }

    #[test]
    fn with_correlation_id_merges_into_an_object_payload_without_overwriting() {
        use crate::identifiers::CorrelationId;

        let id = CorrelationId::new("req-1");
        let merged = with_correlation_id(json!({"kind": "attack"}), Some(&id));
        assert_eq!(merged, json!({"kind": "attack", "correlation_id": "req-1"}));

        let untouched = with_correlation_id(json!({"correlation_id": "explicit"}), Some(&id));
        assert_eq!(untouched, json!({"correlation_id": "explicit"}));

        let scalar = with_correlation_id(json!("just a string"), Some(&id));
        assert_eq!(scalar, json!("just a string"));

        let no_id = with_correlation_id(json!({"kind": "attack"}), None);
        assert_eq!(no_id, json!({"kind": "attack"}));
    }

    #[test]
    fn render_tree_renders_every_string_leaf_of_a_nested_structure() {
        let adapter = Adapter::new();
        let mut ctx = ExecutionContext::new(json!({}));
        ctx.bind_item(json!("gold"));
        let rendered = render_tree(
            &json!({"label": "found {{ item }}", "count": 3, "tags": ["loot", "{{ item }}"]}),
            &ctx,
            &adapter,
        )
        .expect("item is bound");
        assert_eq!(rendered, json!({"label": "found gold", "count": 3, "tags": ["loot", "gold"]}));
    }
}
