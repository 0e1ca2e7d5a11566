// grimoire-core/src/dispatcher.rs
// ============================================================================
// Module: Grimoire Step Dispatcher
// Description: Runs one step's type-specific domain operation against its
//              declared `StepKind`.
// Purpose: Keep the eight step kinds' collaborator calls and transient
//          bindings in one place, independent of the surrounding control
//          loop's prompt/condition/transition handling.
// Dependencies: grimoire-template, serde_json
// ============================================================================

//! ## Overview
//! [`dispatch_step`] matches on a step's [`StepKind`] and returns a
//! [`DispatchOutcome`]: a bound `result` plus an optional dynamic
//! `next_step` override (`Ran`), a `result` that ends the flow (`Terminal`,
//! for `completion`), or a pause bubbled up from a nested `flow_call`
//! (`Paused`). The caller (the interpreter's control loop) is responsible
//! for binding `result` into the context, running the step's `actions`, and
//! transitioning; this module only produces the raw outcome.

use std::sync::Arc;

use serde_json::Value;

use grimoire_template::Adapter;

use crate::actions::{render_tree, run_action_list};
use crate::checkpoint::Checkpoint;
use crate::context::ExecutionContext;
use crate::error::InterpretError;
use crate::host::{call_with_deadline, ChoiceOption, Host};
use crate::identifiers::{FlowId, StepId};
use crate::model::{ChoiceSource, Step, StepKind};
use crate::registry::FlowRegistry;

/// The outcome of dispatching one step's domain operation.
pub(crate) enum DispatchOutcome {
    /// The step produced a `result` and, optionally, a dynamic `next_step`
    /// override that takes precedence over the step's static `next_step`.
    Ran {
        /// The value to bind as `result`.
        result: Value,
        /// A choice- or table-sourced `next_step` override, if any.
        dynamic_next: Option<StepId>,
    },
    /// The step ends the flow once its `actions` have run.
    Terminal {
        /// The value to bind as `result` before the flow completes.
        result: Value,
    },
    /// A nested `flow_call` step paused; propagate the pause upward.
    Paused {
        /// The innermost frame execution paused inside.
        checkpoint: Checkpoint,
        /// Enclosing `flow_call` frames collected so far, nearest caller
        /// first (not yet including this step's own frame).
        parent_checkpoints: Vec<Checkpoint>,
    },
}

/// Dispatches `step`'s domain operation.
///
/// # Errors
/// Returns the collaborator's or action evaluator's [`InterpretError`] on
/// failure.
pub(crate) fn dispatch_step(
    flow_id: &FlowId,
    step: &Step,
    ctx: &mut ExecutionContext,
    adapter: &Adapter,
    registry: &FlowRegistry,
    host: &Host,
) -> Result<DispatchOutcome, InterpretError> {
    match &step.kind {
        StepKind::DiceRoll { roll } => {
            let result = roll_dice(roll, ctx, adapter, host)?;
            Ok(DispatchOutcome::Ran { result, dynamic_next: None })
        }
        StepKind::DiceSequence { sequence } => {
            let result = run_dice_sequence(flow_id, step, sequence, ctx, adapter, registry, host)?;
            Ok(DispatchOutcome::Ran { result, dynamic_next: None })
        }
        StepKind::PlayerChoice { source } => dispatch_player_choice(flow_id, step, source, ctx, adapter, registry, host),
        StepKind::TableRoll { tables } => {
            let result = run_table_roll(flow_id, step, tables, ctx, adapter, registry, host)?;
            Ok(DispatchOutcome::Ran { result, dynamic_next: None })
        }
        StepKind::PlayerInput => {
            let text_prompt = Arc::clone(&host.text_prompt);
            let prompt = step.prompt.clone();
            let answer = call_with_deadline(ctx.deadline(), move || text_prompt.prompt_text(prompt.as_deref()))?;
            Ok(DispatchOutcome::Ran { result: Value::String(answer), dynamic_next: None })
        }
        StepKind::LlmGeneration { prompt_id, prompt_data, llm_settings } => {
            let rendered_data = render_tree(prompt_data, ctx, adapter)?;
            let llm = Arc::clone(&host.llm);
            let prompt_id = prompt_id.clone();
            let llm_settings = llm_settings.clone();
            let completion =
                call_with_deadline(ctx.deadline(), move || llm.complete(prompt_id.as_str(), &rendered_data, &llm_settings))?;
            Ok(DispatchOutcome::Ran { result: Value::String(completion), dynamic_next: None })
        }
        StepKind::NameGeneration { generator, settings } => {
            let names = Arc::clone(&host.names);
            let generator = generator.clone();
            let settings = settings.clone();
            let result = call_with_deadline(ctx.deadline(), move || names.generate_name(&generator, &settings))?;
            Ok(DispatchOutcome::Ran { result, dynamic_next: None })
        }
        StepKind::Completion => Ok(DispatchOutcome::Terminal { result: Value::Null }),
        StepKind::FlowCall { flow, inputs } => {
            let rendered_inputs = render_tree(inputs, ctx, adapter)?;
            match crate::interpreter::invoke_subflow(flow, rendered_inputs, registry, host, adapter, ctx)? {
                crate::interpreter::FlowOutcome::Completed(outputs) => {
                    Ok(DispatchOutcome::Ran { result: outputs, dynamic_next: None })
                }
                crate::interpreter::FlowOutcome::Paused { checkpoint, parent_checkpoints } => {
                    Ok(DispatchOutcome::Paused { checkpoint, parent_checkpoints })
                }
            }
        }
    }
}

// ============================================================================
// SECTION: dice_roll / dice_sequence
// ============================================================================

fn roll_dice(roll: &str, ctx: &ExecutionContext, adapter: &Adapter, host: &Host) -> Result<Value, InterpretError> {
    let rendered = adapter.render(roll, &ctx.template_view())?;
    let outcome = roll_with_deadline(&host.dice, &rendered, ctx.deadline())?;
    Ok(serde_json::to_value(outcome).unwrap_or(Value::Null))
}

/// Rolls `expr` against `dice`, enforcing `budget` via
/// [`call_with_deadline`]. Factored out since every dice-rolling call site
/// (a single `dice_roll`, each `dice_sequence` item, sequential or
/// parallel) needs the same Arc-clone-and-wrap dance.
fn roll_with_deadline(
    dice: &std::sync::Arc<dyn crate::host::DiceRoller>,
    expr: &str,
    budget: Option<std::time::Duration>,
) -> Result<crate::host::DiceOutcome, InterpretError> {
    let dice = Arc::clone(dice);
    let expr = expr.to_string();
    Ok(call_with_deadline(budget, move || dice.roll(&expr))?)
}

fn run_dice_sequence(
    flow_id: &FlowId,
    step: &Step,
    sequence: &crate::model::DiceSequenceSpec,
    ctx: &mut ExecutionContext,
    adapter: &Adapter,
    registry: &FlowRegistry,
    host: &Host,
) -> Result<Value, InterpretError> {
    let items = ctx.get(&sequence.items)?.clone();
    let items = items.as_array().cloned().unwrap_or_default();

    if step.parallel {
        crate::parallel::run_units(ctx, build_units(items.len(), |index| {
            let item = items[index].clone();
            let roll = sequence.roll.clone();
            let actions = sequence.actions.clone();
            let flow_id = flow_id.clone();
            let step_id = step.id.clone();
            Box::new(move |unit_ctx: &mut ExecutionContext| -> Result<(), InterpretError> {
                run_sequence_item(unit_ctx, adapter, registry, host, &flow_id, &step_id, &roll, item, &actions, index)
            })
        }))?;
        collect_scratch_results(ctx, "variables.__dice_sequence", items.len())
    } else {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            ctx.bind_item(item.clone());
            let rendered = adapter.render(&sequence.roll, &ctx.template_view())?;
            let outcome = roll_with_deadline(&host.dice, &rendered, ctx.deadline())?;
            let outcome_value = serde_json::to_value(&outcome).unwrap_or(Value::Null);
            ctx.bind_result(outcome_value.clone());
            run_action_list(&sequence.actions, ctx, adapter, registry, host, flow_id, &step.id)
                .map_err(|run_err| InterpretError::Nested(Box::new(run_err)))?;
            outcomes.push(outcome_value);
        }
        ctx.clear_item();
        Ok(Value::Array(outcomes))
    }
}

#[allow(clippy::too_many_arguments)]
fn run_sequence_item(
    ctx: &mut ExecutionContext,
    adapter: &Adapter,
    registry: &FlowRegistry,
    host: &Host,
    flow_id: &crate::identifiers::FlowId,
    step_id: &StepId,
    roll: &str,
    item: Value,
    actions: &[crate::model::Action],
    index: usize,
) -> Result<(), InterpretError> {
    ctx.bind_item(item);
    let rendered = adapter.render(roll, &ctx.template_view())?;
    let outcome = roll_with_deadline(&host.dice, &rendered, ctx.deadline())?;
    let outcome_value = serde_json::to_value(&outcome).unwrap_or(Value::Null);
    ctx.bind_result(outcome_value.clone());
    run_action_list(actions, ctx, adapter, registry, host, flow_id, step_id).map_err(|run_err| InterpretError::Nested(Box::new(run_err)))?;
    ctx.clear_item();
    ctx.set(&format!("variables.__dice_sequence.{index}"), outcome_value)?;
    Ok(())
}

// ============================================================================
// SECTION: table_roll
// ============================================================================

fn run_table_roll(
    flow_id: &FlowId,
    step: &Step,
    tables: &[crate::model::TableRollEntry],
    ctx: &mut ExecutionContext,
    adapter: &Adapter,
    registry: &FlowRegistry,
    host: &Host,
) -> Result<Value, InterpretError> {
    if step.parallel {
        let deadline = ctx.deadline();
        crate::parallel::run_units(ctx, build_units(tables.len(), |index| {
            let entry = tables[index].clone();
            let flow_id = flow_id.clone();
            let step_id = step.id.clone();
            Box::new(move |unit_ctx: &mut ExecutionContext| -> Result<(), InterpretError> {
                let outcome = roll_table_with_deadline(&host.tables, &entry.table, deadline)?;
                let outcome_value = serde_json::to_value(&outcome).unwrap_or(Value::Null);
                unit_ctx.bind_result(outcome_value.clone());
                run_action_list(&entry.actions, unit_ctx, adapter, registry, host, &flow_id, &step_id)
                    .map_err(|run_err| InterpretError::Nested(Box::new(run_err)))?;
                unit_ctx.set(&format!("variables.__table_roll.{index}"), outcome_value)?;
                Ok(())
            })
        }))?;
        collect_scratch_results(ctx, "variables.__table_roll", tables.len())
    } else {
        let mut outcomes = Vec::with_capacity(tables.len());
        for entry in tables {
            let outcome = roll_table_with_deadline(&host.tables, &entry.table, ctx.deadline())?;
            let outcome_value = serde_json::to_value(&outcome).unwrap_or(Value::Null);
            ctx.bind_result(outcome_value.clone());
            run_action_list(&entry.actions, ctx, adapter, registry, host, flow_id, &step.id)
                .map_err(|run_err| InterpretError::Nested(Box::new(run_err)))?;
            outcomes.push(outcome_value);
        }
        Ok(Value::Array(outcomes))
    }
}

/// Rolls `table` against `tables`, enforcing `budget` via
/// [`call_with_deadline`].
fn roll_table_with_deadline(
    tables: &std::sync::Arc<dyn crate::host::TableStore>,
    table: &str,
    budget: Option<std::time::Duration>,
) -> Result<crate::host::TableOutcome, InterpretError> {
    let tables = Arc::clone(tables);
    let table = table.to_string();
    Ok(call_with_deadline(budget, move || tables.roll_table(&table))?)
}

// ============================================================================
// SECTION: player_choice
// ============================================================================

fn dispatch_player_choice(
    flow_id: &FlowId,
    step: &Step,
    source: &ChoiceSource,
    ctx: &mut ExecutionContext,
    adapter: &Adapter,
    registry: &FlowRegistry,
    host: &Host,
) -> Result<DispatchOutcome, InterpretError> {
    match source {
        ChoiceSource::Static { choices } => {
            let mut options = Vec::with_capacity(choices.len());
            for choice in choices {
                let label = adapter.render(&choice.label, &ctx.template_view())?;
                options.push(ChoiceOption { id: choice.id.as_str().to_string(), label });
            }
            let selected = present_choice_with_deadline(&host.choices, step.prompt.clone(), options, ctx.deadline())?;
            let choice = choices
                .iter()
                .find(|choice| choice.id.as_str() == selected)
                .ok_or_else(|| InterpretError::Collaborator(crate::host::CollaboratorError::Interaction(format!("no such choice: {selected}"))))?;
            ctx.bind_result(Value::String(choice.id.as_str().to_string()));
            run_action_list(&choice.actions, ctx, adapter, registry, host, flow_id, &step.id)
                .map_err(|run_err| InterpretError::Nested(Box::new(run_err)))?;
            Ok(DispatchOutcome::Ran {
                result: Value::String(choice.id.as_str().to_string()),
                dynamic_next: choice.next_step.clone(),
            })
        }
        ChoiceSource::Table { table, display_format, selection_count, actions, next_step } => {
            let count = selection_count.unwrap_or(1).max(1) as usize;
            let mut entries = Vec::with_capacity(count);
            let mut options = Vec::with_capacity(count);
            for index in 0..count {
                let outcome = roll_table_with_deadline(&host.tables, table, ctx.deadline())?;
                let entry = outcome.entry;
                ctx.bind_value(entry.clone());
                let label = render_display(display_format.as_deref(), ctx, adapter, &entry)?;
                options.push(ChoiceOption { id: index.to_string(), label });
                entries.push(entry);
            }
            ctx.clear_value();
            let selected = present_choice_with_deadline(&host.choices, step.prompt.clone(), options, ctx.deadline())?;
            let index: usize = selected
                .parse()
                .ok()
                .filter(|index| *index < entries.len())
                .ok_or_else(|| InterpretError::Collaborator(crate::host::CollaboratorError::Interaction(format!("no such row: {selected}"))))?;
            let entry = entries.swap_remove(index);
            ctx.bind_value(entry.clone());
            ctx.bind_result(entry.clone());
            run_action_list(actions, ctx, adapter, registry, host, flow_id, &step.id)
                .map_err(|run_err| InterpretError::Nested(Box::new(run_err)))?;
            ctx.clear_value();
            Ok(DispatchOutcome::Ran { result: entry, dynamic_next: next_step.clone() })
        }
        ChoiceSource::TableFromValues { values, display_format, selection_count, actions, next_step } => {
            let mapping = ctx.get(values)?.clone();
            let mut entries = entries_of(&mapping);
            if let Some(limit) = selection_count {
                entries.truncate(*limit as usize);
            }
            let mut options = Vec::with_capacity(entries.len());
            for (key, value) in &entries {
                ctx.bind_key_value(Value::String(key.clone()), value.clone());
                let label = render_display(display_format.as_deref(), ctx, adapter, value)?;
                options.push(ChoiceOption { id: key.clone(), label });
            }
            ctx.clear_key_value();
            let selected = present_choice_with_deadline(&host.choices, step.prompt.clone(), options, ctx.deadline())?;
            let (key, value) = entries
                .into_iter()
                .find(|(key, _)| key == &selected)
                .ok_or_else(|| InterpretError::Collaborator(crate::host::CollaboratorError::Interaction(format!("no such entry: {selected}"))))?;
            ctx.bind_key_value(Value::String(key), value.clone());
            ctx.bind_result(value.clone());
            run_action_list(actions, ctx, adapter, registry, host, flow_id, &step.id)
                .map_err(|run_err| InterpretError::Nested(Box::new(run_err)))?;
            ctx.clear_key_value();
            Ok(DispatchOutcome::Ran { result: value, dynamic_next: next_step.clone() })
        }
    }
}

/// Presents `options` via `choices`, enforcing `budget` via
/// [`call_with_deadline`].
fn present_choice_with_deadline(
    choices: &std::sync::Arc<dyn crate::host::ChoicePresenter>,
    prompt: Option<String>,
    options: Vec<ChoiceOption>,
    budget: Option<std::time::Duration>,
) -> Result<String, InterpretError> {
    let choices = Arc::clone(choices);
    Ok(call_with_deadline(budget, move || choices.present_choice(prompt.as_deref(), &options))?)
}

fn render_display(format: Option<&str>, ctx: &ExecutionContext, adapter: &Adapter, value: &Value) -> Result<String, InterpretError> {
    match format {
        Some(template) => Ok(adapter.render(template, &ctx.template_view())?),
        None => Ok(match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }),
    }
}

fn entries_of(mapping: &Value) -> Vec<(String, Value)> {
    match mapping {
        Value::Object(map) => map.iter().map(|(key, value)| (key.clone(), value.clone())).collect(),
        Value::Array(list) => list.iter().enumerate().map(|(index, value)| (index.to_string(), value.clone())).collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// SECTION: Parallel-unit helpers
// ============================================================================

fn build_units<F>(count: usize, build: F) -> Vec<Box<dyn FnOnce(&mut ExecutionContext) -> Result<(), InterpretError> + Send>>
where
    F: Fn(usize) -> Box<dyn FnOnce(&mut ExecutionContext) -> Result<(), InterpretError> + Send>,
{
    (0..count).map(build).collect()
}

fn collect_scratch_results(ctx: &mut ExecutionContext, prefix: &str, count: usize) -> Result<Value, InterpretError> {
    let mut outcomes = Vec::with_capacity(count);
    for index in 0..count {
        let path = format!("{prefix}.{index}");
        outcomes.push(ctx.get(&path)?.clone());
    }
    // The scratch bucket is an implementation detail of merging parallel
    // writes; it never appears in `outputs`/`variables` declared by a flow
    // author, so it is cleared immediately rather than left in `variables`.
    ctx.set(prefix, Value::Null)?;
    Ok(Value::Array(outcomes))
}
