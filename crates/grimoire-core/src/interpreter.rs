// grimoire-core/src/interpreter.rs
// ============================================================================
// Module: Grimoire Flow Interpreter
// Description: The INIT/RUN/TRANSITION/PAUSE/DONE control loop that drives a
//              flow (or sub-flow) from a starting step to completion or a
//              checkpoint.
// Purpose: Own step sequencing, condition gating, prompt display, pause
//          checks, and output projection, delegating step-kind-specific work
//          to the dispatcher and action evaluation to the action evaluator.
// Dependencies: grimoire-template, serde_json
// ============================================================================

//! ## Overview
//! [`execute`] walks a flow one step at a time starting from a [`StartPoint`]:
//! the beginning, a specific step (as on resume), or immediately after a
//! `flow_call` step whose sub-flow just finished (as when bubbling a resume
//! back down through an enclosing call stack). At each step it checks the
//! cooperative pause signal, evaluates `condition`, renders and displays
//! `prompt`, runs `pre_actions`, dispatches the step's domain operation,
//! binds `result`, runs `actions`, and transitions to the next step. A flow
//! completing projects its `outputs`; a flow pausing returns a
//! [`Checkpoint`] plus the stack of enclosing `flow_call` frames still
//! waiting on it, mirroring the teacher's `ControlPlane::start_run` shape of
//! "either a finished outcome or a reason execution stopped early".

use serde_json::Value;

use grimoire_template::Adapter;

use crate::actions::run_action_list;
use crate::checkpoint::{Checkpoint, ResumeTicket};
use crate::context::ExecutionContext;
use crate::dispatcher::{dispatch_step, DispatchOutcome};
use crate::error::{InterpretError, RunError};
use crate::host::Host;
use crate::identifiers::{CorrelationId, FlowId, StepId};
use crate::model::{Flow, Step};
use crate::registry::FlowRegistry;
use crate::run_config::RunConfig;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Where execution should resume from within a flow.
#[derive(Debug, Clone)]
pub enum StartPoint {
    /// Start at the flow's first step, with a freshly constructed context.
    Beginning,
    /// Resume at a specific step, as recorded in a [`Checkpoint`].
    AtStep(StepId),
    /// Resume immediately after a `flow_call` step whose sub-flow just
    /// completed with `result`: skip dispatch, bind `result`, run the step's
    /// `actions`, and transition onward.
    AfterStep {
        /// The `flow_call` step that is resuming.
        step_id: StepId,
        /// The completed sub-flow's projected outputs.
        result: Value,
    },
}

/// The result of running a flow (or sub-flow) to either completion or a
/// pause.
#[derive(Debug, Clone)]
pub enum FlowOutcome {
    /// The flow ran to a step with no successor (or a `completion` step),
    /// carrying its projected `outputs`.
    Completed(Value),
    /// Execution paused at a resume point.
    Paused {
        /// The innermost frame execution paused inside.
        checkpoint: Checkpoint,
        /// Enclosing `flow_call` frames waiting on the paused frame,
        /// nearest caller first.
        parent_checkpoints: Vec<Checkpoint>,
    },
}

/// The result of a top-level [`run`] or [`resume`] call.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The run completed, carrying its projected `outputs`.
    Completed(Value),
    /// The run paused; persist the ticket to resume it later.
    Paused(ResumeTicket),
}

// ============================================================================
// SECTION: Public entry points
// ============================================================================

/// Starts `flow` fresh against `config`'s inputs, correlation id, and
/// collaborator deadline budget.
///
/// # Errors
/// Returns [`RunError`] if a required input is missing or if execution
/// fails at any step.
pub fn run(flow: &Flow, config: RunConfig, registry: &FlowRegistry, host: &Host) -> Result<RunOutcome, RunError> {
    let adapter = Adapter::new();
    let entry_step = entry_step_id(flow);
    let RunConfig { inputs, correlation_id, deadline } = config;
    check_required_inputs(&flow.inputs, &inputs)
        .map_err(|err| RunError::new(flow.id.clone(), entry_step.clone(), err))?;
    let mut ctx = ExecutionContext::new(inputs);
    ctx.set_run_meta(correlation_id, deadline);
    let outcome = execute(flow, &mut ctx, StartPoint::Beginning, registry, host, &adapter)?;
    Ok(into_run_outcome(outcome))
}

/// Resumes a previously paused run from `ticket`, popping enclosing
/// `flow_call` frames off the stack as each one's sub-flow completes.
/// `correlation_id`/`deadline` re-establish the cross-cutting run-scoped
/// settings a resumed context does not itself carry across serialization.
///
/// # Errors
/// Returns [`RunError`] if the ticket's flow version does not match the
/// registered flow, if a referenced flow or step no longer exists, or if
/// execution fails at any step.
pub fn resume(
    ticket: ResumeTicket,
    correlation_id: Option<CorrelationId>,
    deadline: Option<std::time::Duration>,
    registry: &FlowRegistry,
    host: &Host,
) -> Result<RunOutcome, RunError> {
    let adapter = Adapter::new();
    let ResumeTicket { checkpoint, parent_checkpoints } = ticket;
    let mut stack = parent_checkpoints;
    let mut frame = checkpoint;
    let mut start = StartPoint::AtStep(frame.step_id.clone());

    loop {
        let flow = lookup_for_resume(registry, &frame)?;
        let mut ctx = ExecutionContext::new(Value::Null);
        ctx.restore(frame.context.clone());
        ctx.set_run_meta(correlation_id.clone(), deadline);
        let outcome = execute(&flow, &mut ctx, start, registry, host, &adapter)?;

        match outcome {
            FlowOutcome::Paused { checkpoint: inner, parent_checkpoints: mut inner_stack } => {
                inner_stack.extend(stack);
                return Ok(RunOutcome::Paused(ResumeTicket { checkpoint: inner, parent_checkpoints: inner_stack }));
            }
            FlowOutcome::Completed(outputs) => match stack.split_first() {
                None => return Ok(RunOutcome::Completed(outputs)),
                Some((caller, rest)) => {
                    let caller = caller.clone();
                    stack = rest.to_vec();
                    start = StartPoint::AfterStep { step_id: caller.step_id.clone(), result: outputs };
                    frame = caller;
                }
            },
        }
    }
}

// ============================================================================
// SECTION: Sub-flow invocation
// ============================================================================

/// Invokes `flow_id` as a sub-flow with `inputs`, returning its outcome.
/// Used by both the `flow_call` action (which cannot itself pause) and the
/// `flow_call` step kind (which can). `parent` supplies the correlation id
/// and deadline budget the sub-flow's fresh context inherits, since the
/// caller's cross-cutting run settings apply to the whole call tree, not
/// just its outermost flow.
///
/// # Errors
/// Returns [`InterpretError::UnknownFlow`] if `flow_id` is not registered,
/// [`InterpretError::MissingInput`] if a required input is omitted, or
/// [`InterpretError::Nested`] wrapping the sub-flow's own [`RunError`].
pub(crate) fn invoke_subflow(
    flow_id: &FlowId,
    inputs: Value,
    registry: &FlowRegistry,
    host: &Host,
    adapter: &Adapter,
    parent: &ExecutionContext,
) -> Result<FlowOutcome, InterpretError> {
    let child = registry.get(flow_id).ok_or_else(|| InterpretError::UnknownFlow(flow_id.clone()))?;
    check_required_inputs(&child.inputs, &inputs)?;
    let mut ctx = ExecutionContext::new(inputs);
    ctx.set_run_meta(parent.correlation_id().cloned(), parent.deadline());
    execute(&child, &mut ctx, StartPoint::Beginning, registry, host, adapter)
        .map_err(|run_err| InterpretError::Nested(Box::new(run_err)))
}

// ============================================================================
// SECTION: Control loop
// ============================================================================

enum Advance {
    Step(StepId),
    Done,
}

/// Runs `flow` starting from `start`, returning once it completes or pauses.
///
/// # Errors
/// Returns [`RunError`] if any step fails to dispatch, any action fails, or
/// a `next_step`/resume reference names a step that does not exist.
pub(crate) fn execute(
    flow: &Flow,
    ctx: &mut ExecutionContext,
    start: StartPoint,
    registry: &FlowRegistry,
    host: &Host,
    adapter: &Adapter,
) -> Result<FlowOutcome, RunError> {
    let mut current = match &start {
        StartPoint::Beginning => entry_step_id(flow),
        StartPoint::AtStep(id) => id.clone(),
        StartPoint::AfterStep { step_id, .. } => step_id.clone(),
    };

    if let StartPoint::AfterStep { step_id, result } = start {
        let step = flow
            .step(&step_id)
            .ok_or_else(|| mk_err(flow, &step_id, InterpretError::UnknownStep(step_id.clone())))?;
        ctx.bind_result(result);
        run_action_list(&step.actions, ctx, adapter, registry, host, &flow.id, &step_id)?;
        match advance(flow, &step_id, step.next_step.clone())? {
            Advance::Step(id) => current = id,
            Advance::Done => return Ok(FlowOutcome::Completed(project_outputs(flow, ctx, host, &step_id)?)),
        }
    }

    loop {
        if host.cancel.is_cancelled() {
            return Err(mk_err(flow, &current, InterpretError::Cancelled));
        }

        let step = flow
            .step(&current)
            .ok_or_else(|| mk_err(flow, &current, InterpretError::UnknownStep(current.clone())))?;

        if flow.resume_points.contains(&current) && host.pause.is_set() {
            return Ok(FlowOutcome::Paused {
                checkpoint: Checkpoint {
                    flow_id: flow.id.clone(),
                    flow_version: flow.version,
                    step_id: current.clone(),
                    context: ctx.snapshot(),
                },
                parent_checkpoints: Vec::new(),
            });
        }

        let should_run = evaluate_condition(step, ctx, adapter).map_err(|err| mk_err(flow, &current, err))?;
        if !should_run {
            match advance(flow, &current, step.next_step.clone())? {
                Advance::Step(id) => {
                    current = id;
                    continue;
                }
                Advance::Done => return Ok(FlowOutcome::Completed(project_outputs(flow, ctx, host, &current)?)),
            }
        }

        if let Some(prompt) = &step.prompt {
            let rendered = adapter.render(prompt, &ctx.template_view()).map_err(|err| mk_err(flow, &current, err.into()))?;
            host.display.display(&Value::String(rendered));
        }

        run_action_list(&step.pre_actions, ctx, adapter, registry, host, &flow.id, &current)?;

        match dispatch_step(&flow.id, step, ctx, adapter, registry, host).map_err(|err| mk_err(flow, &current, err))? {
            DispatchOutcome::Paused { checkpoint, mut parent_checkpoints } => {
                parent_checkpoints.push(Checkpoint {
                    flow_id: flow.id.clone(),
                    flow_version: flow.version,
                    step_id: current.clone(),
                    context: ctx.snapshot(),
                });
                return Ok(FlowOutcome::Paused { checkpoint, parent_checkpoints });
            }
            DispatchOutcome::Ran { result, dynamic_next } => {
                ctx.bind_result(result);
                run_action_list(&step.actions, ctx, adapter, registry, host, &flow.id, &current)?;
                match advance(flow, &current, dynamic_next.or_else(|| step.next_step.clone()))? {
                    Advance::Step(id) => current = id,
                    Advance::Done => return Ok(FlowOutcome::Completed(project_outputs(flow, ctx, host, &current)?)),
                }
            }
            DispatchOutcome::Terminal { result } => {
                ctx.bind_result(result);
                run_action_list(&step.actions, ctx, adapter, registry, host, &flow.id, &current)?;
                return Ok(FlowOutcome::Completed(project_outputs(flow, ctx, host, &current)?));
            }
        }
    }
}

fn advance(flow: &Flow, current: &StepId, chosen_next: Option<StepId>) -> Result<Advance, RunError> {
    match chosen_next {
        Some(id) => {
            if flow.step(&id).is_none() {
                return Err(mk_err(flow, current, InterpretError::UnknownStep(id)));
            }
            Ok(Advance::Step(id))
        }
        None => {
            let position = flow.steps.iter().position(|step| &step.id == current);
            match position.and_then(|index| flow.steps.get(index + 1)) {
                Some(next) => Ok(Advance::Step(next.id.clone())),
                None => Ok(Advance::Done),
            }
        }
    }
}

fn evaluate_condition(step: &Step, ctx: &ExecutionContext, adapter: &Adapter) -> Result<bool, InterpretError> {
    match &step.condition {
        None => Ok(true),
        Some(condition) => {
            let rendered = adapter.render(condition, &ctx.template_view())?;
            Ok(!matches!(rendered.trim(), "" | "false" | "0"))
        }
    }
}

fn entry_step_id(flow: &Flow) -> StepId {
    flow.steps.first().map_or_else(|| StepId::new("<empty>"), |step| step.id.clone())
}

fn check_required_inputs(declared: &[crate::model::InputDecl], inputs: &Value) -> Result<(), InterpretError> {
    for decl in declared {
        if decl.required && inputs.get(decl.id.as_str()).is_none() {
            return Err(InterpretError::MissingInput(decl.id.clone()));
        }
    }
    Ok(())
}

fn project_outputs(flow: &Flow, ctx: &ExecutionContext, host: &Host, last_step: &StepId) -> Result<Value, RunError> {
    let outputs = ctx.outputs().clone();
    for decl in &flow.outputs {
        if !decl.validate {
            continue;
        }
        let value = outputs.get(decl.id.as_str()).cloned().unwrap_or(Value::Null);
        let validator = std::sync::Arc::clone(&host.validator);
        let type_name = decl.type_name.clone();
        let outcome = crate::host::call_with_deadline(ctx.deadline(), move || validator.validate(&type_name, &value))
            .map_err(InterpretError::from)
            .map_err(|err| mk_err(flow, last_step, err))?;
        if let crate::host::ValidationOutcome::Invalid(errors) = outcome {
            return Err(mk_err(
                flow,
                last_step,
                InterpretError::ValidationError { path: format!("outputs.{}", decl.id), errors },
            ));
        }
    }
    Ok(outputs)
}

fn mk_err(flow: &Flow, step_id: &StepId, source: InterpretError) -> RunError {
    RunError::new(flow.id.clone(), step_id.clone(), source)
}

fn into_run_outcome(outcome: FlowOutcome) -> RunOutcome {
    match outcome {
        FlowOutcome::Completed(outputs) => RunOutcome::Completed(outputs),
        FlowOutcome::Paused { checkpoint, parent_checkpoints } => RunOutcome::Paused(ResumeTicket { checkpoint, parent_checkpoints }),
    }
}

fn lookup_for_resume(registry: &FlowRegistry, frame: &Checkpoint) -> Result<std::sync::Arc<Flow>, RunError> {
    let flow = registry
        .get(&frame.flow_id)
        .ok_or_else(|| RunError::new(frame.flow_id.clone(), frame.step_id.clone(), InterpretError::UnknownFlow(frame.flow_id.clone())))?;
    if flow.version != frame.flow_version {
        return Err(RunError::new(
            frame.flow_id.clone(),
            frame.step_id.clone(),
            InterpretError::VersionMismatch { expected: frame.flow_version, found: flow.version },
        ));
    }
    Ok(flow)
}
