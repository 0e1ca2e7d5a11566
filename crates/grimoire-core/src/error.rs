// grimoire-core/src/error.rs
// ============================================================================
// Module: Grimoire Interpreter Errors
// Description: The leaf error type for interpretation and the run-level
//              wrapper that attaches flow/step/action context to it.
// Purpose: Ensure every error surfaced to a host names the flow, the step,
//          and (for action failures) the action's index and kind.
// Dependencies: thiserror
// ============================================================================

use grimoire_template::TemplateError;
use thiserror::Error;

use crate::host::CollaboratorError;
use crate::identifiers::{FlowId, InputId, StepId};
use crate::model::FlowValidationError;
use crate::path::PathError;

/// The leaf errors the interpreter can raise while running a single step.
#[derive(Debug, Error)]
pub enum InterpretError {
    /// A reference-path operation failed.
    #[error(transparent)]
    Path(#[from] PathError),
    /// A template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// A host collaborator failed.
    #[error(transparent)]
    Collaborator(CollaboratorError),
    /// A collaborator call exceeded its caller-supplied deadline budget
    /// (`RunConfig::deadline`). Distinct from [`Self::Collaborator`] so a
    /// timeout is recognizable without matching into the nested
    /// [`CollaboratorError`] variant.
    #[error("collaborator call timed out: {0}")]
    CollaboratorTimeout(String),
    /// A flow failed load-time validation when registered dynamically.
    #[error(transparent)]
    InvalidFlow(#[from] FlowValidationError),
    /// `flow_call` named a flow the registry does not contain.
    #[error("unknown flow: {0}")]
    UnknownFlow(FlowId),
    /// A `next_step`, choice, or resume target named a step that does not
    /// exist in the current flow.
    #[error("unknown step: {0}")]
    UnknownStep(StepId),
    /// A sub-flow call omitted a required input.
    #[error("missing required input: {0}")]
    MissingInput(InputId),
    /// `validate_value` reported the value invalid.
    #[error("validation failed at {path}: {errors:?}")]
    ValidationError {
        /// The reference path that was validated.
        path: String,
        /// The validator's reported violations.
        errors: Vec<String>,
    },
    /// The cancellation signal was observed.
    #[error("run cancelled")]
    Cancelled,
    /// A resume ticket's flow version did not match the registered flow.
    #[error("resume ticket version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// The version recorded in the resume ticket.
        expected: u32,
        /// The version of the currently registered flow.
        found: u32,
    },
    /// Two concurrently executing units of a parallel step wrote the same
    /// path.
    #[error("concurrent write conflict at {0}")]
    ConcurrentWriteConflict(String),
    /// A resume ticket referenced an empty call stack.
    #[error("resume ticket has no frames")]
    EmptyResumeStack,
    /// An action-level `flow_call` invoked a sub-flow that itself paused;
    /// pausing is only supported through the `flow_call` step kind.
    #[error("sub-flow invoked from an action cannot pause")]
    ActionFlowCallPaused(FlowId),
    /// A parallel unit's worker thread panicked before reporting a result.
    /// Not part of the specification's error taxonomy; needed because
    /// `std::thread::scope` join failures have no typed error of their own.
    #[error("parallel unit panicked: {0}")]
    ParallelUnitPanicked(String),
    /// A nested run failed and already carries its own fully-contextualized
    /// [`RunError`]: either a `flow_call` invoking a sub-flow, or a
    /// per-entry action list inside a `table_roll`/`dice_sequence` unit.
    /// Wrapping it preserves that context instead of re-describing the
    /// failure in terms of the enclosing step.
    #[error(transparent)]
    Nested(Box<RunError>),
}

impl From<CollaboratorError> for InterpretError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Timeout(detail) => InterpretError::CollaboratorTimeout(detail),
            other => InterpretError::Collaborator(other),
        }
    }
}

/// The action a failure occurred inside, for error reporting.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// The zero-based index of the action within its list.
    pub index: usize,
    /// The action's kind, e.g. `"set_value"`.
    pub kind: &'static str,
}

/// A fully contextualized run-time error: which flow, which step, and
/// (if the failure happened while evaluating an action) which action.
#[derive(Debug, Error)]
#[error("flow {flow_id} step {step_id}{}: {source}", self.action_suffix())]
pub struct RunError {
    /// The flow being run when the error occurred.
    pub flow_id: FlowId,
    /// The step being run when the error occurred.
    pub step_id: StepId,
    /// The action being evaluated, if the failure occurred during action
    /// evaluation rather than step dispatch.
    pub action: Option<ActionContext>,
    /// The underlying error.
    #[source]
    pub source: InterpretError,
}

impl RunError {
    pub(crate) fn new(flow_id: FlowId, step_id: StepId, source: InterpretError) -> Self {
        Self { flow_id, step_id, action: None, source }
    }

    pub(crate) fn in_action(mut self, index: usize, kind: &'static str) -> Self {
        self.action = Some(ActionContext { index, kind });
        self
    }

    fn action_suffix(&self) -> String {
        match &self.action {
            Some(action) => format!(" action {} ({})", action.index, action.kind),
            None => String::new(),
        }
    }
}
