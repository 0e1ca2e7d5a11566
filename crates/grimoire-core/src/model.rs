// grimoire-core/src/model.rs
// ============================================================================
// Module: Grimoire Flow Model
// Description: The immutable, load-time-validated shape of a flow document.
// Purpose: Define Flow/Step/Action and the validation battery that load-time
//          tooling runs before a flow is handed to the interpreter.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Flow`] is immutable once loaded. `grimoire-config` is responsible for
//! turning raw YAML into a `Flow` and calling [`Flow::validate`]; this module
//! owns the shape and the validation rules themselves so both the config
//! loader and any in-process flow builder (tests, the CLI) share one
//! definition of "valid".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::identifiers::{ChoiceId, FlowId, InputId, OutputId, PromptId, StepId, VariableId};

// ============================================================================
// SECTION: Declarations
// ============================================================================

/// An `inputs` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDecl {
    /// The declared type name (a basic type or a registered model name).
    #[serde(rename = "type")]
    pub type_name: String,
    /// The input's identifier, addressed as `inputs.<id>`.
    pub id: InputId,
    /// Whether the caller must supply this input.
    #[serde(default)]
    pub required: bool,
}

/// An `outputs` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDecl {
    /// The declared type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The output's identifier, addressed as `outputs.<id>`.
    pub id: OutputId,
    /// Whether `validate_value` should be run against this output before
    /// the flow completes.
    #[serde(default)]
    pub validate: bool,
}

/// A `variables` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    /// The declared type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The variable's identifier, addressed as `variables.<id>`.
    pub id: VariableId,
    /// Whether `validate_value` should be run against this variable when
    /// written.
    #[serde(default)]
    pub validate: bool,
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// A single action in an action list (`pre_actions`, `actions`, or nested
/// inside a `flow_call` action).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Renders `value` (if it is a string) and writes it at `path`.
    SetValue {
        /// The reference path to write.
        path: String,
        /// The value to write; rendered as a template first if it is a
        /// string.
        value: Value,
    },
    /// Atomically exchanges the values at `path1` and `path2`.
    SwapValues {
        /// The first reference path.
        path1: String,
        /// The second reference path.
        path2: String,
    },
    /// Emits the value at `path` to the user-facing display sink.
    DisplayValue {
        /// The reference path to display.
        path: String,
    },
    /// Validates the value at `path` against a declared type.
    ValidateValue {
        /// The reference path to validate.
        path: String,
        /// The type name to validate against.
        #[serde(rename = "type")]
        type_name: String,
    },
    /// Emits a structured event through the event sink.
    LogEvent {
        /// The event's type tag.
        #[serde(rename = "type")]
        event_type: String,
        /// Event payload; string leaves are rendered as templates.
        #[serde(default)]
        data: Value,
    },
    /// Emits a rendered message through the event sink.
    LogMessage {
        /// The message template.
        message: String,
    },
    /// Invokes a sub-flow, then runs `actions` with `result` bound to the
    /// sub-flow's projected outputs.
    FlowCall {
        /// The sub-flow to invoke.
        flow: FlowId,
        /// Sub-flow inputs; string leaves are rendered against the
        /// caller's context before the sub-flow runs.
        #[serde(default)]
        inputs: Value,
        /// Actions to run after the sub-flow completes.
        #[serde(default)]
        actions: Vec<Action>,
    },
}

// ============================================================================
// SECTION: Step kinds
// ============================================================================

/// A static choice offered by a `player_choice` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// The choice's identifier; becomes `result` when selected.
    pub id: ChoiceId,
    /// The label shown to the player; rendered as a template.
    pub label: String,
    /// Actions to run after this choice is selected.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Overrides the step's `next_step` when this choice is selected.
    #[serde(default)]
    pub next_step: Option<StepId>,
}

/// Where a `player_choice` step's options come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceSource {
    /// A fixed, authored list of options.
    Static {
        /// The list of options to present.
        choices: Vec<Choice>,
    },
    /// Options generated from a random table.
    Table {
        /// The table to roll for options.
        table: String,
        /// Template used to render each row for display. `value` is bound
        /// to the row before rendering.
        #[serde(default)]
        display_format: Option<String>,
        /// Number of rows to draw from the table before presenting them as
        /// choices. Defaults to one.
        #[serde(default)]
        selection_count: Option<u32>,
        /// Actions to run after a row is selected, with `value` bound.
        #[serde(default)]
        actions: Vec<Action>,
        /// Overrides the step's `next_step` when a row is selected.
        #[serde(default)]
        next_step: Option<StepId>,
    },
    /// Options generated from a literal mapping.
    TableFromValues {
        /// Reference path to a mapping of key to value.
        values: String,
        /// Template used to render each entry for display. `key` and
        /// `value` are bound to the entry before rendering.
        #[serde(default)]
        display_format: Option<String>,
        /// Caps how many entries (in iteration order) are presented as
        /// choices. Defaults to all entries.
        #[serde(default)]
        selection_count: Option<u32>,
        /// Actions to run after an entry is selected, with `key`/`value`
        /// bound.
        #[serde(default)]
        actions: Vec<Action>,
        /// Overrides the step's `next_step` when an entry is selected.
        #[serde(default)]
        next_step: Option<StepId>,
    },
}

/// One entry in a `table_roll` step's table list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRollEntry {
    /// The table to roll.
    pub table: String,
    /// Actions to run after the roll, with `result` bound to that table's
    /// outcome.
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// One entry in a `dice_sequence` step's iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceSequenceSpec {
    /// Reference path to the list being iterated.
    pub items: String,
    /// The dice expression template to roll for each item, with `item`
    /// bound.
    pub roll: String,
    /// Actions to run after each roll, with `item` and `result` bound.
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Settings for a `name_generation` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameSettings {
    /// Maximum generated name length.
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    /// The name corpus to draw from.
    #[serde(default = "default_corpus")]
    pub corpus: String,
    /// The segmentation strategy.
    #[serde(default = "default_segmenter")]
    pub segmenter: String,
    /// The generation algorithm.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl Default for NameSettings {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            corpus: default_corpus(),
            segmenter: default_segmenter(),
            algorithm: default_algorithm(),
        }
    }
}

fn default_max_length() -> u32 {
    15
}
fn default_corpus() -> String {
    "generic-fantasy".to_string()
}
fn default_segmenter() -> String {
    "fantasy".to_string()
}
fn default_algorithm() -> String {
    "bayesian".to_string()
}

/// The type-specific payload of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Rolls a single dice expression.
    #[serde(deny_unknown_fields)]
    DiceRoll {
        /// The dice expression template.
        roll: String,
    },
    /// Rolls a dice expression once per element of a list.
    #[serde(deny_unknown_fields)]
    DiceSequence {
        /// The sequence specification.
        sequence: DiceSequenceSpec,
    },
    /// Presents the player with a choice, static or table-sourced.
    ///
    /// Not `deny_unknown_fields`: `source` is itself `#[serde(flatten)]`,
    /// and serde rejects combining the two on the same struct/variant. A
    /// typo'd field here surfaces instead as a `ChoiceSource` match
    /// failure from its `#[serde(untagged)]` deserialization.
    PlayerChoice {
        /// Where the choices come from.
        #[serde(flatten)]
        source: ChoiceSource,
    },
    /// Rolls one or more random tables in sequence.
    #[serde(deny_unknown_fields)]
    TableRoll {
        /// The tables to roll, in document order unless `parallel`.
        tables: Vec<TableRollEntry>,
    },
    /// Solicits free-text input from the player.
    #[serde(deny_unknown_fields)]
    PlayerInput,
    /// Invokes the language-model collaborator.
    #[serde(deny_unknown_fields)]
    LlmGeneration {
        /// The prompt template to use.
        prompt_id: PromptId,
        /// Template data passed to the prompt; string leaves are rendered.
        #[serde(default)]
        prompt_data: Value,
        /// Settings passed through to the collaborator unmodified.
        #[serde(default)]
        llm_settings: Value,
    },
    /// Invokes the name-generator collaborator.
    #[serde(deny_unknown_fields)]
    NameGeneration {
        /// The generator to use.
        #[serde(default = "default_generator")]
        generator: String,
        /// Generator settings.
        #[serde(default)]
        settings: NameSettings,
    },
    /// Terminal step: runs its actions, then ends the flow.
    #[serde(deny_unknown_fields)]
    Completion,
    /// Invokes a sub-flow as a step (rather than as an action).
    #[serde(deny_unknown_fields)]
    FlowCall {
        /// The sub-flow to invoke.
        flow: FlowId,
        /// Sub-flow inputs; string leaves are rendered against the
        /// caller's context before the sub-flow runs.
        #[serde(default)]
        inputs: Value,
    },
}

fn default_generator() -> String {
    "wyrdbound-rng".to_string()
}

impl StepKind {
    /// Returns `true` for step kinds that solicit exactly one answer and
    /// therefore cannot be meaningfully combined with `parallel: true`.
    #[must_use]
    pub fn rejects_parallel(&self) -> bool {
        matches!(self, Self::PlayerChoice { .. } | Self::PlayerInput)
    }
}

// ============================================================================
// SECTION: Step
// ============================================================================

/// One step in a flow's step list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// The step's identifier, unique within its flow.
    pub id: StepId,
    /// An optional human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// A template rendered and shown to the player before the step runs.
    #[serde(default)]
    pub prompt: Option<String>,
    /// A template whose rendered form gates whether the step runs at all.
    #[serde(default)]
    pub condition: Option<String>,
    /// Whether this step's internal units of work (table lists, dice
    /// sequence iterations) run concurrently.
    #[serde(default)]
    pub parallel: bool,
    /// Actions run before the step's domain operation.
    #[serde(default)]
    pub pre_actions: Vec<Action>,
    /// Actions run after the step's `result` is bound.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// The step to transition to next; `None` ends the flow when reached
    /// without an overriding dynamic `next_step`.
    #[serde(default)]
    pub next_step: Option<StepId>,
    /// The step's type-specific behavior.
    #[serde(flatten)]
    pub kind: StepKind,
}

// ============================================================================
// SECTION: Flow
// ============================================================================

/// An immutable, validated flow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// The flow's identifier, unique within a [`crate::registry::FlowRegistry`].
    pub id: FlowId,
    /// `"flow"`, carried through for forward-compatible document typing.
    #[serde(default = "default_kind", rename = "kind")]
    pub kind: String,
    /// Human-readable flow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Flow document version, checked against a resume ticket's recorded
    /// version before resuming.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Declared inputs.
    #[serde(default)]
    pub inputs: Vec<InputDecl>,
    /// Declared outputs.
    #[serde(default)]
    pub outputs: Vec<OutputDecl>,
    /// Declared local variables.
    #[serde(default)]
    pub variables: Vec<VariableDecl>,
    /// The ordered step list.
    pub steps: Vec<Step>,
    /// Step IDs at which the interpreter may pause and checkpoint.
    #[serde(default)]
    pub resume_points: BTreeSet<StepId>,
}

fn default_kind() -> String {
    "flow".to_string()
}

fn default_version() -> u32 {
    1
}

/// Errors raised by [`Flow::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowValidationError {
    /// A flow must declare at least one step.
    #[error("flow {0} has no steps")]
    EmptySteps(FlowId),
    /// Two steps in the same flow share an id.
    #[error("flow {0} has duplicate step id {1}")]
    DuplicateStepId(FlowId, StepId),
    /// A `next_step`, choice `next_step`, or resume point names a step that
    /// does not exist in the flow.
    #[error("flow {0} references unknown step {1}")]
    UnknownStepReference(FlowId, StepId),
    /// A step combines `parallel: true` with a step kind that can only ever
    /// produce one answer.
    #[error("flow {0} step {1} cannot be parallel: {2}")]
    InvalidStepConfig(FlowId, StepId, String),
}

impl Flow {
    /// Runs the full load-time validation battery.
    ///
    /// # Errors
    /// Returns the first [`FlowValidationError`] encountered.
    pub fn validate(&self) -> Result<(), FlowValidationError> {
        ensure_non_empty_steps(self)?;
        ensure_unique_step_ids(self)?;
        ensure_step_references_resolve(self)?;
        ensure_resume_points_resolve(self)?;
        ensure_parallel_compatible(self)?;
        Ok(())
    }

    /// Returns the step with the given id, if any.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|step| &step.id == id)
    }
}

fn ensure_non_empty_steps(flow: &Flow) -> Result<(), FlowValidationError> {
    if flow.steps.is_empty() {
        return Err(FlowValidationError::EmptySteps(flow.id.clone()));
    }
    Ok(())
}

fn ensure_unique_step_ids(flow: &Flow) -> Result<(), FlowValidationError> {
    let mut seen = BTreeSet::new();
    for step in &flow.steps {
        if !seen.insert(step.id.clone()) {
            return Err(FlowValidationError::DuplicateStepId(flow.id.clone(), step.id.clone()));
        }
    }
    Ok(())
}

fn ensure_step_references_resolve(flow: &Flow) -> Result<(), FlowValidationError> {
    let known: BTreeSet<&StepId> = flow.steps.iter().map(|step| &step.id).collect();
    let check = |target: &StepId| -> Result<(), FlowValidationError> {
        if known.contains(target) {
            Ok(())
        } else {
            Err(FlowValidationError::UnknownStepReference(flow.id.clone(), target.clone()))
        }
    };

    for step in &flow.steps {
        if let Some(next) = &step.next_step {
            check(next)?;
        }
        if let StepKind::PlayerChoice { source } = &step.kind {
            match source {
                ChoiceSource::Static { choices } => {
                    for choice in choices {
                        if let Some(next) = &choice.next_step {
                            check(next)?;
                        }
                    }
                }
                ChoiceSource::Table { next_step, .. } | ChoiceSource::TableFromValues { next_step, .. } => {
                    if let Some(next) = next_step {
                        check(next)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn ensure_resume_points_resolve(flow: &Flow) -> Result<(), FlowValidationError> {
    for point in &flow.resume_points {
        if flow.step(point).is_none() {
            return Err(FlowValidationError::UnknownStepReference(flow.id.clone(), point.clone()));
        }
    }
    Ok(())
}

fn ensure_parallel_compatible(flow: &Flow) -> Result<(), FlowValidationError> {
    for step in &flow.steps {
        if step.parallel && step.kind.rejects_parallel() {
            return Err(FlowValidationError::InvalidStepConfig(
                flow.id.clone(),
                step.id.clone(),
                "player_choice and player_input solicit a single answer".to_string(),
            ));
        }
    }
    Ok(())
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

    fn step(id: &str, kind: StepKind) -> Step {
        Step {
            id: StepId::new(id),
            name: None,
            prompt: None,
            condition: None,
            parallel: false,
            pre_actions: vec![],
            actions: vec![],
            next_step: None,
            kind,
        }
    }

    fn flow(steps: Vec<Step>) -> Flow {
        Flow {
            id: FlowId::new("test-flow"),
            kind: default_kind(),
            name: "Test Flow".to_string(),
            description: None,
            version: 1,
            inputs: vec![],
            outputs: vec![],
            variables: vec![],
            steps,
            resume_points: BTreeSet::new(),
        }
    }

    #[test]
    fn rejects_empty_steps() {
        let flow = flow(vec![]);
        assert_eq!(flow.validate(), Err(FlowValidationError::EmptySteps(flow.id.clone())));
    }

    #[test]
    fn rejects_duplicate_step_ids() {
        let flow = flow(vec![
            step("a", StepKind::Completion),
            step("a", StepKind::Completion),
        ]);
        assert!(matches!(flow.validate(), Err(FlowValidationError::DuplicateStepId(_, _))));
    }

    #[test]
    fn rejects_unknown_next_step() {
        let mut first = step("a", StepKind::Completion);
        first.next_step = Some(StepId::new("missing"));
        let flow = flow(vec![first]);
        assert!(matches!(flow.validate(), Err(FlowValidationError::UnknownStepReference(_, _))));
    }

    #[test]
    fn rejects_parallel_player_input() {
        let mut first = step("a", StepKind::PlayerInput);
        first.parallel = true;
        let flow = flow(vec![first]);
        assert!(matches!(flow.validate(), Err(FlowValidationError::InvalidStepConfig(_, _, _))));
    }

    #[test]
    fn accepts_well_formed_flow() {
        let flow = flow(vec![step("a", StepKind::Completion)]);
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn step_kind_rejects_unknown_field_typo() {
        let raw = serde_json::json!({
            "type": "dice_roll",
            "roll": "1d6",
            "rol": "1d6"
        });
        let err = serde_json::from_value::<StepKind>(raw).expect_err("typo'd field should fail");
        assert!(err.to_string().contains("unknown field"));
    }
}
