// grimoire-core/src/host.rs
// ============================================================================
// Module: Grimoire Host Interfaces
// Description: Backend-agnostic collaborator traits the interpreter calls out to.
// Purpose: Keep dice/table/name/LLM/validation, user interaction, logging, and
//          pause/cancellation signaling behind narrow interfaces so the core
//          never depends on any concrete backend.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The interpreter never rolls dice, queries a table store, calls a
//! language model, or prints anything itself. It calls out through the
//! traits in this module, bundled at construction time into a [`Host`].
//! Designing, testing, or swapping any one collaborator never touches the
//! interpreter.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::model::NameSettings;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by a host collaborator.
#[derive(Debug, Error, Clone)]
pub enum CollaboratorError {
    /// The dice expression could not be parsed or evaluated.
    #[error("dice error: {0}")]
    Dice(String),
    /// The named table does not exist or could not be rolled.
    #[error("table error: {0}")]
    Table(String),
    /// The name generator failed.
    #[error("name generator error: {0}")]
    Generator(String),
    /// The language-model provider failed.
    #[error("llm error: {0}")]
    Llm(String),
    /// The validator collaborator itself failed (distinct from the value
    /// under validation failing its rules).
    #[error("validator error: {0}")]
    Validator(String),
    /// A user-interaction collaborator (choice/text prompt) failed or
    /// reported no answer.
    #[error("interaction error: {0}")]
    Interaction(String),
    /// The collaborator call exceeded its caller-supplied deadline.
    #[error("collaborator timed out: {0}")]
    Timeout(String),
}

// ============================================================================
// SECTION: Deadlines
// ============================================================================

/// Runs `op` to completion, or fails with [`CollaboratorError::Timeout`] if
/// `budget` elapses first.
///
/// With no budget, `op` runs inline on the calling thread. With a budget,
/// `op` runs on a detached worker thread so the caller can stop waiting at
/// the deadline without blocking on the call itself; per §5's "in-flight
/// collaborator calls are cancelled best-effort", a timed-out worker is not
/// forcibly aborted, only abandoned.
pub(crate) fn call_with_deadline<T, F>(budget: Option<Duration>, op: F) -> Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
{
    let Some(budget) = budget else {
        return op();
    };
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(op());
    });
    rx.recv_timeout(budget).unwrap_or_else(|_| Err(CollaboratorError::Timeout(format!("no response within {budget:?}"))))
}

// ============================================================================
// SECTION: Dice
// ============================================================================

/// The outcome of rolling a dice expression.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DiceOutcome {
    /// The numeric total of the roll.
    pub total: i64,
    /// A human-readable breakdown of the individual dice.
    pub detail: String,
}

/// Evaluates dice expressions such as `2d6+1`.
pub trait DiceRoller: Send + Sync {
    /// Rolls `expr` and returns its outcome.
    ///
    /// # Errors
    /// Returns [`CollaboratorError::Dice`] if `expr` is malformed.
    fn roll(&self, expr: &str) -> Result<DiceOutcome, CollaboratorError>;
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// The outcome of rolling a random table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TableOutcome {
    /// The selected table entry.
    pub entry: Value,
    /// The dice roll that selected the entry.
    pub roll_result: DiceOutcome,
}

/// Resolves named random tables.
pub trait TableStore: Send + Sync {
    /// Rolls the table named `name`.
    ///
    /// # Errors
    /// Returns [`CollaboratorError::Table`] if the table is unknown.
    fn roll_table(&self, name: &str) -> Result<TableOutcome, CollaboratorError>;
}

// ============================================================================
// SECTION: Name generation
// ============================================================================

/// Generates names from settings.
pub trait NameGenerator: Send + Sync {
    /// Generates a name. The returned object always carries a `name` key;
    /// additional keys are generator-specific.
    ///
    /// # Errors
    /// Returns [`CollaboratorError::Generator`] on failure.
    fn generate_name(&self, generator: &str, settings: &NameSettings) -> Result<Value, CollaboratorError>;
}

// ============================================================================
// SECTION: Language model
// ============================================================================

/// Invokes a language-model backend.
pub trait LlmProvider: Send + Sync {
    /// Completes `prompt_id` with the given templated `data` and
    /// passthrough `settings`.
    ///
    /// # Errors
    /// Returns [`CollaboratorError::Llm`] on failure.
    fn complete(&self, prompt_id: &str, data: &Value, settings: &Value) -> Result<String, CollaboratorError>;
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// The result of validating a value against a declared type.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// The value satisfies the type.
    Valid,
    /// The value violates the type; each string is a human-readable
    /// violation.
    Invalid(Vec<String>),
}

/// Validates values against registered types.
pub trait Validator: Send + Sync {
    /// Validates `value` against `type_name`.
    ///
    /// # Errors
    /// Returns [`CollaboratorError::Validator`] if `type_name` is unknown to
    /// the validator (distinct from the value failing validation, which is
    /// reported via [`ValidationOutcome::Invalid`]).
    fn validate(&self, type_name: &str, value: &Value) -> Result<ValidationOutcome, CollaboratorError>;
}

// ============================================================================
// SECTION: User interaction
// ============================================================================

/// One presented option in a player choice.
#[derive(Debug, Clone)]
pub struct ChoiceOption {
    /// The option's identifier, returned verbatim when selected.
    pub id: String,
    /// The rendered label shown to the player.
    pub label: String,
}

/// Presents a choice between options and returns the selected id.
pub trait ChoicePresenter: Send + Sync {
    /// Presents `options` (after an optional rendered `prompt`) and returns
    /// the selected option's id.
    ///
    /// # Errors
    /// Returns [`CollaboratorError::Interaction`] if no selection is made.
    fn present_choice(&self, prompt: Option<&str>, options: &[ChoiceOption]) -> Result<String, CollaboratorError>;
}

/// Solicits free-text input from the player.
pub trait TextPrompt: Send + Sync {
    /// Prompts for free text and returns the entered string.
    ///
    /// # Errors
    /// Returns [`CollaboratorError::Interaction`] if no input is provided.
    fn prompt_text(&self, prompt: Option<&str>) -> Result<String, CollaboratorError>;
}

/// Emits values for the player to see.
pub trait DisplaySink: Send + Sync {
    /// Displays `value`, as produced by a `display_value` action.
    fn display(&self, value: &Value);
}

/// Emits structured events and messages for observability.
pub trait EventSink: Send + Sync {
    /// Records a `log_event` action's structured payload.
    fn log_event(&self, event_type: &str, data: &Value);
    /// Records a `log_message` action's rendered message.
    fn log_message(&self, message: &str);
}

// ============================================================================
// SECTION: Cooperative signals
// ============================================================================

/// Reports whether the caller has asked the interpreter to pause at the
/// next resume point.
pub trait PauseSignal: Send + Sync {
    /// Returns `true` if a pause has been requested.
    fn is_set(&self) -> bool;
}

/// Reports whether the caller has asked the interpreter to stop entirely.
pub trait CancellationSignal: Send + Sync {
    /// Returns `true` if cancellation has been requested.
    fn is_cancelled(&self) -> bool;
}

/// A [`PauseSignal`]/[`CancellationSignal`] that never fires; useful for
/// one-shot runs with no external control.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSignal;

impl PauseSignal for NeverSignal {
    fn is_set(&self) -> bool {
        false
    }
}

impl CancellationSignal for NeverSignal {
    fn is_cancelled(&self) -> bool {
        false
    }
}

// ============================================================================
// SECTION: Host bundle
// ============================================================================

/// The full bundle of collaborators the interpreter calls out to.
///
/// Cloning a `Host` is cheap: every field is an `Arc` to a shared trait
/// object, mirroring how the teacher's `SharedRunStateStore` type-erases a
/// backend behind an `Arc<dyn Trait + Send + Sync>` for cheap sharing across
/// concurrent callers.
#[derive(Clone)]
pub struct Host {
    /// The dice-rolling collaborator.
    pub dice: Arc<dyn DiceRoller>,
    /// The random-table collaborator.
    pub tables: Arc<dyn TableStore>,
    /// The name-generation collaborator.
    pub names: Arc<dyn NameGenerator>,
    /// The language-model collaborator.
    pub llm: Arc<dyn LlmProvider>,
    /// The type/model validation collaborator.
    pub validator: Arc<dyn Validator>,
    /// The choice-presentation collaborator.
    pub choices: Arc<dyn ChoicePresenter>,
    /// The free-text-prompt collaborator.
    pub text_prompt: Arc<dyn TextPrompt>,
    /// The display sink.
    pub display: Arc<dyn DisplaySink>,
    /// The event/log sink.
    pub events: Arc<dyn EventSink>,
    /// The cooperative pause signal.
    pub pause: Arc<dyn PauseSignal>,
    /// The cooperative cancellation signal.
    pub cancel: Arc<dyn CancellationSignal>,
}
