// grimoire-collaborators/src/scripted.rs
// ============================================================================
// Module: Scripted Interaction and Host Assembly
// Description: Pre-recorded ChoicePresenter/TextPrompt for tests, plus a
//              convenience assembler for a complete Host.
// Purpose: Let a flow run end-to-end in a test with deterministic answers,
//          and give callers one place to wire every collaborator together.
// Dependencies: grimoire-core, std
// ============================================================================

//! ## Overview
//! [`ScriptedChoicePresenter`] and [`ScriptedTextPrompt`] answer from a
//! fixed, pre-recorded sequence rather than a live terminal, the test-only
//! counterpart to [`crate::interaction::StdioChoicePresenter`]/
//! [`crate::interaction::StdioTextPrompt`]. [`build_host`] wires every
//! reference collaborator in this crate into one [`grimoire_core::Host`],
//! the way a host embedding `decision-gate-core` would assemble its chosen
//! providers behind `SharedRunStateStore`.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use grimoire_core::host::{ChoiceOption, CollaboratorError};
use grimoire_core::{ChoicePresenter, Host, TextPrompt};

use crate::dice::ExpressionDiceRoller;
use crate::llm::EchoLlmProvider;
use crate::names::CorpusNameGenerator;
use crate::signals::{FlagCancellationSignal, FlagPauseSignal};
use crate::sinks::{LogEventSink, StdoutDisplaySink};
use crate::tables::{InMemoryTableStore, TableDefinition};
use crate::validator::BasicTypeValidator;

/// Answers `present_choice` from a fixed, pre-recorded sequence of option
/// ids, in order.
#[derive(Default)]
pub struct ScriptedChoicePresenter {
    answers: Mutex<VecDeque<String>>,
}

impl ScriptedChoicePresenter {
    /// Creates a presenter that answers with `answers`, in order.
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { answers: Mutex::new(answers.into_iter().map(Into::into).collect()) }
    }
}

impl ChoicePresenter for ScriptedChoicePresenter {
    fn present_choice(&self, _prompt: Option<&str>, options: &[ChoiceOption]) -> Result<String, CollaboratorError> {
        let mut answers = self.answers.lock().map_err(|_| CollaboratorError::Interaction("script mutex poisoned".to_string()))?;
        let answer = answers.pop_front().ok_or_else(|| CollaboratorError::Interaction("choice script exhausted".to_string()))?;
        if !options.iter().any(|option| option.id == answer) {
            return Err(CollaboratorError::Interaction(format!("scripted answer `{answer}` is not one of the offered options")));
        }
        Ok(answer)
    }
}

/// Answers `prompt_text` from a fixed, pre-recorded sequence of strings, in
/// order.
#[derive(Default)]
pub struct ScriptedTextPrompt {
    answers: Mutex<VecDeque<String>>,
}

impl ScriptedTextPrompt {
    /// Creates a prompt that answers with `answers`, in order.
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { answers: Mutex::new(answers.into_iter().map(Into::into).collect()) }
    }
}

impl TextPrompt for ScriptedTextPrompt {
    fn prompt_text(&self, _prompt: Option<&str>) -> Result<String, CollaboratorError> {
        let mut answers = self.answers.lock().map_err(|_| CollaboratorError::Interaction("script mutex poisoned".to_string()))?;
        answers.pop_front().ok_or_else(|| CollaboratorError::Interaction("text script exhausted".to_string()))
    }
}

/// Assembles a complete [`Host`] from this crate's reference collaborators.
///
/// `choice_script` and `text_script` back the interaction collaborators;
/// `tables` seeds the table store. Display and event output go to stdout
/// and a discarded sink respectively — swap either field on the returned
/// `Host` for a collecting sink in a test that needs to assert on them.
#[must_use]
pub fn build_host(
    choice_script: Vec<String>,
    text_script: Vec<String>,
    tables: BTreeMap<String, TableDefinition>,
) -> Host {
    let dice = Arc::new(ExpressionDiceRoller::new());
    Host {
        dice: dice.clone(),
        tables: Arc::new(InMemoryTableStore::new(tables, dice)),
        names: Arc::new(CorpusNameGenerator::new()),
        llm: Arc::new(EchoLlmProvider),
        validator: Arc::new(BasicTypeValidator::new()),
        choices: Arc::new(ScriptedChoicePresenter::new(choice_script)),
        text_prompt: Arc::new(ScriptedTextPrompt::new(text_script)),
        display: Arc::new(StdoutDisplaySink),
        events: Arc::new(LogEventSink::new(io::sink())),
        pause: Arc::new(FlagPauseSignal::new()),
        cancel: Arc::new(FlagCancellationSignal::new()),
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

    #[test]
    fn scripted_choice_presenter_returns_answers_in_order() {
        let presenter = ScriptedChoicePresenter::new(["left", "right"]);
        let options =
            vec![ChoiceOption { id: "left".to_string(), label: "Go left".to_string() }, ChoiceOption {
                id: "right".to_string(),
                label: "Go right".to_string(),
            }];
        assert_eq!(presenter.present_choice(None, &options).expect("first answer"), "left");
        assert_eq!(presenter.present_choice(None, &options).expect("second answer"), "right");
        assert!(presenter.present_choice(None, &options).is_err());
    }

    #[test]
    fn scripted_choice_presenter_rejects_an_answer_not_offered() {
        let presenter = ScriptedChoicePresenter::new(["nowhere"]);
        let options = vec![ChoiceOption { id: "left".to_string(), label: "Go left".to_string() }];
        assert!(presenter.present_choice(None, &options).is_err());
    }

    #[test]
    fn scripted_text_prompt_returns_answers_in_order() {
        let prompt = ScriptedTextPrompt::new(["Ava"]);
        assert_eq!(prompt.prompt_text(None).expect("one scripted answer"), "Ava");
        assert!(prompt.prompt_text(None).is_err());
    }

    #[test]
    fn build_host_assembles_every_collaborator() {
        let host = build_host(vec!["left".to_string()], vec!["Ava".to_string()], BTreeMap::new());
        let outcome = host.dice.roll("1d6").expect("dice roller is wired");
        assert!((1..=6).contains(&outcome.total));
    }
}
