// grimoire-collaborators/src/interaction.rs
// ============================================================================
// Module: Stdio Interaction
// Description: Terminal-driven ChoicePresenter/TextPrompt implementations.
// Purpose: Let the CLI run a flow interactively against a real terminal.
// Dependencies: grimoire-core, std
// ============================================================================

//! ## Overview
//! [`StdioChoicePresenter`] and [`StdioTextPrompt`] read from stdin and
//! write prompts to stdout, the terminal-facing counterpart to
//! [`crate::scripted::ScriptedChoicePresenter`]/[`crate::scripted::ScriptedTextPrompt`],
//! which answer from a pre-recorded script instead of a live terminal.

use std::io::{self, BufRead, Write};

use grimoire_core::host::{ChoiceOption, CollaboratorError};
use grimoire_core::{ChoicePresenter, TextPrompt};

/// Presents choices on stdout and reads the selection from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioChoicePresenter;

impl ChoicePresenter for StdioChoicePresenter {
    fn present_choice(&self, prompt: Option<&str>, options: &[ChoiceOption]) -> Result<String, CollaboratorError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Some(prompt) = prompt {
            let _ = writeln!(out, "{prompt}");
        }
        for (index, option) in options.iter().enumerate() {
            let _ = writeln!(out, "  {}) {}", index + 1, option.label);
        }
        let _ = write!(out, "> ");
        let _ = out.flush();

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map_err(|err| CollaboratorError::Interaction(err.to_string()))?;
        let trimmed = line.trim();

        if let Ok(number) = trimmed.parse::<usize>() {
            if number >= 1 {
                if let Some(option) = options.get(number - 1) {
                    return Ok(option.id.clone());
                }
            }
        }
        if let Some(option) = options.iter().find(|option| option.id == trimmed) {
            return Ok(option.id.clone());
        }
        Err(CollaboratorError::Interaction(format!("`{trimmed}` is not one of the offered options")))
    }
}

/// Prompts on stdout and reads free text from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioTextPrompt;

impl TextPrompt for StdioTextPrompt {
    fn prompt_text(&self, prompt: Option<&str>) -> Result<String, CollaboratorError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Some(prompt) = prompt {
            let _ = write!(out, "{prompt} ");
        }
        let _ = out.flush();

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map_err(|err| CollaboratorError::Interaction(err.to_string()))?;
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }
}
