// grimoire-collaborators/src/llm.rs
// ============================================================================
// Module: Echo LLM Provider
// Description: Deterministic, offline stand-in for a language-model backend.
// Purpose: Let `llm_generation` steps run (and be tested) without a network
//          call or an API key.
// Dependencies: grimoire-core, serde_json
// ============================================================================

//! ## Overview
//! [`EchoLlmProvider`] never calls out to a real model. It renders a
//! deterministic completion from `prompt_id` and `data` so flows and tests
//! exercise the full `llm_generation` step without needing network access,
//! the same role `decision-gate-providers`' `TimeProvider` plays for trigger
//! time: a small, in-process stand-in behind the real trait. A host that
//! wants a real model swaps this out for its own [`grimoire_core::LlmProvider`]
//! without the interpreter noticing.

use grimoire_core::host::CollaboratorError;
use grimoire_core::LlmProvider;
use serde_json::Value;

/// A deterministic `LlmProvider` that echoes its prompt id and data back as
/// a formatted string instead of calling a real model.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoLlmProvider;

impl LlmProvider for EchoLlmProvider {
    fn complete(&self, prompt_id: &str, data: &Value, settings: &Value) -> Result<String, CollaboratorError> {
        if prompt_id.is_empty() {
            return Err(CollaboratorError::Llm("prompt_id must not be empty".to_string()));
        }
        let data_json = serde_json::to_string(data).map_err(|err| CollaboratorError::Llm(err.to_string()))?;
        let settings_suffix =
            if settings.is_null() { String::new() } else { format!(" settings={settings}") };
        Ok(format!("[{prompt_id}] {data_json}{settings_suffix}"))
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
    fn echoes_prompt_id_and_data() {
        let provider = EchoLlmProvider;
        let completion = provider.complete("greeting", &json!({"name": "Ava"}), &Value::Null).expect("valid prompt");
        assert!(completion.starts_with("[greeting]"));
        assert!(completion.contains("Ava"));
    }

    #[test]
    fn empty_prompt_id_is_rejected() {
        let provider = EchoLlmProvider;
        assert!(provider.complete("", &Value::Null, &Value::Null).is_err());
    }
}
