// grimoire-core/src/run_config.rs
// ============================================================================
// Module: Run Configuration
// Description: Caller-supplied configuration for a top-level run: inputs,
//              an optional correlation id, and an optional collaborator
//              deadline budget.
// Purpose: Thread cross-cutting, run-scoped concerns (log correlation,
//          collaborator timeouts) through `run` without growing its
//          argument list ad hoc.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Mirrors `decision-gate-core`'s own `RunConfig`: one caller-supplied
//! bundle of per-run settings, kept separate from the flow document and
//! the [`crate::host::Host`] bundle. `deadline` is a [`Duration`] budget
//! rather than an absolute instant, re-armed before every individual
//! collaborator call rather than shared across the whole run — a flow
//! that rolls ten dice gets ten budgets, not one budget divided ten ways.

use std::time::Duration;

use serde_json::Value;

use crate::identifiers::CorrelationId;

/// Caller-supplied configuration for one top-level [`crate::interpreter::run`]
/// call.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The flow's input values.
    pub inputs: Value,
    /// A correlation id attached to every `log_event` this run emits, for
    /// cross-cutting log correlation across a host's own observability
    /// stack.
    pub correlation_id: Option<CorrelationId>,
    /// A deadline budget applied to every individual collaborator call
    /// this run makes. A call that does not return within the budget
    /// fails with [`crate::error::InterpretError::CollaboratorTimeout`].
    pub deadline: Option<Duration>,
}

impl RunConfig {
    /// Creates a config with no correlation id or deadline.
    #[must_use]
    pub fn new(inputs: Value) -> Self {
        Self { inputs, correlation_id: None, deadline: None }
    }

    /// Attaches a correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Attaches a per-collaborator-call deadline budget.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
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
    fn defaults_to_no_correlation_id_or_deadline() {
        let config = RunConfig::new(json!({"name": "Kael"}));
        assert!(config.correlation_id.is_none());
        assert!(config.deadline.is_none());
    }

    #[test]
    fn builders_attach_correlation_id_and_deadline() {
        let config = RunConfig::new(Value::Null).with_correlation_id("req-42").with_deadline(Duration::from_millis(500));
        assert_eq!(config.correlation_id, Some(CorrelationId::new("req-42")));
        assert_eq!(config.deadline, Some(Duration::from_millis(500)));
    }
}
