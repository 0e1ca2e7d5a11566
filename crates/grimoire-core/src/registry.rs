// grimoire-core/src/registry.rs
// ============================================================================
// Module: Grimoire Flow Registry
// Description: An in-memory lookup of validated flows, keyed by flow id.
// Purpose: Let `flow_call` resolve sub-flows without re-parsing or
//          re-validating specs mid-run.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`FlowRegistry`] is built once, typically by `grimoire-config` loading a
//! directory of flow documents, and handed to the interpreter. It is
//! intentionally read-only after construction: the interpreter's control
//! loop never mutates it, mirroring how the teacher's control plane is
//! constructed once against a single validated spec and never reparses it
//! mid-run.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::identifiers::FlowId;
use crate::model::Flow;

/// A read-only collection of validated flows, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: BTreeMap<FlowId, Arc<Flow>>,
}

impl FlowRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { flows: BTreeMap::new() }
    }

    /// Registers `flow`, keyed by its own id. Replaces any prior flow with
    /// the same id.
    pub fn insert(&mut self, flow: Flow) {
        self.flows.insert(flow.id.clone(), Arc::new(flow));
    }

    /// Looks up a flow by id.
    #[must_use]
    pub fn get(&self, id: &FlowId) -> Option<Arc<Flow>> {
        self.flows.get(id).cloned()
    }

    /// Returns the number of registered flows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Returns `true` if no flows are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

impl FromIterator<Flow> for FlowRegistry {
    fn from_iter<I: IntoIterator<Item = Flow>>(iter: I) -> Self {
        let mut registry = Self::new();
        for flow in iter {
            registry.insert(flow);
        }
        registry
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
    use crate::model::StepKind;
    use std::collections::BTreeSet;

    fn flow(id: &str) -> Flow {
        Flow {
            id: FlowId::new(id),
            kind: "flow".to_string(),
            name: id.to_string(),
            description: None,
            version: 1,
            inputs: vec![],
            outputs: vec![],
            variables: vec![],
            steps: vec![crate::model::Step {
                id: crate::identifiers::StepId::new("only"),
                name: None,
                prompt: None,
                condition: None,
                parallel: false,
                pre_actions: vec![],
                actions: vec![],
                next_step: None,
                kind: StepKind::Completion,
            }],
            resume_points: BTreeSet::new(),
        }
    }

    #[test]
    fn inserts_and_looks_up() {
        let mut registry = FlowRegistry::new();
        registry.insert(flow("a"));
        assert!(registry.get(&FlowId::new("a")).is_some());
        assert!(registry.get(&FlowId::new("missing")).is_none());
    }
}
