// grimoire-core/src/checkpoint.rs
// ============================================================================
// Module: Grimoire Resume/Checkpoint Machinery
// Description: Plain, replayable records of a paused flow run and its
//              enclosing sub-flow call stack.
// Purpose: Let a caller persist a paused run as opaque bytes and later
//          resume it, with lossless round-trip fidelity.
// Dependencies: serde, serde_json, serde_jcs
// ============================================================================

//! ## Overview
//! A [`Checkpoint`] is one frame: the flow and step execution should resume
//! at, plus the context it should resume with. A [`ResumeTicket`] bundles
//! the innermost paused frame with the stack of enclosing sub-flow frames
//! that are waiting on it to complete (ordered innermost-caller first),
//! mirroring `RunpackManifest`'s "plain data, no function pointers" shape in
//! the teacher codebase. Tickets serialize to canonical JSON via
//! `serde_jcs`, the same canonicalization discipline the teacher uses for
//! hash-stable records, so two logically identical tickets always produce
//! byte-identical output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ContextSnapshot;
use crate::identifiers::{FlowId, StepId};

// ============================================================================
// SECTION: Checkpoint
// ============================================================================

/// One frame of a paused run: the flow and step it should resume at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The paused flow's identifier.
    pub flow_id: FlowId,
    /// The paused flow's version, checked against the registry on resume.
    pub flow_version: u32,
    /// The step id execution should resume at.
    pub step_id: StepId,
    /// The context snapshot to restore before resuming.
    pub context: ContextSnapshot,
}

/// A persisted, resumable run: the innermost paused frame plus the stack of
/// enclosing sub-flow frames waiting on it, innermost-caller first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeTicket {
    /// The innermost frame execution actually paused inside.
    pub checkpoint: Checkpoint,
    /// Enclosing `flow_call` frames, nearest caller first. Empty for a
    /// top-level pause with no sub-flow nesting involved.
    #[serde(default)]
    pub parent_checkpoints: Vec<Checkpoint>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised serializing or deserializing a [`ResumeTicket`].
#[derive(Debug, Error)]
pub enum TicketError {
    /// Canonicalization or JSON encoding failed.
    #[error("failed to encode resume ticket: {0}")]
    Encode(String),
    /// The bytes did not parse as a resume ticket.
    #[error("failed to decode resume ticket: {0}")]
    Decode(String),
}

impl ResumeTicket {
    /// Serializes this ticket to canonical JSON bytes.
    ///
    /// # Errors
    /// Returns [`TicketError::Encode`] if canonicalization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TicketError> {
        serde_jcs::to_vec(self).map_err(|err| TicketError::Encode(err.to_string()))
    }

    /// Parses a ticket previously produced by [`Self::to_bytes`].
    ///
    /// # Errors
    /// Returns [`TicketError::Decode`] if the bytes are not a valid ticket.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TicketError> {
        serde_json::from_slice(bytes).map_err(|err| TicketError::Decode(err.to_string()))
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

    fn sample() -> ResumeTicket {
        ResumeTicket {
            checkpoint: Checkpoint {
                flow_id: FlowId::new("child"),
                flow_version: 1,
                step_id: StepId::new("s2"),
                context: ContextSnapshot { inputs: json!({}), outputs: json!({}), variables: json!({}) },
            },
            parent_checkpoints: vec![Checkpoint {
                flow_id: FlowId::new("parent"),
                flow_version: 1,
                step_id: StepId::new("call"),
                context: ContextSnapshot { inputs: json!({"a": 1}), outputs: json!({}), variables: json!({}) },
            }],
        }
    }

    #[test]
    fn round_trips_losslessly() {
        let ticket = sample();
        let bytes = ticket.to_bytes().expect("encode");
        let restored = ResumeTicket::from_bytes(&bytes).expect("decode");
        assert_eq!(restored.checkpoint.flow_id, ticket.checkpoint.flow_id);
        assert_eq!(restored.parent_checkpoints.len(), 1);
        assert_eq!(restored.parent_checkpoints[0].flow_id, FlowId::new("parent"));
    }

    #[test]
    fn identical_tickets_encode_identically() {
        let a = sample().to_bytes().expect("encode a");
        let b = sample().to_bytes().expect("encode b");
        assert_eq!(a, b);
    }
}
