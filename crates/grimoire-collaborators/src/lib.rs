// grimoire-collaborators/src/lib.rs
// ============================================================================
// Module: Grimoire Collaborators
// Description: Reference implementations of grimoire-core's host traits.
// Purpose: Give a flow a concrete dice roller, table store, name generator,
//          LLM stub, validator, interaction surface, and event sinks without
//          pulling any of that knowledge into the interpreter itself.
// Dependencies: grimoire-core, rand, serde_json
// ============================================================================

//! ## Overview
//! `grimoire-core` defines the [`grimoire_core::host`] traits and interprets
//! against whatever implements them; it never ships an implementation of its
//! own. This crate is that implementation, the way `decision-gate-providers`
//! ships the built-in evidence providers `decision-gate-core` only declares
//! an interface for. Every module here implements exactly one collaborator
//! trait; [`scripted::build_host`] assembles a complete
//! [`grimoire_core::Host`] wired for tests, and `grimoire-cli` assembles its
//! own interactive variant on top of the same pieces, swapping in
//! [`interaction::StdioChoicePresenter`]/[`interaction::StdioTextPrompt`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dice;
pub mod interaction;
pub mod llm;
pub mod names;
pub mod scripted;
pub mod signals;
pub mod sinks;
pub mod tables;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dice::ExpressionDiceRoller;
pub use interaction::StdioChoicePresenter;
pub use interaction::StdioTextPrompt;
pub use llm::EchoLlmProvider;
pub use names::CorpusNameGenerator;
pub use signals::FlagCancellationSignal;
pub use signals::FlagPauseSignal;
pub use sinks::CallbackEventSink;
pub use sinks::ChannelEventSink;
pub use sinks::LogEventSink;
pub use sinks::StdoutDisplaySink;
pub use tables::InMemoryTableStore;
pub use tables::TableDefinition;
pub use tables::TableEntry;
pub use validator::BasicTypeValidator;

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
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
}
