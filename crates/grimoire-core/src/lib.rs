// grimoire-core/src/lib.rs
// ============================================================================
// Module: Grimoire Core Library
// Description: Public API surface for the Grimoire flow interpreter.
// Purpose: Expose the flow data model, execution context, host/collaborator
//          interfaces, and the run/resume entry points.
// Dependencies: crate::{actions, checkpoint, context, dispatcher, error,
//               host, identifiers, interpreter, model, parallel, path,
//               registry, run_config}
// ============================================================================

//! ## Overview
//! Grimoire Core loads declarative flow documents (dice rolls, table rolls,
//! player choices, name and LLM generation, sub-flow calls) and interprets
//! them one step at a time against a host-supplied set of collaborators. It
//! is backend-agnostic: presentation, persistence, randomness, and language
//! generation are all provided by the embedding host through the traits in
//! [`host`], not built into this crate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actions;
pub mod checkpoint;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod identifiers;
pub mod interpreter;
pub mod model;
pub mod parallel;
pub mod path;
pub mod registry;
pub mod run_config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use checkpoint::Checkpoint;
pub use checkpoint::ResumeTicket;
pub use checkpoint::TicketError;
pub use context::ContextSnapshot;
pub use context::ExecutionContext;
pub use error::ActionContext;
pub use error::InterpretError;
pub use error::RunError;
pub use host::ChoiceOption;
pub use host::CollaboratorError;
pub use host::DiceOutcome;
pub use host::DiceRoller;
pub use host::ChoicePresenter;
pub use host::DisplaySink;
pub use host::EventSink;
pub use host::CancellationSignal;
pub use host::Host;
pub use host::LlmProvider;
pub use host::NameGenerator;
pub use host::NeverSignal;
pub use host::PauseSignal;
pub use host::TableOutcome;
pub use host::TableStore;
pub use host::TextPrompt;
pub use host::ValidationOutcome;
pub use host::Validator;
pub use identifiers::ChoiceId;
pub use identifiers::CorrelationId;
pub use identifiers::FlowId;
pub use identifiers::InputId;
pub use identifiers::OutputId;
pub use identifiers::PromptId;
pub use identifiers::StepId;
pub use identifiers::VariableId;
pub use interpreter::run;
pub use interpreter::resume;
pub use interpreter::FlowOutcome;
pub use interpreter::RunOutcome;
pub use interpreter::StartPoint;
pub use model::Action;
pub use model::Choice;
pub use model::ChoiceSource;
pub use model::DiceSequenceSpec;
pub use model::Flow;
pub use model::FlowValidationError;
pub use model::InputDecl;
pub use model::NameSettings;
pub use model::OutputDecl;
pub use model::Step;
pub use model::StepKind;
pub use model::TableRollEntry;
pub use model::VariableDecl;
pub use registry::FlowRegistry;
pub use run_config::RunConfig;
