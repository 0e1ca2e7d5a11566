#![cfg_attr(
    test,
    allow(
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
    )
)]
// grimoire-cli/src/main.rs
// ============================================================================
// Module: Grimoire CLI Entry Point
// Description: Command dispatcher for validating, running, and resuming
//              flow documents.
// Purpose: Provide a terminal-facing front end over grimoire-config and
//          grimoire-core without embedding either into a larger service.
// Dependencies: clap, grimoire-collaborators, grimoire-config, grimoire-core,
//               serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The Grimoire CLI loads a flow document, optionally a directory of
//! sub-flows and a table data file, and either just validates the
//! document, runs it interactively against a terminal, or resumes a
//! previously paused run from a persisted ticket. It carries no
//! localization catalog and no async runtime: grimoire-core is entirely
//! synchronous, so the CLI is too.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use grimoire_collaborators::scripted::build_host;
use grimoire_collaborators::{TableDefinition, TableEntry};
use grimoire_config::{LoadError, LoadedFlow};
use grimoire_core::{CorrelationId, FlowRegistry, Host, ResumeTicket, RunConfig, RunOutcome};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "grimoire", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Loads a flow document and reports whether it is valid.
    Validate(ValidateCommand),
    /// Runs a flow document to completion or to its first pause point.
    Run(RunCommand),
    /// Resumes a previously paused run from a persisted ticket.
    Resume(ResumeCommand),
}

/// Arguments shared by `run` and `resume`: how to resolve sub-flows and
/// tables, and where to persist a new pause ticket.
#[derive(Args, Debug)]
struct RuntimeArgs {
    /// Directory of additional `*.yaml`/`*.yml` flows `flow_call` may
    /// invoke. The flow being run (or resumed) is always registered too.
    #[arg(long, value_name = "DIR")]
    registry_dir: Option<PathBuf>,
    /// JSON file mapping table names to weighted entries, e.g.
    /// `{"weather": [{"weight": 1, "value": "storm"}]}`.
    #[arg(long, value_name = "PATH")]
    tables: Option<PathBuf>,
    /// Where to write a resume ticket if the run pauses. Required for the
    /// run to pause usefully; a paused run with no `--ticket-out` still
    /// succeeds, but its ticket is only printed to stdout.
    #[arg(long, value_name = "PATH")]
    ticket_out: Option<PathBuf>,
    /// Correlation id attached to this run's logged events, for tying
    /// together log lines from one invocation across a host's own logging.
    #[arg(long, value_name = "ID")]
    correlation_id: Option<String>,
    /// Per-collaborator-call deadline budget in milliseconds. A collaborator
    /// call that does not return within this budget fails with
    /// `CollaboratorTimeout` rather than blocking the run indefinitely.
    #[arg(long, value_name = "MILLIS")]
    deadline_ms: Option<u64>,
}

/// Builds the [`CorrelationId`]/deadline pair `run`/`resume` take from a
/// [`RuntimeArgs`]' `--correlation-id`/`--deadline-ms` flags.
fn run_meta(runtime: &RuntimeArgs) -> (Option<CorrelationId>, Option<std::time::Duration>) {
    let correlation_id = runtime.correlation_id.clone().map(CorrelationId::new);
    let deadline = runtime.deadline_ms.map(std::time::Duration::from_millis);
    (correlation_id, deadline)
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Path to the flow document.
    flow: PathBuf,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Path to the flow document.
    flow: PathBuf,
    /// `key=json` input bindings, e.g. `character=\"Ava\"` or `level=3`.
    /// Values that do not parse as JSON are passed through as strings.
    #[arg(long = "input", value_name = "KEY=VALUE")]
    inputs: Vec<String>,
    #[command(flatten)]
    runtime: RuntimeArgs,
}

/// Arguments for `resume`.
#[derive(Args, Debug)]
struct ResumeCommand {
    /// Path to a resume ticket previously written by `run` or `resume`.
    ticket: PathBuf,
    #[command(flatten)]
    runtime: RuntimeArgs,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{0}")]
struct CliError(String);

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(command) => command_validate(&command),
        Commands::Run(command) => command_run(&command),
        Commands::Resume(command) => command_resume(&command),
    }
}

// ============================================================================
// SECTION: Validate command
// ============================================================================

/// Executes the `validate` command.
fn command_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    let loaded = load_flow(&command.flow)?;
    emit_warnings(&loaded.warnings)?;
    write_stdout_line(&format!("{} is valid ({} steps)", loaded.flow.id, loaded.flow.steps.len())).map_err(io_error)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Run command
// ============================================================================

/// Executes the `run` command.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let loaded = load_flow(&command.flow)?;
    emit_warnings(&loaded.warnings)?;

    let mut registry = build_registry(command.runtime.registry_dir.as_deref())?;
    registry.insert(loaded.flow.clone());

    let inputs = parse_inputs(&command.inputs)?;
    let host = build_runtime_host(command.runtime.tables.as_deref())?;
    let (correlation_id, deadline) = run_meta(&command.runtime);

    let mut config = RunConfig::new(inputs);
    if let Some(correlation_id) = correlation_id {
        config = config.with_correlation_id(correlation_id);
    }
    if let Some(deadline) = deadline {
        config = config.with_deadline(deadline);
    }

    let outcome = grimoire_core::run(&loaded.flow, config, &registry, &host).map_err(|err| CliError::new(err.to_string()))?;
    report_outcome(outcome, command.runtime.ticket_out.as_deref())
}

// ============================================================================
// SECTION: Resume command
// ============================================================================

/// Executes the `resume` command.
///
/// `--registry-dir` must contain the paused flow itself (not just the
/// sub-flows it calls): a ticket records only ids and versions, never a
/// flow's source path, so there is nowhere else to recover the document
/// from.
fn command_resume(command: &ResumeCommand) -> CliResult<ExitCode> {
    let bytes = fs::read(&command.ticket).map_err(|err| CliError::new(format!("failed to read {}: {err}", command.ticket.display())))?;
    let ticket = ResumeTicket::from_bytes(&bytes).map_err(|err| CliError::new(err.to_string()))?;

    let registry_dir = command
        .runtime
        .registry_dir
        .as_deref()
        .ok_or_else(|| CliError::new("resume requires --registry-dir pointing at the paused flow's directory"))?;
    let registry = build_registry(Some(registry_dir))?;
    let flow_id = &ticket.checkpoint.flow_id;
    if registry.get(flow_id).is_none() {
        return Err(CliError::new(format!("{} does not contain flow `{flow_id}`", registry_dir.display())));
    }

    let host = build_runtime_host(command.runtime.tables.as_deref())?;
    let (correlation_id, deadline) = run_meta(&command.runtime);
    let outcome =
        grimoire_core::resume(ticket, correlation_id, deadline, &registry, &host).map_err(|err| CliError::new(err.to_string()))?;
    report_outcome(outcome, command.runtime.ticket_out.as_deref())
}

// ============================================================================
// SECTION: Shared helpers
// ============================================================================

/// Loads and validates a flow document, translating load errors into a
/// [`CliError`].
fn load_flow(path: &Path) -> CliResult<LoadedFlow> {
    grimoire_config::load_flow_file(path).map_err(|err: LoadError| CliError::new(format!("{}: {err}", path.display())))
}

/// Builds a registry from `--registry-dir`, or an empty one if it was not
/// given.
fn build_registry(registry_dir: Option<&Path>) -> CliResult<FlowRegistry> {
    match registry_dir {
        Some(dir) => grimoire_config::load_registry_dir(dir).map_err(|err| CliError::new(format!("{}: {err}", dir.display()))),
        None => Ok(FlowRegistry::new()),
    }
}

/// Builds the interactive `Host` the `run`/`resume` commands execute
/// against: stdio-driven interaction, stdout display, and tables loaded
/// from `--tables` if given.
fn build_runtime_host(tables_path: Option<&Path>) -> CliResult<Host> {
    let tables = match tables_path {
        Some(path) => load_tables(path)?,
        None => BTreeMap::new(),
    };
    let mut host = build_host(Vec::new(), Vec::new(), tables);
    host.choices = std::sync::Arc::new(grimoire_collaborators::StdioChoicePresenter);
    host.text_prompt = std::sync::Arc::new(grimoire_collaborators::StdioTextPrompt);
    Ok(host)
}

/// Parses a table data file into the shape [`InMemoryTableStore`] expects.
///
/// [`InMemoryTableStore`]: grimoire_collaborators::InMemoryTableStore
fn load_tables(path: &Path) -> CliResult<BTreeMap<String, TableDefinition>> {
    let bytes = fs::read(path).map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    let raw: BTreeMap<String, Vec<RawTableEntry>> =
        serde_json::from_slice(&bytes).map_err(|err| CliError::new(format!("{}: {err}", path.display())))?;
    Ok(raw
        .into_iter()
        .map(|(name, entries)| {
            let entries = entries.into_iter().map(|entry| TableEntry { weight: entry.weight, value: entry.value }).collect();
            (name, TableDefinition::new(entries))
        })
        .collect())
}

/// One entry in a `--tables` JSON file.
#[derive(Debug, serde::Deserialize)]
struct RawTableEntry {
    /// The entry's relative weight.
    weight: u32,
    /// The entry's value.
    value: Value,
}

/// Parses `--input key=value` pairs into a single JSON object. Values that
/// parse as JSON keep their type; anything else is kept as a string.
fn parse_inputs(pairs: &[String]) -> CliResult<Value> {
    let mut object = serde_json::Map::new();
    for pair in pairs {
        let (key, raw_value) =
            pair.split_once('=').ok_or_else(|| CliError::new(format!("`{pair}` is not in `key=value` form")))?;
        let value = serde_json::from_str(raw_value).unwrap_or_else(|_| Value::String(raw_value.to_string()));
        object.insert(key.to_string(), value);
    }
    Ok(Value::Object(object))
}

/// Reports a `run`/`resume` outcome: prints completion output, or persists
/// and reports a pause ticket.
fn report_outcome(outcome: RunOutcome, ticket_out: Option<&Path>) -> CliResult<ExitCode> {
    match outcome {
        RunOutcome::Completed(outputs) => {
            write_stdout_line(&serde_json::to_string_pretty(&outputs).map_err(|err| CliError::new(err.to_string()))?)
                .map_err(io_error)?;
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Paused(ticket) => {
            let bytes = ticket.to_bytes().map_err(|err| CliError::new(err.to_string()))?;
            if let Some(path) = ticket_out {
                fs::write(path, &bytes).map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display())))?;
                write_stdout_line(&format!("paused; resume ticket written to {}", path.display())).map_err(io_error)?;
            } else {
                write_stdout_line(
                    std::str::from_utf8(&bytes).map_err(|err| CliError::new(err.to_string()))?,
                )
                .map_err(io_error)?;
            }
            Ok(ExitCode::from(2))
        }
    }
}

/// Writes each warning to stderr, prefixed for readability.
fn emit_warnings(warnings: &[String]) -> CliResult<()> {
    for warning in warnings {
        write_stderr_line(&format!("warning: {warning}")).map_err(io_error)?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Output helpers
// ============================================================================

#[allow(clippy::print_stdout, reason = "the CLI's entire purpose is to print to stdout")]
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

#[allow(clippy::print_stderr, reason = "warnings and fatal errors are reported on stderr")]
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

fn io_error(err: std::io::Error) -> CliError {
    CliError::new(format!("output error: {err}"))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
