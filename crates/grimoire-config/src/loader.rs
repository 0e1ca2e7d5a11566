// grimoire-config/src/loader.rs
// ============================================================================
// Module: Grimoire Flow Loader
// Description: Parses YAML flow documents into validated `Flow` values.
// Purpose: Give the CLI and the test harness one narrow, fallible entry
//          point between a flow document on disk and a flow the
//          interpreter can run.
// Dependencies: grimoire-core, serde_yaml, serde_json
// ============================================================================

//! ## Overview
//! Loading is the two-phase process §6.1 of the specification describes:
//! `serde_yaml` deserializes the document into `grimoire_core::Flow`, whose
//! step-kind payloads are `#[serde(deny_unknown_fields)]` so a typo'd field
//! name surfaces as [`LoadError::UnknownField`] instead of being silently
//! ignored; then [`grimoire_core::Flow::validate`] runs the structural
//! battery (unique step ids, resolvable references, non-empty steps,
//! `parallel`-incompatible step kinds). Unknown *top-level* keys are a softer
//! failure mode: the specification calls for a warning, not a hard error, so
//! [`LoadedFlow::warnings`] carries them back to the caller to log through
//! whatever sink it has on hand (`grimoire-config` itself has no `host` to
//! log through).
//!
//! This mirrors `decision-gate-config`'s `parse_document`
//! (extension-sensitive parsing into a raw model, then a validation battery)
//! without actually depending on a registry's worth of enterprise config
//! concerns the teacher's `config.rs` also covers (storage, provider, and
//! policy configuration) — those have no Grimoire counterpart; see
//! `DESIGN.md`.

use std::fs;
use std::path::{Path, PathBuf};

use grimoire_core::{Flow, FlowRegistry, FlowValidationError, StepId};
use serde_json::Value as JsonValue;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading a flow document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The document is not well-formed YAML, or does not match the `Flow`
    /// schema in a way unrelated to an unknown step-kind field.
    #[error("schema error: {0}")]
    SchemaError(String),
    /// Two steps in the same flow share an id.
    #[error("duplicate step id: {0}")]
    DuplicateStepId(StepId),
    /// A `next_step`, choice, or resume point names a step that does not
    /// exist in the flow.
    #[error("unknown step reference: {0}")]
    UnknownStepReference(StepId),
    /// A step-kind payload carried a field its kind does not declare,
    /// almost always a typo (e.g. `rol` instead of `roll`).
    #[error("unknown field: {0}")]
    UnknownField(String),
}

impl From<FlowValidationError> for LoadError {
    fn from(err: FlowValidationError) -> Self {
        match err {
            FlowValidationError::DuplicateStepId(_, step_id) => Self::DuplicateStepId(step_id),
            FlowValidationError::UnknownStepReference(_, step_id) => Self::UnknownStepReference(step_id),
            other @ (FlowValidationError::EmptySteps(_) | FlowValidationError::InvalidStepConfig(_, _, _)) => {
                Self::SchemaError(other.to_string())
            }
        }
    }
}

// ============================================================================
// SECTION: Loaded flow
// ============================================================================

/// A successfully parsed and validated flow, plus any non-fatal warnings
/// collected while loading it.
#[derive(Debug, Clone)]
pub struct LoadedFlow {
    /// The validated flow.
    pub flow: Flow,
    /// Human-readable warnings, e.g. for ignored unknown top-level keys.
    /// Empty on a document with no surprises.
    pub warnings: Vec<String>,
}

// ============================================================================
// SECTION: Known top-level keys
// ============================================================================

const KNOWN_TOP_LEVEL_KEYS: &[&str] =
    &["id", "kind", "name", "description", "version", "inputs", "outputs", "variables", "steps", "resume_points"];

// ============================================================================
// SECTION: Entry points
// ============================================================================

/// Loads and validates a flow document from a file on disk.
///
/// # Errors
/// Returns [`LoadError::Io`] if the file cannot be read, or any other
/// [`LoadError`] variant the document itself fails on.
pub fn load_flow_file(path: &Path) -> Result<LoadedFlow, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    load_flow_bytes(&bytes)
}

/// Loads and validates a flow document from raw YAML bytes.
///
/// # Errors
/// See [`load_flow_str`].
pub fn load_flow_bytes(bytes: &[u8]) -> Result<LoadedFlow, LoadError> {
    let text = std::str::from_utf8(bytes).map_err(|err| LoadError::SchemaError(err.to_string()))?;
    load_flow_str(text)
}

/// Loads and validates a flow document from a YAML string.
///
/// # Errors
/// Returns [`LoadError::SchemaError`] if the document is not well-formed
/// YAML or does not otherwise match the `Flow` schema,
/// [`LoadError::UnknownField`] if a step-kind payload carries a field its
/// kind does not declare, or [`LoadError::DuplicateStepId`] /
/// [`LoadError::UnknownStepReference`] if the parsed flow fails structural
/// validation.
pub fn load_flow_str(text: &str) -> Result<LoadedFlow, LoadError> {
    let warnings = top_level_warnings(text)?;
    let flow: Flow = serde_yaml::from_str(text).map_err(classify_parse_error)?;
    flow.validate()?;
    Ok(LoadedFlow { flow, warnings })
}

/// Loads every `*.yaml`/`*.yml` document in `dir` (non-recursively) into a
/// [`FlowRegistry`], the shape `flow_call` resolves sub-flows against.
///
/// # Errors
/// Returns [`LoadError::Io`] if `dir` cannot be listed, or any other
/// [`LoadError`] the first failing document raises.
pub fn load_registry_dir(dir: &Path) -> Result<FlowRegistry, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io { path: dir.to_path_buf(), source })?;
    let mut registry = FlowRegistry::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if !is_yaml_file(&path) {
            continue;
        }
        let loaded = load_flow_file(&path)?;
        registry.insert(loaded.flow);
    }
    Ok(registry)
}

fn is_yaml_file(path: &Path) -> bool {
    path.is_file() && matches!(path.extension().and_then(|ext| ext.to_str()), Some("yaml" | "yml"))
}

// ============================================================================
// SECTION: Top-level key warnings
// ============================================================================

/// Parses `text` as a generic YAML value and reports any top-level mapping
/// key that the `Flow` schema does not declare, without treating that as a
/// parse failure: §6 requires unknown top-level keys to be ignored with a
/// warning, not rejected.
fn top_level_warnings(text: &str) -> Result<Vec<String>, LoadError> {
    let raw: JsonValue = serde_yaml::from_str(text).map_err(classify_parse_error)?;
    let Some(map) = raw.as_object() else {
        return Ok(Vec::new());
    };
    let mut warnings = Vec::new();
    for key in map.keys() {
        if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
            warnings.push(format!("ignoring unknown top-level key `{key}`"));
        }
    }
    Ok(warnings)
}

// ============================================================================
// SECTION: Error classification
// ============================================================================

/// Classifies a `serde_yaml` parse failure as [`LoadError::UnknownField`]
/// when its message names an unrecognized field (the signature serde's
/// derived `Deserialize` leaves for `deny_unknown_fields` violations), and
/// as [`LoadError::SchemaError`] otherwise.
fn classify_parse_error(err: serde_yaml::Error) -> LoadError {
    let message = err.to_string();
    if message.contains("unknown field") {
        LoadError::UnknownField(message)
    } else {
        LoadError::SchemaError(message)
    }
}
