// grimoire-core/src/path.rs
// ============================================================================
// Module: Grimoire Reference-Path Resolver
// Description: Dotted-path read/write/swap access into a JSON context tree.
// Purpose: Give the action evaluator and step dispatcher a single, narrow
//          way to address values inside the execution context.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A reference path is a dot-delimited string such as `outputs.character.name`
//! or `variables.rolls.0`. The first segment names a root (`inputs`,
//! `outputs`, or `variables`); the remaining segments walk object keys or,
//! when a segment parses as an integer, list indices.
//!
//! Writes create intermediate mapping nodes as they walk the path
//! (creation-on-write) but never grow a list implicitly: a numeric segment
//! must already address an existing element. `inputs` is read-only once the
//! context is constructed.

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving a reference path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// No value exists at the given path.
    #[error("path not found: {0}")]
    NotFound(String),
    /// A segment expected a mapping or list but found a scalar, or a segment
    /// was expected to be numeric but was not.
    #[error("type conflict at path {0}")]
    TypeConflict(String),
    /// A write was attempted against the read-only `inputs` root.
    #[error("inputs root is read-only: {0}")]
    ReadOnlyRoot(String),
    /// The path is empty or names an unknown root segment.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

// ============================================================================
// SECTION: Segment parsing
// ============================================================================

fn segments(path: &str) -> Result<Vec<&str>, PathError> {
    if path.is_empty() {
        return Err(PathError::InvalidPath(path.to_string()));
    }
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|segment| segment.is_empty()) {
        return Err(PathError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

fn is_known_root(root: &str) -> bool {
    matches!(root, "inputs" | "outputs" | "variables")
}

// ============================================================================
// SECTION: Read
// ============================================================================

/// Reads the value at `path` within `root`.
///
/// # Errors
/// Returns [`PathError::InvalidPath`] for a malformed or unrooted path, and
/// [`PathError::NotFound`] if any segment does not resolve.
pub fn read<'a>(root: &'a Value, path: &str) -> Result<&'a Value, PathError> {
    let parts = segments(path)?;
    if !is_known_root(parts[0]) {
        return Err(PathError::InvalidPath(path.to_string()));
    }
    let mut current = root;
    for segment in &parts {
        current = step_into(current, segment).ok_or_else(|| PathError::NotFound(path.to_string()))?;
    }
    Ok(current)
}

fn step_into<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(list) => segment.parse::<usize>().ok().and_then(|index| list.get(index)),
        _ => None,
    }
}

// ============================================================================
// SECTION: Write
// ============================================================================

/// Writes `value` at `path` within `root`, creating intermediate mapping
/// nodes as needed. Never grows a list implicitly.
///
/// # Errors
/// Returns [`PathError::ReadOnlyRoot`] if `path` is rooted at `inputs`,
/// [`PathError::TypeConflict`] if an intermediate segment addresses a
/// scalar or an out-of-range/non-numeric list index, or
/// [`PathError::InvalidPath`] for a malformed path.
pub fn write(root: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let parts = segments(path)?;
    if parts[0] == "inputs" {
        return Err(PathError::ReadOnlyRoot(path.to_string()));
    }
    if !is_known_root(parts[0]) {
        return Err(PathError::InvalidPath(path.to_string()));
    }
    write_segments(root, &parts, path, value)
}

fn write_segments(
    root: &mut Value,
    parts: &[&str],
    full_path: &str,
    value: Value,
) -> Result<(), PathError> {
    let mut current = root;
    for segment in &parts[..parts.len() - 1] {
        current = descend_for_write(current, segment, full_path)?;
    }
    let last = parts[parts.len() - 1];
    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(list) => {
            let index = last
                .parse::<usize>()
                .map_err(|_| PathError::TypeConflict(full_path.to_string()))?;
            let slot = list
                .get_mut(index)
                .ok_or_else(|| PathError::TypeConflict(full_path.to_string()))?;
            *slot = value;
            Ok(())
        }
        _ => Err(PathError::TypeConflict(full_path.to_string())),
    }
}

fn descend_for_write<'a>(
    current: &'a mut Value,
    segment: &str,
    full_path: &str,
) -> Result<&'a mut Value, PathError> {
    if current.is_null() {
        *current = Value::Object(serde_json::Map::new());
    }
    match current {
        Value::Object(map) => Ok(map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()))),
        Value::Array(list) => {
            let index = segment
                .parse::<usize>()
                .map_err(|_| PathError::TypeConflict(full_path.to_string()))?;
            list.get_mut(index)
                .ok_or_else(|| PathError::TypeConflict(full_path.to_string()))
        }
        _ => Err(PathError::TypeConflict(full_path.to_string())),
    }
}

// ============================================================================
// SECTION: Swap
// ============================================================================

/// Atomically exchanges the values at `path1` and `path2`. Both paths must
/// already resolve to a value.
///
/// # Errors
/// Returns [`PathError::NotFound`] if either path does not already resolve,
/// and the same variants as [`write`] otherwise.
pub fn swap(root: &mut Value, path1: &str, path2: &str) -> Result<(), PathError> {
    let value1 = read(root, path1)?.clone();
    let value2 = read(root, path2)?.clone();
    write(root, path1, value2)?;
    write(root, path2, value1)?;
    Ok(())
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

    fn ctx() -> Value {
        json!({"inputs": {"a": 1}, "outputs": {}, "variables": {"list": [1, 2, 3]}})
    }

    #[test]
    fn read_existing_path() {
        let c = ctx();
        assert_eq!(read(&c, "inputs.a").expect("ok"), &json!(1));
    }

    #[test]
    fn read_missing_path_not_found() {
        let c = ctx();
        assert!(matches!(read(&c, "outputs.missing"), Err(PathError::NotFound(_))));
    }

    #[test]
    fn write_creates_intermediate_maps() {
        let mut c = ctx();
        write(&mut c, "outputs.character.name", json!("Kael")).expect("write");
        assert_eq!(read(&c, "outputs.character.name").expect("read"), &json!("Kael"));
    }

    #[test]
    fn write_to_inputs_is_rejected() {
        let mut c = ctx();
        assert!(matches!(
            write(&mut c, "inputs.a", json!(2)),
            Err(PathError::ReadOnlyRoot(_))
        ));
    }

    #[test]
    fn write_does_not_grow_lists() {
        let mut c = ctx();
        assert!(matches!(
            write(&mut c, "variables.list.10", json!(9)),
            Err(PathError::TypeConflict(_))
        ));
    }

    #[test]
    fn write_existing_list_index() {
        let mut c = ctx();
        write(&mut c, "variables.list.1", json!(99)).expect("write");
        assert_eq!(read(&c, "variables.list.1").expect("read"), &json!(99));
    }

    #[test]
    fn swap_exchanges_values() {
        let mut c = ctx();
        write(&mut c, "variables.x", json!(1)).expect("write");
        write(&mut c, "variables.y", json!(2)).expect("write");
        swap(&mut c, "variables.x", "variables.y").expect("swap");
        assert_eq!(read(&c, "variables.x").expect("read"), &json!(2));
        assert_eq!(read(&c, "variables.y").expect("read"), &json!(1));
    }

    #[test]
    fn swap_requires_both_sides_to_preexist() {
        let mut c = ctx();
        assert!(matches!(
            swap(&mut c, "variables.missing", "variables.list"),
            Err(PathError::NotFound(_))
        ));
    }
}
