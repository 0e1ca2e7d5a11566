// grimoire-core/src/parallel.rs
// ============================================================================
// Module: Grimoire Parallel Step Units
// Description: Runs independent units of a `parallel: true` step concurrently
//              and merges their writes back into one execution context.
// Purpose: Give `table_roll` and `dice_sequence` a shared, safe concurrency
//          primitive without forcing the whole interpreter onto an async
//          runtime.
// Dependencies: std::thread
// ============================================================================

//! ## Overview
//! Each unit runs against its own clone of the context, seeded from the same
//! snapshot every other unit starts from. Once all units finish, their
//! `outputs`/`variables` writes are diffed against that shared starting
//! snapshot and merged back in. Two units writing the same leaf path is
//! [`InterpretError::ConcurrentWriteConflict`]; disjoint writes commute
//! regardless of merge order, matching §5's "some sequential interleaving"
//! requirement.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::error::InterpretError;

/// Runs `units` concurrently against clones of `base`, then merges their
/// disjoint writes back into `base`. Returns the first error observed, by
/// unit index, if any unit fails or if two units write the same path.
///
/// # Errors
/// Propagates the first unit's [`InterpretError`], or
/// [`InterpretError::ConcurrentWriteConflict`] if two units wrote the same
/// path.
pub fn run_units<F>(base: &mut ExecutionContext, units: Vec<F>) -> Result<(), InterpretError>
where
    F: FnOnce(&mut ExecutionContext) -> Result<(), InterpretError> + Send,
{
    let snapshot = base.clone();
    let outcomes: Vec<Result<ExecutionContext, InterpretError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = units
            .into_iter()
            .map(|unit| {
                let mut local = snapshot.clone();
                scope.spawn(move || {
                    unit(&mut local)?;
                    Ok(local)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(InterpretError::ParallelUnitPanicked("worker thread panicked".to_string())))
            })
            .collect()
    });

    let baseline_outputs = snapshot.outputs().clone();
    let baseline_variables = snapshot.variables().clone();
    let mut seen: BTreeMap<String, Value> = BTreeMap::new();
    let mut merged = snapshot;
    for outcome in outcomes {
        let local = outcome?;
        let mut writes = BTreeMap::new();
        diff(&baseline_outputs, local.outputs(), "outputs", &mut writes);
        diff(&baseline_variables, local.variables(), "variables", &mut writes);
        for (path, value) in writes {
            if seen.contains_key(&path) {
                return Err(InterpretError::ConcurrentWriteConflict(path));
            }
            seen.insert(path.clone(), value.clone());
            merged.set(&path, value)?;
        }
    }
    *base = merged;
    Ok(())
}

fn diff(old: &Value, new: &Value, prefix: &str, out: &mut BTreeMap<String, Value>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            diff_maps(old_map, new_map, prefix, out);
        }
        (Value::Array(old_list), Value::Array(new_list)) if old_list.len() == new_list.len() => {
            for (index, (old_item, new_item)) in old_list.iter().zip(new_list.iter()).enumerate() {
                diff(old_item, new_item, &format!("{prefix}.{index}"), out);
            }
        }
        _ => {
            if old != new {
                out.insert(prefix.to_string(), new.clone());
            }
        }
    }
}

fn diff_maps(old_map: &Map<String, Value>, new_map: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (key, new_value) in new_map {
        let path = format!("{prefix}.{key}");
        match old_map.get(key) {
            Some(old_value) => diff(old_value, new_value, &path, out),
            None => {
                out.insert(path, new_value.clone());
            }
        }
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
    fn disjoint_writes_merge_cleanly() {
        let mut ctx = ExecutionContext::new(json!({}));
        let units: Vec<Box<dyn FnOnce(&mut ExecutionContext) -> Result<(), InterpretError> + Send>> = vec![
            Box::new(|c: &mut ExecutionContext| c.set("outputs.a", json!(1)).map_err(InterpretError::from)),
            Box::new(|c: &mut ExecutionContext| c.set("outputs.b", json!(2)).map_err(InterpretError::from)),
        ];
        run_units(&mut ctx, units).expect("merge");
        assert_eq!(ctx.get("outputs.a").expect("a"), &json!(1));
        assert_eq!(ctx.get("outputs.b").expect("b"), &json!(2));
    }

    #[test]
    fn overlapping_writes_conflict() {
        let mut ctx = ExecutionContext::new(json!({}));
        let units: Vec<Box<dyn FnOnce(&mut ExecutionContext) -> Result<(), InterpretError> + Send>> = vec![
            Box::new(|c: &mut ExecutionContext| c.set("outputs.a", json!(1)).map_err(InterpretError::from)),
            Box::new(|c: &mut ExecutionContext| c.set("outputs.a", json!(2)).map_err(InterpretError::from)),
        ];
        let err = run_units(&mut ctx, units).expect_err("should conflict");
        assert!(matches!(err, InterpretError::ConcurrentWriteConflict(_)));
    }
}
