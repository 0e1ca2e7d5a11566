// grimoire-collaborators/src/tables.rs
// ============================================================================
// Module: In-Memory Table Store
// Description: Weighted random table resolution backed by a plain map.
// Purpose: Give `table_roll` steps a concrete TableStore without requiring
//          a database or network round trip.
// Dependencies: grimoire-core, serde_json
// ============================================================================

//! ## Overview
//! [`InMemoryTableStore`] holds a fixed set of named tables, each a list of
//! weighted entries, and resolves a roll by drawing one value from
//! `1..=total_weight` through the same [`grimoire_core::DiceRoller`] a
//! `dice_roll` step would use — a table roll is, underneath, a dice roll
//! whose die size is the table's total weight. This keeps "randomness" a
//! single collaborator concern rather than duplicating an RNG here, the way
//! `decision-gate-providers`' registry composes other providers instead of
//! re-implementing their logic.

use std::collections::BTreeMap;
use std::sync::Arc;

use grimoire_core::host::{CollaboratorError, DiceRoller, TableOutcome, TableStore};
use serde_json::Value;

/// One weighted row in a table.
#[derive(Debug, Clone)]
pub struct TableEntry {
    /// The entry's relative weight; must be at least 1.
    pub weight: u32,
    /// The value returned when this entry is selected.
    pub value: Value,
}

/// A named table: an ordered list of weighted entries.
#[derive(Debug, Clone, Default)]
pub struct TableDefinition {
    /// The table's entries, in declaration order.
    pub entries: Vec<TableEntry>,
}

impl TableDefinition {
    /// Creates a table from a list of `(weight, value)` pairs.
    #[must_use]
    pub fn new(entries: Vec<TableEntry>) -> Self {
        Self { entries }
    }

    fn total_weight(&self) -> u32 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }
}

/// A fixed, in-process set of named random tables.
pub struct InMemoryTableStore {
    tables: BTreeMap<String, TableDefinition>,
    dice: Arc<dyn DiceRoller>,
}

impl InMemoryTableStore {
    /// Creates a table store over `tables`, drawing randomness from `dice`.
    #[must_use]
    pub fn new(tables: BTreeMap<String, TableDefinition>, dice: Arc<dyn DiceRoller>) -> Self {
        Self { tables, dice }
    }
}

impl TableStore for InMemoryTableStore {
    fn roll_table(&self, name: &str) -> Result<TableOutcome, CollaboratorError> {
        let table = self.tables.get(name).ok_or_else(|| CollaboratorError::Table(format!("unknown table `{name}`")))?;
        if table.entries.is_empty() {
            return Err(CollaboratorError::Table(format!("table `{name}` has no entries")));
        }

        let total_weight = table.total_weight();
        let roll_result = self.dice.roll(&format!("1d{total_weight}"))?;

        let mut cumulative: i64 = 0;
        for entry in &table.entries {
            cumulative += i64::from(entry.weight);
            if roll_result.total <= cumulative {
                return Ok(TableOutcome { entry: entry.value.clone(), roll_result });
            }
        }

        // Weights sum exactly to the die size rolled above, so every roll
        // resolves inside the loop; this only guards against float-free
        // rounding surprises that cannot currently occur.
        Err(CollaboratorError::Table(format!("table `{name}` roll {} did not resolve to an entry", roll_result.total)))
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
    use crate::dice::ExpressionDiceRoller;

    fn store_with_one_table() -> InMemoryTableStore {
        let mut tables = BTreeMap::new();
        tables.insert(
            "weather".to_string(),
            TableDefinition::new(vec![
                TableEntry { weight: 1, value: Value::String("storm".to_string()) },
                TableEntry { weight: 9, value: Value::String("clear".to_string()) },
            ]),
        );
        InMemoryTableStore::new(tables, Arc::new(ExpressionDiceRoller::new()))
    }

    #[test]
    fn rolling_an_unknown_table_is_an_error() {
        let store = store_with_one_table();
        assert!(store.roll_table("nonexistent").is_err());
    }

    #[test]
    fn rolling_a_known_table_returns_one_of_its_entries() {
        let store = store_with_one_table();
        for _ in 0..50 {
            let outcome = store.roll_table("weather").expect("table exists");
            let value = outcome.entry.as_str().expect("entries are strings");
            assert!(value == "storm" || value == "clear");
        }
    }

    #[test]
    fn empty_table_is_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert("empty".to_string(), TableDefinition::default());
        let store = InMemoryTableStore::new(tables, Arc::new(ExpressionDiceRoller::new()));
        assert!(store.roll_table("empty").is_err());
    }
}
