// grimoire-collaborators/src/dice.rs
// ============================================================================
// Module: Expression Dice Roller
// Description: Parses and evaluates standard dice notation.
// Purpose: Give `dice_roll` and `dice_sequence` steps a concrete roller.
// Dependencies: grimoire-core, rand
// ============================================================================

//! ## Overview
//! [`ExpressionDiceRoller`] evaluates expressions of the form `NdM+K`, where
//! `N` (the number of dice, default 1) and `K` (a flat modifier, default 0)
//! are optional and `M` (the die size) is required. `table_roll` entries use
//! the same roller internally to pick a weighted row, mirroring the way the
//! teacher's built-in evidence providers are plain, dependency-light
//! evaluators behind a single trait method.

use std::sync::Mutex;

use grimoire_core::host::{CollaboratorError, DiceOutcome, DiceRoller};
use rand::Rng;
use rand::rngs::ThreadRng;

/// Evaluates dice expressions such as `2d6+1` using the thread-local RNG.
pub struct ExpressionDiceRoller {
    rng: Mutex<ThreadRng>,
}

impl ExpressionDiceRoller {
    /// Creates a roller backed by `rand`'s thread-local generator.
    #[must_use]
    pub fn new() -> Self {
        Self { rng: Mutex::new(rand::thread_rng()) }
    }
}

impl Default for ExpressionDiceRoller {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceRoller for ExpressionDiceRoller {
    fn roll(&self, expr: &str) -> Result<DiceOutcome, CollaboratorError> {
        let parsed = ParsedExpr::parse(expr)?;
        let mut rng = self.rng.lock().map_err(|_| CollaboratorError::Dice("dice rng mutex poisoned".to_string()))?;
        Ok(parsed.evaluate(&mut rng))
    }
}

/// A parsed `NdM+K` expression.
struct ParsedExpr {
    count: u32,
    sides: u32,
    modifier: i64,
}

impl ParsedExpr {
    fn parse(expr: &str) -> Result<Self, CollaboratorError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(CollaboratorError::Dice("empty dice expression".to_string()));
        }

        let (body, modifier) = split_modifier(trimmed)?;
        let mut halves = body.splitn(2, ['d', 'D']);
        let count_str = halves.next().unwrap_or_default();
        let sides_str = halves.next().ok_or_else(|| CollaboratorError::Dice(format!("missing `d` in `{expr}`")))?;

        let count = if count_str.is_empty() {
            1
        } else {
            count_str.parse::<u32>().map_err(|_| CollaboratorError::Dice(format!("invalid dice count in `{expr}`")))?
        };
        let sides =
            sides_str.parse::<u32>().map_err(|_| CollaboratorError::Dice(format!("invalid die size in `{expr}`")))?;

        if count == 0 {
            return Err(CollaboratorError::Dice(format!("dice count must be at least 1 in `{expr}`")));
        }
        if sides == 0 {
            return Err(CollaboratorError::Dice(format!("die size must be at least 1 in `{expr}`")));
        }
        if count > 10_000 {
            return Err(CollaboratorError::Dice(format!("dice count too large in `{expr}`")));
        }

        Ok(Self { count, sides, modifier })
    }

    fn evaluate(&self, rng: &mut ThreadRng) -> DiceOutcome {
        let mut rolls = Vec::with_capacity(self.count as usize);
        let mut total: i64 = 0;
        for _ in 0..self.count {
            let value = rng.gen_range(1..=self.sides);
            total += i64::from(value);
            rolls.push(value.to_string());
        }
        total += self.modifier;

        let mut detail = format!("[{}]", rolls.join(", "));
        match self.modifier.cmp(&0) {
            std::cmp::Ordering::Greater => detail.push_str(&format!(" + {}", self.modifier)),
            std::cmp::Ordering::Less => detail.push_str(&format!(" - {}", -self.modifier)),
            std::cmp::Ordering::Equal => {}
        }
        DiceOutcome { total, detail }
    }
}

/// Splits a trailing `+K`/`-K` modifier off the `NdM` body, if present.
fn split_modifier(expr: &str) -> Result<(&str, i64), CollaboratorError> {
    let plus = expr.rfind('+');
    let minus = expr.rfind('-');
    match (plus, minus) {
        (Some(index), None) => {
            let modifier = expr[index + 1..]
                .trim()
                .parse::<i64>()
                .map_err(|_| CollaboratorError::Dice(format!("invalid modifier in `{expr}`")))?;
            Ok((expr[..index].trim(), modifier))
        }
        (None, Some(index)) => {
            let modifier = expr[index + 1..]
                .trim()
                .parse::<i64>()
                .map_err(|_| CollaboratorError::Dice(format!("invalid modifier in `{expr}`")))?;
            Ok((expr[..index].trim(), -modifier))
        }
        (Some(plus_index), Some(minus_index)) => {
            let index = plus_index.max(minus_index);
            let is_negative = index == minus_index;
            let raw = expr[index + 1..]
                .trim()
                .parse::<i64>()
                .map_err(|_| CollaboratorError::Dice(format!("invalid modifier in `{expr}`")))?;
            let modifier = if is_negative { -raw } else { raw };
            Ok((expr[..index].trim(), modifier))
        }
        (None, None) => Ok((expr, 0)),
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

    #[test]
    fn single_die_has_no_modifier() {
        let roller = ExpressionDiceRoller::new();
        let outcome = roller.roll("1d6").expect("valid expression");
        assert!((1..=6).contains(&outcome.total));
    }

    #[test]
    fn multiple_dice_with_positive_modifier() {
        let roller = ExpressionDiceRoller::new();
        let outcome = roller.roll("2d6+3").expect("valid expression");
        assert!((5..=15).contains(&outcome.total));
        assert!(outcome.detail.contains("+ 3"));
    }

    #[test]
    fn negative_modifier_can_drive_total_below_the_dice_floor() {
        let roller = ExpressionDiceRoller::new();
        let outcome = roller.roll("1d4-10").expect("valid expression");
        assert!(outcome.total <= -6);
        assert!(outcome.detail.contains("- 10"));
    }

    #[test]
    fn implicit_single_die_count() {
        let roller = ExpressionDiceRoller::new();
        let outcome = roller.roll("d20").expect("valid expression");
        assert!((1..=20).contains(&outcome.total));
    }

    #[test]
    fn zero_sided_die_is_rejected() {
        let roller = ExpressionDiceRoller::new();
        assert!(roller.roll("1d0").is_err());
    }

    #[test]
    fn garbage_expression_is_rejected() {
        let roller = ExpressionDiceRoller::new();
        assert!(roller.roll("not-dice").is_err());
    }
}
