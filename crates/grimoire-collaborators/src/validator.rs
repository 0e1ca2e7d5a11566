// grimoire-collaborators/src/validator.rs
// ============================================================================
// Module: Basic Type Validator
// Description: Validates values against basic types and registered models.
// Purpose: Give `validate_value` actions and validated inputs/outputs a
//          concrete Validator collaborator.
// Dependencies: grimoire-core, serde_json
// ============================================================================

//! ## Overview
//! A flow's type identifiers are either one of six basic types (`str`,
//! `int`, `bool`, `float`, `list`, `dict`) or an opaque registered model
//! name. [`BasicTypeValidator`] checks the basic types directly against
//! `serde_json::Value`'s shape and dispatches registered model names to a
//! caller-supplied predicate, mirroring how `decision-gate-providers`'
//! registry routes by identifier to whichever provider was registered for
//! it rather than hardcoding every provider inline.

use std::collections::BTreeMap;
use std::sync::Arc;

use grimoire_core::host::{CollaboratorError, ValidationOutcome};
use grimoire_core::Validator;
use serde_json::Value;

/// A model-specific validation rule: returns the list of violations (empty
/// means valid).
pub type ModelRule = Arc<dyn Fn(&Value) -> Vec<String> + Send + Sync>;

/// Validates basic types inline and registered model names via a caller
/// supplied rule.
#[derive(Clone, Default)]
pub struct BasicTypeValidator {
    models: BTreeMap<String, ModelRule>,
}

impl BasicTypeValidator {
    /// Creates a validator with no registered models.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validation rule for a model name.
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>, rule: ModelRule) -> Self {
        self.models.insert(name.into(), rule);
        self
    }
}

impl Validator for BasicTypeValidator {
    fn validate(&self, type_name: &str, value: &Value) -> Result<ValidationOutcome, CollaboratorError> {
        if let Some(violations) = basic_type_violations(type_name, value) {
            return Ok(if violations.is_empty() { ValidationOutcome::Valid } else { ValidationOutcome::Invalid(violations) });
        }

        let rule = self
            .models
            .get(type_name)
            .ok_or_else(|| CollaboratorError::Validator(format!("unknown type `{type_name}`")))?;
        let violations = rule(value);
        Ok(if violations.is_empty() { ValidationOutcome::Valid } else { ValidationOutcome::Invalid(violations) })
    }
}

/// Returns `Some(violations)` if `type_name` is one of the six basic types,
/// or `None` if it should be looked up as a registered model instead.
fn basic_type_violations(type_name: &str, value: &Value) -> Option<Vec<String>> {
    let ok = match type_name {
        "str" => value.is_string(),
        "int" => value.as_i64().is_some() || value.as_u64().is_some(),
        "bool" => value.is_boolean(),
        "float" => value.is_f64() || value.as_i64().is_some(),
        "list" => value.is_array(),
        "dict" => value.is_object(),
        _ => return None,
    };
    Some(if ok { Vec::new() } else { vec![format!("expected {type_name}, got {value}")] })
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
    fn basic_types_validate_their_shape() {
        let validator = BasicTypeValidator::new();
        assert!(matches!(validator.validate("str", &json!("hi")).expect("str is a basic type"), ValidationOutcome::Valid));
        assert!(matches!(validator.validate("str", &json!(5)).expect("str is a basic type"), ValidationOutcome::Invalid(_)));
        assert!(matches!(validator.validate("int", &json!(5)).expect("int is a basic type"), ValidationOutcome::Valid));
        assert!(matches!(validator.validate("list", &json!([1, 2])).expect("list is a basic type"), ValidationOutcome::Valid));
    }

    #[test]
    fn unknown_type_name_is_an_error() {
        let validator = BasicTypeValidator::new();
        assert!(validator.validate("character_sheet", &json!({})).is_err());
    }

    #[test]
    fn registered_model_rule_is_used() {
        let validator = BasicTypeValidator::new().with_model(
            "positive_int",
            Arc::new(|value: &Value| {
                if value.as_i64().is_some_and(|n| n > 0) { Vec::new() } else { vec!["must be a positive integer".to_string()] }
            }),
        );
        assert!(matches!(validator.validate("positive_int", &json!(3)).expect("positive_int is registered"), ValidationOutcome::Valid));
        assert!(matches!(validator.validate("positive_int", &json!(-1)).expect("positive_int is registered"), ValidationOutcome::Invalid(_)));
    }
}
