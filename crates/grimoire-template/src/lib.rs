// grimoire-template/src/lib.rs
// ============================================================================
// Module: Grimoire Template Adapter
// Description: Renders double-brace expressions against a JSON execution context.
// Purpose: Provide a single, narrow rendering surface the rest of Grimoire depends on.
// Dependencies: minijinja, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate wraps [`minijinja`] behind a small, stable surface: render a
//! template string against a `serde_json::Value` context and get back either
//! a rendered `String` or a [`TemplateError`]. Nothing else in the workspace
//! talks to `minijinja` directly.
//!
//! The adapter layers two behaviors on top of the underlying engine:
//! - a textual pre-pass that rewrites the literal `||` default operator into
//!   MiniJinja's native `or`, so flow authors can write `{{ a || 'Unnamed' }}`
//!   without the underlying engine understanding `||` itself;
//! - strict undefined-variable behavior, so an unresolved reference is a
//!   [`TemplateError::UnresolvedReference`] rather than silently rendering as
//!   empty.

#![forbid(unsafe_code)]

use std::fmt;

use minijinja::{Environment, UndefinedBehavior, Value as MiniValue};
use serde_json::Value as JsonValue;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while rendering a template string.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template failed to parse or evaluate.
    #[error("template error: {0}")]
    Syntax(String),
    /// A referenced path was not defined in the context (strict mode only).
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Renders template strings against a JSON execution context.
///
/// `Adapter` is cheap to construct and holds no context of its own; callers
/// pass the context tree on every call to [`Adapter::render`].
pub struct Adapter {
    env: Environment<'static>,
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter").finish_non_exhaustive()
    }
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter {
    /// Creates an adapter configured for strict, side-effect-free rendering.
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    /// Renders `template` against `context`, returning the rendered string.
    ///
    /// `context` is typically the execution context projected as
    /// `{"inputs": ..., "outputs": ..., "variables": ..., "result": ...,
    /// "item": ..., "key": ..., "value": ...}`; unset bindings should be
    /// omitted rather than set to `null`, since strict mode distinguishes
    /// "undefined" from "null".
    ///
    /// # Errors
    /// Returns [`TemplateError::Syntax`] if the template fails to parse or
    /// evaluate, or [`TemplateError::UnresolvedReference`] if it references a
    /// name that is not present in `context`.
    pub fn render(&self, template: &str, context: &JsonValue) -> Result<String, TemplateError> {
        let rewritten = rewrite_default_operator(template);
        let ctx = MiniValue::from_serialize(context);
        self.env
            .render_str(&rewritten, ctx)
            .map_err(classify_error)
    }

    /// Returns `true` if `template` contains at least one `{{ ... }}` or
    /// `{% ... %}` block, i.e. whether rendering it could do anything beyond
    /// returning the string unchanged.
    #[must_use]
    pub fn is_template(template: &str) -> bool {
        template.contains("{{") || template.contains("{%")
    }

    /// Renders `template` against `context`, preserving the underlying JSON
    /// type when `template` is, once trimmed, a single bare `{{ ... }}`
    /// expression with no surrounding text (e.g. `"{{ result.total }}"`).
    /// Any other shape (no braces, or an expression embedded in a longer
    /// string) renders as a plain `String`, matching [`Self::render`].
    ///
    /// This is what lets `set_value {path, value: "{{ result.total }}"}`
    /// write an integer rather than its string form.
    ///
    /// # Errors
    /// Returns the same errors as [`Self::render`].
    pub fn render_value(&self, template: &str, context: &JsonValue) -> Result<JsonValue, TemplateError> {
        let rewritten = rewrite_default_operator(template.trim());
        if let Some(inner) = sole_expression(&rewritten) {
            let ctx = MiniValue::from_serialize(context);
            let expr = self.env.compile_expression(inner).map_err(classify_error)?;
            let value = expr.eval(ctx).map_err(classify_error)?;
            return serde_json::to_value(value).map_err(|err| TemplateError::Syntax(err.to_string()));
        }
        self.render(template, context).map(JsonValue::String)
    }
}

/// Returns the inner expression text if `rewritten` is, in its entirety, one
/// `{{ ... }}` block with nothing before or after it.
fn sole_expression(rewritten: &str) -> Option<&str> {
    let inner = rewritten.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

fn classify_error(err: minijinja::Error) -> TemplateError {
    if matches!(err.kind(), minijinja::ErrorKind::UndefinedError) {
        TemplateError::UnresolvedReference(err.to_string())
    } else {
        TemplateError::Syntax(err.to_string())
    }
}

// ============================================================================
// SECTION: `||` default-operator preprocessing
// ============================================================================

/// Rewrites `||` to ` or ` inside `{{ ... }}` expression blocks, leaving
/// string literals and everything outside expression blocks untouched.
///
/// This is a textual, single-pass rewrite rather than a full reparse: it
/// tracks whether it is inside an expression block and inside a quoted
/// string within that block, and only rewrites `||` when in the former and
/// not the latter.
fn rewrite_default_operator(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    let mut in_expr = false;
    let mut quote: Option<char> = None;
    let mut prev_was_backslash = false;

    while i < chars.len() {
        let c = chars[i];
        if !in_expr {
            if c == '{' && chars.get(i + 1) == Some(&'{') {
                in_expr = true;
                out.push_str("{{");
                i += 2;
                continue;
            }
            out.push(c);
            i += 1;
            continue;
        }

        if let Some(q) = quote {
            out.push(c);
            if c == q && !prev_was_backslash {
                quote = None;
            }
            prev_was_backslash = c == '\\' && !prev_was_backslash;
            i += 1;
            continue;
        }

        if c == '\'' || c == '"' {
            quote = Some(c);
            out.push(c);
            i += 1;
            continue;
        }

        if c == '}' && chars.get(i + 1) == Some(&'}') {
            in_expr = false;
            out.push_str("}}");
            i += 2;
            continue;
        }

        if c == '|' && chars.get(i + 1) == Some(&'|') {
            out.push_str(" or ");
            i += 2;
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
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
    fn renders_plain_path() {
        let adapter = Adapter::new();
        let ctx = json!({"outputs": {"name": "Kael"}});
        let rendered = adapter.render("{{ outputs.name }}", &ctx).expect("render");
        assert_eq!(rendered, "Kael");
    }

    #[test]
    fn default_operator_falls_back_on_undefined() {
        let adapter = Adapter::new();
        let ctx = json!({"outputs": {}});
        let rendered = adapter
            .render("{{ outputs.name || 'Unnamed' }}", &ctx)
            .expect("render");
        assert_eq!(rendered, "Unnamed");
    }

    #[test]
    fn default_operator_ignored_inside_string_literal() {
        let adapter = Adapter::new();
        let ctx = json!({});
        let rendered = adapter
            .render("{{ 'a||b' }}", &ctx)
            .expect("render");
        assert_eq!(rendered, "a||b");
    }

    #[test]
    fn strict_mode_rejects_unresolved_reference() {
        let adapter = Adapter::new();
        let ctx = json!({});
        let err = adapter
            .render("{{ outputs.missing }}", &ctx)
            .expect_err("should fail");
        assert!(matches!(err, TemplateError::UnresolvedReference(_)));
    }

    #[test]
    fn filters_apply() {
        let adapter = Adapter::new();
        let ctx = json!({"outputs": {"name": "kael"}});
        let rendered = adapter
            .render("{{ outputs.name | title }}", &ctx)
            .expect("render");
        assert_eq!(rendered, "Kael");
    }

    #[test]
    fn is_template_detects_expression_blocks() {
        assert!(Adapter::is_template("{{ outputs.name }}"));
        assert!(!Adapter::is_template("a literal string"));
    }

    #[test]
    fn render_value_preserves_type_for_sole_expression() {
        let adapter = Adapter::new();
        let ctx = json!({"result": {"total": 7}});
        let rendered = adapter.render_value("{{ result.total }}", &ctx).expect("render");
        assert_eq!(rendered, json!(7));
    }

    #[test]
    fn render_value_stringifies_embedded_expressions() {
        let adapter = Adapter::new();
        let ctx = json!({"result": {"total": 7}});
        let rendered = adapter
            .render_value("Total: {{ result.total }}", &ctx)
            .expect("render");
        assert_eq!(rendered, json!("Total: 7"));
    }

    #[test]
    fn render_value_passes_through_literal_strings() {
        let adapter = Adapter::new();
        let ctx = json!({});
        let rendered = adapter.render_value("Kael", &ctx).expect("render");
        assert_eq!(rendered, json!("Kael"));
    }
}
