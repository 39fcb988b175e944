//! Expression evaluation and template interpolation
//!
//! Handles `{{ variable }}` interpolation against an explicit [`EvalContext`].
//! Supports nested access like `{{ config.api_key }}` and `{{ partition.id }}`,
//! plus boolean conditions such as `{{ record.status }} == 'active'`.
//!
//! Evaluation is exposed through the [`Evaluator`] capability trait so the
//! expression language is an injected collaborator, never an ambient lookup.
//! [`TemplateEvaluator`] is the default implementation.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Comparison operators recognized in boolean conditions, longest first so
/// `>=` is not split as `>`.
const OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

// ============================================================================
// Evaluation context
// ============================================================================

/// Explicit variable roots for one evaluation.
///
/// Each field is addressable by name from a template: `{{ config.x }}`,
/// `{{ record.x }}`, `{{ partition.x }}`, `{{ state.x }}`,
/// `{{ page_token.x }}`. A bare path falls back to `config`.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// Connector configuration values
    pub config: JsonValue,
    /// The record under evaluation (filters only)
    pub record: JsonValue,
    /// Current partition/slice values
    pub partition: JsonValue,
    /// Persisted stream state
    pub state: JsonValue,
    /// Next-page token from the paginator
    pub page_token: JsonValue,
}

impl EvalContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with config values
    pub fn with_config(config: JsonValue) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Set the record under evaluation
    #[must_use]
    pub fn record(mut self, record: JsonValue) -> Self {
        self.record = record;
        self
    }

    /// Set partition values
    #[must_use]
    pub fn partition(mut self, partition: JsonValue) -> Self {
        self.partition = partition;
        self
    }

    /// Set the stream state
    #[must_use]
    pub fn state(mut self, state: JsonValue) -> Self {
        self.state = state;
        self
    }

    /// Set the next-page token
    #[must_use]
    pub fn page_token(mut self, token: JsonValue) -> Self {
        self.page_token = token;
        self
    }

    /// Get a value by path (e.g., "config.api_key")
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.is_empty() {
            return None;
        }

        let root = match parts[0] {
            "config" => &self.config,
            "record" => &self.record,
            "partition" => &self.partition,
            "state" => &self.state,
            "page_token" => &self.page_token,
            // Bare paths resolve against config
            _ => return get_nested_value(&self.config, &parts),
        };

        if parts.len() == 1 {
            Some(root)
        } else {
            get_nested_value(root, &parts[1..])
        }
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

// ============================================================================
// Evaluator capability
// ============================================================================

/// Capability for evaluating templates and boolean conditions against a
/// context. Implementations must be pure: same inputs, same output, no side
/// effects.
pub trait Evaluator: Send + Sync {
    /// Render a string template; undefined variables are an error
    fn eval_string(&self, template: &str, ctx: &EvalContext) -> Result<String>;

    /// Render a string template, resolving undefined variables to empty
    /// strings. Used where an absent context value (e.g. no page token on
    /// the first request) should omit the output rather than fail.
    fn eval_optional(&self, template: &str, ctx: &EvalContext) -> String;

    /// Evaluate a boolean condition; undefined variables resolve to empty
    /// (falsy) operands rather than erroring, so per-record gaps do not
    /// abort a sync
    fn eval_bool(&self, condition: &str, ctx: &EvalContext) -> Result<bool>;

    /// Validate an expression without evaluating it. Malformed expressions
    /// are configuration errors and must be surfaced before any record is
    /// processed.
    fn validate(&self, expression: &str) -> Result<()>;
}

/// Default [`Evaluator`] backed by `{{ variable.path }}` interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEvaluator;

impl TemplateEvaluator {
    /// Create a new template evaluator
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for TemplateEvaluator {
    fn eval_string(&self, template: &str, ctx: &EvalContext) -> Result<String> {
        self.validate(template)?;
        render(template, ctx)
    }

    fn eval_optional(&self, template: &str, ctx: &EvalContext) -> String {
        render_lenient(template, ctx)
    }

    fn eval_bool(&self, condition: &str, ctx: &EvalContext) -> Result<bool> {
        self.validate(condition)?;
        let rendered = render_lenient(condition, ctx);
        Ok(eval_condition(&rendered))
    }

    fn validate(&self, expression: &str) -> Result<()> {
        // Every "{{" must be consumed by a well-formed variable reference.
        let stripped = TEMPLATE_REGEX.replace_all(expression, "");
        if stripped.contains("{{") || stripped.contains("}}") {
            return Err(Error::template(format!(
                "malformed template expression: {expression}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a template string with the given context
pub fn render(template: &str, ctx: &EvalContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let var_path = cap.get(1).unwrap().as_str();

        match ctx.get(var_path) {
            Some(value) => {
                let replacement = value_to_string(value);
                result = result.replace(full_match, &replacement);
            }
            None => {
                errors.push(var_path.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Render a template, substituting empty strings for undefined variables
pub fn render_lenient(template: &str, ctx: &EvalContext) -> String {
    let mut result = template.to_string();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let var_path = cap.get(1).unwrap().as_str();

        let replacement = ctx.get(var_path).map(value_to_string).unwrap_or_default();
        result = result.replace(full_match, &replacement);
    }

    result
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // For complex types, use JSON serialization
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

// ============================================================================
// Boolean conditions
// ============================================================================

/// Evaluate a fully-rendered condition string.
///
/// Supports a single top-level comparison (`==`, `!=`, `>`, `>=`, `<`, `<=`)
/// between two operands, or the truthiness of the whole string when no
/// operator is present.
fn eval_condition(rendered: &str) -> bool {
    if let Some((lhs, op, rhs)) = split_comparison(rendered) {
        return compare(strip_quotes(lhs.trim()), op, strip_quotes(rhs.trim()));
    }
    is_truthy(strip_quotes(rendered.trim()))
}

/// Split a condition on the first comparison operator outside quotes
fn split_comparison(s: &str) -> Option<(&str, &str, &str)> {
    let mut quote: Option<char> = None;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                } else {
                    for op in OPERATORS {
                        if s[i..].starts_with(op) {
                            return Some((&s[..i], op, &s[i + op.len()..]));
                        }
                    }
                }
            }
        }
    }
    None
}

/// Compare two rendered operands, numerically when both parse as numbers
fn compare(lhs: &str, op: &str, rhs: &str) -> bool {
    if let (Ok(l), Ok(r)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        return match op {
            "==" => (l - r).abs() < f64::EPSILON,
            "!=" => (l - r).abs() >= f64::EPSILON,
            ">" => l > r,
            ">=" => l >= r,
            "<" => l < r,
            "<=" => l <= r,
            _ => false,
        };
    }

    match op {
        "==" => lhs == rhs,
        "!=" => lhs != rhs,
        ">" => lhs > rhs,
        ">=" => lhs >= rhs,
        "<" => lhs < rhs,
        "<=" => lhs <= rhs,
        _ => false,
    }
}

/// Strip one layer of matching surrounding quotes
fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 {
        let b = s.as_bytes();
        if (b[0] == b'\'' && b[s.len() - 1] == b'\'') || (b[0] == b'"' && b[s.len() - 1] == b'"') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Truthiness of a rendered scalar
fn is_truthy(s: &str) -> bool {
    !(s.is_empty()
        || s.eq_ignore_ascii_case("false")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("none")
        || s == "0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_substitution() {
        let ctx = EvalContext::with_config(json!({
            "api_key": "sk_test_123"
        }));

        let result = render("Bearer {{ config.api_key }}", &ctx).unwrap();
        assert_eq!(result, "Bearer sk_test_123");
    }

    #[test]
    fn test_multiple_substitutions() {
        let ctx = EvalContext::with_config(json!({
            "host": "api.example.com",
            "version": "v1"
        }));

        let result = render("https://{{ config.host }}/{{ config.version }}/users", &ctx).unwrap();
        assert_eq!(result, "https://api.example.com/v1/users");
    }

    #[test]
    fn test_nested_value() {
        let ctx = EvalContext::with_config(json!({
            "credentials": {
                "client_id": "my-client",
                "client_secret": "secret123"
            }
        }));

        let result = render("Client: {{ config.credentials.client_id }}", &ctx).unwrap();
        assert_eq!(result, "Client: my-client");
    }

    #[test]
    fn test_partition_and_token_roots() {
        let ctx = EvalContext::with_config(json!({"base": "https://api.example.com"}))
            .partition(json!({"repo_id": "12345"}))
            .page_token(json!({"cursor": "abc"}));

        let result = render(
            "{{ config.base }}/repos/{{ partition.repo_id }}?after={{ page_token.cursor }}",
            &ctx,
        )
        .unwrap();
        assert_eq!(result, "https://api.example.com/repos/12345?after=abc");
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = EvalContext::new();
        let result = render("{{ config.missing }}", &ctx);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("config.missing"));
    }

    #[test]
    fn test_render_lenient() {
        let ctx = EvalContext::with_config(json!({"key": "value"}));

        assert_eq!(render_lenient("test {{ config.key }}", &ctx), "test value");
        assert_eq!(render_lenient("test {{ config.missing }}", &ctx), "test ");
    }

    #[test]
    fn test_has_templates() {
        assert!(has_templates("{{ config.key }}"));
        assert!(has_templates("prefix {{ var }} suffix"));
        assert!(!has_templates("no templates here"));
        assert!(!has_templates("{ not a template }"));
    }

    #[test]
    fn test_whitespace_in_template() {
        let ctx = EvalContext::with_config(json!({"key": "value"}));

        assert_eq!(render("{{config.key}}", &ctx).unwrap(), "value");
        assert_eq!(render("{{ config.key }}", &ctx).unwrap(), "value");
        assert_eq!(render("{{  config.key  }}", &ctx).unwrap(), "value");
    }

    #[test]
    fn test_eval_bool_comparison() {
        let evaluator = TemplateEvaluator::new();
        let ctx = EvalContext::new().record(json!({"status": "active", "total": 150}));

        assert!(evaluator
            .eval_bool("{{ record.status }} == 'active'", &ctx)
            .unwrap());
        assert!(!evaluator
            .eval_bool("{{ record.status }} == 'archived'", &ctx)
            .unwrap());
        assert!(evaluator
            .eval_bool("{{ record.total }} > 100", &ctx)
            .unwrap());
        assert!(evaluator
            .eval_bool("{{ record.total }} <= 150", &ctx)
            .unwrap());
        assert!(evaluator
            .eval_bool("{{ record.status }} != 'archived'", &ctx)
            .unwrap());
    }

    #[test]
    fn test_eval_bool_numeric_not_lexicographic() {
        let evaluator = TemplateEvaluator::new();
        let ctx = EvalContext::new().record(json!({"count": 9}));

        // 9 < 100 numerically, but "9" > "100" lexicographically
        assert!(evaluator.eval_bool("{{ record.count }} < 100", &ctx).unwrap());
    }

    #[test]
    fn test_eval_bool_truthiness() {
        let evaluator = TemplateEvaluator::new();
        let ctx = EvalContext::new().record(json!({"active": true, "deleted": false}));

        assert!(evaluator.eval_bool("{{ record.active }}", &ctx).unwrap());
        assert!(!evaluator.eval_bool("{{ record.deleted }}", &ctx).unwrap());
        // Missing variables are falsy, not an error
        assert!(!evaluator.eval_bool("{{ record.missing }}", &ctx).unwrap());
    }

    #[test]
    fn test_eval_bool_quoted_operator() {
        let evaluator = TemplateEvaluator::new();
        let ctx = EvalContext::new();

        // Operators inside quoted literals must not split the comparison
        assert!(evaluator.eval_bool("'a == b' == 'a == b'", &ctx).unwrap());
        assert!(!evaluator.eval_bool("'a == b' == 'c'", &ctx).unwrap());
    }

    #[test]
    fn test_validate_malformed() {
        let evaluator = TemplateEvaluator::new();
        assert!(evaluator.validate("{{ config.ok }}").is_ok());
        assert!(evaluator.validate("no templates").is_ok());
        assert!(evaluator.validate("{{ unclosed").is_err());
        assert!(evaluator.validate("{{ bad-name }}").is_err());
    }

    #[test]
    fn test_eval_string_requires_defined_vars() {
        let evaluator = TemplateEvaluator::new();
        let ctx = EvalContext::with_config(json!({"key": "v"}));

        assert_eq!(evaluator.eval_string("{{ config.key }}", &ctx).unwrap(), "v");
        assert!(evaluator.eval_string("{{ config.nope }}", &ctx).is_err());
    }
}
