//! Request parameter and header providers
//!
//! Providers compute the query parameters and headers for one request from
//! the current evaluation context. Two variants exist per seam: interpolated
//! (templated values rendered per request) and static.

use crate::error::Result;
use crate::template::{EvalContext, Evaluator};
use crate::types::StringMap;
use std::sync::Arc;

/// Trait for computing query parameters
pub trait RequestParameterProvider: Send + Sync {
    /// The query parameters for the given context
    fn request_params(&self, ctx: &EvalContext) -> Result<StringMap>;
}

/// Trait for computing request headers
pub trait RequestHeaderProvider: Send + Sync {
    /// The headers for the given context
    fn request_headers(&self, ctx: &EvalContext) -> Result<StringMap>;
}

// ============================================================================
// Interpolated provider
// ============================================================================

/// Renders each configured value through the evaluator per request.
/// Entries that render to an empty string are omitted, so a template
/// referencing an absent page token simply drops the parameter.
pub struct InterpolatedProvider {
    templates: Vec<(String, String)>,
    evaluator: Arc<dyn Evaluator>,
}

impl InterpolatedProvider {
    /// Create a provider from (name, template) pairs
    pub fn new(
        templates: impl IntoIterator<Item = (String, String)>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            templates: templates.into_iter().collect(),
            evaluator,
        }
    }

    fn render_all(&self, ctx: &EvalContext) -> Result<StringMap> {
        let mut rendered = StringMap::new();
        for (name, template) in &self.templates {
            // Lenient rendering: an absent context value (e.g. no page token
            // yet) omits the entry instead of failing the request
            let value = self.evaluator.eval_optional(template, ctx);
            if !value.is_empty() {
                rendered.insert(name.clone(), value);
            }
        }
        Ok(rendered)
    }
}

impl RequestParameterProvider for InterpolatedProvider {
    fn request_params(&self, ctx: &EvalContext) -> Result<StringMap> {
        self.render_all(ctx)
    }
}

impl RequestHeaderProvider for InterpolatedProvider {
    fn request_headers(&self, ctx: &EvalContext) -> Result<StringMap> {
        self.render_all(ctx)
    }
}

impl std::fmt::Debug for InterpolatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpolatedProvider")
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Static provider
// ============================================================================

/// Returns the same fixed entries for every request
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    entries: StringMap,
}

impl StaticProvider {
    /// Create a provider with fixed entries
    pub fn new(entries: StringMap) -> Self {
        Self { entries }
    }

    /// Create an empty provider
    pub fn empty() -> Self {
        Self::default()
    }
}

impl RequestParameterProvider for StaticProvider {
    fn request_params(&self, _ctx: &EvalContext) -> Result<StringMap> {
        Ok(self.entries.clone())
    }
}

impl RequestHeaderProvider for StaticProvider {
    fn request_headers(&self, _ctx: &EvalContext) -> Result<StringMap> {
        Ok(self.entries.clone())
    }
}
