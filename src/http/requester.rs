//! HTTP requester
//!
//! The requester is a pure builder/decision object: it evaluates every piece
//! of one request (URL, path, method, query parameters, headers, body)
//! against the current sync context and delegates retry decisions to its
//! retrier. It performs no I/O itself; the read driver executes what the
//! requester describes, one page at a time.

use super::providers::{
    InterpolatedProvider, RequestHeaderProvider, RequestParameterProvider, StaticProvider,
};
use super::retry::{BackoffPolicy, ExponentialBackoffRetrier, Retrier};
use crate::auth::Authenticator;
use crate::decode::{DecoderConfig, RecordDecoder};
use crate::error::{Error, Result};
use crate::partition::StreamSlice;
use crate::state::StreamState;
use crate::template::{has_templates, EvalContext, Evaluator, TemplateEvaluator};
use crate::types::{JsonValue, Method, Record, StringMap};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds and classifies the HTTP requests for one stream
pub struct HttpRequester {
    name: String,
    url_base: String,
    path: String,
    method: Method,
    params: Box<dyn RequestParameterProvider>,
    headers: Box<dyn RequestHeaderProvider>,
    body: Option<JsonValue>,
    authenticator: Authenticator,
    decoder: Box<dyn RecordDecoder>,
    retrier: Box<dyn Retrier>,
    evaluator: Arc<dyn Evaluator>,
    config: JsonValue,
}

impl HttpRequester {
    /// Start building a requester for the named stream
    pub fn builder(name: impl Into<String>) -> HttpRequesterBuilder {
        HttpRequesterBuilder::new(name)
    }

    /// The stream name this requester serves
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assemble the evaluation context for one request
    pub fn context(
        &self,
        stream_state: &StreamState,
        stream_slice: Option<&StreamSlice>,
        next_page_token: Option<&JsonValue>,
    ) -> EvalContext {
        EvalContext::with_config(self.config.clone())
            .state(stream_state.to_value())
            .partition(stream_slice.map(StreamSlice::to_value).unwrap_or_default())
            .page_token(next_page_token.cloned().unwrap_or_default())
    }

    /// The base URL, evaluated against the connector config
    pub fn url_base(&self) -> Result<String> {
        let ctx = EvalContext::with_config(self.config.clone());
        self.evaluator.eval_string(&self.url_base, &ctx)
    }

    /// The request path, evaluated against the full context
    pub fn path(&self, ctx: &EvalContext) -> Result<String> {
        self.evaluator.eval_string(&self.path, ctx)
    }

    /// The full URL for one request: base joined with the evaluated path
    pub fn url(&self, ctx: &EvalContext) -> Result<String> {
        let base = self.url_base()?;
        let path = self.path(ctx)?;

        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path);
        }

        let base = base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(format!("{base}/{path}"))
    }

    /// The HTTP method, fixed at construction
    pub fn method(&self) -> Method {
        self.method
    }

    /// Query parameters for one request
    pub fn query_params(&self, ctx: &EvalContext) -> Result<StringMap> {
        self.params.request_params(ctx)
    }

    /// Headers for one request
    pub fn headers(&self, ctx: &EvalContext) -> Result<StringMap> {
        self.headers.request_headers(ctx)
    }

    /// The JSON body for one request, with template strings rendered
    pub fn body_json(&self, ctx: &EvalContext) -> Result<Option<JsonValue>> {
        self.body
            .as_ref()
            .map(|body| render_body(body, self.evaluator.as_ref(), ctx))
            .transpose()
    }

    /// The authenticator the HTTP layer attaches to outgoing requests
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Decode a response body into records
    pub fn decode(&self, body: &str) -> Result<Vec<Record>> {
        self.decoder.decode(body)
    }

    /// Decode a response body into the full response value (for pagination)
    pub fn decode_raw(&self, body: &str) -> Result<JsonValue> {
        self.decoder.decode_raw(body)
    }

    // Retry surface: delegated entirely to the retrier

    /// Whether the response should be retried
    pub fn should_retry(&self, response: &reqwest::Response) -> bool {
        self.retrier.should_retry(response)
    }

    /// Server-directed backoff, if any
    pub fn backoff_time(&self, response: &reqwest::Response) -> Option<Duration> {
        self.retrier.backoff_time(response)
    }

    /// The retry budget, if bounded
    pub fn max_retries(&self) -> Option<u32> {
        self.retrier.max_retries()
    }

    /// Base of the exponential retry delay, in seconds
    pub fn retry_factor(&self) -> f64 {
        self.retrier.retry_factor()
    }
}

impl std::fmt::Debug for HttpRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequester")
            .field("name", &self.name)
            .field("url_base", &self.url_base)
            .field("path", &self.path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Render all template strings inside a JSON body
fn render_body(value: &JsonValue, evaluator: &dyn Evaluator, ctx: &EvalContext) -> Result<JsonValue> {
    match value {
        Value::String(s) if has_templates(s) => Ok(Value::String(evaluator.eval_string(s, ctx)?)),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::new();
            for (key, val) in map {
                rendered.insert(key.clone(), render_body(val, evaluator, ctx)?);
            }
            Ok(Value::Object(rendered))
        }
        Value::Array(arr) => Ok(Value::Array(
            arr.iter()
                .map(|v| render_body(v, evaluator, ctx))
                .collect::<Result<_>>()?,
        )),
        _ => Ok(value.clone()),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HttpRequester`]
pub struct HttpRequesterBuilder {
    name: String,
    url_base: String,
    path: String,
    method: Method,
    param_templates: Vec<(String, String)>,
    params: Option<Box<dyn RequestParameterProvider>>,
    header_templates: Vec<(String, String)>,
    headers: Option<Box<dyn RequestHeaderProvider>>,
    body: Option<JsonValue>,
    authenticator: Authenticator,
    decoder_config: DecoderConfig,
    retrier: Option<Box<dyn Retrier>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    config: JsonValue,
}

impl HttpRequesterBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_base: String::new(),
            path: String::new(),
            method: Method::GET,
            param_templates: Vec::new(),
            params: None,
            header_templates: Vec::new(),
            headers: None,
            body: None,
            authenticator: Authenticator::None,
            decoder_config: DecoderConfig::json(),
            retrier: None,
            evaluator: None,
            config: JsonValue::Null,
        }
    }

    /// Set the base URL (may contain templates over config)
    #[must_use]
    pub fn url_base(mut self, url_base: impl Into<String>) -> Self {
        self.url_base = url_base.into();
        self
    }

    /// Set the request path (may contain templates over the full context)
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the HTTP method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a templated query parameter
    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.param_templates.push((name.into(), template.into()));
        self
    }

    /// Replace the parameter provider wholesale
    #[must_use]
    pub fn param_provider(mut self, provider: Box<dyn RequestParameterProvider>) -> Self {
        self.params = Some(provider);
        self
    }

    /// Add a templated header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.header_templates.push((name.into(), template.into()));
        self
    }

    /// Replace the header provider wholesale
    #[must_use]
    pub fn header_provider(mut self, provider: Box<dyn RequestHeaderProvider>) -> Self {
        self.headers = Some(provider);
        self
    }

    /// Set the JSON request body (template strings are rendered per request)
    #[must_use]
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the authenticator
    #[must_use]
    pub fn authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Set the decoder configuration
    #[must_use]
    pub fn decoder(mut self, config: DecoderConfig) -> Self {
        self.decoder_config = config;
        self
    }

    /// Set the retrier
    #[must_use]
    pub fn retrier(mut self, retrier: Box<dyn Retrier>) -> Self {
        self.retrier = Some(retrier);
        self
    }

    /// Set the backoff policy on the default retrier
    #[must_use]
    pub fn backoff_policy(mut self, policy: BackoffPolicy) -> Self {
        self.retrier = Some(Box::new(ExponentialBackoffRetrier::new(policy)));
        self
    }

    /// Set the expression evaluator
    #[must_use]
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Set the connector configuration templates evaluate against
    #[must_use]
    pub fn config(mut self, config: JsonValue) -> Self {
        self.config = config;
        self
    }

    /// Build the requester
    pub fn build(self) -> Result<HttpRequester> {
        if self.url_base.is_empty() {
            return Err(Error::missing_field("url_base"));
        }

        // A literal base URL can be validated up front; templated ones are
        // resolved per sync
        if !has_templates(&self.url_base) {
            Url::parse(&self.url_base)?;
        }

        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Arc::new(TemplateEvaluator::new()));

        for template in self
            .param_templates
            .iter()
            .chain(self.header_templates.iter())
            .map(|(_, t)| t)
            .chain([&self.url_base, &self.path])
        {
            evaluator.validate(template)?;
        }

        let params: Box<dyn RequestParameterProvider> = match self.params {
            Some(provider) => provider,
            None if self.param_templates.is_empty() => Box::new(StaticProvider::empty()),
            None => Box::new(InterpolatedProvider::new(
                self.param_templates,
                Arc::clone(&evaluator),
            )),
        };

        let headers: Box<dyn RequestHeaderProvider> = match self.headers {
            Some(provider) => provider,
            None if self.header_templates.is_empty() => Box::new(StaticProvider::empty()),
            None => Box::new(InterpolatedProvider::new(
                self.header_templates,
                Arc::clone(&evaluator),
            )),
        };

        let retrier = self
            .retrier
            .unwrap_or_else(|| Box::new(ExponentialBackoffRetrier::new(BackoffPolicy::default())));

        // A fresh decoder per build: decoders are never shared between
        // requester instances
        let decoder = crate::decode::build_decoder(&self.decoder_config);

        Ok(HttpRequester {
            name: self.name,
            url_base: self.url_base,
            path: self.path,
            method: self.method,
            params,
            headers,
            body: self.body,
            authenticator: self.authenticator,
            decoder,
            retrier,
            evaluator,
            config: self.config,
        })
    }
}
