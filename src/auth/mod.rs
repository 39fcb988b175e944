//! Authentication module
//!
//! Authenticators are opaque capabilities attached to outgoing requests by
//! the HTTP layer. The requester exposes its authenticator; the read driver
//! applies it when a request is actually sent.

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};


/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// Authentication applied to each outgoing request
#[derive(Debug, Clone, Default)]
pub enum Authenticator {
    /// No authentication required
    #[default]
    None,

    /// API Key authentication (header or query)
    ApiKey {
        /// Where to place the API key
        location: Location,
        /// Header or query parameter name
        name: String,
        /// Prefix to add before the value (e.g., "Bearer ")
        prefix: Option<String>,
        /// The API key value
        value: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl Authenticator {
    /// API key placed in a request header
    pub fn api_key_header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ApiKey {
            location: Location::Header,
            name: name.into(),
            prefix: None,
            value: value.into(),
        }
    }

    /// API key placed in a query parameter
    pub fn api_key_query(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ApiKey {
            location: Location::Query,
            name: name.into(),
            prefix: None,
            value: value.into(),
        }
    }

    /// Bearer token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// HTTP basic credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Authenticator::None => req,

            Authenticator::ApiKey {
                location,
                name,
                prefix,
                value,
            } => {
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    Location::Header => req.header(name.as_str(), val),
                    Location::Query => req.query(&[(name.as_str(), val.as_str())]),
                }
            }

            Authenticator::Basic { username, password } => req.basic_auth(username, Some(password)),

            Authenticator::Bearer { token } => req.bearer_auth(token),
        }
    }
}
