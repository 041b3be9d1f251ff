//! The gateway's error taxonomy.
//!
//! Every fallible entry point returns one of these through `?`; `GatewayError` is the umbrella
//! `thiserror` enum — one variant per source error, `#[error(transparent)]` throughout so
//! `Display` just defers to the inner error.

use std::fmt;

/// A structural error discovered while composing N location schemas into a supergraph.
/// Raised eagerly at build time; by construction it never reaches the request path.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CompositionError {
    pub message: String,
}

impl CompositionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A request that could not be turned into a `Plan`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PlanError {
    pub message: String,
}

impl PlanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A request that failed structural validation against the supergraph's merged schema.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A transport or parse failure talking to a location (as opposed to a GraphQL-level error
/// returned *by* a location, which is a [`RemoteGraphQLError`] and passes through to the client).
#[derive(Debug, thiserror::Error)]
#[error("location {location} failed: {message}")]
pub struct ExecutionError {
    pub location: String,
    pub message: String,
}

/// One `errors[]` entry returned by a location's response body. Not a failure of the gateway;
/// collected, repathed (§4.3) and merged verbatim into the final result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemoteGraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

/// A single segment of a GraphQL response path: either a response key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Index(idx) => write!(f, "{idx}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("failed to parse document: {0}")]
    Parse(String),
}

impl GatewayError {
    pub fn parse(message: impl Into<String>) -> Self {
        GatewayError::Parse(message.into())
    }

    /// A single generic client-visible error entry, per §7's policy for `ExecutionError`: the
    /// caller's `ErrorHook` decides the message, the gateway never leaks transport internals.
    pub fn into_client_message(self, hook: &dyn Fn(&GatewayError) -> String) -> String {
        match &self {
            GatewayError::Execution(_) => hook(&self),
            other => other.to_string(),
        }
    }
}
