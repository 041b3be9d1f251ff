//! The `LocationExecutor` contract (§6): the one seam every sub-query crosses to reach an
//! upstream GraphQL endpoint (or, for `"__super"`, the local introspection resolver). Modeled as
//! an `async_trait` (`async fn`, boxed futures) rather than a synchronous callback —
//! implementations may wrap a blocking call in `tokio::task::spawn_blocking` if they need to, but
//! the contract itself is always async.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RemoteGraphQLError;

/// The response shape every location returns: a GraphQL-style `{data, errors}` pair. Either may
/// be empty; both may be present at once (partial success).
#[derive(Debug, Clone, Default)]
pub struct LocationResponse {
    pub data: Option<Value>,
    pub errors: Vec<RemoteGraphQLError>,
}

/// Opaque, cloneable context threaded from the client call down to every LocationExecutor
/// invocation for that request (auth headers, trace ids, …). The gateway never inspects it.
pub type RequestContext = Map<String, Value>;

#[async_trait]
pub trait LocationExecutor: Send + Sync {
    /// Issues `query_document` (already fully rendered GraphQL text) against this location.
    /// Must not mutate `variables` or `context`.
    async fn execute(
        &self,
        location: &str,
        query_document: &str,
        variables: &Map<String, Value>,
        context: &RequestContext,
    ) -> Result<LocationResponse, crate::error::ExecutionError>;
}

/// A `LocationExecutor` backed by a plain async closure — useful for tests and for small
/// embedded locations that don't need a full struct.
pub struct FnLocationExecutor<F> {
    f: F,
}

impl<F> FnLocationExecutor<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> LocationExecutor for FnLocationExecutor<F>
where
    F: Fn(String, String, Map<String, Value>, RequestContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<LocationResponse, crate::error::ExecutionError>>
        + Send,
{
    async fn execute(
        &self,
        location: &str,
        query_document: &str,
        variables: &Map<String, Value>,
        context: &RequestContext,
    ) -> Result<LocationResponse, crate::error::ExecutionError> {
        (self.f)(
            location.to_string(),
            query_document.to_string(),
            variables.clone(),
            context.clone(),
        )
        .await
    }
}
