//! The gateway façade (§6): the single `execute` entry point that ties `Request::prepare`,
//! optional structural validation, plan caching, the Planner and the Executor together.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::PlanCache;
use crate::error::{GatewayError, RemoteGraphQLError};
use crate::executor::{self, ExecutionOutcome};
use crate::location::RequestContext;
use crate::planner::{self, Plan};
use crate::request::Request;
use crate::supergraph::Supergraph;

/// Maps an unhandled [`GatewayError`] to the one client-visible message (§7): only an
/// `ExecutionError` is routed through here — other variants already carry a safe message.
pub type ErrorHook = dyn Fn(&GatewayError) -> String + Send + Sync;

fn default_error_hook(err: &GatewayError) -> String {
    match err {
        GatewayError::Execution(_) => "internal error".to_string(),
        other => other.to_string(),
    }
}

/// The gateway's response shape: `{data?, errors?}`, ready to serialize as-is.
#[derive(Debug, Default, serde::Serialize)]
pub struct GatewayResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RemoteGraphQLError>,
}

impl GatewayResponse {
    fn single_error(message: impl Into<String>) -> Self {
        GatewayResponse {
            data: None,
            errors: vec![RemoteGraphQLError { message: message.into(), path: Vec::new(), extensions: Map::new() }],
        }
    }
}

/// One configured gateway instance: a composed [`Supergraph`] plus the optional plan cache and
/// error hook a caller wires in (§6).
pub struct Gateway {
    supergraph: Arc<Supergraph>,
    plan_cache: Option<Arc<dyn PlanCache>>,
    error_hook: Arc<ErrorHook>,
}

impl Gateway {
    pub fn new(supergraph: Arc<Supergraph>) -> Self {
        Self { supergraph, plan_cache: None, error_hook: Arc::new(default_error_hook) }
    }

    pub fn with_plan_cache(mut self, cache: Arc<dyn PlanCache>) -> Self {
        self.plan_cache = Some(cache);
        self
    }

    pub fn with_error_hook(mut self, hook: Arc<ErrorHook>) -> Self {
        self.error_hook = hook;
        self
    }

    /// Executes one client call (§6's `execute(query, variables?, operationName?, context?,
    /// validate?) → {data?, errors?}`).
    pub async fn execute(
        &self,
        query: &str,
        variables: Map<String, Value>,
        operation_name: Option<String>,
        context: RequestContext,
        validate: bool,
    ) -> GatewayResponse {
        match self.run(query, variables, operation_name, context, validate).await {
            Ok(ExecutionOutcome { data, errors }) => GatewayResponse { data, errors },
            Err(err) => GatewayResponse::single_error(err.into_client_message(&*self.error_hook)),
        }
    }

    async fn run(
        &self,
        query: &str,
        variables: Map<String, Value>,
        operation_name: Option<String>,
        context: RequestContext,
        validate: bool,
    ) -> Result<ExecutionOutcome, GatewayError> {
        let request = Request::prepare(query, operation_name, variables, context)?;

        if validate {
            crate::validation::validate(&self.supergraph.schema, &request)?;
        }

        let plan = self.plan_from_cache_or_build(&request).await?;
        let outcome = executor::execute(&self.supergraph, &request, &plan).await?;
        Ok(outcome)
    }

    async fn plan_from_cache_or_build(&self, request: &Request) -> Result<Plan, GatewayError> {
        if let Some(cache) = &self.plan_cache {
            if let Some(cached) = cache.on_cache_read(&request.digest, &request.context).await {
                if let Ok(plan) = serde_json::from_str::<Plan>(&cached) {
                    return Ok(plan);
                }
            }
        }

        let plan = planner::plan(&self.supergraph, request)?;

        if let Some(cache) = &self.plan_cache {
            if let Ok(json) = serde_json::to_string(&plan) {
                cache.on_cache_write(&request.digest, json, &request.context).await;
            }
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::config::GatewayConfig;
    use crate::location::LocationResponse;
    use async_trait::async_trait;
    use indexmap::IndexMap;

    struct StaticExecutor {
        body: Value,
    }

    #[async_trait]
    impl crate::location::LocationExecutor for StaticExecutor {
        async fn execute(
            &self,
            _location: &str,
            _query_document: &str,
            _variables: &Map<String, Value>,
            _context: &RequestContext,
        ) -> Result<LocationResponse, crate::error::ExecutionError> {
            Ok(LocationResponse { data: Some(self.body.clone()), errors: vec![] })
        }
    }

    fn field(name: &str, ty: &str) -> FieldDef {
        FieldDef { name: name.to_string(), arguments: IndexMap::new(), ty: GqlType::Named(ty.to_string()), directives: vec![] }
    }

    fn gateway(body: Value) -> Gateway {
        let mut fields = IndexMap::new();
        fields.insert("widget".to_string(), field("widget", "Widget"));
        let mut query = IndexMap::new();
        query.insert("Query".to_string(), TypeDef::Object(ObjectTypeDef { name: "Query".into(), implements: vec![], fields }));
        let schema = SchemaDoc { query_type: Some("Query".into()), mutation_type: None, subscription_type: None, types: query };

        let mut schemas = IndexMap::new();
        schemas.insert("widgets".to_string(), schema);
        let mut executables: IndexMap<String, Arc<dyn crate::location::LocationExecutor>> = IndexMap::new();
        executables.insert("widgets".to_string(), Arc::new(StaticExecutor { body }));

        let supergraph = crate::composer::compose(schemas, executables, GatewayConfig::default()).unwrap();
        Gateway::new(Arc::new(supergraph))
    }

    #[tokio::test]
    async fn executes_and_returns_data() {
        let gw = gateway(serde_json::json!({"widget": {"id": "1"}}));
        let response = gw.execute("{ widget { id } }", Map::new(), None, RequestContext::new(), false).await;
        assert!(response.errors.is_empty());
        assert_eq!(response.data.unwrap().get("widget").unwrap().get("id").unwrap(), "1");
    }

    #[tokio::test]
    async fn validation_short_circuits_on_an_unknown_field() {
        let gw = gateway(serde_json::json!({}));
        let response = gw.execute("{ nope }", Map::new(), None, RequestContext::new(), true).await;
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
    }

    #[tokio::test]
    async fn plan_errors_short_circuit_before_execution() {
        let gw = gateway(serde_json::json!({}));
        let response = gw.execute("mutation { nope }", Map::new(), None, RequestContext::new(), false).await;
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
    }
}
