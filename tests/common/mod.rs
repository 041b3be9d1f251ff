//! Shared fixtures for the integration suite: a fixed-response [`LocationExecutor`] and a couple
//! of small location SDL pairs reused across composer/planner/executor/scenario tests.

use std::sync::{Arc, Once};

use async_trait::async_trait;
use graphql_stitch::error::ExecutionError;
use graphql_stitch::{compose, GatewayConfig, LocationExecutor, LocationResponse, RequestContext, Supergraph};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A location whose response never depends on the outbound document — the unit under test here
/// is the gateway's own composition/planning/merging logic, not a real upstream's resolvers.
pub struct StaticExecutor {
    pub body: Value,
}

#[async_trait]
impl LocationExecutor for StaticExecutor {
    async fn execute(
        &self,
        _location: &str,
        _query_document: &str,
        _variables: &Map<String, Value>,
        _context: &RequestContext,
    ) -> Result<LocationResponse, ExecutionError> {
        Ok(LocationResponse { data: Some(self.body.clone()), errors: Vec::new() })
    }
}

/// A location whose response is produced by a closure, so a test can assert on the document the
/// gateway actually sent (e.g. the batched boundary-query shape) before returning a fixture.
pub struct RecordingExecutor<F> {
    pub respond: F,
}

#[async_trait]
impl<F> LocationExecutor for RecordingExecutor<F>
where
    F: Fn(&str) -> LocationResponse + Send + Sync,
{
    async fn execute(
        &self,
        _location: &str,
        query_document: &str,
        _variables: &Map<String, Value>,
        _context: &RequestContext,
    ) -> Result<LocationResponse, ExecutionError> {
        Ok((self.respond)(query_document))
    }
}

static TRACING: Once = Once::new();

/// Installs a test-scoped `tracing` subscriber once per process, so `#[instrument]` spans on the
/// executor path surface in `cargo test -- --nocapture` instead of going nowhere.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn compose_with(
    schemas: Vec<(&str, &str)>,
    executors: Vec<(&str, Arc<dyn LocationExecutor>)>,
) -> Supergraph {
    let mut schema_map = IndexMap::new();
    for (location, sdl) in schemas {
        let schema = graphql_stitch::parser::parse_schema(sdl).unwrap();
        schema_map.insert(location.to_string(), schema);
    }
    let mut executable_map: IndexMap<String, Arc<dyn LocationExecutor>> = IndexMap::new();
    for (location, executor) in executors {
        executable_map.insert(location.to_string(), executor);
    }
    compose(schema_map, executable_map, GatewayConfig::default()).unwrap()
}

pub const WIDGETS_SDL: &str = r#"
    type Query {
      widget: Widget
    }
    type Mutation {
      makeWidget: Widget
    }
    type Widget { id: ID }
"#;

pub const SPROCKETS_SDL: &str = r#"
    type Query {
      sprocket: Sprocket
    }
    type Mutation {
      makeSprocket: Sprocket
    }
    type Sprocket { id: ID }
"#;

/// A location whose response carries both data and `errors[]`, for exercising error repathing.
pub struct FixtureExecutor {
    pub data: Value,
    pub errors: Vec<graphql_stitch::error::RemoteGraphQLError>,
}

#[async_trait]
impl LocationExecutor for FixtureExecutor {
    async fn execute(
        &self,
        _location: &str,
        _query_document: &str,
        _variables: &Map<String, Value>,
        _context: &RequestContext,
    ) -> Result<LocationResponse, ExecutionError> {
        Ok(LocationResponse { data: Some(self.data.clone()), errors: self.errors.clone() })
    }
}
