//! A small harness for exercising the composer and planner from the command line against SDL
//! files on disk. Dispatching a plan over the wire is out of scope here — this binary only
//! composes and plans.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use graphql_stitch::{compose, GatewayConfig, LocationExecutor, LocationResponse, RequestContext};

#[derive(Parser)]
#[command(name = "gateway-cli", about = "Compose and plan against stitching gateway locations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose the given locations and report the merged supergraph's shape.
    Compose {
        #[arg(long = "location", value_name = "NAME=PATH", required = true)]
        locations: Vec<String>,
    },
    /// Compose the given locations, then plan one query document against the result.
    Plan {
        #[arg(long = "location", value_name = "NAME=PATH", required = true)]
        locations: Vec<String>,
        #[arg(long)]
        query: PathBuf,
        #[arg(long)]
        operation_name: Option<String>,
    },
}

struct UncalledExecutor;

#[async_trait::async_trait]
impl LocationExecutor for UncalledExecutor {
    async fn execute(
        &self,
        location: &str,
        _query_document: &str,
        _variables: &serde_json::Map<String, serde_json::Value>,
        _context: &RequestContext,
    ) -> Result<LocationResponse, graphql_stitch::GatewayError> {
        unreachable!("gateway-cli never dispatches to location `{location}` — it only composes and plans")
    }
}

fn parse_location_args(args: &[String]) -> Result<HashMap<String, PathBuf>> {
    let mut out = HashMap::new();
    for arg in args {
        let Some((name, path)) = arg.split_once('=') else {
            bail!("--location expects NAME=PATH, got `{arg}`");
        };
        out.insert(name.to_string(), PathBuf::from(path));
    }
    Ok(out)
}

async fn load_schemas(
    locations: &HashMap<String, PathBuf>,
) -> Result<indexmap::IndexMap<String, graphql_stitch::ast::SchemaDoc>> {
    let mut schemas = indexmap::IndexMap::new();
    for (name, path) in locations {
        let sdl = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading schema for location `{name}` at {}", path.display()))?;
        let schema =
            graphql_stitch::parser::parse_schema(&sdl).map_err(|err| anyhow::anyhow!("{name}: {err}"))?;
        schemas.insert(name.clone(), schema);
    }
    Ok(schemas)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compose { locations } => {
            let locations = parse_location_args(&locations)?;
            let schemas = load_schemas(&locations).await?;
            let mut executables: indexmap::IndexMap<String, Arc<dyn LocationExecutor>> = indexmap::IndexMap::new();
            for name in schemas.keys() {
                executables.insert(name.clone(), Arc::new(UncalledExecutor));
            }
            let supergraph = compose(schemas, executables, GatewayConfig::default())
                .map_err(|err| anyhow::anyhow!("{err}"))?;
            println!("locations: {:?}", supergraph.locations.iter().collect::<Vec<_>>());
            println!("merged types: {}", supergraph.schema.types.len());
            println!("boundary queries: {}", supergraph.boundaries.len());
        }
        Command::Plan { locations, query, operation_name } => {
            let locations = parse_location_args(&locations)?;
            let schemas = load_schemas(&locations).await?;
            let mut executables: indexmap::IndexMap<String, Arc<dyn LocationExecutor>> = indexmap::IndexMap::new();
            for name in schemas.keys() {
                executables.insert(name.clone(), Arc::new(UncalledExecutor));
            }
            let supergraph = compose(schemas, executables, GatewayConfig::default())
                .map_err(|err| anyhow::anyhow!("{err}"))?;

            let query_text = tokio::fs::read_to_string(&query)
                .await
                .with_context(|| format!("reading query document at {}", query.display()))?;
            let request = graphql_stitch::Request::prepare(
                &query_text,
                operation_name,
                serde_json::Map::new(),
                RequestContext::new(),
            )
            .map_err(|err| anyhow::anyhow!("{err}"))?;
            let built = graphql_stitch::plan(&supergraph, &request).map_err(|err| anyhow::anyhow!("{err}"))?;
            println!("{}", serde_json::to_string_pretty(&built)?);
        }
    }

    Ok(())
}
