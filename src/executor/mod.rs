//! The Executor (§4.3): walks a [`Plan`], batching and dispatching per-location sub-queries
//! concurrently as their `after` dependencies clear, merges every response into one data tree,
//! re-paths remote errors, and strips the Planner's `_STITCH_*` bookkeeping before returning.

pub(crate) mod batch;
mod merge;

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::{ExecutionError, RemoteGraphQLError};
use crate::planner::{Operation, Plan};
use crate::request::Request;
use crate::supergraph::Supergraph;

/// The gateway's top-level result: a GraphQL-shaped `{data, errors}` pair, ready to serialize.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    pub data: Option<Value>,
    pub errors: Vec<RemoteGraphQLError>,
}

/// Executes `plan` against `supergraph` for `request`.
///
/// An [`ExecutionError`] — a transport or parse failure reaching a location — aborts the whole
/// request; §7's policy is that the caller gets a generic error and no partial `data`. A
/// [`RemoteGraphQLError`] — an entry in a location's own `errors[]` — is not fatal: it is
/// collected, repathed, and merged into the result while sibling operations keep running.
#[instrument(skip_all, fields(operations = plan.operations.len()))]
pub async fn execute(
    supergraph: &Supergraph,
    request: &Request,
    plan: &Plan,
) -> Result<ExecutionOutcome, ExecutionError> {
    let mut data = Value::Object(Map::new());
    let mut errors = Vec::new();
    let mut completed: HashSet<u32> = HashSet::new();
    let mut remaining: Vec<&Operation> = plan.operations.iter().collect();

    while !remaining.is_empty() {
        let (ready, not_ready): (Vec<&Operation>, Vec<&Operation>) =
            remaining.into_iter().partition(|op| op.after == 0 || completed.contains(&op.after));
        if ready.is_empty() {
            // Unreachable for a plan the Planner produced: every `after` names an earlier step.
            break;
        }
        remaining = not_ready;

        let groups = batch::group_by_location_and_after(&ready);
        let outcomes = futures::future::join_all(
            groups.into_iter().map(|group| dispatch_batch(supergraph, request, &data, group)),
        )
        .await;

        for outcome in outcomes {
            merge::apply_batch_outcome(&mut data, &mut errors, outcome?);
        }

        for op in ready {
            completed.insert(op.step);
        }
    }

    merge::strip_reserved_fields(&mut data, &supergraph.config.reserved_prefix);
    Ok(ExecutionOutcome { data: Some(data), errors })
}

async fn dispatch_batch<'a>(
    supergraph: &Supergraph,
    request: &Request,
    data: &Value,
    group: batch::BatchGroup<'a>,
) -> Result<batch::BatchOutcome<'a>, ExecutionError> {
    if group.location == supergraph.config.introspection_location {
        return crate::introspection::resolve_batch(supergraph, request, group);
    }

    let built = batch::build_document(request, data, &group);
    let executor = supergraph.executables.get(&group.location).ok_or_else(|| ExecutionError {
        location: group.location.clone(),
        message: "no executor registered for this location".to_string(),
    })?;

    let response = executor.execute(&group.location, &built.document, &built.variables, &request.context).await?;

    Ok(batch::BatchOutcome { members: built.members, data: response.data, errors: response.errors })
}
