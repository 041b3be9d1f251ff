//! The Planner (§4.2): turns a [`Request`] against a [`Supergraph`] into a [`Plan`] — an ordered,
//! dependency-annotated sequence of per-location [`Operation`]s.

mod descend;
mod pathfind;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::ast::{OperationKind, Selection};
use crate::error::PathSegment;
use crate::error::PlanError;
use crate::request::Request;
use crate::supergraph::{BoundaryQuery, Supergraph};

/// One per-location sub-query in a [`Plan`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub step: u32,
    pub after: u32,
    pub location: String,
    pub operation_type: OperationKind,
    /// Textual GraphQL for this operation's selection set (braces included, no fragments).
    pub selection_set: String,
    /// Declared-variable names this operation's selection set actually references.
    pub variables: Vec<String>,
    /// Response-key path this operation's selections are rooted at; empty for root operations.
    pub path: Vec<PathSegment>,
    /// For abstract-type branches: the concrete `__typename` required at `path` to run this op.
    pub if_type: Option<String>,
    /// Present iff this operation fulfills a merged type via a boundary query.
    pub boundary: Option<BoundaryQuery>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub operations: Vec<Operation>,
}

pub(crate) struct PlanCtx<'a> {
    pub supergraph: &'a Supergraph,
    pub request: &'a Request,
    pub next_step: u32,
    pub finished: Vec<Operation>,
}

impl<'a> PlanCtx<'a> {
    fn alloc_step(&mut self) -> u32 {
        let step = self.next_step;
        self.next_step += 1;
        step
    }
}

/// Builds a [`Plan`] for `request` against `supergraph`.
pub fn plan(supergraph: &Supergraph, request: &Request) -> Result<Plan, PlanError> {
    if request.operation_kind == OperationKind::Subscription {
        return Err(PlanError::new("the root operation is a subscription, which this gateway cannot plan"));
    }

    reject_reserved_aliases(supergraph, &request.selection_set)?;

    let root_type = match request.operation_kind {
        OperationKind::Mutation => supergraph
            .schema
            .mutation_type
            .as_deref()
            .ok_or_else(|| PlanError::new("supergraph has no mutation root"))?,
        _ => supergraph
            .schema
            .query_type
            .as_deref()
            .ok_or_else(|| PlanError::new("supergraph has no query root"))?,
    };
    if !supergraph.schema.types.contains_key(root_type) {
        return Err(PlanError::new(format!("supergraph has no `{root_type}` root")));
    }

    let mut ctx = PlanCtx { supergraph, request, next_step: 1, finished: Vec::new() };

    let is_mutation = request.operation_kind == OperationKind::Mutation;
    let groups = group_root_selections(supergraph, root_type, &request.selection_set, is_mutation)?;

    let mut previous_step = 0u32;
    for group in groups {
        let step = ctx.alloc_step();
        let after = if is_mutation { previous_step } else { 0 };
        let stub_index = ctx.finished.len();
        ctx.finished.push(Operation {
            step,
            after,
            location: group.location.clone(),
            operation_type: request.operation_kind,
            selection_set: String::new(),
            variables: Vec::new(),
            path: Vec::new(),
            if_type: None,
            boundary: None,
        });

        let finalized = if group.location == supergraph.config.introspection_location {
            group.selections
        } else {
            descend::descend(&mut ctx, &group.location, root_type, &[], group.selections, step)?
        };

        let variables = referenced_declared_variables(request, &finalized);
        let text = crate::parser::print_selection_set(&finalized);
        ctx.finished[stub_index].selection_set = text;
        ctx.finished[stub_index].variables = variables;

        if is_mutation {
            previous_step = step;
        }
    }

    Ok(Plan { operations: ctx.finished })
}

struct RootGroup {
    location: String,
    selections: Vec<Selection>,
}

/// Root scoping + grouping (§4.2 steps 2-3): assigns each top-level selection a resolving
/// location. Queries have no ordering guarantee between sibling operations, so every selection
/// bound for the same location coalesces into one group no matter where it sits in the client's
/// text (§8 scenario 1). Mutations must preserve textual order, so only *contiguous* same-location
/// runs coalesce — two runs of the same location separated by another location stay separate ops
/// (§8 scenario 2).
fn group_root_selections(
    supergraph: &Supergraph,
    root_type: &str,
    selections: &[Selection],
    is_mutation: bool,
) -> Result<Vec<RootGroup>, PlanError> {
    let flattened = descend::flatten_same_type_fragments(selections, root_type);

    let mut assignments: Vec<(String, Selection)> = Vec::with_capacity(flattened.len());
    let mut previous_location: Option<String> = None;
    for selection in flattened {
        let Selection::Field(field) = &selection else {
            return Err(PlanError::new("root selection set may only contain fields after fragment inlining"));
        };
        let location = resolve_root_location(supergraph, root_type, &field.name, previous_location.as_deref())?;
        previous_location = Some(location.clone());
        assignments.push((location, selection));
    }

    if is_mutation {
        let mut groups: Vec<RootGroup> = Vec::new();
        for (location, selection) in assignments {
            match groups.last_mut() {
                Some(group) if group.location == location => group.selections.push(selection),
                _ => groups.push(RootGroup { location, selections: vec![selection] }),
            }
        }
        Ok(groups)
    } else {
        let mut buckets: indexmap::IndexMap<String, Vec<Selection>> = indexmap::IndexMap::new();
        for (location, selection) in assignments {
            buckets.entry(location).or_default().push(selection);
        }
        Ok(buckets.into_iter().map(|(location, selections)| RootGroup { location, selections }).collect())
    }
}

fn resolve_root_location(
    supergraph: &Supergraph,
    root_type: &str,
    field_name: &str,
    preferred: Option<&str>,
) -> Result<String, PlanError> {
    if matches!(field_name, "__schema" | "__type" | "__typename") {
        return Ok(supergraph.config.introspection_location.clone());
    }

    let candidates = supergraph.locations_resolving_field(root_type, field_name);
    if candidates.is_empty() {
        return Err(PlanError::new(format!("no location resolves root field `{root_type}.{field_name}`")));
    }
    if let Some(preferred) = preferred {
        if candidates.contains(&preferred) {
            return Ok(preferred.to_string());
        }
    }
    Ok(candidates[0].to_string())
}

fn reject_reserved_aliases(supergraph: &Supergraph, selections: &[Selection]) -> Result<(), PlanError> {
    let reserved = [
        supergraph.config.export_alias_prefix.as_str(),
        supergraph.config.reserved_prefix.as_str(),
    ];
    for selection in selections {
        if let Selection::Field(field) = selection {
            if let Some(alias) = &field.alias {
                if reserved.iter().any(|prefix| alias.starts_with(prefix)) {
                    return Err(PlanError::new(format!(
                        "selection alias `{alias}` uses a reserved prefix"
                    )));
                }
            }
            reject_reserved_aliases(supergraph, &field.selection_set)?;
        } else if let Selection::InlineFragment(frag) = selection {
            reject_reserved_aliases(supergraph, &frag.selection_set)?;
        }
    }
    Ok(())
}

fn referenced_declared_variables(request: &Request, selections: &[Selection]) -> Vec<String> {
    let mut used = IndexSet::new();
    crate::ast::collect_variable_usages(selections, &mut used);
    request
        .variable_definitions
        .iter()
        .map(|v| v.name.clone())
        .filter(|name| used.contains(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::config::GatewayConfig;
    use crate::location::{LocationResponse, RequestContext};
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use std::sync::Arc;

    struct StubExecutor;

    #[async_trait]
    impl crate::location::LocationExecutor for StubExecutor {
        async fn execute(
            &self,
            _location: &str,
            _query_document: &str,
            _variables: &serde_json::Map<String, serde_json::Value>,
            _context: &RequestContext,
        ) -> Result<LocationResponse, crate::error::ExecutionError> {
            Ok(LocationResponse::default())
        }
    }

    fn field(name: &str, ty: &str) -> FieldDef {
        FieldDef { name: name.to_string(), arguments: IndexMap::new(), ty: GqlType::Named(ty.to_string()), directives: vec![] }
    }

    fn two_location_supergraph() -> Supergraph {
        let mut widgets_fields = IndexMap::new();
        widgets_fields.insert("widget".to_string(), field("widget", "Widget"));
        let mut widgets_query = IndexMap::new();
        widgets_query.insert(
            "Query".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Query".into(), implements: vec![], fields: widgets_fields }),
        );
        let mut widgets_mutation_fields = IndexMap::new();
        widgets_mutation_fields.insert("makeWidget".to_string(), field("makeWidget", "Widget"));
        widgets_query.insert(
            "Mutation".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Mutation".into(), implements: vec![], fields: widgets_mutation_fields }),
        );
        let widgets_schema = SchemaDoc {
            query_type: Some("Query".into()),
            mutation_type: Some("Mutation".into()),
            subscription_type: None,
            types: widgets_query,
        };

        let mut sprockets_fields = IndexMap::new();
        sprockets_fields.insert("sprocket".to_string(), field("sprocket", "Sprocket"));
        let mut sprockets_query = IndexMap::new();
        sprockets_query.insert(
            "Query".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Query".into(), implements: vec![], fields: sprockets_fields }),
        );
        let mut sprockets_mutation_fields = IndexMap::new();
        sprockets_mutation_fields.insert("makeSprocket".to_string(), field("makeSprocket", "Sprocket"));
        sprockets_query.insert(
            "Mutation".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Mutation".into(), implements: vec![], fields: sprockets_mutation_fields }),
        );
        let sprockets_schema = SchemaDoc {
            query_type: Some("Query".into()),
            mutation_type: Some("Mutation".into()),
            subscription_type: None,
            types: sprockets_query,
        };

        let mut schemas = IndexMap::new();
        schemas.insert("widgets".to_string(), widgets_schema);
        schemas.insert("sprockets".to_string(), sprockets_schema);

        let mut executables: IndexMap<String, Arc<dyn crate::location::LocationExecutor>> = IndexMap::new();
        executables.insert("widgets".to_string(), Arc::new(StubExecutor));
        executables.insert("sprockets".to_string(), Arc::new(StubExecutor));

        crate::composer::compose(schemas, executables, GatewayConfig::default()).unwrap()
    }

    #[test]
    fn splits_a_query_by_location() {
        let supergraph = two_location_supergraph();
        let request = Request::prepare(
            "{ a:widget{id} b:sprocket{id} c:widget{id} d:sprocket{id} }",
            None,
            serde_json::Map::new(),
            RequestContext::new(),
        )
        .unwrap();

        let built = plan(&supergraph, &request).unwrap();
        assert_eq!(built.operations.len(), 2);
        assert!(built.operations.iter().all(|op| op.after == 0));
        let widgets_op = built.operations.iter().find(|op| op.location == "widgets").unwrap();
        assert!(widgets_op.selection_set.contains("a: widget"));
        assert!(widgets_op.selection_set.contains("c: widget"));
    }

    #[test]
    fn serializes_mutation_groups_in_order() {
        let supergraph = two_location_supergraph();
        let request = Request::prepare(
            "mutation { a:makeWidget{id} b:makeSprocket{id} c:makeSprocket{id} d:makeWidget{id} e:makeWidget{id} }",
            None,
            serde_json::Map::new(),
            RequestContext::new(),
        )
        .unwrap();

        let built = plan(&supergraph, &request).unwrap();
        assert_eq!(built.operations.len(), 3);
        assert_eq!(built.operations[0].location, "widgets");
        assert_eq!(built.operations[1].location, "sprockets");
        assert_eq!(built.operations[2].location, "widgets");
        assert_eq!(built.operations[0].after, 0);
        assert_eq!(built.operations[1].after, built.operations[0].step);
        assert_eq!(built.operations[2].after, built.operations[1].step);
    }

    #[test]
    fn rejects_reserved_alias_prefix() {
        let supergraph = two_location_supergraph();
        let request = Request::prepare(
            "{ _export_x:widget{id} }",
            None,
            serde_json::Map::new(),
            RequestContext::new(),
        )
        .unwrap();
        assert!(plan(&supergraph, &request).is_err());
    }
}
