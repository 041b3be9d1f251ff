//! The Composer (§4.1): merges N location schemas into one [`Supergraph`], eagerly rejecting any
//! combination that cannot be served consistently. Composition runs once, at startup (or whenever
//! locations are reloaded); the request path never sees a `CompositionError`.

mod merge;
mod stitch;

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::ast::{ObjectTypeDef, SchemaDoc, TypeDef};
use crate::config::GatewayConfig;
use crate::error::CompositionError;
use crate::location::LocationExecutor;
use crate::supergraph::Supergraph;

/// Composes `schemas` (one SDL document per location) plus their executors into a [`Supergraph`].
///
/// `schemas` and `executables` must carry exactly the same key set; locations present in one but
/// not the other are a configuration error the caller should catch before calling `compose`, so
/// this only asserts it rather than returning a typed error for it.
pub fn compose(
    schemas: IndexMap<String, SchemaDoc>,
    executables: IndexMap<String, Arc<dyn LocationExecutor>>,
    config: GatewayConfig,
) -> Result<Supergraph, CompositionError> {
    for location in schemas.keys() {
        if !executables.contains_key(location) {
            return Err(CompositionError::new(format!(
                "location `{location}` has a schema but no executor was registered for it"
            )));
        }
    }

    for (location, schema) in &schemas {
        if schema.subscription_type.is_some() {
            return Err(CompositionError::new(format!(
                "location `{location}` declares a subscription root, which this gateway does not compose"
            )));
        }
    }

    let mut fields_by_type_and_location: IndexMap<(String, String), IndexSet<String>> = IndexMap::new();

    // Every location's own schema calls its roots `Query`/`Mutation` (the SDL convention);
    // `config.query_type_name`/`mutation_type_name` only rename the *merged* root the supergraph
    // publishes them under.
    const QUERY_ROOT_NAME: &str = "Query";
    const MUTATION_ROOT_NAME: &str = "Mutation";

    if !schemas.values().any(|s| s.query_type.is_some()) {
        return Err(CompositionError::new("no location declares a Query root"));
    }
    let merged_query = merge::merge_root_type(
        QUERY_ROOT_NAME,
        &schemas,
        &config.stitch_directive_name,
        &mut fields_by_type_and_location,
    )?;

    let has_mutation = schemas.values().any(|s| s.mutation_type.is_some());
    let merged_mutation = if has_mutation {
        Some(merge::merge_root_type(
            MUTATION_ROOT_NAME,
            &schemas,
            &config.stitch_directive_name,
            &mut fields_by_type_and_location,
        )?)
    } else {
        None
    };

    let mut type_names: IndexSet<String> = IndexSet::new();
    for schema in schemas.values() {
        for name in schema.types.keys() {
            if name != QUERY_ROOT_NAME && schema.mutation_type.as_deref() != Some(name) {
                type_names.insert(name.clone());
            }
        }
    }

    let query_type_name = &config.query_type_name;
    let mutation_type_name = &config.mutation_type_name;
    if query_type_name != QUERY_ROOT_NAME && type_names.contains(query_type_name) {
        return Err(CompositionError::new(format!(
            "query root rename `{query_type_name}` collides with an existing type of the same name"
        )));
    }
    if has_mutation && mutation_type_name != MUTATION_ROOT_NAME && type_names.contains(mutation_type_name) {
        return Err(CompositionError::new(format!(
            "mutation root rename `{mutation_type_name}` collides with an existing type of the same name"
        )));
    }
    if has_mutation && query_type_name == mutation_type_name {
        return Err(CompositionError::new(format!(
            "query and mutation roots cannot both be renamed to `{query_type_name}`"
        )));
    }

    let mut merged_types: IndexMap<String, TypeDef> = IndexMap::new();
    merged_types.insert(
        query_type_name.clone(),
        TypeDef::Object(ObjectTypeDef { name: query_type_name.clone(), ..merged_query }),
    );
    if let Some(mutation) = merged_mutation {
        merged_types.insert(
            mutation_type_name.clone(),
            TypeDef::Object(ObjectTypeDef { name: mutation_type_name.clone(), ..mutation }),
        );
    }
    for type_name in &type_names {
        let merged = merge::merge_type(type_name, &schemas, &mut fields_by_type_and_location)?;
        merged_types.insert(type_name.clone(), merged);
    }

    let boundaries = stitch::discover_boundary_queries(&schemas, &config)?;

    validate_boundary_coverage(&schemas, &merged_types, &fields_by_type_and_location, &boundaries, &config)?;

    let schema = SchemaDoc {
        query_type: Some(query_type_name.clone()),
        mutation_type: has_mutation.then(|| mutation_type_name.clone()),
        subscription_type: None,
        types: merged_types,
    };

    let locations: IndexSet<String> = schemas.keys().cloned().collect();

    Ok(Supergraph { schema, locations, fields_by_type_and_location, boundaries, executables, config })
}

/// Every type contributed to by more than one location must be reachable at each of its
/// contributing locations: either because a boundary query fetches it there, or because that
/// location exposes a plain (non-`@stitch`) root field returning it directly, making it a valid
/// plan-entry location the Planner reaches without ever needing a boundary (§4.1 invariant, §8
/// scenario 6 — the entry location of an asymmetric join never needs a boundary back into itself).
fn validate_boundary_coverage(
    schemas: &IndexMap<String, SchemaDoc>,
    merged_types: &IndexMap<String, TypeDef>,
    fields_by_type_and_location: &IndexMap<(String, String), IndexSet<String>>,
    boundaries: &IndexMap<String, Vec<crate::supergraph::BoundaryQuery>>,
    config: &GatewayConfig,
) -> Result<(), CompositionError> {
    for type_name in merged_types.keys() {
        let contributing: Vec<&str> = fields_by_type_and_location
            .keys()
            .filter(|(t, _)| t == type_name)
            .map(|(_, loc)| loc.as_str())
            .collect();
        if contributing.len() <= 1 {
            continue;
        }
        let reachable: IndexSet<&str> =
            boundaries.get(type_name).map(|bs| bs.iter().map(|b| b.location.as_str()).collect()).unwrap_or_default();
        let natural_entries = natural_entry_locations(type_name, schemas, &config.stitch_directive_name);
        for location in &contributing {
            if !reachable.contains(location) && !natural_entries.contains(*location) {
                return Err(CompositionError::new(format!(
                    "type `{type_name}` is contributed to by location `{location}` but it is \
                     neither a plain root entry point there nor reachable via a boundary query"
                )));
            }
        }
    }
    Ok(())
}

/// Locations exposing at least one root (`Query`/`Mutation`) field whose return type is
/// `type_name` and which does not itself carry the stitch directive — a natural, non-keyed entry
/// point the Planner reaches straight from the client's root selection, with no boundary needed.
fn natural_entry_locations<'a>(
    type_name: &str,
    schemas: &'a IndexMap<String, SchemaDoc>,
    stitch_directive_name: &str,
) -> IndexSet<&'a str> {
    let mut out = IndexSet::new();
    for (location, schema) in schemas {
        for root_name in [schema.query_type.as_deref(), schema.mutation_type.as_deref()].into_iter().flatten() {
            let Some(TypeDef::Object(root)) = schema.types.get(root_name) else { continue };
            let has_natural_field = root.fields.values().any(|field| {
                field.ty.inner_name() == type_name
                    && !field.directives.iter().any(|d| d.name == stitch_directive_name)
            });
            if has_natural_field {
                out.insert(location.as_str());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DirectiveUse, FieldDef, InputValueDef, ObjectTypeDef, Value};
    use crate::ast::GqlType;
    use crate::location::{LocationResponse, RequestContext};
    use async_trait::async_trait;

    struct StubExecutor;

    #[async_trait]
    impl LocationExecutor for StubExecutor {
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

    fn query_root(fields: IndexMap<String, FieldDef>) -> SchemaDoc {
        let mut types = IndexMap::new();
        types.insert("Query".to_string(), TypeDef::Object(ObjectTypeDef { name: "Query".into(), implements: vec![], fields }));
        SchemaDoc { query_type: Some("Query".into()), mutation_type: None, subscription_type: None, types }
    }

    #[test]
    fn composes_a_single_location_schema() {
        let mut fields = IndexMap::new();
        fields.insert(
            "widget".to_string(),
            FieldDef { name: "widget".into(), arguments: IndexMap::new(), ty: GqlType::Named("String".into()), directives: vec![] },
        );
        let mut schemas = IndexMap::new();
        schemas.insert("a".to_string(), query_root(fields));

        let mut executables: IndexMap<String, Arc<dyn LocationExecutor>> = IndexMap::new();
        executables.insert("a".to_string(), Arc::new(StubExecutor));

        let supergraph = compose(schemas, executables, GatewayConfig::default()).unwrap();
        assert!(supergraph.locations.contains("a"));
    }

    #[test]
    fn rejects_incompatible_root_field_without_stitch() {
        let mut fields_a = IndexMap::new();
        fields_a.insert(
            "widget".to_string(),
            FieldDef { name: "widget".into(), arguments: IndexMap::new(), ty: GqlType::Named("String".into()), directives: vec![] },
        );
        let mut fields_b = IndexMap::new();
        fields_b.insert(
            "widget".to_string(),
            FieldDef { name: "widget".into(), arguments: IndexMap::new(), ty: GqlType::Named("Int".into()), directives: vec![] },
        );

        let mut schemas = IndexMap::new();
        schemas.insert("a".to_string(), query_root(fields_a));
        schemas.insert("b".to_string(), query_root(fields_b));

        let mut executables: IndexMap<String, Arc<dyn LocationExecutor>> = IndexMap::new();
        executables.insert("a".to_string(), Arc::new(StubExecutor));
        executables.insert("b".to_string(), Arc::new(StubExecutor));

        let result = compose(schemas, executables, GatewayConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn rejects_merged_type_with_no_boundary_back_to_a_contributing_location() {
        let mut arguments = IndexMap::new();
        arguments.insert("id".to_string(), InputValueDef { name: "id".into(), ty: GqlType::Named("ID".into()) });
        let mut directive_args = IndexMap::new();
        directive_args.insert("key".to_string(), Value::String("id".into()));

        let mut fields_a = IndexMap::new();
        fields_a.insert(
            "widget".to_string(),
            FieldDef {
                name: "widget".into(),
                arguments: arguments.clone(),
                ty: GqlType::Named("Widget".into()),
                directives: vec![DirectiveUse { name: "stitch".into(), arguments: directive_args }],
            },
        );
        let mut schema_a = query_root(fields_a);
        let mut widget_fields_a = IndexMap::new();
        widget_fields_a.insert(
            "id".to_string(),
            FieldDef { name: "id".into(), arguments: IndexMap::new(), ty: GqlType::Named("ID".into()), directives: vec![] },
        );
        schema_a.types.insert(
            "Widget".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Widget".into(), implements: vec![], fields: widget_fields_a }),
        );

        let mut schema_b = query_root(IndexMap::new());
        let mut widget_fields_b = IndexMap::new();
        widget_fields_b.insert(
            "price".to_string(),
            FieldDef { name: "price".into(), arguments: IndexMap::new(), ty: GqlType::Named("Int".into()), directives: vec![] },
        );
        schema_b.types.insert(
            "Widget".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Widget".into(), implements: vec![], fields: widget_fields_b }),
        );

        let mut schemas = IndexMap::new();
        schemas.insert("a".to_string(), schema_a);
        schemas.insert("b".to_string(), schema_b);

        let mut executables: IndexMap<String, Arc<dyn LocationExecutor>> = IndexMap::new();
        executables.insert("a".to_string(), Arc::new(StubExecutor));
        executables.insert("b".to_string(), Arc::new(StubExecutor));

        let result = compose(schemas, executables, GatewayConfig::default());
        assert!(result.is_err());
    }
}
