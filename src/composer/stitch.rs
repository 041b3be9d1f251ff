//! Stitch-directive discovery: turns every `@stitch`-annotated root query field, in every
//! location's own schema, into a [`BoundaryQuery`] keyed by the type it resolves (§4.1, §6).

use indexmap::{IndexMap, IndexSet};

use crate::ast::{GqlType, SchemaDoc, TypeDef};
use crate::config::GatewayConfig;
use crate::directive::parse_stitch_key;
use crate::error::CompositionError;
use crate::supergraph::BoundaryQuery;

/// Scans every location's `Query` root for fields carrying the configured stitch directive and
/// builds the `typeName -> BoundaryQuery` routing table the Planner walks.
pub fn discover_boundary_queries(
    schemas: &IndexMap<String, SchemaDoc>,
    config: &GatewayConfig,
) -> Result<IndexMap<String, Vec<BoundaryQuery>>, CompositionError> {
    let mut boundaries: IndexMap<String, Vec<BoundaryQuery>> = IndexMap::new();
    let mut seen_location_keys: IndexSet<(String, String, String)> = IndexSet::new();

    for (location, schema) in schemas {
        let Some(query_type_name) = &schema.query_type else { continue };
        let Some(TypeDef::Object(query_root)) = schema.types.get(query_type_name) else { continue };

        for field in query_root.fields.values() {
            let Some(directive) = field.directives.iter().find(|d| d.name == config.stitch_directive_name) else {
                continue;
            };
            let Some(crate::ast::Value::String(raw_key)) = directive.arguments.get("key") else {
                return Err(CompositionError::new(format!(
                    "location `{location}` field `{}.{}` carries @{} without a string `key` argument",
                    query_type_name, field.name, config.stitch_directive_name
                )));
            };
            let stitch_key = parse_stitch_key(raw_key, field)?;

            let target_type = field.ty.inner_name().to_string();

            let target_has_key_field = match schema.types.get(&target_type) {
                Some(TypeDef::Object(obj)) | Some(TypeDef::Interface(obj)) => {
                    obj.fields.contains_key(&stitch_key.field_name)
                }
                _ => false,
            };
            if !target_has_key_field {
                return Err(CompositionError::new(format!(
                    "location `{location}` field `{}.{}` stitches on key `{}`, which is not a \
                     field of `{target_type}` in that location's own schema",
                    query_type_name, field.name, stitch_key.field_name
                )));
            }

            let dedup_key = (location.clone(), target_type.clone(), stitch_key.field_name.clone());
            if !seen_location_keys.insert(dedup_key) {
                return Err(CompositionError::new(format!(
                    "location `{location}` declares more than one @{} boundary query into \
                     `{target_type}` on key `{}`",
                    config.stitch_directive_name, stitch_key.field_name
                )));
            }

            let list = field.ty.is_list();
            let federation = is_federation_shaped_key(field, &stitch_key.arg_name);

            boundaries.entry(target_type.clone()).or_default().push(BoundaryQuery {
                location: location.clone(),
                type_name: target_type,
                field: field.name.clone(),
                arg_name: stitch_key.arg_name,
                key: stitch_key.field_name,
                list,
                federation,
            });
        }
    }

    Ok(boundaries)
}

/// A boundary argument shaped `{ __typename, key }` (or a list of such objects) signals a
/// federation-style `_entities`-like input rather than a bare scalar key list (§6 glossary).
fn is_federation_shaped_key(field: &crate::ast::FieldDef, arg_name: &str) -> bool {
    field
        .arguments
        .get(arg_name)
        .map(|arg| arg.ty.inner_name().ends_with("Key") || arg.ty.inner_name().ends_with("Representation"))
        .unwrap_or(false)
        && matches!(field.arguments.get(arg_name).map(|a| &a.ty), Some(GqlType::List(_)) | Some(GqlType::NonNull(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DirectiveUse, FieldDef, InputValueDef, ObjectTypeDef, Value};

    fn schema_with_stitch_field() -> SchemaDoc {
        let mut arguments = IndexMap::new();
        arguments.insert("id".to_string(), InputValueDef { name: "id".into(), ty: GqlType::Named("ID".into()) });
        let mut directive_args = IndexMap::new();
        directive_args.insert("key".to_string(), Value::String("id".into()));

        let field = FieldDef {
            name: "widget".into(),
            arguments,
            ty: GqlType::Named("Widget".into()),
            directives: vec![DirectiveUse { name: "stitch".into(), arguments: directive_args }],
        };
        let mut fields = IndexMap::new();
        fields.insert("widget".to_string(), field);

        let mut types = IndexMap::new();
        types.insert("Query".to_string(), TypeDef::Object(ObjectTypeDef { name: "Query".into(), implements: vec![], fields }));

        let mut widget_fields = IndexMap::new();
        widget_fields.insert(
            "id".to_string(),
            FieldDef { name: "id".into(), arguments: IndexMap::new(), ty: GqlType::Named("ID".into()), directives: vec![] },
        );
        types.insert(
            "Widget".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Widget".into(), implements: vec![], fields: widget_fields }),
        );

        SchemaDoc { query_type: Some("Query".into()), mutation_type: None, subscription_type: None, types }
    }

    #[test]
    fn discovers_a_simple_boundary_query() {
        let mut schemas = IndexMap::new();
        schemas.insert("widgets".to_string(), schema_with_stitch_field());

        let boundaries = discover_boundary_queries(&schemas, &GatewayConfig::default()).unwrap();
        let widget_boundaries = boundaries.get("Widget").expect("Widget should have a boundary query");
        assert_eq!(widget_boundaries.len(), 1);
        assert_eq!(widget_boundaries[0].location, "widgets");
        assert_eq!(widget_boundaries[0].field, "widget");
        assert_eq!(widget_boundaries[0].arg_name, "id");
        assert_eq!(widget_boundaries[0].key, "id");
        assert!(!widget_boundaries[0].list);
    }

    #[test]
    fn rejects_a_stitch_key_that_is_not_a_field_of_the_target_type() {
        let mut arguments = IndexMap::new();
        arguments.insert("sku".to_string(), InputValueDef { name: "sku".into(), ty: GqlType::Named("ID".into()) });
        let mut directive_args = IndexMap::new();
        directive_args.insert("key".to_string(), Value::String("sku".into()));

        let field = FieldDef {
            name: "widget".into(),
            arguments,
            ty: GqlType::Named("Widget".into()),
            directives: vec![DirectiveUse { name: "stitch".into(), arguments: directive_args }],
        };
        let mut fields = IndexMap::new();
        fields.insert("widget".to_string(), field);
        let mut types = IndexMap::new();
        types.insert("Query".to_string(), TypeDef::Object(ObjectTypeDef { name: "Query".into(), implements: vec![], fields }));
        let mut widget_fields = IndexMap::new();
        widget_fields.insert(
            "id".to_string(),
            FieldDef { name: "id".into(), arguments: IndexMap::new(), ty: GqlType::Named("ID".into()), directives: vec![] },
        );
        types.insert(
            "Widget".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Widget".into(), implements: vec![], fields: widget_fields }),
        );
        let schema = SchemaDoc { query_type: Some("Query".into()), mutation_type: None, subscription_type: None, types };

        let mut schemas = IndexMap::new();
        schemas.insert("widgets".to_string(), schema);

        let result = discover_boundary_queries(&schemas, &GatewayConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_boundary_queries_on_the_same_location_and_key() {
        let mut fields = IndexMap::new();
        for field_name in ["widgetByIdA", "widgetByIdB"] {
            let mut arguments = IndexMap::new();
            arguments.insert("id".to_string(), InputValueDef { name: "id".into(), ty: GqlType::Named("ID".into()) });
            let mut directive_args = IndexMap::new();
            directive_args.insert("key".to_string(), Value::String("id".into()));
            fields.insert(
                field_name.to_string(),
                FieldDef {
                    name: field_name.into(),
                    arguments,
                    ty: GqlType::Named("Widget".into()),
                    directives: vec![DirectiveUse { name: "stitch".into(), arguments: directive_args }],
                },
            );
        }
        let mut types = IndexMap::new();
        types.insert("Query".to_string(), TypeDef::Object(ObjectTypeDef { name: "Query".into(), implements: vec![], fields }));
        let mut widget_fields = IndexMap::new();
        widget_fields.insert(
            "id".to_string(),
            FieldDef { name: "id".into(), arguments: IndexMap::new(), ty: GqlType::Named("ID".into()), directives: vec![] },
        );
        types.insert(
            "Widget".to_string(),
            TypeDef::Object(ObjectTypeDef { name: "Widget".into(), implements: vec![], fields: widget_fields }),
        );
        let schema = SchemaDoc { query_type: Some("Query".into()), mutation_type: None, subscription_type: None, types };

        let mut schemas = IndexMap::new();
        schemas.insert("widgets".to_string(), schema);

        let result = discover_boundary_queries(&schemas, &GatewayConfig::default());
        assert!(result.is_err());
    }
}
