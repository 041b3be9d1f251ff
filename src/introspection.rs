//! Local resolution of `__schema`/`__type`/`__typename` against the merged schema (§4.2's
//! synthetic `"__super"` location). These fields never leave the process: the Planner routes them
//! here instead of to any [`crate::location::LocationExecutor`], and the Executor calls straight
//! into [`resolve_batch`] instead of dispatching a wire call.
//!
//! Covers the introspection shapes a client actually needs to discover the supergraph's merged
//! shape — type names, kinds, fields and their argument/return types, enum values, input fields.
//! Wrapping (`NON_NULL`/`LIST` as distinct `__Type` nodes via `ofType`) is not modeled; field and
//! argument types resolve straight to their named inner type. See `DESIGN.md`.

use serde_json::{Map, Value};

use crate::ast::{self, FieldDef, GqlType, OperationKind, SchemaDoc, Selection, TypeDef};
use crate::error::ExecutionError;
use crate::executor::batch::{BatchGroup, BatchOutcome, MemberDemux, MemberShape};
use crate::request::Request;
use crate::supergraph::Supergraph;

pub(crate) fn resolve_batch<'a>(
    supergraph: &Supergraph,
    request: &Request,
    group: BatchGroup<'a>,
) -> Result<BatchOutcome<'a>, ExecutionError> {
    let mut root = Map::new();
    let mut members = Vec::with_capacity(group.members.len());

    for operation in group.members {
        let document = crate::parser::parse_executable(&operation.selection_set).map_err(|err| ExecutionError {
            location: supergraph.config.introspection_location.clone(),
            message: err.to_string(),
        })?;
        let selections = document
            .operations
            .first()
            .map(|op| op.selection_set.clone())
            .unwrap_or_default();
        let root_type_name = match operation.operation_type {
            OperationKind::Mutation => supergraph.schema.mutation_type.as_deref().unwrap_or("Mutation"),
            _ => supergraph.schema.query_type.as_deref().unwrap_or("Query"),
        };

        for selection in &selections {
            if let Selection::Field(field) = selection {
                let value = resolve_root_field(supergraph, &request.variables, root_type_name, field);
                root.insert(field.response_key().to_string(), value);
            }
        }
        members.push(MemberDemux { operation, shape: MemberShape::Root });
    }

    Ok(BatchOutcome { members, data: Some(Value::Object(root)), errors: Vec::new() })
}

fn resolve_root_field(
    supergraph: &Supergraph,
    variables: &Map<String, Value>,
    root_type_name: &str,
    field: &ast::FieldSelection,
) -> Value {
    match field.name.as_str() {
        "__typename" => Value::String(root_type_name.to_string()),
        "__schema" => resolve_schema(&supergraph.schema, &field.selection_set),
        "__type" => {
            let name = field.arguments.get("name").and_then(|v| resolve_arg_string(v, variables));
            match name.filter(|n| supergraph.schema.types.contains_key(n)) {
                Some(name) => resolve_type(&supergraph.schema, &name, &field.selection_set),
                None => Value::Null,
            }
        }
        _ => Value::Null,
    }
}

fn resolve_arg_string(value: &ast::Value, variables: &Map<String, Value>) -> Option<String> {
    match value {
        ast::Value::String(s) => Some(s.clone()),
        ast::Value::Variable(name) => variables.get(name).and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn resolve_schema(schema: &SchemaDoc, selections: &[Selection]) -> Value {
    let mut obj = Map::new();
    for selection in selections {
        let Selection::Field(field) = selection else { continue };
        let value = match field.name.as_str() {
            "queryType" => match &schema.query_type {
                Some(name) => resolve_type(schema, name, &field.selection_set),
                None => Value::Null,
            },
            "mutationType" => match &schema.mutation_type {
                Some(name) => resolve_type(schema, name, &field.selection_set),
                None => Value::Null,
            },
            "subscriptionType" => Value::Null,
            "types" => Value::Array(schema.types.keys().map(|name| resolve_type(schema, name, &field.selection_set)).collect()),
            "directives" => Value::Array(Vec::new()),
            _ => Value::Null,
        };
        obj.insert(field.response_key().to_string(), value);
    }
    Value::Object(obj)
}

fn resolve_type(schema: &SchemaDoc, type_name: &str, selections: &[Selection]) -> Value {
    let Some(def) = schema.types.get(type_name) else { return Value::Null };
    let mut obj = Map::new();
    for selection in selections {
        let Selection::Field(field) = selection else { continue };
        let value = match field.name.as_str() {
            "name" => Value::String(type_name.to_string()),
            "kind" => Value::String(introspection_kind(def).to_string()),
            "description" => Value::Null,
            "fields" => match def.fields() {
                Some(fields) => {
                    Value::Array(fields.values().map(|f| resolve_field_node(schema, f, &field.selection_set)).collect())
                }
                None => Value::Null,
            },
            "interfaces" => match def {
                TypeDef::Object(o) => {
                    Value::Array(o.implements.iter().map(|i| resolve_type(schema, i, &field.selection_set)).collect())
                }
                _ => Value::Null,
            },
            "possibleTypes" => match def {
                TypeDef::Union(u) => {
                    Value::Array(u.members.iter().map(|m| resolve_type(schema, m, &field.selection_set)).collect())
                }
                _ => Value::Null,
            },
            "enumValues" => match def {
                TypeDef::Enum(e) => {
                    Value::Array(e.values.iter().map(|v| resolve_enum_value_node(v, &field.selection_set)).collect())
                }
                _ => Value::Null,
            },
            "inputFields" => match def {
                TypeDef::InputObject(i) => Value::Array(
                    i.fields.values().map(|f| resolve_input_value_node(schema, &f.name, &f.ty, &field.selection_set)).collect(),
                ),
                _ => Value::Null,
            },
            "ofType" => Value::Null,
            _ => Value::Null,
        };
        obj.insert(field.response_key().to_string(), value);
    }
    Value::Object(obj)
}

fn introspection_kind(def: &TypeDef) -> &'static str {
    match def {
        TypeDef::Scalar => "SCALAR",
        TypeDef::Object(_) => "OBJECT",
        TypeDef::Interface(_) => "INTERFACE",
        TypeDef::Union(_) => "UNION",
        TypeDef::Enum(_) => "ENUM",
        TypeDef::InputObject(_) => "INPUT_OBJECT",
    }
}

fn resolve_field_node(schema: &SchemaDoc, field_def: &FieldDef, selections: &[Selection]) -> Value {
    let mut obj = Map::new();
    for selection in selections {
        let Selection::Field(field) = selection else { continue };
        let value = match field.name.as_str() {
            "name" => Value::String(field_def.name.clone()),
            "description" => Value::Null,
            "args" => Value::Array(
                field_def
                    .arguments
                    .values()
                    .map(|a| resolve_input_value_node(schema, &a.name, &a.ty, &field.selection_set))
                    .collect(),
            ),
            "type" => resolve_type(schema, field_def.ty.inner_name(), &field.selection_set),
            "isDeprecated" => Value::Bool(false),
            "deprecationReason" => Value::Null,
            _ => Value::Null,
        };
        obj.insert(field.response_key().to_string(), value);
    }
    Value::Object(obj)
}

fn resolve_input_value_node(schema: &SchemaDoc, name: &str, ty: &GqlType, selections: &[Selection]) -> Value {
    let mut obj = Map::new();
    for selection in selections {
        let Selection::Field(field) = selection else { continue };
        let value = match field.name.as_str() {
            "name" => Value::String(name.to_string()),
            "description" => Value::Null,
            "type" => resolve_type(schema, ty.inner_name(), &field.selection_set),
            "defaultValue" => Value::Null,
            _ => Value::Null,
        };
        obj.insert(field.response_key().to_string(), value);
    }
    Value::Object(obj)
}

fn resolve_enum_value_node(name: &str, selections: &[Selection]) -> Value {
    let mut obj = Map::new();
    for selection in selections {
        let Selection::Field(field) = selection else { continue };
        let value = match field.name.as_str() {
            "name" => Value::String(name.to_string()),
            "description" => Value::Null,
            "isDeprecated" => Value::Bool(false),
            "deprecationReason" => Value::Null,
            _ => Value::Null,
        };
        obj.insert(field.response_key().to_string(), value);
    }
    Value::Object(obj)
}
