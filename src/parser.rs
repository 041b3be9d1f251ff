//! Parsing of schema (SDL) and executable (query) documents, and printing selection sets
//! back to GraphQL text for outbound sub-queries.
//!
//! Parsing is delegated to `graphql-parser`, the lightest widely-used GraphQL grammar in the
//! Rust ecosystem; its borrowed AST is converted into our owned [`crate::ast`] types at the
//! boundary so nothing downstream has to carry the parser's lifetimes around.

use std::fmt::Write as _;

use graphql_parser::query as gq;
use graphql_parser::schema as gs;

use crate::ast::{
    DirectiveUse, EnumTypeDef, ExecutableDoc, FieldDef, FieldSelection, FragmentDef,
    FragmentSpreadSelection, GqlType, InlineFragmentSelection, InputObjectTypeDef, InputValueDef,
    ObjectTypeDef, OperationDef, OperationKind, SchemaDoc, Selection, TypeDef, UnionTypeDef,
    Value, VariableDef,
};
use crate::error::GatewayError;

pub fn parse_schema(sdl: &str) -> Result<SchemaDoc, GatewayError> {
    let doc = graphql_parser::parse_schema::<&str>(sdl)
        .map_err(|err| GatewayError::parse(err.to_string()))?;
    Ok(convert_schema(&doc))
}

pub fn parse_executable(src: &str) -> Result<ExecutableDoc, GatewayError> {
    let doc =
        graphql_parser::parse_query::<&str>(src).map_err(|err| GatewayError::parse(err.to_string()))?;
    Ok(convert_executable(&doc))
}

fn convert_type(ty: &gs::Type<'_, &str>) -> GqlType {
    match ty {
        gs::Type::NamedType(name) => GqlType::Named((*name).to_string()),
        gs::Type::ListType(inner) => GqlType::List(Box::new(convert_type(inner))),
        gs::Type::NonNullType(inner) => GqlType::NonNull(Box::new(convert_type(inner))),
    }
}

fn convert_schema_value(value: &gs::Value<'_, &str>) -> Value {
    match value {
        gs::Value::Variable(name) => Value::Variable((*name).to_string()),
        gs::Value::Int(n) => Value::Int(n.as_i64().unwrap_or_default()),
        gs::Value::Float(f) => Value::Float(*f),
        gs::Value::String(s) => Value::String(s.clone()),
        gs::Value::Boolean(b) => Value::Boolean(*b),
        gs::Value::Null => Value::Null,
        gs::Value::Enum(name) => Value::Enum((*name).to_string()),
        gs::Value::List(items) => Value::List(items.iter().map(convert_schema_value).collect()),
        gs::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), convert_schema_value(v)))
                .collect(),
        ),
    }
}

fn convert_schema_directives(directives: &[gs::Directive<'_, &str>]) -> Vec<DirectiveUse> {
    directives
        .iter()
        .map(|d| DirectiveUse {
            name: d.name.to_string(),
            arguments: d
                .arguments
                .iter()
                .map(|(k, v)| ((*k).to_string(), convert_schema_value(v)))
                .collect(),
        })
        .collect()
}

fn convert_input_values(values: &[gs::InputValue<'_, &str>]) -> IndexMapVal {
    values
        .iter()
        .map(|v| {
            (
                v.name.to_string(),
                InputValueDef {
                    name: v.name.to_string(),
                    ty: convert_type(&v.value_type),
                },
            )
        })
        .collect()
}

type IndexMapVal = indexmap::IndexMap<String, InputValueDef>;

fn convert_fields(fields: &[gs::Field<'_, &str>]) -> indexmap::IndexMap<String, FieldDef> {
    fields
        .iter()
        .map(|f| {
            (
                f.name.to_string(),
                FieldDef {
                    name: f.name.to_string(),
                    arguments: convert_input_values(&f.arguments),
                    ty: convert_type(&f.field_type),
                    directives: convert_schema_directives(&f.directives),
                },
            )
        })
        .collect()
}

fn convert_schema(doc: &gs::Document<'_, &str>) -> SchemaDoc {
    let mut out = SchemaDoc::default();
    out.query_type = Some("Query".to_string());
    for definition in &doc.definitions {
        match definition {
            gs::Definition::SchemaDefinition(schema_def) => {
                if let Some(q) = &schema_def.query {
                    out.query_type = Some(q.to_string());
                }
                out.mutation_type = schema_def.mutation.map(|m| m.to_string());
                out.subscription_type = schema_def.subscription.map(|s| s.to_string());
            }
            gs::Definition::TypeDefinition(type_def) => {
                let (name, def) = convert_type_definition(type_def);
                out.types.insert(name, def);
            }
            gs::Definition::TypeExtension(_) | gs::Definition::DirectiveDefinition(_) => {
                // Directive definitions (e.g. the `@stitch` declaration) are documentation-only
                // for composition purposes; their applications are what matter and those are read
                // straight off the field they decorate. Type extensions are not emitted by the
                // upstream schemas this gateway composes today.
            }
        }
    }
    // No explicit `schema { ... }` block named a mutation/subscription root — fall back to the
    // bare `type Mutation`/`type Subscription` convention the rest of the GraphQL ecosystem uses.
    if out.mutation_type.is_none() && out.types.contains_key("Mutation") {
        out.mutation_type = Some("Mutation".to_string());
    }
    if out.subscription_type.is_none() && out.types.contains_key("Subscription") {
        out.subscription_type = Some("Subscription".to_string());
    }
    out
}

fn convert_type_definition(def: &gs::TypeDefinition<'_, &str>) -> (String, TypeDef) {
    match def {
        gs::TypeDefinition::Scalar(s) => (s.name.to_string(), TypeDef::Scalar),
        gs::TypeDefinition::Object(o) => (
            o.name.to_string(),
            TypeDef::Object(ObjectTypeDef {
                name: o.name.to_string(),
                implements: o.implements_interfaces.iter().map(|i| i.to_string()).collect(),
                fields: convert_fields(&o.fields),
            }),
        ),
        gs::TypeDefinition::Interface(i) => (
            i.name.to_string(),
            TypeDef::Interface(ObjectTypeDef {
                name: i.name.to_string(),
                implements: i.implements_interfaces.iter().map(|n| n.to_string()).collect(),
                fields: convert_fields(&i.fields),
            }),
        ),
        gs::TypeDefinition::Union(u) => (
            u.name.to_string(),
            TypeDef::Union(UnionTypeDef {
                name: u.name.to_string(),
                members: u.types.iter().map(|t| t.to_string()).collect(),
            }),
        ),
        gs::TypeDefinition::Enum(e) => (
            e.name.to_string(),
            TypeDef::Enum(EnumTypeDef {
                name: e.name.to_string(),
                values: e.values.iter().map(|v| v.name.to_string()).collect(),
            }),
        ),
        gs::TypeDefinition::InputObject(i) => (
            i.name.to_string(),
            TypeDef::InputObject(InputObjectTypeDef {
                name: i.name.to_string(),
                fields: convert_input_values(&i.fields),
            }),
        ),
    }
}

// ---- executable documents --------------------------------------------------

fn convert_query_type(ty: &gq::Type<'_, &str>) -> GqlType {
    match ty {
        gq::Type::NamedType(name) => GqlType::Named((*name).to_string()),
        gq::Type::ListType(inner) => GqlType::List(Box::new(convert_query_type(inner))),
        gq::Type::NonNullType(inner) => GqlType::NonNull(Box::new(convert_query_type(inner))),
    }
}

fn convert_query_value(value: &gq::Value<'_, &str>) -> Value {
    match value {
        gq::Value::Variable(name) => Value::Variable((*name).to_string()),
        gq::Value::Int(n) => Value::Int(n.as_i64().unwrap_or_default()),
        gq::Value::Float(f) => Value::Float(*f),
        gq::Value::String(s) => Value::String(s.clone()),
        gq::Value::Boolean(b) => Value::Boolean(*b),
        gq::Value::Null => Value::Null,
        gq::Value::Enum(name) => Value::Enum((*name).to_string()),
        gq::Value::List(items) => Value::List(items.iter().map(convert_query_value).collect()),
        gq::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), convert_query_value(v)))
                .collect(),
        ),
    }
}

fn convert_query_args(args: &[(&str, gq::Value<'_, &str>)]) -> indexmap::IndexMap<String, Value> {
    args.iter()
        .map(|(k, v)| ((*k).to_string(), convert_query_value(v)))
        .collect()
}

fn convert_query_directives(directives: &[gq::Directive<'_, &str>]) -> Vec<DirectiveUse> {
    directives
        .iter()
        .map(|d| DirectiveUse {
            name: d.name.to_string(),
            arguments: convert_query_args(&d.arguments),
        })
        .collect()
}

fn convert_selection_set(set: &gq::SelectionSet<'_, &str>) -> Vec<Selection> {
    set.items.iter().map(convert_selection).collect()
}

fn convert_selection(selection: &gq::Selection<'_, &str>) -> Selection {
    match selection {
        gq::Selection::Field(field) => Selection::Field(FieldSelection {
            alias: field.alias.map(|a| a.to_string()),
            name: field.name.to_string(),
            arguments: convert_query_args(&field.arguments),
            directives: convert_query_directives(&field.directives),
            selection_set: convert_selection_set(&field.selection_set),
        }),
        gq::Selection::FragmentSpread(spread) => {
            Selection::FragmentSpread(FragmentSpreadSelection {
                name: spread.fragment_name.to_string(),
                directives: convert_query_directives(&spread.directives),
            })
        }
        gq::Selection::InlineFragment(frag) => Selection::InlineFragment(InlineFragmentSelection {
            type_condition: frag.type_condition.as_ref().map(|gq::TypeCondition::On(t)| t.to_string()),
            directives: convert_query_directives(&frag.directives),
            selection_set: convert_selection_set(&frag.selection_set),
        }),
    }
}

fn convert_variable_definitions(defs: &[gq::VariableDefinition<'_, &str>]) -> Vec<VariableDef> {
    defs.iter()
        .map(|v| VariableDef {
            name: v.name.to_string(),
            ty: convert_query_type(&v.var_type),
            default_value: v.default_value.as_ref().map(convert_query_value),
        })
        .collect()
}

fn convert_executable(doc: &gq::Document<'_, &str>) -> ExecutableDoc {
    let mut out = ExecutableDoc::default();
    for definition in &doc.definitions {
        match definition {
            gq::Definition::Operation(op) => out.operations.push(convert_operation(op)),
            gq::Definition::Fragment(frag) => {
                let gq::TypeCondition::On(type_condition) = &frag.type_condition;
                out.fragments.insert(
                    frag.name.to_string(),
                    FragmentDef {
                        name: frag.name.to_string(),
                        type_condition: type_condition.to_string(),
                        directives: convert_query_directives(&frag.directives),
                        selection_set: convert_selection_set(&frag.selection_set),
                    },
                );
            }
        }
    }
    out
}

fn convert_operation(op: &gq::OperationDefinition<'_, &str>) -> OperationDef {
    match op {
        gq::OperationDefinition::SelectionSet(set) => OperationDef {
            name: None,
            kind: OperationKind::Query,
            variable_definitions: Vec::new(),
            directives: Vec::new(),
            selection_set: convert_selection_set(set),
        },
        gq::OperationDefinition::Query(q) => OperationDef {
            name: q.name.map(|n| n.to_string()),
            kind: OperationKind::Query,
            variable_definitions: convert_variable_definitions(&q.variable_definitions),
            directives: convert_query_directives(&q.directives),
            selection_set: convert_selection_set(&q.selection_set),
        },
        gq::OperationDefinition::Mutation(m) => OperationDef {
            name: m.name.map(|n| n.to_string()),
            kind: OperationKind::Mutation,
            variable_definitions: convert_variable_definitions(&m.variable_definitions),
            directives: convert_query_directives(&m.directives),
            selection_set: convert_selection_set(&m.selection_set),
        },
        gq::OperationDefinition::Subscription(s) => OperationDef {
            name: s.name.map(|n| n.to_string()),
            kind: OperationKind::Subscription,
            variable_definitions: convert_variable_definitions(&s.variable_definitions),
            directives: convert_query_directives(&s.directives),
            selection_set: convert_selection_set(&s.selection_set),
        },
    }
}

// ---- printing ---------------------------------------------------------------

/// Renders a selection set back to GraphQL text. Used by the Planner (operation.selection_set)
/// and the Executor (outbound batched sub-documents); both only ever deal in selection sets with
/// fragments already inlined, so there is no fragment-spread case to print.
pub fn print_selection_set(selections: &[Selection]) -> String {
    let mut out = String::new();
    print_selection_set_into(selections, &mut out);
    out
}

fn print_selection_set_into(selections: &[Selection], out: &mut String) {
    out.push('{');
    for (i, selection) in selections.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        print_selection_into(selection, out);
    }
    out.push('}');
}

fn print_selection_into(selection: &Selection, out: &mut String) {
    match selection {
        Selection::Field(field) => {
            if let Some(alias) = &field.alias {
                let _ = write!(out, "{alias}: ");
            }
            out.push_str(&field.name);
            if !field.arguments.is_empty() {
                out.push('(');
                for (i, (name, value)) in field.arguments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{name}: {}", print_value(value));
                }
                out.push(')');
            }
            for directive in &field.directives {
                print_directive_into(directive, out);
            }
            if !field.selection_set.is_empty() {
                out.push(' ');
                print_selection_set_into(&field.selection_set, out);
            }
        }
        Selection::FragmentSpread(spread) => {
            let _ = write!(out, "...{}", spread.name);
        }
        Selection::InlineFragment(frag) => {
            out.push_str("...");
            if let Some(t) = &frag.type_condition {
                let _ = write!(out, " on {t}");
            }
            out.push(' ');
            print_selection_set_into(&frag.selection_set, out);
        }
    }
}

fn print_directive_into(directive: &DirectiveUse, out: &mut String) {
    let _ = write!(out, " @{}", directive.name);
    if !directive.arguments.is_empty() {
        out.push('(');
        for (i, (name, value)) in directive.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{name}: {}", print_value(value));
        }
        out.push(')');
    }
}

pub fn print_value(value: &Value) -> String {
    match value {
        Value::Variable(name) => format!("${name}"),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("{:?}", s),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Enum(name) => name.clone(),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(print_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(fields) => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(k, v)| format!("{k}: {}", print_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

pub fn print_type(ty: &GqlType) -> String {
    match ty {
        GqlType::Named(name) => name.clone(),
        GqlType::List(inner) => format!("[{}]", print_type(inner)),
        GqlType::NonNull(inner) => format!("{}!", print_type(inner)),
    }
}

/// Renders a full operation document: `query Name($var: Type) { ... }`.
pub fn print_operation(
    kind: OperationKind,
    name: Option<&str>,
    variable_definitions: &[VariableDef],
    directives: &[DirectiveUse],
    selection_set: &[Selection],
) -> String {
    let mut out = String::new();
    out.push_str(kind.as_str());
    if let Some(name) = name {
        let _ = write!(out, " {name}");
    }
    if !variable_definitions.is_empty() {
        out.push('(');
        for (i, var) in variable_definitions.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "${}: {}", var.name, print_type(&var.ty));
            if let Some(default) = &var.default_value {
                let _ = write!(out, " = {}", print_value(default));
            }
        }
        out.push(')');
    }
    for directive in directives {
        print_directive_into(directive, &mut out);
    }
    out.push(' ');
    print_selection_set_into(selection_set, &mut out);
    out
}

/// Renders a full operation document whose selection set has already been rendered to text
/// (braces included) rather than kept as an AST — the Executor uses this to splice batched,
/// aliased boundary fields that were built directly as strings and never parsed.
pub fn render_document_with_text_selection(
    kind: OperationKind,
    name: Option<&str>,
    variable_definitions: &[VariableDef],
    directives: &[DirectiveUse],
    selection_set_text: &str,
) -> String {
    let mut out = String::new();
    out.push_str(kind.as_str());
    if let Some(name) = name {
        let _ = write!(out, " {name}");
    }
    if !variable_definitions.is_empty() {
        out.push('(');
        for (i, var) in variable_definitions.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "${}: {}", var.name, print_type(&var.ty));
            if let Some(default) = &var.default_value {
                let _ = write!(out, " = {}", print_value(default));
            }
        }
        out.push(')');
    }
    for directive in directives {
        print_directive_into(directive, &mut out);
    }
    out.push(' ');
    out.push_str(selection_set_text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_query() {
        let doc = parse_executable("{ widget(id: \"1\") { id name } }").unwrap();
        assert_eq!(doc.operations.len(), 1);
        let op = &doc.operations[0];
        assert_eq!(op.selection_set.len(), 1);
    }

    #[test]
    fn round_trips_selection_set_text() {
        let doc = parse_executable("query Q { a: widget(id: \"1\") { id } }").unwrap();
        let op = &doc.operations[0];
        let text = print_selection_set(&op.selection_set);
        assert!(text.contains("a: widget"));
        assert!(text.contains("\"1\""));
    }

    #[test]
    fn parses_object_type_with_directive() {
        let schema = parse_schema(
            r#"
            directive @stitch(key: String!) repeatable on FIELD_DEFINITION
            type Query { widget(id: ID!): Widget @stitch(key: "id") }
            type Widget { id: ID! name: String }
            "#,
        )
        .unwrap();
        let query = schema.types.get("Query").unwrap();
        let field = query.fields().unwrap().get("widget").unwrap();
        assert_eq!(field.directives.len(), 1);
        assert_eq!(field.directives[0].name, "stitch");
    }
}
