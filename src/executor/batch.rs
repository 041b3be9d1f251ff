//! Batching (§4.3 "Boundary batching"): groups ready [`Operation`]s sharing a location and an
//! `after` step into one outbound document, aliasing each member's boundary field so the
//! response can be demultiplexed back to the right origin objects.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::ast::VariableDef;
use crate::error::PathSegment;
use crate::planner::Operation;
use crate::request::Request;

/// Every ready operation sharing a `(location, after)` pair, dispatched as one wire call.
pub(crate) struct BatchGroup<'a> {
    pub location: String,
    pub members: Vec<&'a Operation>,
}

/// Partitions `ready` operations by `(location, after)`, preserving the order a location's
/// members first appear in so batch aliases stay deterministic across runs.
pub(crate) fn group_by_location_and_after<'a>(ready: &[&'a Operation]) -> Vec<BatchGroup<'a>> {
    let mut order: IndexMap<(String, u32), Vec<&'a Operation>> = IndexMap::new();
    for op in ready {
        order.entry((op.location.clone(), op.after)).or_default().push(op);
    }
    order.into_iter().map(|((location, _after), members)| BatchGroup { location, members }).collect()
}

/// A concrete, index-resolved response path to one origin object — `Operation::path` names
/// response keys only; walking it against live data (§4.3) replaces any list hop with the
/// element's actual index.
#[derive(Debug, Clone)]
pub(crate) struct OriginRef {
    pub path: Vec<PathSegment>,
}

/// How one member's outbound fields were aliased, needed to demultiplex the response and to
/// repath any `errors[]` entry it returns.
pub(crate) enum MemberShape {
    /// A root (non-boundary) operation: its response fields merge directly at the data root.
    Root,
    /// One aliased field whose argument batches every origin's key into a single list.
    ListBatch { alias: String, origins: Vec<OriginRef> },
    /// One aliased field per origin object.
    PerObject { aliases: Vec<(String, OriginRef)> },
}

pub(crate) struct MemberDemux<'a> {
    pub operation: &'a Operation,
    pub shape: MemberShape,
}

pub(crate) struct BuiltDocument<'a> {
    pub document: String,
    pub variables: Map<String, Value>,
    pub members: Vec<MemberDemux<'a>>,
}

/// Walks `path` against `data`, flattening through every list it passes so a field that returns
/// a list yields one origin per element instead of one origin for the whole array (§4.3,
/// §8 scenario 6). Read-only: used while *building* the outbound document, before any response
/// has come back to merge.
fn walk_origins<'v>(
    value: &'v Value,
    path: &[PathSegment],
    prefix: Vec<PathSegment>,
) -> Vec<(&'v Value, Vec<PathSegment>)> {
    match path.split_first() {
        None => vec![(value, prefix)],
        Some((PathSegment::Key(key), rest)) => match value {
            Value::Object(map) => match map.get(key) {
                Some(next) => {
                    let mut p = prefix;
                    p.push(PathSegment::Key(key.clone()));
                    walk_origins(next, rest, p)
                }
                None => Vec::new(),
            },
            Value::Array(items) => items
                .iter()
                .enumerate()
                .flat_map(|(i, item)| {
                    let mut p = prefix.clone();
                    p.push(PathSegment::Index(i));
                    walk_origins(item, path, p)
                })
                .collect(),
            _ => Vec::new(),
        },
        Some((PathSegment::Index(_), _)) => Vec::new(),
    }
}

fn matches_if_type(value: &Value, if_type: Option<&str>) -> bool {
    match if_type {
        None => true,
        Some(expected) => value.get("_STITCH_typename").and_then(Value::as_str) == Some(expected),
    }
}

fn strip_braces(text: &str) -> &str {
    text.strip_prefix('{').and_then(|s| s.strip_suffix('}')).unwrap_or(text)
}

fn json_to_graphql_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Array(items) => {
            format!("[{}]", items.iter().map(json_to_graphql_literal).collect::<Vec<_>>().join(", "))
        }
        Value::Object(fields) => format!(
            "{{{}}}",
            fields.iter().map(|(k, v)| format!("{k}: {}", json_to_graphql_literal(v))).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Renders the key argument literal for one origin object: a bare scalar for an ordinary
/// boundary, or a `{__typename, key}` object literal for a federation-shaped one (§6 glossary).
fn render_key_literal(origin: &Value, boundary: &crate::supergraph::BoundaryQuery) -> String {
    let key_field = format!("_STITCH_{}", boundary.key);
    let key_value = origin.get(&key_field).cloned().unwrap_or(Value::Null);
    if boundary.federation {
        let mut object = Map::new();
        object.insert("__typename".to_string(), Value::String(boundary.type_name.clone()));
        object.insert(boundary.key.clone(), key_value);
        json_to_graphql_literal(&Value::Object(object))
    } else {
        json_to_graphql_literal(&key_value)
    }
}

/// Builds the single outbound document for every ready operation at one `(location, after)`,
/// aliasing boundary fields per §4.3 and splicing root operations' selection sets in unwrapped.
pub(crate) fn build_document<'a>(
    request: &Request,
    data: &Value,
    group: &BatchGroup<'a>,
) -> BuiltDocument<'a> {
    let mut selection_parts: Vec<String> = Vec::new();
    let mut variable_names: IndexSet<String> = IndexSet::new();
    let mut members: Vec<MemberDemux<'a>> = Vec::new();
    let operation_type = group.members[0].operation_type;

    for (idx, op) in group.members.iter().enumerate() {
        variable_names.extend(op.variables.iter().cloned());

        match &op.boundary {
            None => {
                selection_parts.push(strip_braces(&op.selection_set).to_string());
                members.push(MemberDemux { operation: op, shape: MemberShape::Root });
            }
            Some(boundary) => {
                let origins: Vec<(&Value, Vec<PathSegment>)> = walk_origins(data, &op.path, Vec::new())
                    .into_iter()
                    .filter(|(value, _)| matches_if_type(value, op.if_type.as_deref()))
                    .collect();

                if boundary.list {
                    let alias = format!("_{idx}_result");
                    let keys = origins.iter().map(|(v, _)| render_key_literal(v, boundary)).collect::<Vec<_>>().join(", ");
                    selection_parts.push(format!(
                        "{alias}: {field}({arg}: [{keys}]) {selection}",
                        alias = alias,
                        field = boundary.field,
                        arg = boundary.arg_name,
                        keys = keys,
                        selection = op.selection_set,
                    ));
                    let origin_refs = origins.into_iter().map(|(_, path)| OriginRef { path }).collect();
                    members.push(MemberDemux { operation: op, shape: MemberShape::ListBatch { alias, origins: origin_refs } });
                } else {
                    let mut aliases = Vec::with_capacity(origins.len());
                    for (obj_idx, (value, path)) in origins.iter().enumerate() {
                        let alias = format!("_{idx}_{obj_idx}_result");
                        let key_literal = render_key_literal(value, boundary);
                        selection_parts.push(format!(
                            "{alias}: {field}({arg}: {key}) {selection}",
                            alias = alias,
                            field = boundary.field,
                            arg = boundary.arg_name,
                            key = key_literal,
                            selection = op.selection_set,
                        ));
                        aliases.push((alias, OriginRef { path: path.clone() }));
                    }
                    members.push(MemberDemux { operation: op, shape: MemberShape::PerObject { aliases } });
                }
            }
        }
    }

    let name = format!("Op{}", group.members.iter().map(|m| format!("_{}", m.step)).collect::<String>());
    let var_defs: Vec<VariableDef> =
        request.variable_definitions.iter().filter(|v| variable_names.contains(&v.name)).cloned().collect();
    let selection_text = format!("{{{}}}", selection_parts.join(" "));
    let document = crate::parser::render_document_with_text_selection(
        operation_type,
        Some(&name),
        &var_defs,
        &request.operation_directives,
        &selection_text,
    );

    let mut variables = Map::new();
    for name in &variable_names {
        if let Some(v) = request.variables.get(name) {
            variables.insert(name.clone(), v.clone());
        }
    }

    BuiltDocument { document, variables, members }
}

pub(crate) struct BatchOutcome<'a> {
    pub members: Vec<MemberDemux<'a>>,
    pub data: Option<Value>,
    pub errors: Vec<crate::error::RemoteGraphQLError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::OperationKind;
    use crate::supergraph::BoundaryQuery;

    fn op(step: u32, after: u32, location: &str, boundary: Option<BoundaryQuery>, path: Vec<PathSegment>) -> Operation {
        Operation {
            step,
            after,
            location: location.to_string(),
            operation_type: OperationKind::Query,
            selection_set: "{weight}".to_string(),
            variables: vec![],
            path,
            if_type: None,
            boundary,
        }
    }

    #[test]
    fn groups_ready_operations_by_location_and_after() {
        let a = op(2, 1, "shipping", None, vec![]);
        let b = op(3, 1, "shipping", None, vec![]);
        let c = op(4, 1, "billing", None, vec![]);
        let refs = vec![&a, &b, &c];
        let groups = group_by_location_and_after(&refs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[1].members.len(), 1);
    }

    #[test]
    fn list_boundary_batches_every_flattened_origin() {
        let data: Value = serde_json::from_str(
            r#"{"elementsA":[{"_STITCH_id":"1"},{"_STITCH_id":"2"}]}"#,
        )
        .unwrap();
        let boundary = BoundaryQuery {
            location: "b".into(),
            type_name: "Element".into(),
            field: "elements".into(),
            arg_name: "ids".into(),
            key: "id".into(),
            list: true,
            federation: false,
        };
        let operation = op(2, 1, "b", Some(boundary), vec![PathSegment::Key("elementsA".into())]);
        let group = BatchGroup { location: "b".into(), members: vec![&operation] };
        let request = crate::request::Request::prepare(
            "{ elementsA { id } }",
            None,
            Map::new(),
            crate::location::RequestContext::new(),
        )
        .unwrap();
        let built = build_document(&request, &data, &group);
        assert!(built.document.contains("_0_result: elements(ids: [\"1\", \"2\"])"));
    }
}
