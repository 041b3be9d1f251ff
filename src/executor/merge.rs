//! Result merging and error repathing (§4.3): folds one batch's response back into the shared
//! data tree at each origin object, and rewrites `errors[].path` from the batch's wire aliasing
//! back to the client-visible response path.

use serde_json::Value;

use crate::error::{PathSegment, RemoteGraphQLError};

use super::batch::{BatchOutcome, MemberShape};

pub(crate) fn apply_batch_outcome(data: &mut Value, errors: &mut Vec<RemoteGraphQLError>, outcome: BatchOutcome) {
    let BatchOutcome { members, data: response_data, errors: response_errors } = outcome;
    let response_data = response_data.unwrap_or(Value::Null);

    for member in &members {
        match &member.shape {
            MemberShape::Root => {
                if let Value::Object(resp_map) = &response_data {
                    for (key, value) in resp_map {
                        merge_field_at_root(data, key, value);
                    }
                }
            }
            MemberShape::ListBatch { alias, origins } => {
                if let Some(items) = response_data.get(alias).and_then(Value::as_array) {
                    for (origin, item) in origins.iter().zip(items.iter()) {
                        if !item.is_null() {
                            merge_at_path(data, &origin.path, item);
                        }
                    }
                }
            }
            MemberShape::PerObject { aliases } => {
                for (alias, origin) in aliases {
                    if let Some(item) = response_data.get(alias) {
                        if !item.is_null() {
                            merge_at_path(data, &origin.path, item);
                        }
                    }
                }
            }
        }
    }

    for error in response_errors {
        errors.extend(repath_error(&members, error));
    }
}

fn merge_field_at_root(data: &mut Value, key: &str, value: &Value) {
    let Value::Object(root) = data else { return };
    match root.get_mut(key) {
        Some(existing) => merge_value_into(existing, value),
        None => {
            root.insert(key.to_string(), value.clone());
        }
    }
}

/// Merges `src` into `dest` by shallow field assignment, recursing when both sides are objects
/// so an already-merged nested object isn't clobbered wholesale (§4.3 "Result merging").
fn merge_value_into(dest: &mut Value, src: &Value) {
    match (dest, src) {
        (Value::Object(dest_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dest_map.get_mut(k) {
                    Some(existing) => merge_value_into(existing, v),
                    None => {
                        dest_map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (dest_slot, src_val) => *dest_slot = src_val.clone(),
    }
}

fn merge_at_path(data: &mut Value, path: &[PathSegment], item: &Value) {
    if let Some(target) = navigate_mut(data, path) {
        merge_value_into(target, item);
    }
}

fn navigate_mut<'a>(value: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    match path.split_first() {
        None => Some(value),
        Some((PathSegment::Key(key), rest)) => value.as_object_mut()?.get_mut(key).and_then(|v| navigate_mut(v, rest)),
        Some((PathSegment::Index(idx), rest)) => value.as_array_mut()?.get_mut(*idx).and_then(|v| navigate_mut(v, rest)),
    }
}

/// Strips a batch alias prefix off `error.path` and prepends the matching origin's real response
/// path, resolving the "one more path segment past a list-batch alias names the origin index"
/// rule and the open-ended "descend one level by the next path segment" case from §9 by simply
/// splicing the remainder onto the origin path unchanged.
///
/// A `ListBatch` error path of just `[alias]`, with no following index, means the whole batched
/// field failed rather than one element of it — there is no single origin to blame, so the error
/// is duplicated once per origin in the batch, each repathed to that origin's own response path.
fn repath_error(members: &[super::batch::MemberDemux], error: RemoteGraphQLError) -> Vec<RemoteGraphQLError> {
    let Some((PathSegment::Key(first_key), rest)) = error.path.split_first() else { return vec![error] };

    for member in members {
        match &member.shape {
            MemberShape::Root => {}
            MemberShape::ListBatch { alias, origins } => {
                if alias != first_key {
                    continue;
                }
                return match rest.split_first() {
                    Some((PathSegment::Index(idx), remainder)) => match origins.get(*idx) {
                        Some(origin) => {
                            let mut path = origin.path.clone();
                            path.extend(remainder.iter().cloned());
                            vec![RemoteGraphQLError { message: error.message, path, extensions: error.extensions }]
                        }
                        None => vec![error],
                    },
                    None => origins
                        .iter()
                        .map(|origin| RemoteGraphQLError {
                            message: error.message.clone(),
                            path: origin.path.clone(),
                            extensions: error.extensions.clone(),
                        })
                        .collect(),
                    _ => vec![error],
                };
            }
            MemberShape::PerObject { aliases } => {
                if let Some((_, origin)) = aliases.iter().find(|(a, _)| a == first_key) {
                    let mut path = origin.path.clone();
                    path.extend(rest.iter().cloned());
                    return vec![RemoteGraphQLError { message: error.message, path, extensions: error.extensions }];
                }
            }
        }
    }
    vec![error]
}

/// Deletes every Planner-injected `_STITCH_*` bookkeeping field from the final result tree
/// (§4.3 cleanup), recursing through objects and arrays alike.
pub(crate) fn strip_reserved_fields(value: &mut Value, prefix: &str) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !k.starts_with(prefix));
            for v in map.values_mut() {
                strip_reserved_fields(v, prefix);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_reserved_fields(item, prefix);
            }
        }
        _ => {}
    }
}
