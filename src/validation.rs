//! Structural request validation against the merged schema (§6's `validate=true` gateway option).
//!
//! Checks field and argument existence recursively, gating a request before it reaches planning.
//! This is not a full re-implementation of GraphQL's validation rules (fragment-on-condition
//! compatibility, argument value coercion, selection-set merging) — those are peripheral to the
//! stitching core and are scoped out here; see `DESIGN.md`.

use crate::ast::{OperationKind, SchemaDoc, Selection, TypeDef};
use crate::error::ValidationError;
use crate::request::Request;

pub fn validate(schema: &SchemaDoc, request: &Request) -> Result<(), ValidationError> {
    let root_type = match request.operation_kind {
        OperationKind::Mutation => schema
            .mutation_type
            .as_deref()
            .ok_or_else(|| ValidationError::new("schema has no mutation root"))?,
        _ => schema.query_type.as_deref().ok_or_else(|| ValidationError::new("schema has no query root"))?,
    };
    validate_selection_set(schema, root_type, &request.selection_set)
}

fn validate_selection_set(schema: &SchemaDoc, type_name: &str, selections: &[Selection]) -> Result<(), ValidationError> {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                if field.name.starts_with("__") {
                    continue;
                }
                let Some(field_def) = schema.types.get(type_name).and_then(TypeDef::fields).and_then(|f| f.get(&field.name))
                else {
                    return Err(ValidationError::new(format!("field `{type_name}.{}` does not exist", field.name)));
                };
                for arg_name in field.arguments.keys() {
                    if !field_def.arguments.contains_key(arg_name) {
                        return Err(ValidationError::new(format!(
                            "field `{type_name}.{}` has no argument `{arg_name}`",
                            field.name
                        )));
                    }
                }
                if !field.selection_set.is_empty() {
                    validate_selection_set(schema, field_def.ty.inner_name(), &field.selection_set)?;
                }
            }
            Selection::InlineFragment(frag) => {
                let next_type = frag.type_condition.clone().unwrap_or_else(|| type_name.to_string());
                validate_selection_set(schema, &next_type, &frag.selection_set)?;
            }
            Selection::FragmentSpread(_) => unreachable!("fragments are inlined during Request::prepare"),
        }
    }
    Ok(())
}
